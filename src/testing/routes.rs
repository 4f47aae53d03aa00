//! Mock backend routes
//!
//! - GET /api/users/ - Current user
//! - POST /api/users/login/ - Token for username/password
//! - POST /api/users/register/ - Create account, returns token
//! - GET|POST /api/subscriptions/ - List / create
//! - GET /api/subscriptions/stats/ - Totals
//! - POST /api/subscriptions/bulk_upload/ - CSV import
//! - DELETE /api/subscriptions/delete/:id/ - Delete

use axum::{
    extract::{Multipart, Path, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;

use super::error::{MockError, MockResult};
use super::state::{BackendState, RecordedRequest, Shared};
use crate::derive::{annual_equivalent, monthly_equivalent, round_money};
use crate::subscriptions::{
    RenewalType, ServiceCost, StatsSummary, Subscription, SubscriptionId, REQUIRED_COLUMNS,
};

pub(crate) fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/users/", get(current_user))
        .route("/api/users/login/", post(login))
        .route("/api/users/register/", post(register))
        .route("/api/subscriptions/", get(list_subscriptions).post(create_subscription))
        .route("/api/subscriptions/stats/", get(stats))
        .route("/api/subscriptions/bulk_upload/", post(bulk_upload))
        .route("/api/subscriptions/delete/:id/", delete(delete_subscription))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        authorization: request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    state.lock().unwrap().requests.push(recorded);

    next.run(request).await
}

fn authenticate(state: &BackendState, headers: &HeaderMap) -> MockResult<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| state.tokens.get(token))
        .cloned()
        .ok_or(MockError::Unauthorized)
}

async fn current_user(State(state): State<Shared>, headers: HeaderMap) -> MockResult<Json<Value>> {
    let state = state.lock().unwrap();
    let username = authenticate(&state, &headers)?;
    let user = &state.users[&username];

    Ok(Json(json!({
        "id": user.id,
        "username": user.username,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "is_staff": false,
        "is_active": true,
    })))
}

fn str_field<'a>(body: &'a Value, name: &str) -> &'a str {
    body.get(name).and_then(Value::as_str).unwrap_or("")
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> MockResult<Json<Value>> {
    let mut state = state.lock().unwrap();
    let username = str_field(&body, "username");
    let password = str_field(&body, "password");

    let valid = state
        .users
        .get(username)
        .is_some_and(|user| user.password == password);
    if !valid {
        return Err(MockError::error("Invalid credentials"));
    }

    let token = state.issue_token(username);
    Ok(Json(json!({ "access": token })))
}

async fn register(
    State(state): State<Shared>,
    Json(body): Json<Value>,
) -> MockResult<(StatusCode, Json<Value>)> {
    let mut state = state.lock().unwrap();
    let username = str_field(&body, "username").trim().to_string();

    if username.is_empty() {
        return Err(MockError::field("username", "This field may not be blank."));
    }
    if state.users.contains_key(&username) {
        return Err(MockError::field(
            "username",
            "A user with that username already exists.",
        ));
    }

    state.add_user(&username, str_field(&body, "password"));
    if let Some(user) = state.users.get_mut(&username) {
        user.first_name = str_field(&body, "first_name").to_string();
        user.last_name = str_field(&body, "last_name").to_string();
    }

    let token = state.issue_token(&username);
    Ok((StatusCode::CREATED, Json(json!({ "access": token }))))
}

async fn list_subscriptions(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> MockResult<Json<Vec<Subscription>>> {
    let state = state.lock().unwrap();
    let username = authenticate(&state, &headers)?;

    let mut subs = state.owned_by(&username);
    subs.sort_by_key(|s| s.renewal_date);
    Ok(Json(subs))
}

fn parse_cost(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

async fn create_subscription(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> MockResult<(StatusCode, Json<Subscription>)> {
    let mut state = state.lock().unwrap();
    let username = authenticate(&state, &headers)?;
    state.last_json_body = Some(body.clone());

    let name = str_field(&body, "name").trim();
    if name.is_empty() {
        return Err(MockError::field("name", "This field may not be blank."));
    }

    let cost = parse_cost(body.get("cost"))
        .ok_or_else(|| MockError::field("cost", "A valid number is required."))?;

    let date = NaiveDate::parse_from_str(str_field(&body, "subscription_date"), "%Y-%m-%d")
        .map_err(|_| {
            MockError::field(
                "subscription_date",
                "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
            )
        })?;

    let renewal_type = RenewalType::from_str(str_field(&body, "renewal_type")).map_err(|_| {
        MockError::field("renewal_type", "This is not a valid choice.")
    })?;

    if state.owned_by(&username).iter().any(|s| s.name == name) {
        return Err(MockError::field(
            "non_field_errors",
            "The fields user, name must make a unique set.",
        ));
    }

    let created = state.insert(&username, name, cost, date, renewal_type);
    Ok((StatusCode::CREATED, Json(created)))
}

async fn stats(State(state): State<Shared>, headers: HeaderMap) -> MockResult<Json<StatsSummary>> {
    let state = state.lock().unwrap();
    let username = authenticate(&state, &headers)?;

    if state.fail_stats {
        return Err(MockError::Internal("Error: database unavailable".to_string()));
    }

    let subs = state.owned_by(&username);
    let monthly: Decimal = subs.iter().map(monthly_equivalent).sum();
    let yearly: Decimal = subs.iter().map(annual_equivalent).sum();

    Ok(Json(StatsSummary {
        monthly_cost: round_money(monthly),
        yearly_cost: round_money(yearly),
        subscription_count: Some(subs.len() as u64),
        service_costs: subs
            .iter()
            .map(|s| ServiceCost {
                name: s.name.clone(),
                monthly_cost: round_money(monthly_equivalent(s)),
                yearly_cost: round_money(annual_equivalent(s)),
            })
            .collect(),
    }))
}

async fn bulk_upload(
    State(state): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> MockResult<(StatusCode, Json<Value>)> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MockError::error(e.to_string()))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| MockError::error(e.to_string()))?;
            upload = Some((name, bytes.to_vec()));
        }
    }

    let mut state = state.lock().unwrap();
    let username = authenticate(&state, &headers)?;

    let (file_name, bytes) = upload.ok_or_else(|| MockError::error("No file provided"))?;
    state.last_upload_name = Some(file_name.clone());

    if !file_name.ends_with(".csv") {
        return Err(MockError::error("File is not a CSV"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes.as_slice());
    let headers = reader
        .headers()
        .map_err(|e| MockError::error(e.to_string()))?
        .clone();

    let mut columns = Vec::new();
    for required in REQUIRED_COLUMNS {
        let idx = headers
            .iter()
            .position(|h| h == required)
            .ok_or_else(|| MockError::error(format!("Missing required column: {}", required)))?;
        columns.push(idx);
    }

    let mut imported = Vec::new();
    for record in reader.records().flatten() {
        let get = |i: usize| record.get(columns[i]).unwrap_or("");
        let cost = Decimal::from_str(get(1)).ok();
        let date = NaiveDate::parse_from_str(get(2), "%Y-%m-%d").ok();
        let renewal = RenewalType::from_str(get(3)).ok();

        if let (false, Some(cost), Some(date), Some(renewal)) = (get(0).is_empty(), cost, date, renewal) {
            let created = state.insert(&username, get(0), cost, date, renewal);
            imported.push(created);
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("imported {} subscriptions", imported.len()),
            "subscriptions": imported,
        })),
    ))
}

async fn delete_subscription(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<SubscriptionId>,
) -> MockResult<StatusCode> {
    let mut state = state.lock().unwrap();
    let username = authenticate(&state, &headers)?;

    let idx = state
        .subscriptions
        .iter()
        .position(|(_, s)| s.id == id)
        .ok_or_else(|| MockError::NotFound("Subscription not found".to_string()))?;

    if state.subscriptions[idx].0 != username {
        return Err(MockError::Forbidden("No access".to_string()));
    }

    state.subscriptions.remove(idx);
    Ok(StatusCode::NO_CONTENT)
}
