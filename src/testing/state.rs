//! Mock backend state

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::derive::{renewal_date, renews_within, round_money, RENEWAL_WINDOW_DAYS};
use crate::subscriptions::{RenewalType, Subscription};

pub(crate) type Shared = Arc<Mutex<BackendState>>;

#[derive(Debug, Clone)]
pub(crate) struct MockUser {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct BackendState {
    pub users: HashMap<String, MockUser>,
    /// token -> username
    pub tokens: HashMap<String, String>,
    /// (owner, record)
    pub subscriptions: Vec<(String, Subscription)>,
    pub requests: Vec<RecordedRequest>,
    pub last_json_body: Option<Value>,
    pub last_upload_name: Option<String>,
    pub fail_stats: bool,
    next_id: i64,
    tokens_issued: u64,
}

impl BackendState {
    pub fn add_user(&mut self, username: &str, password: &str) {
        let id = self.users.len() as i64 + 1;
        self.users.insert(
            username.to_string(),
            MockUser {
                id,
                username: username.to_string(),
                password: password.to_string(),
                first_name: String::new(),
                last_name: String::new(),
            },
        );
    }

    pub fn issue_token(&mut self, username: &str) -> String {
        self.tokens_issued += 1;
        let token = format!("tok-{}-{}", username, self.tokens_issued);
        self.tokens.insert(token.clone(), username.to_string());
        token
    }

    pub fn insert(
        &mut self,
        owner: &str,
        name: &str,
        cost: Decimal,
        subscription_date: NaiveDate,
        renewal_type: RenewalType,
    ) -> Subscription {
        self.next_id += 1;
        let today = Utc::now().date_naive();

        let sub = Subscription {
            id: self.next_id,
            name: name.to_string(),
            cost: round_money(cost),
            subscription_date,
            renewal_type,
            renewal_date: renewal_date(subscription_date, renewal_type).unwrap_or(subscription_date),
            renewing_in_7_days: renews_within(subscription_date, renewal_type, today, RENEWAL_WINDOW_DAYS),
            created_at: Some(Utc::now().to_rfc3339()),
            updated_at: Some(Utc::now().to_rfc3339()),
        };

        self.subscriptions.push((owner.to_string(), sub.clone()));
        sub
    }

    pub fn owned_by(&self, owner: &str) -> Vec<Subscription> {
        self.subscriptions
            .iter()
            .filter(|(o, _)| o == owner)
            .map(|(_, s)| s.clone())
            .collect()
    }
}
