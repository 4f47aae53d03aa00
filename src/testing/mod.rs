//! In-process mock of the subscriptions backend
//!
//! An Axum server bound to `127.0.0.1:0` that behaves like the real REST
//! service closely enough for client tests, and records every request it
//! receives.

mod error;
mod routes;
mod state;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::subscriptions::{RenewalType, SubscriptionId};
use state::{BackendState, Shared};

pub(crate) struct MockBackend {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub(crate) async fn start() -> Self {
        let state: Shared = Arc::new(std::sync::Mutex::new(BackendState::default()));
        let router = routes::router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Self { addr, state, handle }
    }

    pub(crate) fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn add_user(&self, username: &str, password: &str) {
        self.state.lock().unwrap().add_user(username, password);
    }

    /// Token for `username`, creating the user if needed
    pub(crate) fn issue_token(&self, username: &str) -> String {
        let mut state = self.state.lock().unwrap();
        if !state.users.contains_key(username) {
            state.add_user(username, "password");
        }
        state.issue_token(username)
    }

    pub(crate) fn seed_subscription(
        &self,
        owner: &str,
        name: &str,
        cost: &str,
        subscription_date: NaiveDate,
        renewal_type: RenewalType,
    ) -> SubscriptionId {
        let cost = Decimal::from_str(cost).unwrap();
        self.state
            .lock()
            .unwrap()
            .insert(owner, name, cost, subscription_date, renewal_type)
            .id
    }

    /// Make the stats endpoint answer 500
    pub(crate) fn fail_stats(&self, fail: bool) {
        self.state.lock().unwrap().fail_stats = fail;
    }

    pub(crate) fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub(crate) fn requests(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .map(|r| (r.method.clone(), r.path.clone()))
            .collect()
    }

    pub(crate) fn last_authorization(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .requests
            .last()
            .and_then(|r| r.authorization.clone())
    }

    pub(crate) fn last_json_body(&self) -> Option<Value> {
        self.state.lock().unwrap().last_json_body.clone()
    }

    pub(crate) fn last_upload_name(&self) -> Option<String> {
        self.state.lock().unwrap().last_upload_name.clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_requests() {
        let backend = MockBackend::start().await;
        let token = backend.issue_token("alice");

        let response = reqwest::Client::new()
            .get(format!("{}/api/subscriptions/", backend.url()))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            backend.requests(),
            vec![("GET".to_string(), "/api/subscriptions/".to_string())]
        );
    }
}
