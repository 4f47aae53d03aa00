//! Session Store
//!
//! Explicit session object with a pending → resolved lifecycle. Consumers
//! receive it by reference; there is no process-wide session.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::token_store::TokenStore;
use crate::error::{ClientError, ClientResult};
use crate::gateway::{Expect, Gateway};

/// Endpoint returning the user that owns the bearer token
pub const CURRENT_USER_PATH: &str = "/api/users/";

/// The authenticated user as reported by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_staff: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// Any other backend-supplied fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserSummary {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            id: None,
            first_name: None,
            last_name: None,
            is_staff: None,
            is_active: None,
            extra: Map::new(),
        }
    }

    /// First and last name when known, otherwise the username
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}

/// Snapshot of the authentication state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub is_authenticated: bool,
    pub token: Option<String>,
    pub user: Option<UserSummary>,
    /// True until startup validation has finished
    pub loading: bool,
}

impl Session {
    fn pending() -> Self {
        Self {
            is_authenticated: false,
            token: None,
            user: None,
            loading: true,
        }
    }

    fn signed_out() -> Self {
        Self {
            loading: false,
            ..Self::pending()
        }
    }

    fn signed_in(token: String, user: UserSummary) -> Self {
        Self {
            is_authenticated: true,
            token: Some(token),
            user: Some(user),
            loading: false,
        }
    }
}

/// Owns the session state and its persisted token
pub struct SessionStore {
    state: Session,
    tokens: Box<dyn TokenStore>,
}

impl SessionStore {
    /// New store in the pending phase; call [`initialize`](Self::initialize)
    /// once before relying on its state.
    pub fn new(tokens: impl TokenStore + 'static) -> Self {
        Self {
            state: Session::pending(),
            tokens: Box::new(tokens),
        }
    }

    pub fn session(&self) -> &Session {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated
    }

    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    pub fn user(&self) -> Option<&UserSummary> {
        self.state.user.as_ref()
    }

    /// Restore the session from the persisted token.
    ///
    /// Any failure (unreadable store, rejected token, unreachable backend)
    /// erases the persisted token and leaves the session signed out; it is
    /// never reported to the caller. Always ends with `loading == false`.
    pub async fn initialize(&mut self, gateway: &Gateway) -> &Session {
        let token = match self.tokens.load().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!("No persisted token, starting signed out");
                self.state = Session::signed_out();
                return &self.state;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted token");
                self.reset_persisted().await;
                return &self.state;
            }
        };

        match fetch_current_user(&gateway.with_token(&token)).await {
            Ok(user) => {
                tracing::info!(username = %user.username, "Session restored");
                self.state = Session::signed_in(token, user);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Persisted token rejected, signing out");
                self.reset_persisted().await;
            }
        }

        &self.state
    }

    /// Record a token obtained by a login or registration flow.
    ///
    /// No request is made; the state is only changed once the token has been
    /// persisted.
    pub async fn login(&mut self, token: impl Into<String>, user: UserSummary) -> ClientResult<()> {
        let token = token.into();
        self.tokens.save(&token).await?;

        tracing::info!(username = %user.username, "Logged in");
        self.state = Session::signed_in(token, user);
        Ok(())
    }

    /// Erase the persisted token and sign out
    pub async fn logout(&mut self) -> ClientResult<()> {
        self.state = Session::signed_out();
        self.tokens.clear().await?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// A gateway carrying this session's token
    pub fn authorized(&self, gateway: &Gateway) -> ClientResult<Gateway> {
        match (&self.state.is_authenticated, &self.state.token) {
            (true, Some(token)) => Ok(gateway.with_token(token)),
            _ => Err(ClientError::NotAuthenticated),
        }
    }

    async fn reset_persisted(&mut self) {
        if let Err(e) = self.tokens.clear().await {
            tracing::warn!(error = %e, "Failed to erase persisted token");
        }
        self.state = Session::signed_out();
    }
}

/// GET the user owning the gateway's token
pub async fn fetch_current_user(gateway: &Gateway) -> ClientResult<UserSummary> {
    gateway.get_json(CURRENT_USER_PATH, Expect::OK).await
}
