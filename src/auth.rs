//! Login and registration flows
//!
//! Obtain a bearer token from the backend and hand it to the
//! [`SessionStore`]. When the token response does not include the user, the
//! flow looks it up with the new token before signing in.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::gateway::{Expect, Gateway};
use crate::session::{fetch_current_user, SessionStore, UserSummary};

pub const LOGIN_PATH: &str = "/api/users/login/";
pub const REGISTER_PATH: &str = "/api/users/register/";

/// Username/password pair for `POST /api/users/login/`
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn validate(&self) -> ClientResult<()> {
        if self.username.trim().is_empty() {
            return Err(ClientError::Validation("Please enter a username".to_string()));
        }
        if self.password.is_empty() {
            return Err(ClientError::Validation("Please enter a password".to_string()));
        }
        Ok(())
    }
}

/// Account details for `POST /api/users/register/`
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl Registration {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
        }
    }

    pub fn first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }
}

/// Token response; login answers with `access`, registration with `token`
/// or `access`
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(alias = "token")]
    access: String,
    #[serde(default)]
    user: Option<UserSummary>,
}

/// Authenticate and sign the session in
pub async fn login(
    session: &mut SessionStore,
    gateway: &Gateway,
    credentials: &Credentials,
) -> ClientResult<UserSummary> {
    credentials.validate()?;

    let response: TokenResponse = gateway
        .anonymous()
        .post_json(LOGIN_PATH, credentials, Expect::OK)
        .await?;

    complete(session, gateway, response).await
}

/// Create an account and sign the session in
pub async fn register(
    session: &mut SessionStore,
    gateway: &Gateway,
    registration: &Registration,
) -> ClientResult<UserSummary> {
    Credentials::new(registration.username.clone(), registration.password.clone()).validate()?;

    let response: TokenResponse = gateway
        .anonymous()
        .post_json(REGISTER_PATH, registration, Expect::OK_OR_CREATED)
        .await?;

    complete(session, gateway, response).await
}

async fn complete(
    session: &mut SessionStore,
    gateway: &Gateway,
    response: TokenResponse,
) -> ClientResult<UserSummary> {
    let user = match response.user {
        Some(user) => user,
        None => fetch_current_user(&gateway.with_token(&response.access)).await?,
    };

    session.login(response.access, user.clone()).await?;
    Ok(user)
}
