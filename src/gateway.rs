//! Authenticated Request Gateway
//!
//! Thin wrapper over [`reqwest::Client`] used by every component that talks
//! to the backend. Attaches `Authorization: Bearer <token>` when a token is
//! set, makes a single attempt per call and classifies the outcome into
//! [`ClientError`].

use reqwest::header::AUTHORIZATION;
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult, RejectionBody};

/// Which response statuses an endpoint treats as success
#[derive(Debug, Clone, Copy)]
pub enum Expect {
    /// Any 2xx
    Success,
    /// Exactly these statuses
    OneOf(&'static [StatusCode]),
}

impl Expect {
    pub const OK: Expect = Expect::OneOf(&[StatusCode::OK]);
    pub const CREATED: Expect = Expect::OneOf(&[StatusCode::CREATED]);
    pub const OK_OR_CREATED: Expect = Expect::OneOf(&[StatusCode::OK, StatusCode::CREATED]);

    pub fn accepts(&self, status: StatusCode) -> bool {
        match self {
            Expect::Success => status.is_success(),
            Expect::OneOf(codes) => codes.contains(&status),
        }
    }
}

/// HTTP gateway to the subscriptions backend
#[derive(Debug, Clone)]
pub struct Gateway {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl Gateway {
    /// Build a gateway without a token.
    ///
    /// No timeout is set unless `request_timeout_secs` is configured.
    /// `base_url` must be an absolute `http` or `https` URL.
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            ClientError::Validation(format!("Invalid API URL '{}': {}", config.base_url, e))
        })?;
        if !matches!(base.scheme(), "http" | "https") || !base.has_host() {
            return Err(ClientError::Validation(format!(
                "Invalid API URL '{}': expected http:// or https://",
                config.base_url
            )));
        }

        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            ClientError::Validation(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Same client and base URL, carrying `token`
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.into()),
        }
    }

    /// Same client and base URL, without a token
    pub fn anonymous(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Absolute URL for an API path such as `/api/subscriptions/`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    /// Send once and check the status against `expect`
    async fn dispatch(&self, builder: RequestBuilder, expect: Expect) -> ClientResult<Response> {
        let request = builder.build().map_err(send_error)?;
        let method = request.method().clone();
        let url = request.url().clone();

        tracing::debug!(%method, %url, authenticated = self.has_token(), "Sending request");

        let response = self.client.execute(request).await.map_err(|e| {
            tracing::debug!(%method, %url, error = %e, "Request failed without response");
            send_error(e)
        })?;

        let status = response.status();
        tracing::debug!(%method, %url, status = status.as_u16(), "Received response");

        if expect.accepts(status) {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(ClientError::Rejected {
            status,
            body: RejectionBody::from_text(&text),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// GET a JSON document
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, expect: Expect) -> ClientResult<T> {
        let response = self.dispatch(self.request(Method::GET, path), expect).await?;
        Self::decode(response).await
    }

    /// POST a JSON body and decode the JSON reply
    pub async fn post_json<B, T>(&self, path: &str, body: &B, expect: Expect) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).json(body);
        let response = self.dispatch(builder, expect).await?;
        Self::decode(response).await
    }

    /// POST a multipart form and decode the JSON reply
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
        expect: Expect,
    ) -> ClientResult<T> {
        let builder = self.request(Method::POST, path).multipart(form);
        let response = self.dispatch(builder, expect).await?;
        Self::decode(response).await
    }

    /// DELETE a resource, ignoring any reply body
    pub async fn delete(&self, path: &str, expect: Expect) -> ClientResult<()> {
        self.dispatch(self.request(Method::DELETE, path), expect).await?;
        Ok(())
    }
}

/// Requests that could not be built never reached the network
fn send_error(e: reqwest::Error) -> ClientError {
    if e.is_builder() {
        ClientError::Validation(format!("Invalid request: {}", e))
    } else {
        ClientError::Network(e)
    }
}
