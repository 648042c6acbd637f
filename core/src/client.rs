//! Authenticated request client with retry on 401.
//!
//! # Design
//! `ApiClient` owns an immutable `ClientConfig`, a `SessionProvider` and a
//! `Transport`, and nothing else. Each `call` runs the same sequence:
//! acquire a token, build the request, send it, then either return the
//! parsed body, retry after a 401 while budget remains, or fail. Retries of
//! one call are strictly sequential; separate calls share no mutable state.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{build_request, join_url, HttpMethod, HttpResponse, RequestBody};
use crate::session::SessionProvider;
use crate::transport::{ReqwestTransport, Transport};

const TOKEN_PREFIX_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct ApiClient<S, T = ReqwestTransport> {
    config: ClientConfig,
    session: S,
    transport: T,
}

impl<S: SessionProvider> ApiClient<S, ReqwestTransport> {
    /// Client over the default reqwest transport, bounded by `config.timeout`.
    pub fn new(config: ClientConfig, session: S) -> Result<Self, ApiError> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self {
            config,
            session,
            transport,
        })
    }
}

impl<S: SessionProvider, T: Transport> ApiClient<S, T> {
    pub fn with_transport(config: ClientConfig, session: S, transport: T) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self {
            config,
            session,
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        join_url(&self.config.base_url, endpoint)
    }

    /// Issue a request and parse the 2xx body as `R`.
    pub async fn call<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: HttpMethod,
        body: Option<RequestBody>,
        extra_headers: &[(String, String)],
    ) -> Result<R, ApiError> {
        let response = self.send(endpoint, method, body.as_ref(), extra_headers).await?;
        parse_json(&response)
    }

    pub async fn get<R: DeserializeOwned>(&self, endpoint: &str) -> Result<R, ApiError> {
        self.call(endpoint, HttpMethod::Get, None, &[]).await
    }

    pub async fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = RequestBody::json(body)?;
        self.call(endpoint, HttpMethod::Post, Some(body), &[]).await
    }

    /// Run the attempt loop and return the first 2xx response.
    async fn send(
        &self,
        endpoint: &str,
        method: HttpMethod,
        body: Option<&RequestBody>,
        extra_headers: &[(String, String)],
    ) -> Result<HttpResponse, ApiError> {
        let url = self.url_for(endpoint);
        let mut remaining = self.config.max_retries;
        let mut force_refresh = false;
        let mut attempt: u32 = 1;

        loop {
            let token = self.acquire_token(force_refresh).await;
            debug!(
                endpoint,
                %method,
                attempt,
                token = token.as_deref().map(token_prefix).unwrap_or("<none>"),
                "sending request"
            );

            let request = build_request(method, &url, body, extra_headers, token.as_deref());
            let response = match self.transport.execute(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(endpoint, %method, attempt, error = %e, "request failed before a response was received");
                    return Err(e);
                }
            };

            if response.is_success() {
                debug!(endpoint, status = response.status, attempt, "request succeeded");
                return Ok(response);
            }

            if response.status == 401 && remaining > 0 {
                remaining -= 1;
                warn!(
                    endpoint,
                    attempt,
                    remaining,
                    delay = ?self.config.retry_delay,
                    "unauthorized, retrying with a fresh token"
                );
                tokio::time::sleep(self.config.retry_delay).await;
                force_refresh = true;
                attempt += 1;
                continue;
            }

            warn!(endpoint, status = response.status, attempt, "request rejected");
            return Err(ApiError::Http {
                status: response.status,
                body: response.body,
            });
        }
    }

    async fn acquire_token(&self, force_refresh: bool) -> Option<String> {
        if !self.session.is_signed_in().await {
            return None;
        }
        self.session
            .token(force_refresh)
            .await
            .filter(|token| !token.is_empty())
    }
}

/// Parse a 2xx body. An empty body is read as JSON `null`.
fn parse_json<R: DeserializeOwned>(response: &HttpResponse) -> Result<R, ApiError> {
    let text = response.body.trim();
    let text = if text.is_empty() { "null" } else { text };
    serde_json::from_str(text).map_err(ApiError::Deserialization)
}

fn token_prefix(token: &str) -> &str {
    match token.char_indices().nth(TOKEN_PREFIX_LEN) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}
