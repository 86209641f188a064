//! HTTP transport backed by `ureq`: page fetching and token authentication.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AuthError, LoadError};
use crate::paginator::{PageFetcher, PageRequest};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Blocking HTTP client shared by page loads and logins.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("jtv/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }

    pub fn agent(&self) -> &ureq::Agent {
        &self.agent
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

/// `Authorization` header value for a bearer token.
pub fn bearer_header(token: &str) -> String {
    format!("Bearer {token}")
}

impl PageFetcher for HttpFetcher {
    fn fetch_page(&self, request: &PageRequest) -> Result<Value, LoadError> {
        let mut req = self
            .agent
            .get(&request.url)
            .set("Accept", "application/json");
        if let Some(token) = request.token.as_deref().filter(|t| !t.is_empty()) {
            req = req.set("Authorization", &bearer_header(token));
        }

        let response = match req.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                warn!(url = %request.url, status, "page request rejected");
                return Err(LoadError::HttpStatus {
                    status,
                    url: request.url.clone(),
                });
            }
            Err(ureq::Error::Transport(e)) => {
                warn!(url = %request.url, error = %e, "page request failed");
                return Err(LoadError::Transport {
                    url: request.url.clone(),
                    message: e.to_string(),
                });
            }
        };

        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(LoadError::HttpStatus {
                status,
                url: request.url.clone(),
            });
        }
        debug!(url = %request.url, status, "page response");

        serde_json::from_reader(response.into_reader()).map_err(|e| {
            if e.is_io() {
                LoadError::Transport {
                    url: request.url.clone(),
                    message: e.to_string(),
                }
            } else {
                LoadError::MalformedResponse(format!("body is not valid JSON: {e}"))
            }
        })
    }
}

/// Username and password posted to the authentication endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Obtain a bearer token from `auth_url`. The token is returned as-is.
pub fn login(
    agent: &ureq::Agent,
    auth_url: &str,
    credentials: &Credentials,
) -> Result<String, AuthError> {
    debug!(auth_url, username = %credentials.username, "logging in");
    let response = match agent.post(auth_url).send_json(credentials) {
        Ok(response) => response,
        Err(ureq::Error::Status(status, _)) => return Err(AuthError::HttpStatus { status }),
        Err(ureq::Error::Transport(e)) => {
            return Err(AuthError::Transport {
                url: auth_url.to_string(),
                message: e.to_string(),
            })
        }
    };
    let body: Value = response
        .into_json()
        .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
    parse_token_response(&body)
}

/// Extract the `token` string from an authentication response body.
pub fn parse_token_response(body: &Value) -> Result<String, AuthError> {
    match body.get("token") {
        Some(Value::String(token)) if !token.is_empty() => Ok(token.clone()),
        Some(_) => Err(AuthError::MalformedResponse(
            "\"token\" must be a non-empty string".to_string(),
        )),
        None => Err(AuthError::MalformedResponse(
            "response has no \"token\" field".to_string(),
        )),
    }
}
