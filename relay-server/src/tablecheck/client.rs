//! HTTP client for the TableCheck webhook registration endpoint.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use super::types::WebhookRegistration;
use crate::Config;

/// Path of the webhook registration endpoint, relative to the API base URL.
pub const WEBHOOKS_PATH: &str = "/api/sync/v1/webhooks";

/// Errors from a registration call.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Connect failure, timeout or an unreadable response.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// TableCheck answered with a non-2xx status.
    #[error("TableCheck responded with status code {}", .status.as_u16())]
    Status { status: StatusCode, body: Value },
}

impl RegistrationError {
    /// Body returned by TableCheck, if any.
    pub fn body(&self) -> Option<&Value> {
        match self {
            RegistrationError::Status { body, .. } if !is_empty_body(body) => Some(body),
            _ => None,
        }
    }

    /// Best available error detail: the TableCheck body, else the error message.
    pub fn detail(&self) -> Value {
        self.body()
            .cloned()
            .unwrap_or_else(|| Value::String(self.to_string()))
    }

    /// TableCheck body for the error log.
    pub fn response_body(&self) -> Value {
        self.body()
            .cloned()
            .unwrap_or_else(|| Value::String("No response data".to_string()))
    }
}

fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Parse a response body as JSON, keeping non-JSON text as a string.
fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Authenticated client for the TableCheck sync API.
#[derive(Debug, Clone)]
pub struct TableCheckClient {
    http: Client,
    endpoint: String,
    api_key: String,
    timeout: Option<Duration>,
}

impl TableCheckClient {
    pub fn new(
        http: Client,
        base_url: &Url,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            http,
            endpoint: format!("{}{}", base_url.as_str().trim_end_matches('/'), WEBHOOKS_PATH),
            api_key: api_key.into(),
            timeout,
        }
    }

    /// Build a client from the relay configuration.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = Client::builder().build()?;
        Ok(Self::new(
            http,
            &config.tablecheck_api_url,
            config.tablecheck_api_key.clone(),
            config.request_timeout_ms.map(Duration::from_millis),
        ))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit a webhook registration and return TableCheck's response body.
    ///
    /// The call is made exactly once; failures are returned, never retried.
    pub async fn register_webhook(
        &self,
        registration: &WebhookRegistration,
    ) -> Result<Value, RegistrationError> {
        info!(
            endpoint = %self.endpoint,
            franchise_ids = ?registration.franchise_ids,
            shop_ids = ?registration.shop_ids,
            "tablecheck_register_starting"
        );

        let mut request = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(registration);

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    warn!(endpoint = %self.endpoint, error = %e, "tablecheck_register_timeout");
                } else {
                    warn!(endpoint = %self.endpoint, error = %e, "tablecheck_register_request_error");
                }
                return Err(e.into());
            }
        };

        let status = response.status();
        let body = parse_body(&response.text().await?);

        if !status.is_success() {
            warn!(
                endpoint = %self.endpoint,
                status_code = status.as_u16(),
                "tablecheck_register_rejected"
            );
            return Err(RegistrationError::Status { status, body });
        }

        info!(status_code = status.as_u16(), "tablecheck_register_complete");

        Ok(body)
    }
}
