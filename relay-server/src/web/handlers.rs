//! HTTP endpoint handlers.
//!
//! - `GET /` answers with a static banner
//! - `POST /api/register-webhook` registers this relay with TableCheck
//! - `POST /api/webhook-receiver` records TableCheck callbacks and always
//!   answers 200, even when recording fails, so TableCheck never retries or
//!   alerts because of the relay's own problems

use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use crate::eventlog::{iso_timestamp, EventSink, LogFile};
use crate::tablecheck::{TableCheckClient, WebhookRegistration};
use crate::web::envelope::Envelope;
use crate::Config;

/// Plaintext answer of the root endpoint.
pub const SERVICE_BANNER: &str = "TableCheck Webhook App is running!";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tablecheck: TableCheckClient,
    pub events: Arc<dyn EventSink>,
}

impl AppState {
    pub fn new(config: Config, tablecheck: TableCheckClient, events: Arc<dyn EventSink>) -> Self {
        Self {
            config: Arc::new(config),
            tablecheck,
            events,
        }
    }
}

/// Append to the event log, reporting failures only on the diagnostic stream.
fn record<T: Serialize>(events: &dyn EventSink, file: LogFile, entry: &T) {
    let result = serde_json::to_value(entry)
        .map_err(Into::into)
        .and_then(|value| events.append(file, &value));

    if let Err(e) = result {
        warn!(file = file.file_name(), error = %e, "event_log_append_failed");
    }
}

// =============================================================================
// Root / Health
// =============================================================================

pub async fn root() -> &'static str {
    SERVICE_BANNER
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Webhook Registration
// =============================================================================

/// Webhook registration endpoint.
///
/// The request body is ignored; every parameter comes from configuration.
/// Each call makes one outbound request, with no deduplication.
pub async fn register_webhook(State(state): State<AppState>) -> (StatusCode, Json<Envelope>) {
    let registration = WebhookRegistration::from_config(&state.config);
    record(
        state.events.as_ref(),
        LogFile::RegisterRequest,
        &registration,
    );

    match state.tablecheck.register_webhook(&registration).await {
        Ok(data) => {
            record(state.events.as_ref(), LogFile::RegisterResponse, &data);
            info!(
                franchise_id = %state.config.franchise_id,
                shop_id = %state.config.shop_id,
                "register_webhook_succeeded"
            );
            (StatusCode::OK, Json(Envelope::registered(data)))
        }
        Err(e) => {
            record(
                state.events.as_ref(),
                LogFile::RegisterError,
                &json!({
                    "message": e.to_string(),
                    "response": e.response_body(),
                }),
            );
            error!(error = %e, detail = %e.detail(), "register_webhook_failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Envelope::registration_failed(e.detail())),
            )
        }
    }
}

// =============================================================================
// Webhook Receiver
// =============================================================================

/// Webhook receiver endpoint.
///
/// Accepts any headers and body without validation. Always returns 200.
pub async fn webhook_receiver(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Envelope>) {
    let body_length = body.len();
    let body = parse_webhook_body(&headers, &body);

    info!(
        body_length = body_length,
        header_count = headers.len(),
        "webhook_received"
    );
    debug!(body = %body, "webhook_received_body");

    let events = state.events.as_ref();

    match acknowledge(events, &headers, body) {
        Ok(envelope) => (StatusCode::OK, Json(envelope)),
        Err(e) => {
            let message = format!("{e:#}");
            error!(error = %message, "webhook_processing_failed");

            record(
                events,
                LogFile::WebhookError,
                &json!({
                    "message": message,
                    "stack": format!("{e:?}"),
                }),
            );

            let envelope = Envelope::processing_failed(message);
            record(events, LogFile::WebhookErrorResponse, &envelope);

            (StatusCode::OK, Json(envelope))
        }
    }
}

/// Record the callback and build the success acknowledgement.
fn acknowledge(
    events: &dyn EventSink,
    headers: &HeaderMap,
    body: Value,
) -> anyhow::Result<Envelope> {
    let received = json!({
        "headers": headers_to_json(headers),
        "body": body,
    });
    events
        .append(LogFile::WebhookReceived, &received)
        .context("Failed to record received webhook")?;

    let envelope = Envelope::received(iso_timestamp());
    let entry = serde_json::to_value(&envelope).context("Failed to serialize acknowledgement")?;
    events
        .append(LogFile::WebhookResponse, &entry)
        .context("Failed to record acknowledgement")?;

    Ok(envelope)
}

/// Decode a callback body.
///
/// An empty body becomes `{}`. Form-encoded bodies become an object, other
/// bodies are parsed as JSON and anything that is not JSON is kept as text.
fn parse_webhook_body(headers: &HeaderMap, raw: &[u8]) -> Value {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Value::Object(Map::new());
    }

    if is_form_encoded(headers) {
        return form_to_json(raw);
    }

    serde_json::from_slice(raw)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(raw).into_owned()))
}

fn is_form_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
        .unwrap_or(false)
}

/// Decode `a=1&b=2` into an object; a repeated key collects its values in an array.
fn form_to_json(raw: &[u8]) -> Value {
    let mut map = Map::new();

    for (key, value) in url::form_urlencoded::parse(raw) {
        let value = Value::String(value.into_owned());
        match map.get_mut(&*key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }

    Value::Object(map)
}

/// Flatten request headers into a JSON object; repeated headers are joined by ", ".
fn headers_to_json(headers: &HeaderMap) -> Value {
    let mut map = Map::new();

    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        map.insert(name.as_str().to_string(), Value::String(joined));
    }

    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_content_type(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn test_parse_webhook_body_json() {
        let headers = with_content_type("application/json");
        let body = parse_webhook_body(&headers, br#"{"event":"reservation.created"}"#);
        assert_eq!(body, json!({"event": "reservation.created"}));
    }

    #[test]
    fn test_parse_webhook_body_empty() {
        let headers = HeaderMap::new();
        assert_eq!(parse_webhook_body(&headers, b""), json!({}));
        assert_eq!(parse_webhook_body(&headers, b"  \n"), json!({}));
    }

    #[test]
    fn test_parse_webhook_body_not_json() {
        let headers = with_content_type("text/plain");
        assert_eq!(
            parse_webhook_body(&headers, b"event=created"),
            json!("event=created")
        );
    }

    #[test]
    fn test_parse_webhook_body_form_encoded() {
        let headers = with_content_type("application/x-www-form-urlencoded");
        assert_eq!(
            parse_webhook_body(&headers, b"event=created&id=r1"),
            json!({"event": "created", "id": "r1"})
        );
    }

    #[test]
    fn test_parse_webhook_body_form_charset_and_repeated_keys() {
        let headers = with_content_type("Application/X-WWW-Form-Urlencoded; charset=UTF-8");
        assert_eq!(
            parse_webhook_body(&headers, b"tag=vip&tag=late&note=window+seat%21"),
            json!({"tag": ["vip", "late"], "note": "window seat!"})
        );
    }

    #[test]
    fn test_headers_to_json_joins_repeated() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.append("x-trace", HeaderValue::from_static("a"));
        headers.append("x-trace", HeaderValue::from_static("b"));

        assert_eq!(
            headers_to_json(&headers),
            json!({
                "content-type": "application/json",
                "x-trace": "a, b"
            })
        );
    }
}
