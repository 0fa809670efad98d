//! Uniform JSON response envelope shared by the API handlers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const REGISTERED_MESSAGE: &str = "Webhook registered successfully with TableCheck";
pub const REGISTRATION_FAILED_MESSAGE: &str = "Failed to register webhook";
pub const RECEIVED_MESSAGE: &str = "Webhook received and processed successfully";
pub const PROCESSING_FAILED_MESSAGE: &str = "Webhook received but processing failed";

/// `{success, message, ...}` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Envelope {
    fn new(success: bool, message: &str) -> Self {
        Self {
            success,
            message: message.to_string(),
            data: None,
            error: None,
            timestamp: None,
        }
    }

    /// TableCheck accepted the registration.
    pub fn registered(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::new(true, REGISTERED_MESSAGE)
        }
    }

    /// The registration call failed.
    pub fn registration_failed(error: Value) -> Self {
        Self {
            error: Some(error),
            ..Self::new(false, REGISTRATION_FAILED_MESSAGE)
        }
    }

    /// Acknowledgement for a received webhook.
    pub fn received(timestamp: String) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..Self::new(true, RECEIVED_MESSAGE)
        }
    }

    /// Acknowledgement for a received webhook whose processing failed.
    pub fn processing_failed(error: String) -> Self {
        Self {
            error: Some(Value::String(error)),
            ..Self::new(false, PROCESSING_FAILED_MESSAGE)
        }
    }
}
