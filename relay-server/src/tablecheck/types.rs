//! Request payloads for the TableCheck sync API.

use serde::{Deserialize, Serialize};

use crate::Config;

/// Webhook registration descriptor.
///
/// Built fresh from configuration for every registration call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRegistration {
    /// HTTP method TableCheck uses for callbacks
    pub callback_method: String,
    /// Where TableCheck delivers callbacks
    pub callback_url: String,
    /// Authentication TableCheck performs against the callback URL
    pub callback_auth_method: String,
    pub callback_oauth_url: String,
    pub callback_username: String,
    pub callback_password: String,
    /// Franchises whose events are delivered
    pub franchise_ids: Vec<String>,
    /// Shops whose events are delivered
    pub shop_ids: Vec<String>,
}

impl WebhookRegistration {
    /// Unauthenticated POST callbacks scoped to the configured franchise and shop.
    pub fn from_config(config: &Config) -> Self {
        Self {
            callback_method: "post".to_string(),
            callback_url: config.callback_url.clone(),
            callback_auth_method: "none".to_string(),
            callback_oauth_url: String::new(),
            callback_username: String::new(),
            callback_password: String::new(),
            franchise_ids: vec![config.franchise_id.clone()],
            shop_ids: vec![config.shop_id.clone()],
        }
    }
}
