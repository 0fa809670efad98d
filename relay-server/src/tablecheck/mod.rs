//! TableCheck API integration.
//!
//! This module provides:
//! - The webhook registration descriptor sent to TableCheck
//! - An HTTP client for the webhook registration endpoint

pub mod client;
pub mod types;

pub use client::{RegistrationError, TableCheckClient, WEBHOOKS_PATH};
pub use types::WebhookRegistration;
