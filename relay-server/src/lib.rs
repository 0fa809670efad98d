//! TableCheck webhook relay.
//!
//! A single service that:
//! - Registers a webhook subscription with the TableCheck platform
//! - Receives webhook callbacks from TableCheck and always acknowledges them
//! - Appends every request, response and error to plaintext event logs
//!
//! ## Architecture
//!
//! ```text
//! POST /api/register-webhook → TableCheckClient → TableCheck
//! TableCheck → POST /api/webhook-receiver → EventSink → logs/*.txt
//! ```

pub mod config;
pub mod eventlog;
pub mod tablecheck;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use eventlog::{EventLogError, EventSink, FileEventLog, LogFile};
pub use tablecheck::{RegistrationError, TableCheckClient, WebhookRegistration};
pub use web::{router, AppState, Envelope};
