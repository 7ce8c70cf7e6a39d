//! Fans report status changes out to notification channels.
//!
//! The report workflow publishes a [`StatusChange`](crate::core::StatusChange)
//! to a [`NotificationHub`](hub::NotificationHub) without knowing which
//! listeners (SMS, logging, ...) are registered with it.
pub mod gateway;
pub mod hub;
pub mod logging_subscriber;
pub mod sms;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use gateway::{AfricasTalkingClient, Credentials, GatewayError};
pub use hub::{DispatchReport, HubOptions, ListenerError, ListenerOutcome, NotificationHub};
pub use logging_subscriber::LoggingListener;
pub use sms::{SkipReason, SmsListener, SmsOutcome};
