//! Encapsulation for setting up external services.

use crate::{
    config::Config,
    core::SmsGateway,
    notification::{
        gateway::AfricasTalkingClient, hub::NotificationHub, logging_subscriber::LoggingListener,
        sms::SmsListener,
    },
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Builds the notification hub and registers the configured listeners.
///
/// Missing SMS credentials are not an error: the SMS listener is still
/// registered but skips every change.
pub fn build_notification_hub(config: &Config) -> Result<NotificationHub> {
    let gateway = AfricasTalkingClient::from_config(&config.sms)
        .context("Failed to build SMS gateway client")?
        .map(|client| Arc::new(client) as Arc<dyn SmsGateway>);
    build_notification_hub_with_gateway(config, gateway)
}

/// Same as [`build_notification_hub`], with an explicit SMS gateway.
pub fn build_notification_hub_with_gateway(
    config: &Config,
    gateway: Option<Arc<dyn SmsGateway>>,
) -> Result<NotificationHub> {
    let hub = NotificationHub::new((&config.notifications).into());

    let sms = SmsListener::from_config(gateway, &config.sms);
    if sms.is_enabled() {
        info!(endpoint = %config.sms.endpoint, "SMS notifications enabled.");
    } else {
        warn!("SMS credentials not configured. SMS notifications are disabled.");
    }
    hub.register(Arc::new(sms));

    if config.notifications.log_status_changes {
        hub.register(Arc::new(LoggingListener));
    }

    info!(listeners = hub.len(), "Notification hub ready.");
    Ok(hub)
}
