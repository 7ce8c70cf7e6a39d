//! Sends an SMS to the citizen whenever their report changes status.

use crate::config::SmsConfig;
use crate::core::{Listener, SmsGateway, SmsReceipt, SmsRequest, StatusChange};
use crate::formatting::{format_status_message, truncate_chars, LanguagePolicy};
use crate::notification::gateway::GatewayError;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

pub const DEFAULT_SENDER_ID: &str = "CRIME-RPT";

/// Why a status change did not produce an SMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No gateway credentials were configured.
    NotConfigured,
    /// The change carries no usable phone number.
    NoRecipient,
    /// Truncation left nothing to send.
    EmptyMessage,
}

impl SkipReason {
    fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotConfigured => "not_configured",
            SkipReason::NoRecipient => "no_recipient",
            SkipReason::EmptyMessage => "empty_message",
        }
    }
}

/// What happened to one status change.
#[derive(Debug)]
pub enum SmsOutcome {
    Skipped(SkipReason),
    Sent(SmsReceipt),
    Failed(GatewayError),
}

/// A [`Listener`] that texts the citizen about their report's new status.
pub struct SmsListener {
    gateway: Option<Arc<dyn SmsGateway>>,
    sender_id: String,
    language_policy: LanguagePolicy,
    max_message_chars: usize,
}

impl SmsListener {
    /// Creates a listener. A `None` gateway leaves SMS disabled.
    pub fn new(gateway: Option<Arc<dyn SmsGateway>>) -> Self {
        Self {
            gateway,
            sender_id: DEFAULT_SENDER_ID.to_string(),
            language_policy: LanguagePolicy::default(),
            max_message_chars: SmsConfig::default().max_message_chars,
        }
    }

    /// Creates a listener using the sender, language and length settings of `config`.
    pub fn from_config(gateway: Option<Arc<dyn SmsGateway>>, config: &SmsConfig) -> Self {
        Self::new(gateway)
            .with_sender_id(config.sender_id.clone())
            .with_language_policy(config.language_policy)
            .with_max_message_chars(config.max_message_chars)
    }

    pub fn with_sender_id(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = sender_id.into();
        self
    }

    pub fn with_language_policy(mut self, policy: LanguagePolicy) -> Self {
        self.language_policy = policy;
        self
    }

    pub fn with_max_message_chars(mut self, max: usize) -> Self {
        self.max_message_chars = max;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.gateway.is_some()
    }

    /// Builds the request that would be sent for `change`, if it has a recipient.
    pub fn build_request(&self, change: &StatusChange) -> Option<SmsRequest> {
        let to = change.recipient()?;
        let language = self.language_policy.resolve(change.citizen_language);
        let message = format_status_message(change, language);
        Some(SmsRequest {
            to: to.to_string(),
            message: truncate_chars(&message, self.max_message_chars).to_string(),
            from: self.sender_id.clone(),
        })
    }

    /// Sends the SMS for `change` and reports what happened.
    pub async fn deliver(&self, change: &StatusChange) -> SmsOutcome {
        let Some(gateway) = &self.gateway else {
            return SmsOutcome::Skipped(SkipReason::NotConfigured);
        };
        let Some(request) = self.build_request(change) else {
            return SmsOutcome::Skipped(SkipReason::NoRecipient);
        };
        if request.message.trim().is_empty() {
            return SmsOutcome::Skipped(SkipReason::EmptyMessage);
        }

        match gateway.send(&request).await {
            Ok(receipt) => SmsOutcome::Sent(receipt),
            Err(e) => SmsOutcome::Failed(e),
        }
    }
}

#[async_trait]
impl Listener for SmsListener {
    fn name(&self) -> &str {
        "sms"
    }

    /// Never fails: gateway errors are logged and absorbed.
    #[instrument(skip_all, fields(report_id = %change.report_id))]
    async fn handle(&self, change: &StatusChange) -> Result<()> {
        match self.deliver(change).await {
            SmsOutcome::Skipped(reason) => {
                debug!(reason = reason.as_str(), "Skipping status change SMS");
                metrics::counter!("sms_skipped_total", "reason" => reason.as_str()).increment(1);
            }
            SmsOutcome::Sent(receipt) => {
                info!(summary = %receipt.summary, "Status change SMS sent");
                metrics::counter!("sms_sent_total").increment(1);
            }
            SmsOutcome::Failed(e) => {
                error!(error = %e, "Failed to send status change SMS");
                metrics::counter!("sms_failed_total").increment(1);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Language, ReportStatus};
    use crate::notification::test_utils::RecordingGateway;

    fn change() -> StatusChange {
        StatusChange::new("CR123456", ReportStatus::Submitted, ReportStatus::Assigned, "officer-1")
            .with_phone("+250788123456")
    }

    fn listener(gateway: &Arc<RecordingGateway>) -> SmsListener {
        SmsListener::new(Some(gateway.clone() as Arc<dyn SmsGateway>))
    }

    #[tokio::test]
    async fn test_sends_one_message_to_citizen() {
        let gateway = Arc::new(RecordingGateway::new());

        let outcome = listener(&gateway).deliver(&change()).await;

        assert!(matches!(outcome, SmsOutcome::Sent(_)));
        let sent = gateway.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "+250788123456");
        assert_eq!(sent[0].from, DEFAULT_SENDER_ID);
        assert!(sent[0].message.contains("CR123456"));
        assert!(sent[0].message.contains("submitted"));
        assert!(sent[0].message.contains("assigned"));
    }

    #[tokio::test]
    async fn test_skips_without_gateway() {
        let unconfigured = SmsListener::new(None);
        assert!(!unconfigured.is_enabled());

        let outcome = unconfigured.deliver(&change()).await;
        assert!(matches!(outcome, SmsOutcome::Skipped(SkipReason::NotConfigured)));
        assert!(listener(&Arc::new(RecordingGateway::new())).is_enabled());
    }

    #[tokio::test]
    async fn test_skips_blank_phone() {
        let gateway = Arc::new(RecordingGateway::new());
        let change = change().with_phone("");

        let outcome = listener(&gateway).deliver(&change).await;

        assert!(matches!(outcome, SmsOutcome::Skipped(SkipReason::NoRecipient)));
        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_default_policy_sends_english_to_french_speaker() {
        let gateway = Arc::new(RecordingGateway::new());
        let change = change().with_language(Language::Fr);

        listener(&gateway).deliver(&change).await;

        assert!(gateway.requests()[0].message.starts_with("Report #CR123456"));
    }

    #[tokio::test]
    async fn test_recipient_policy_sends_preferred_language() {
        let gateway = Arc::new(RecordingGateway::new());
        let change = change().with_language(Language::Fr);

        listener(&gateway)
            .with_language_policy(LanguagePolicy::Recipient)
            .deliver(&change)
            .await;

        assert!(gateway.requests()[0].message.starts_with("Rapport #CR123456"));
    }

    #[tokio::test]
    async fn test_long_messages_are_truncated() {
        let gateway = Arc::new(RecordingGateway::new());

        listener(&gateway)
            .with_max_message_chars(10)
            .deliver(&change())
            .await;

        assert_eq!(gateway.requests()[0].message, "Report #CR");
    }

    #[tokio::test]
    async fn test_zero_length_limit_sends_nothing() {
        let gateway = Arc::new(RecordingGateway::new());
        let listener = listener(&gateway).with_max_message_chars(0);

        let outcome = listener.deliver(&change()).await;

        assert!(matches!(outcome, SmsOutcome::Skipped(SkipReason::EmptyMessage)));
        assert!(listener.handle(&change()).await.is_ok());
        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_handle_absorbs_gateway_failure() {
        let gateway = Arc::new(RecordingGateway::new());
        gateway.set_fail_on_send(true);
        let listener = listener(&gateway);

        assert!(matches!(listener.deliver(&change()).await, SmsOutcome::Failed(_)));
        assert!(listener.handle(&change()).await.is_ok());
        assert_eq!(gateway.requests().len(), 2);
    }
}
