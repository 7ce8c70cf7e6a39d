//! Core domain types and service traits for CrimeWatch
//!
//! This module defines the status-change payload that flows through the
//! notification hub and the trait contracts that listeners and SMS gateways
//! implement.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::notification::gateway::GatewayError;

/// The lifecycle states a crime report moves through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Submitted,
    UnderReview,
    Assigned,
    Investigating,
    Resolved,
    Closed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Submitted => "submitted",
            ReportStatus::UnderReview => "under_review",
            ReportStatus::Assigned => "assigned",
            ReportStatus::Investigating => "investigating",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Closed => "closed",
        }
    }

    /// Whether moving into this status hands the report to the acting officer.
    pub fn assigns_officer(&self) -> bool {
        matches!(self, ReportStatus::Assigned | ReportStatus::Investigating)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown report status: {0:?}")]
pub struct ParseStatusError(pub String);

impl FromStr for ReportStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "submitted" => Ok(ReportStatus::Submitted),
            "under_review" => Ok(ReportStatus::UnderReview),
            "assigned" => Ok(ReportStatus::Assigned),
            "investigating" => Ok(ReportStatus::Investigating),
            "resolved" => Ok(ReportStatus::Resolved),
            "closed" => Ok(ReportStatus::Closed),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Languages a citizen can pick for notifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
    Rw,
}

impl Language {
    /// Maps a language code to a `Language`, falling back to English.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "fr" => Language::Fr,
            "rw" => Language::Rw,
            _ => Language::En,
        }
    }
}

impl FromStr for Language {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Language::from_code(s))
    }
}

/// Describes a single report status transition.
///
/// Built by the status-update workflow after the new status has been saved
/// and handed to [`NotificationHub::dispatch`](crate::notification::hub::NotificationHub::dispatch).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
    /// Public identifier of the report, e.g. `CR123456`.
    pub report_id: String,
    pub old_status: ReportStatus,
    pub new_status: ReportStatus,
    /// Phone number of the citizen who filed the report.
    pub citizen_phone: Option<String>,
    /// Notification language preferred by the citizen.
    pub citizen_language: Option<Language>,
    /// Identifier of the officer or admin who made the change.
    pub updated_by: String,
    pub changed_at: DateTime<Utc>,
}

impl StatusChange {
    /// Creates a change stamped with the current time and no contact data.
    pub fn new(
        report_id: impl Into<String>,
        old_status: ReportStatus,
        new_status: ReportStatus,
        updated_by: impl Into<String>,
    ) -> Self {
        Self {
            report_id: report_id.into(),
            old_status,
            new_status,
            citizen_phone: None,
            citizen_language: None,
            updated_by: updated_by.into(),
            changed_at: Utc::now(),
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.citizen_phone = Some(phone.into());
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.citizen_language = Some(language);
        self
    }

    /// Returns the phone number to notify, treating blank numbers as absent.
    pub fn recipient(&self) -> Option<&str> {
        self.citizen_phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Receives status changes fanned out by the notification hub.
#[async_trait]
pub trait Listener: Send + Sync {
    /// A short, descriptive name (e.g. "sms", "log") used in logs and metrics.
    fn name(&self) -> &str;

    /// Handles one status change.
    ///
    /// # Returns
    /// * `Ok(())` once the listener is done with the change
    /// * `Err` if handling failed; the hub records it and carries on
    async fn handle(&self, change: &StatusChange) -> Result<()>;
}

/// A single outbound SMS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SmsRequest {
    pub to: String,
    pub message: String,
    pub from: String,
}

/// Per-recipient delivery information returned by a gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SmsRecipient {
    pub number: String,
    pub status: String,
    pub message_id: Option<String>,
    pub cost: Option<String>,
}

/// The gateway's acknowledgement of a send request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SmsReceipt {
    /// Human-readable summary returned by the gateway.
    pub summary: String,
    pub recipients: Vec<SmsRecipient>,
}

/// Sends SMS messages through an external provider.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Submits one message to the provider.
    ///
    /// # Returns
    /// * `Ok(SmsReceipt)` if the provider accepted the message
    /// * `Err(GatewayError)` on transport errors or rejection
    async fn send(&self, request: &SmsRequest) -> Result<SmsReceipt, GatewayError>;
}
