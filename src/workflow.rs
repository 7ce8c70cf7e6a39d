//! The report status update workflow.
//!
//! Saves a report's new status and then publishes the change to the
//! notification hub. Notification results never affect the update itself.

use crate::core::{Language, ReportStatus, StatusChange};
use crate::notification::hub::{DispatchReport, NotificationHub};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// The parts of a crime report the status workflow works with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub report_id: String,
    pub status: ReportStatus,
    pub citizen_phone: Option<String>,
    pub citizen_language: Option<Language>,
    pub assigned_officer: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    /// A freshly submitted report.
    pub fn new(report_id: impl Into<String>) -> Self {
        Self {
            report_id: report_id.into(),
            status: ReportStatus::Submitted,
            citizen_phone: None,
            citizen_language: None,
            assigned_officer: None,
            updated_at: Utc::now(),
        }
    }
}

/// Loads and saves reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn find(&self, report_id: &str) -> Result<Option<Report>>;
    async fn save(&self, report: &Report) -> Result<()>;
}

/// A `ReportStore` that keeps reports in memory.
#[derive(Default)]
pub struct InMemoryReportStore {
    reports: RwLock<HashMap<String, Report>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn find(&self, report_id: &str) -> Result<Option<Report>> {
        Ok(self.reports.read().await.get(report_id).cloned())
    }

    async fn save(&self, report: &Report) -> Result<()> {
        self.reports
            .write()
            .await
            .insert(report.report_id.clone(), report.clone());
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("report {0} not found")]
    NotFound(String),

    #[error("report store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// The saved report and what happened to its notifications.
#[derive(Debug)]
pub struct StatusUpdate {
    pub report: Report,
    pub notifications: DispatchReport,
}

pub struct ReportStatusUpdater<S: ReportStore> {
    store: Arc<S>,
    hub: Arc<NotificationHub>,
}

impl<S: ReportStore> ReportStatusUpdater<S> {
    pub fn new(store: Arc<S>, hub: Arc<NotificationHub>) -> Self {
        Self { store, hub }
    }

    /// Moves a report to `new_status` on behalf of `actor` and notifies listeners.
    #[instrument(skip(self, new_status), fields(new_status = %new_status))]
    pub async fn update_status(
        &self,
        report_id: &str,
        new_status: ReportStatus,
        actor: &str,
    ) -> Result<StatusUpdate, UpdateError> {
        let mut report = self
            .store
            .find(report_id)
            .await?
            .ok_or_else(|| UpdateError::NotFound(report_id.to_string()))?;

        let old_status = report.status;
        report.status = new_status;
        report.updated_at = Utc::now();
        if new_status.assigns_officer() {
            report.assigned_officer = Some(actor.to_string());
        }
        self.store.save(&report).await?;
        info!(%old_status, "Report status updated");

        let change = StatusChange {
            report_id: report.report_id.clone(),
            old_status,
            new_status,
            citizen_phone: report.citizen_phone.clone(),
            citizen_language: report.citizen_language,
            updated_by: actor.to_string(),
            changed_at: report.updated_at,
        };
        let notifications = self.hub.dispatch(&change).await;
        if !notifications.all_succeeded() {
            warn!(
                failed = notifications.failure_count(),
                "Some notification listeners failed"
            );
        }

        Ok(StatusUpdate {
            report,
            notifications,
        })
    }
}
