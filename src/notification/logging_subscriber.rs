//! A listener that logs every status change.
//!
//! Gives operators an audit trail of who changed which report, independent of
//! whether any SMS went out.

use crate::core::{Listener, StatusChange};
use async_trait::async_trait;
use tracing::info;

pub struct LoggingListener;

#[async_trait]
impl Listener for LoggingListener {
    fn name(&self) -> &str {
        "log"
    }

    async fn handle(&self, change: &StatusChange) -> anyhow::Result<()> {
        info!(
            report_id = %change.report_id,
            old_status = %change.old_status,
            new_status = %change.new_status,
            updated_by = %change.updated_by,
            has_phone = change.recipient().is_some(),
            "Report status changed"
        );
        Ok(())
    }
}
