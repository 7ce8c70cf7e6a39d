use crimewatch::core::{ReportStatus, StatusChange};

/// The status change used throughout the notification tests.
pub fn sample_change() -> StatusChange {
    StatusChange::new(
        "CR123456",
        ReportStatus::Submitted,
        ReportStatus::Assigned,
        "officer-42",
    )
    .with_phone("+250788123456")
}
