//! CrimeWatch - status change notifications for citizen crime reports
//!
//! This library fans report status changes out to notification channels,
//! chiefly SMS to the citizen who filed the report.

pub mod cli;
pub mod config;
pub mod core;
pub mod formatting;
pub mod notification;
pub mod services;
pub mod workflow;

// Re-export core types for convenience
pub use crate::core::*;
