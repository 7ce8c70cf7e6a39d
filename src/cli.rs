//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the `crimewatch.toml` file and environment variables.

use crate::core::{Language, ReportStatus};
use crate::formatting::LanguagePolicy;
use clap::{Args, Parser, Subcommand};
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Sends citizen notifications for crime report status changes.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error).
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Language policy for SMS messages (always_english or recipient).
    #[arg(long, value_name = "POLICY", global = true)]
    pub language_policy: Option<LanguagePolicy>,

    /// Sender identifier for outgoing SMS.
    #[arg(long, value_name = "ID", global = true)]
    pub sender_id: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Dispatch a single status change to all notification channels.
    Notify(NotifyArgs),
    /// Print the effective configuration with secrets masked.
    ShowConfig,
}

#[derive(Args, Debug, Clone)]
pub struct NotifyArgs {
    /// Public report identifier, e.g. CR123456.
    #[arg(long)]
    pub report_id: String,

    /// Status before the change.
    #[arg(long)]
    pub old_status: ReportStatus,

    /// Status after the change.
    #[arg(long)]
    pub new_status: ReportStatus,

    /// Citizen phone number to notify.
    #[arg(long)]
    pub phone: Option<String>,

    /// Citizen language preference (en, fr, rw).
    #[arg(long)]
    pub language: Option<Language>,

    /// Identifier of the officer making the change.
    #[arg(long, default_value = "cli")]
    pub updated_by: String,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut sms = Dict::new();
        if let Some(policy) = self.language_policy {
            let policy = match policy {
                LanguagePolicy::AlwaysEnglish => "always_english",
                LanguagePolicy::Recipient => "recipient",
            };
            sms.insert("language_policy".into(), Value::from(policy));
        }
        if let Some(sender_id) = &self.sender_id {
            sms.insert("sender_id".into(), Value::from(sender_id.clone()));
        }

        let mut dict = Dict::new();
        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }
        if !sms.is_empty() {
            dict.insert("sms".into(), Value::from(sms));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notify_command() {
        let cli = Cli::parse_from([
            "crimewatch",
            "--sender-id",
            "POLICE",
            "notify",
            "--report-id",
            "CR123456",
            "--old-status",
            "submitted",
            "--new-status",
            "under_review",
            "--phone",
            "+250788123456",
            "--language",
            "rw",
        ]);

        assert_eq!(cli.sender_id.as_deref(), Some("POLICE"));
        match cli.command {
            Some(Command::Notify(args)) => {
                assert_eq!(args.report_id, "CR123456");
                assert_eq!(args.old_status, ReportStatus::Submitted);
                assert_eq!(args.new_status, ReportStatus::UnderReview);
                assert_eq!(args.language, Some(Language::Rw));
                assert_eq!(args.updated_by, "cli");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_status() {
        let result = Cli::try_parse_from([
            "crimewatch",
            "notify",
            "--report-id",
            "CR1",
            "--old-status",
            "lost",
            "--new-status",
            "closed",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_provider_only_sets_given_values() {
        let cli = Cli {
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        let data = cli.data().unwrap();
        let dict = &data[&Profile::Default];
        assert!(dict.contains_key("log_level"));
        assert!(!dict.contains_key("sms"));
    }
}
