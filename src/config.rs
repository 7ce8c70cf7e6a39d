//! Configuration management for CrimeWatch
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to load configuration from a `crimewatch.toml` file and merge it
//! with environment variables and command-line arguments.

use crate::cli::Cli;
use crate::formatting::LanguagePolicy;
use crate::notification::gateway::Credentials;
use crate::notification::hub::HubOptions;
use crate::notification::sms::DEFAULT_SENDER_ID;
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_FILE: &str = "crimewatch.toml";

/// Shortest allowed message limit, one UCS-2 SMS segment.
pub const MIN_MESSAGE_CHARS: usize = 70;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Configuration for the SMS channel.
    pub sms: SmsConfig,
    /// Configuration for the notification hub.
    pub notifications: NotificationConfig,
}

/// Configuration for the SMS channel.
///
/// SMS is disabled unless both `username` and `api_key` are set.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SmsConfig {
    /// Africa's Talking account username.
    pub username: Option<String>,
    /// Africa's Talking API key.
    pub api_key: Option<String>,
    /// Sender identifier shown to the recipient.
    pub sender_id: String,
    /// Base URL of the messaging API.
    pub endpoint: String,
    /// Request timeout for the gateway.
    pub timeout_seconds: u64,
    /// Which language outgoing messages are written in.
    pub language_policy: LanguagePolicy,
    /// Messages longer than this are truncated.
    pub max_message_chars: usize,
}

impl SmsConfig {
    /// Returns the gateway credentials, if both are present and non-empty.
    pub fn credentials(&self) -> Option<Credentials> {
        let username = self.username.as_deref().filter(|s| !s.trim().is_empty())?;
        let api_key = self.api_key.as_deref().filter(|s| !s.trim().is_empty())?;
        Some(Credentials {
            username: username.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Checks settings that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.max_message_chars < MIN_MESSAGE_CHARS {
            bail!(
                "sms.max_message_chars must be at least {}, got {}",
                MIN_MESSAGE_CHARS,
                self.max_message_chars
            );
        }
        Ok(())
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            username: None,
            api_key: None,
            sender_id: DEFAULT_SENDER_ID.to_string(),
            endpoint: "https://api.africastalking.com".to_string(),
            timeout_seconds: 10,
            language_policy: LanguagePolicy::AlwaysEnglish,
            max_message_chars: 160,
        }
    }
}

/// Configuration for the notification hub.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    /// Ignore repeated registrations of the same listener.
    pub reject_duplicate_listeners: bool,
    /// Register a listener that logs every status change.
    pub log_status_changes: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            reject_duplicate_listeners: false,
            log_status_changes: true,
        }
    }
}

impl From<&NotificationConfig> for HubOptions {
    fn from(config: &NotificationConfig) -> Self {
        HubOptions {
            reject_duplicates: config.reject_duplicate_listeners,
        }
    }
}

impl Config {
    /// Loads the application configuration.
    ///
    /// Sources are layered, later ones winning: built-in defaults, the TOML
    /// file, `AT_API_KEY`/`AT_USERNAME`, `CRIMEWATCH_*` variables, and the
    /// command-line arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.into());

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(
                Env::raw()
                    .only(&["AT_API_KEY", "AT_USERNAME"])
                    .map(|key| {
                        if key.as_str().eq_ignore_ascii_case("AT_API_KEY") {
                            "sms.api_key".into()
                        } else {
                            "sms.username".into()
                        }
                    }),
            )
            // e.g. CRIMEWATCH_SMS__SENDER_ID=POLICE
            .merge(Env::prefixed("CRIMEWATCH_").split("__"))
            .merge(cli.clone())
            .extract()?;
        config.sms.validate()?;
        Ok(config)
    }

    /// Returns a copy safe to print, with the API key masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.sms.api_key.is_some() {
            config.sms.api_key = Some("********".to_string());
        }
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            sms: SmsConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_require_both_fields() {
        let mut sms = SmsConfig::default();
        assert!(sms.credentials().is_none());

        sms.username = Some("sandbox".to_string());
        assert!(sms.credentials().is_none());

        sms.api_key = Some("  ".to_string());
        assert!(sms.credentials().is_none());

        sms.api_key = Some("key".to_string());
        assert_eq!(
            sms.credentials(),
            Some(Credentials {
                username: "sandbox".to_string(),
                api_key: "key".to_string(),
            })
        );
    }

    #[test]
    fn test_validate_rejects_short_message_limit() {
        let mut sms = SmsConfig::default();
        assert!(sms.validate().is_ok());

        sms.max_message_chars = MIN_MESSAGE_CHARS;
        assert!(sms.validate().is_ok());

        sms.max_message_chars = 0;
        let err = sms.validate().unwrap_err();
        assert!(err.to_string().contains("max_message_chars"));
    }

    #[test]
    fn test_redacted_masks_api_key() {
        let mut config = Config::default();
        config.sms.api_key = Some("super-secret".to_string());
        assert_eq!(config.redacted().sms.api_key.as_deref(), Some("********"));
        assert_eq!(Config::default().redacted().sms.api_key, None);
    }
}
