// src/formatting.rs

use crate::core::{Language, StatusChange};
use serde::{Deserialize, Serialize};

/// Decides which language an outgoing SMS is written in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LanguagePolicy {
    /// Every message is sent in English, whatever the citizen picked.
    #[default]
    AlwaysEnglish,
    /// Use the citizen's preferred language, English when unknown.
    Recipient,
}

impl LanguagePolicy {
    pub fn resolve(&self, preferred: Option<Language>) -> Language {
        match self {
            LanguagePolicy::AlwaysEnglish => Language::En,
            LanguagePolicy::Recipient => preferred.unwrap_or_default(),
        }
    }
}

impl std::str::FromStr for LanguagePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "always_english" => Ok(LanguagePolicy::AlwaysEnglish),
            "recipient" => Ok(LanguagePolicy::Recipient),
            other => Err(format!(
                "unknown language policy '{}', expected 'always_english' or 'recipient'",
                other
            )),
        }
    }
}

/// Formats the status-change SMS text.
pub fn format_status_message(change: &StatusChange, language: Language) -> String {
    let id = &change.report_id;
    let old = change.old_status;
    let new = change.new_status;
    match language {
        Language::En => format!("Report #{}: Status changed from {} to {}.", id, old, new),
        Language::Fr => format!("Rapport #{}: Statut changé de {} à {}.", id, old, new),
        Language::Rw => format!(
            "Raporo #{}: Imiterere yahindutse kuri {} ikora {}.",
            id, old, new
        ),
    }
}

/// Truncates `message` to at most `max_chars` characters.
pub fn truncate_chars(message: &str, max_chars: usize) -> &str {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => &message[..idx],
        None => message,
    }
}
