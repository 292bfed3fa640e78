use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Backend identifier of an analyzed email.
pub type EmailId = i64;

/// One analyzed email as known to the dashboard.
///
/// `id` and the classification fields are fixed by the backend; only the
/// workflow flags (`is_important`, `is_archived`, `is_read`) change over a
/// record's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailRecord {
    pub id: EmailId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sender: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_spam: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_phishing: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub email_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_important: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_archived: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_read: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority_level: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_attachment: bool,
}

/// Backend columns are nullable; a null reads as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl EmailRecord {
    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or("(no subject)")
    }

    pub fn priority(&self) -> Priority {
        Priority::from_level(self.priority_level)
    }

    /// Headline classification shown in the detections table.
    pub fn analysis_type(&self) -> &str {
        if self.is_phishing {
            "Phishing"
        } else if self.is_spam {
            "Spam"
        } else {
            match self.category.as_deref() {
                Some(c) if !c.is_empty() => c,
                _ => "Normal",
            }
        }
    }

    /// Which detector produced the classification.
    pub fn rule_type(&self) -> &'static str {
        if self.is_phishing {
            "Phishing Detection"
        } else if self.is_spam {
            "Spam Filter"
        } else {
            "Security Scan"
        }
    }
}

/// Ordinal priority, 0 (normal) through 3 (high).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Normal,
    Low,
    Medium,
    High,
}

impl Priority {
    /// Levels above 3 are treated as high.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Priority::Normal,
            1 => Priority::Low,
            2 => Priority::Medium,
            _ => Priority::High,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Normal => "Normal",
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

/// Payload of an `email_deleted` push event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeletedEmail {
    pub id: EmailId,
}

/// Live channel connection state.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Per-email workflow requests the backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    MarkImportant,
    ToggleArchive,
    ToggleRead,
    Delete,
}

impl Mutation {
    /// Message shown when the request fails.
    pub fn failure_notice(self) -> &'static str {
        match self {
            Mutation::MarkImportant => "Failed to update email status",
            Mutation::ToggleArchive => "Failed to archive email",
            Mutation::ToggleRead => "Failed to update read status",
            Mutation::Delete => "Failed to delete email",
        }
    }
}

/// Verdict from `POST /test-spam`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpamVerdict {
    pub is_spam: bool,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub text: Option<String>,
}

pub const PROCESSOR_CATEGORIES: [&str; 3] = ["primary", "promotions", "social"];
pub const PROCESSOR_MAX_EMAILS: u32 = 50;
pub const PROCESSOR_DEFAULT_EMAILS: u32 = 10;

/// Body of `POST /run-email-processor`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessRequest {
    pub categories: Vec<String>,
    pub max_emails: u32,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl Default for ProcessRequest {
    fn default() -> Self {
        ProcessRequest {
            categories: vec!["primary".to_string()],
            max_emails: PROCESSOR_DEFAULT_EMAILS,
            start_date: None,
            end_date: None,
        }
    }
}

impl ProcessRequest {
    /// Reject requests the processor form would never submit.
    pub fn validate(&self) -> Result<(), String> {
        if self.categories.is_empty() {
            return Err("Please select at least one category".into());
        }
        if let Some(bad) = self
            .categories
            .iter()
            .find(|c| !PROCESSOR_CATEGORIES.contains(&c.as_str()))
        {
            return Err(format!("Unknown category: {bad}"));
        }
        if !(1..=PROCESSOR_MAX_EMAILS).contains(&self.max_emails) {
            return Err(format!(
                "Email count must be between 1 and {PROCESSOR_MAX_EMAILS}"
            ));
        }
        // ISO dates compare correctly as strings.
        if let (Some(start), Some(end)) = (&self.start_date, &self.end_date) {
            if end < start {
                return Err("End date must not be before start date".into());
            }
        }
        Ok(())
    }
}

/// Response of `POST /run-email-processor`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProcessOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: BTreeMap<String, serde_json::Value>,
}

impl ProcessOutcome {
    pub fn summary(&self) -> String {
        if self.results.is_empty() {
            "Successfully processed emails from selected categories".into()
        } else {
            let names: Vec<&str> = self.results.keys().map(String::as_str).collect();
            format!("Successfully processed emails from {}", names.join(", "))
        }
    }
}
