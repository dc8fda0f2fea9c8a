//! Display-ready message record

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A flattened Gmail message, independent of the provider's payload nesting.
///
/// Built once from a single API response by
/// [`normalize_message`](crate::gmail::normalize_message) and never modified
/// afterwards. Serializes to the camelCase shape the web front end reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMessage {
    pub id: MessageId,
    pub thread_id: String,
    /// Subject header, or "No Subject"
    pub subject: String,
    /// Raw From header, or "Unknown Sender"
    pub from: String,
    /// Provider-truncated preview
    pub snippet: String,
    /// Decoded body text (empty when missing or undecodable)
    pub body: String,
    /// Gmail's internal timestamp, epoch milliseconds as supplied
    pub date: String,
    pub label_ids: Vec<String>,
}

impl NormalizedMessage {
    /// Parse `date` into a UTC timestamp, if it holds a valid millisecond count
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        let millis: i64 = self.date.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }

    /// Parsed sender address, for displays that only want the name
    pub fn sender_address(&self) -> EmailAddress {
        EmailAddress::parse(&self.from)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.label_ids.iter().any(|l| l == label)
    }
}

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Parse an address from a header value like "John Doe <john@example.com>"
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim().trim_matches('"');
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
                email: email.to_string(),
            };
        }

        Self {
            name: None,
            email: s.to_string(),
        }
    }

    /// Display name if present, otherwise the bare address
    pub fn short_display(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}
