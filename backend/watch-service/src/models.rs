//! Record models shared by the store adapters and the session core
//!
//! Field names follow the hosted data service's column names; the serde
//! attributes are the wire contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// =============================================================================
// Channel
// =============================================================================

/// A broadcaster's persistent page. Read-only to the viewer core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_live: bool,
}

// =============================================================================
// Stream
// =============================================================================

/// One broadcast instance of a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub id: Uuid,
    pub channel_id: Uuid,
    #[serde(default)]
    pub is_live: bool,
    /// Raw store value; may be absent, negative or oddly typed
    #[serde(default, deserialize_with = "lenient_count")]
    pub viewer_count: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Stream {
    /// Viewer count clamped to the displayable range
    pub fn displayed_viewers(&self) -> u64 {
        clamp_viewer_count(self.viewer_count)
    }
}

pub fn clamp_viewer_count(raw: Option<i64>) -> u64 {
    raw.map(|count| count.max(0) as u64).unwrap_or(0)
}

/// Accepts integers, floats, numeric strings and null for counter columns.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

// =============================================================================
// Viewer
// =============================================================================

/// Registration record written once per accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewViewer {
    pub stream_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: Uuid,
    pub stream_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Viewer {
    pub fn from_new(id: Uuid, viewer: NewViewer) -> Self {
        Self {
            id,
            stream_id: viewer.stream_id,
            first_name: viewer.first_name,
            last_name: viewer.last_name,
            email: viewer.email,
        }
    }
}

// =============================================================================
// Chat
// =============================================================================

/// Who produced a chat line in the local log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageOrigin {
    /// Typed by the viewer of this session
    Local,
    /// Injected by the simulated peer feed
    Peer,
}

/// Entry of the session's local chat log (display order = append order)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub stream_id: Option<Uuid>,
    pub author: String,
    pub text: String,
    pub origin: MessageOrigin,
    pub created_at: DateTime<Utc>,
}

/// Chat row as stored by the record store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredChatMessage {
    pub id: Uuid,
    pub stream_id: Uuid,
    #[serde(rename = "message")]
    pub text: String,
    pub created_at: DateTime<Utc>,
}
