use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Backend user record attached to a recognition result.
///
/// Opaque pass-through from the inference backend; the client stores and
/// displays it but never mutates it. Timestamps stay as the backend sent
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Backend record id.
    #[serde(rename = "user_id")]
    pub id: String,

    /// Human-readable display name.
    #[serde(rename = "username")]
    pub display_name: String,

    /// External reference number (e.g. a student id).
    #[serde(rename = "student_id")]
    pub external_ref: String,

    /// The recognition label this record is registered under.
    pub label: String,

    pub created_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}
