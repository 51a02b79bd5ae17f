//! Serde wire types for the Trello API (subset of fields we care about).

use serde::{Deserialize, Serialize};

/// A board, fetched by short id to learn its database id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
}

/// A list (column) on a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardList {
    pub id: String,
    pub name: String,
}

/// A label on a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    /// Trello reports `null` for colorless labels.
    pub color: Option<String>,
}

/// A created card. Trello returns much more; the id is all we need for
/// attachment uploads and the acknowledgement payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(rename = "shortUrl", default)]
    pub short_url: Option<String>,
}

/// Payload for the create-card call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCard {
    #[serde(rename = "idList")]
    pub list_id: String,
    pub name: String,
    pub desc: String,
    /// Always `"top"` — newest requests surface first on the board.
    pub pos: String,
    /// Creation timestamp, RFC 3339.
    pub start: String,
    #[serde(rename = "idLabels")]
    pub label_ids: Vec<String>,
}

/// The one definition of name equality used for events, lists, and labels.
///
/// Trello preserves whatever casing the operator typed, so every name
/// comparison in this crate is trimmed and case-insensitive.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
