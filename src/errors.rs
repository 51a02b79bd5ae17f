//! Typed error hierarchy for pitboard.
//!
//! Two top-level enums cover the two layers:
//! - `TrelloError` — transport and API failures from the board service
//! - `SubmitError` — submission pipeline failures, split by who can fix them
//!   (caller resubmits for `Validation`, operator fixes config for
//!   `UnknownEvent`/`NoIncomingList`, Trello is at fault for the rest)

use thiserror::Error;

/// One field-level validation problem, reported to the caller as
/// `{field, message}` so the form can mark every bad input at once.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors from the Trello client.
#[derive(Debug, Error)]
pub enum TrelloError {
    /// The request never produced an HTTP response (DNS, TLS, timeout).
    #[error("Request to Trello failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Trello answered with a non-success status.
    #[error("Trello returned {status} for {operation}: {message}")]
    Api {
        operation: &'static str,
        status: u16,
        message: String,
    },
}

/// Errors from the card submission pipeline.
///
/// Label lookup failures and attachment upload failures are deliberately
/// absent: both degrade (label omitted, per-attachment result recorded)
/// instead of failing the submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Submission failed validation ({} field(s))", .0.len())]
    Validation(Vec<FieldError>),

    #[error("No board is configured for event '{event}'")]
    UnknownEvent { event: String },

    #[error("Board {board_id} has no 'incoming' list")]
    NoIncomingList { board_id: String },

    #[error("Trello rejected the card: {status}: {message}")]
    CardCreate { status: u16, message: String },

    /// Transport failure during a fatal step (list lookup, card creation).
    #[error(transparent)]
    Trello(#[from] TrelloError),
}
