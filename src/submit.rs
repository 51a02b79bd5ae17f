//! Card Submission Pipeline — turns one validated help request into one
//! Trello card, with best-effort attachment upload.
//!
//! Step order is fixed: validate → resolve board → resolve incoming list →
//! format description → resolve labels → create card → upload attachments.
//! Validation failures are aggregated and returned wholesale; board, list,
//! and card-create failures abort the submission; label lookups and
//! attachment uploads degrade without aborting anything.

use std::sync::{Arc, LazyLock};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::errors::{FieldError, SubmitError, TrelloError};
use crate::registry::BoardRegistry;
use crate::trello::{BoardService, NewCard};

/// Label applied to every privileged-channel card, on top of whatever
/// category/priority resolve. Part of the default taxonomy in the config
/// template so provisioning creates it.
pub const PRIVILEGED_LABEL: &str = "FTA";

/// Contact name stamped on privileged-channel cards; field staff submit on
/// behalf of teams, so there is no caller-supplied contact.
pub const PRIVILEGED_CONTACT_NAME: &str = "FTA";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Which path a submission arrived on. The HTTP layer decides this from the
/// route (and its API-key check); the pipeline only relaxes validation and
/// adjusts card metadata accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// The public browser form. Full validation.
    Public,
    /// The key-protected API used by field staff. Relaxed required fields.
    PrivilegedApi,
}

impl Channel {
    pub fn is_privileged(self) -> bool {
        matches!(self, Channel::PrivilegedApi)
    }
}

/// One base64-encoded file riding along with a submission. Consumed once;
/// never persisted server-side.
///
/// `data` is optional so that an entry with no payload at all fails
/// validation, while an empty string stays a legal zero-byte file.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data: Option<String>,
}

/// An inbound help request, as posted by the form or the privileged API.
///
/// Every field defaults on deserialization so a missing field surfaces as
/// an aggregated validation error instead of a bare 422 from serde.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub team_number: String,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub problem_category: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentPayload>,
}

/// Outcome of one attachment upload attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentResult {
    pub name: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything the caller learns about a successful submission. Lives for
/// one request and is never cached.
#[derive(Debug, Clone, Serialize)]
pub struct CardCreationResult {
    pub card_id: String,
    pub label_ids_applied: Vec<String>,
    pub attachment_results: Vec<AttachmentResult>,
}

pub struct SubmissionPipeline {
    registry: BoardRegistry,
    service: Arc<dyn BoardService>,
}

impl SubmissionPipeline {
    pub fn new(config: Arc<AppConfig>, service: Arc<dyn BoardService>) -> Self {
        Self {
            registry: BoardRegistry::new(config, service.clone()),
            service,
        }
    }

    /// Run the full pipeline for one submission.
    pub async fn submit(
        &self,
        channel: Channel,
        request: SubmissionRequest,
    ) -> Result<CardCreationResult, SubmitError> {
        let problems = validate(channel, &request);
        if !problems.is_empty() {
            return Err(SubmitError::Validation(problems));
        }

        let board_id = self.registry.resolve_board(&request.event)?.board_id.clone();
        let list_id = self.registry.resolve_incoming_list_id(&board_id).await?;

        let description = format_description(channel, &request);
        let label_ids = self.resolve_labels(channel, &board_id, &request).await;

        let team = request.team_number.trim();
        let new_card = NewCard {
            list_id,
            name: format!("{}: {}", team, request.title.trim()),
            desc: description,
            pos: "top".to_string(),
            start: Utc::now().to_rfc3339(),
            label_ids: label_ids.clone(),
        };

        tracing::info!(team, event = %request.event.trim(), "creating card");
        let card = match self.service.create_card(&new_card).await {
            Ok(card) => card,
            Err(TrelloError::Api {
                status, message, ..
            }) => {
                tracing::error!(status, %message, "card creation rejected");
                return Err(SubmitError::CardCreate { status, message });
            }
            Err(err) => return Err(err.into()),
        };

        let attachment_results = self.upload_attachments(&card.id, &request.attachments).await;

        tracing::info!(
            card_id = %card.id,
            labels = label_ids.len(),
            attachments = attachment_results.len(),
            "card created"
        );
        Ok(CardCreationResult {
            card_id: card.id,
            label_ids_applied: label_ids,
            attachment_results,
        })
    }

    /// Resolve the applied-label list: category and priority when provided,
    /// plus the fixed privileged-channel label. Every resolution is
    /// independently optional — a miss or a lookup failure means the label
    /// is omitted, never that the submission fails.
    async fn resolve_labels(
        &self,
        channel: Channel,
        board_id: &str,
        request: &SubmissionRequest,
    ) -> Vec<String> {
        let mut wanted: Vec<(&str, &str)> = Vec::new();
        if let Some(category) = non_empty(&request.problem_category) {
            wanted.push(("problemCategory", category));
        }
        if let Some(priority) = non_empty(&request.priority) {
            wanted.push(("priority", priority));
        }
        if channel.is_privileged() {
            wanted.push(("channel", PRIVILEGED_LABEL));
        }

        let mut ids = Vec::new();
        for (field, name) in wanted {
            match self.registry.resolve_label_id(board_id, name).await {
                Ok(Some(id)) => ids.push(id),
                Ok(None) => {
                    tracing::warn!(field, label = name, board_id, "label not found on board; omitting");
                }
                Err(err) => {
                    tracing::warn!(field, label = name, board_id, error = %err, "label lookup failed; omitting");
                }
            }
        }
        ids
    }

    /// Upload every attachment, unconditionally: one failure is recorded
    /// and logged but never aborts the card or the remaining uploads.
    async fn upload_attachments(
        &self,
        card_id: &str,
        attachments: &[AttachmentPayload],
    ) -> Vec<AttachmentResult> {
        let mut results = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let data = attachment.data.as_deref().unwrap_or_default();
            let outcome = match BASE64.decode(data.as_bytes()) {
                Ok(bytes) => self
                    .service
                    .create_attachment(card_id, &attachment.name, bytes)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(format!("invalid base64 payload: {}", e)),
            };
            match outcome {
                Ok(()) => results.push(AttachmentResult {
                    name: attachment.name.clone(),
                    ok: true,
                    error: None,
                }),
                Err(error) => {
                    tracing::warn!(card_id, name = %attachment.name, %error, "attachment upload failed");
                    results.push(AttachmentResult {
                        name: attachment.name.clone(),
                        ok: false,
                        error: Some(error),
                    });
                }
            }
        }
        results
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Collect every field-level problem. Never short-circuits: the form shows
/// all of them at once.
pub fn validate(channel: Channel, request: &SubmissionRequest) -> Vec<FieldError> {
    let mut problems = Vec::new();

    if request.title.trim().is_empty() {
        problems.push(FieldError::new("title", "Title must not be empty"));
    }

    let team = request.team_number.trim();
    if team.is_empty() || !team.chars().all(|c| c.is_ascii_digit()) {
        problems.push(FieldError::new("teamNumber", "Team number must be a number"));
    }

    if request.event.trim().is_empty() {
        problems.push(FieldError::new("event", "An event must be selected"));
    }

    if !channel.is_privileged() {
        match non_empty(&request.contact_email) {
            Some(email) if EMAIL_RE.is_match(email) => {}
            _ => problems.push(FieldError::new(
                "contactEmail",
                "A valid contact email is required",
            )),
        }
        if non_empty(&request.description).is_none() {
            problems.push(FieldError::new("description", "A description is required"));
        }
        if non_empty(&request.priority).is_none() {
            problems.push(FieldError::new("priority", "A priority must be selected"));
        }
    }

    for (index, attachment) in request.attachments.iter().enumerate() {
        if attachment.name.trim().is_empty() {
            problems.push(FieldError::new(
                "attachments",
                format!("Attachment {} has no file name", index + 1),
            ));
        }
        if attachment.data.is_none() {
            problems.push(FieldError::new(
                "attachments",
                format!("Attachment {} has no data", index + 1),
            ));
        }
    }

    problems
}

/// Markdown card description. The public variant carries the contact block;
/// the privileged variant is the short automated-submission form.
pub fn format_description(channel: Channel, request: &SubmissionRequest) -> String {
    let team = request.team_number.trim();
    match channel {
        Channel::Public => format!(
            "**THIS IS AN AUTOMATICALLY CREATED CARD FROM AN ONLINE SUBMITTED TEAM REQUEST**\n\n\
             **Team Number:** {team}\n\n\
             **Contact Email:** {email}\n\n\
             **Contact Name:** {name}\n\n\
             **Description:** {description}",
            email = non_empty(&request.contact_email).unwrap_or_default(),
            name = non_empty(&request.contact_name).unwrap_or_default(),
            description = non_empty(&request.description).unwrap_or_default(),
        ),
        Channel::PrivilegedApi => {
            let mut desc = format!(
                "**THIS IS AN AUTOMATICALLY CREATED CARD FROM A FIELD API SUBMISSION**\n\n\
                 **Team Number:** {team}\n\n\
                 **Contact Name:** {PRIVILEGED_CONTACT_NAME}"
            );
            if let Some(text) = non_empty(&request.description) {
                desc.push_str("\n\n**Description:** ");
                desc.push_str(text);
            }
            desc
        }
    }
}
