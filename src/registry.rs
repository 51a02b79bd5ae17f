//! Board Registry Resolver — read-only lookups from human names to Trello ids.
//!
//! Nothing here is cached: every submission resolves list and label ids
//! freshly so the board can be reorganized without restarting the service.

use std::sync::Arc;

use crate::config::{AppConfig, BoardConfig};
use crate::errors::{SubmitError, TrelloError};
use crate::trello::{BoardService, names_match};

/// The designated column newly created cards land on. Every configured
/// board must carry exactly one list with this name; the resolver never
/// creates it.
pub const INCOMING_LIST_NAME: &str = "incoming";

pub struct BoardRegistry {
    config: Arc<AppConfig>,
    service: Arc<dyn BoardService>,
}

impl BoardRegistry {
    pub fn new(config: Arc<AppConfig>, service: Arc<dyn BoardService>) -> Self {
        Self { config, service }
    }

    /// Map an event name to its enabled board config.
    ///
    /// Exact case-insensitive match only. An unknown event is a hard
    /// failure — the default event is a form pre-fill concern and is never
    /// substituted here.
    pub fn resolve_board(&self, event: &str) -> Result<&BoardConfig, SubmitError> {
        self.config
            .boards
            .iter()
            .filter(|b| b.enabled)
            .find(|b| names_match(&b.event, event))
            .ok_or_else(|| SubmitError::UnknownEvent {
                event: event.trim().to_string(),
            })
    }

    /// Find the id of the board's "incoming" list.
    pub async fn resolve_incoming_list_id(&self, board_id: &str) -> Result<String, SubmitError> {
        let lists = self.service.lists(board_id).await?;
        lists
            .into_iter()
            .find(|list| names_match(&list.name, INCOMING_LIST_NAME))
            .map(|list| list.id)
            .ok_or_else(|| SubmitError::NoIncomingList {
                board_id: board_id.to_string(),
            })
    }

    /// Find a label id by name, or `None` when the board has no such label.
    ///
    /// Absence is expected (optional form fields), so it is not an error;
    /// transport failures are, and the caller decides whether to degrade.
    pub async fn resolve_label_id(
        &self,
        board_id: &str,
        label_name: &str,
    ) -> Result<Option<String>, TrelloError> {
        let labels = self.service.labels(board_id).await?;
        Ok(labels
            .into_iter()
            .find(|label| names_match(&label.name, label_name))
            .map(|label| label.id))
    }
}
