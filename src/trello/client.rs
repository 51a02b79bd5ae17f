//! HTTP client for the Trello REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;

use crate::config::{LabelColor, TrelloCredentials};
use crate::errors::TrelloError;

use super::models::{Board, BoardList, Card, Label, NewCard};

const TRELLO_API_BASE: &str = "https://api.trello.com/1";

/// Ceiling on any single Trello call. A hung upstream call fails the step
/// the same way a non-success response would.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The board-service operations the rest of the crate depends on.
///
/// `TrelloClient` is the production implementation; tests substitute an
/// in-memory fake. `delete_label` exists only for the `nuke-labels`
/// subcommand and is never called from submission handling.
#[async_trait]
pub trait BoardService: Send + Sync {
    /// Fetch a board by short id (yields the database id needed for writes).
    async fn board(&self, board_id: &str) -> Result<Board, TrelloError>;

    /// All lists on a board.
    async fn lists(&self, board_id: &str) -> Result<Vec<BoardList>, TrelloError>;

    /// All labels on a board.
    async fn labels(&self, board_id: &str) -> Result<Vec<Label>, TrelloError>;

    /// Create a label. `board_db_id` must be the database id, not the short id.
    async fn create_label(
        &self,
        board_db_id: &str,
        name: &str,
        color: LabelColor,
    ) -> Result<Label, TrelloError>;

    /// Create a card on its target list.
    async fn create_card(&self, card: &NewCard) -> Result<Card, TrelloError>;

    /// Upload one file to an existing card.
    async fn create_attachment(
        &self,
        card_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), TrelloError>;

    /// Delete a label outright. Destructive; `nuke-labels` only.
    async fn delete_label(&self, label_id: &str) -> Result<(), TrelloError>;
}

/// Authenticated reqwest client for `api.trello.com`.
///
/// Credentials ride along as `key`/`token` query parameters on every call
/// (Trello's scheme) and never appear in logs — see the redacting `Debug`
/// on [`TrelloCredentials`].
#[derive(Debug, Clone)]
pub struct TrelloClient {
    http: reqwest::Client,
    credentials: TrelloCredentials,
    base_url: String,
}

impl TrelloClient {
    pub fn new(credentials: TrelloCredentials) -> Result<Self, TrelloError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            credentials,
            base_url: TRELLO_API_BASE.to_string(),
        })
    }

    fn auth(&self) -> [(&'static str, &str); 2] {
        [
            ("key", self.credentials.app_key.as_str()),
            ("token", self.credentials.user_token.as_str()),
        ]
    }

    /// Turn a non-success response into a `TrelloError::Api` carrying the
    /// upstream status and (truncated) body text.
    async fn check(
        resp: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, TrelloError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let mut message = resp.text().await.unwrap_or_default();
        message.truncate(500);
        Err(TrelloError::Api {
            operation,
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }
}

#[async_trait]
impl BoardService for TrelloClient {
    async fn board(&self, board_id: &str) -> Result<Board, TrelloError> {
        let resp = self
            .http
            .get(format!("{}/boards/{}", self.base_url, board_id))
            .query(&self.auth())
            .send()
            .await?;
        Ok(Self::check(resp, "fetch board").await?.json().await?)
    }

    async fn lists(&self, board_id: &str) -> Result<Vec<BoardList>, TrelloError> {
        let resp = self
            .http
            .get(format!("{}/boards/{}/lists", self.base_url, board_id))
            .query(&self.auth())
            .send()
            .await?;
        Ok(Self::check(resp, "list lists").await?.json().await?)
    }

    async fn labels(&self, board_id: &str) -> Result<Vec<Label>, TrelloError> {
        let resp = self
            .http
            .get(format!("{}/boards/{}/labels", self.base_url, board_id))
            .query(&self.auth())
            .send()
            .await?;
        Ok(Self::check(resp, "list labels").await?.json().await?)
    }

    async fn create_label(
        &self,
        board_db_id: &str,
        name: &str,
        color: LabelColor,
    ) -> Result<Label, TrelloError> {
        let resp = self
            .http
            .post(format!("{}/labels", self.base_url))
            .query(&self.auth())
            .query(&[
                ("name", name),
                ("color", color.as_str()),
                ("idBoard", board_db_id),
            ])
            .send()
            .await?;
        Ok(Self::check(resp, "create label").await?.json().await?)
    }

    async fn create_card(&self, card: &NewCard) -> Result<Card, TrelloError> {
        let resp = self
            .http
            .post(format!("{}/cards", self.base_url))
            .query(&self.auth())
            .json(card)
            .send()
            .await?;
        Ok(Self::check(resp, "create card").await?.json().await?)
    }

    async fn create_attachment(
        &self,
        card_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), TrelloError> {
        // Trello's attachment endpoint takes credentials in the form body,
        // alongside the file part.
        let form = multipart::Form::new()
            .text("key", self.credentials.app_key.clone())
            .text("token", self.credentials.user_token.clone())
            .part(
                "file",
                multipart::Part::bytes(bytes).file_name(file_name.to_string()),
            );
        let resp = self
            .http
            .post(format!("{}/cards/{}/attachments", self.base_url, card_id))
            .multipart(form)
            .send()
            .await?;
        Self::check(resp, "create attachment").await?;
        Ok(())
    }

    async fn delete_label(&self, label_id: &str) -> Result<(), TrelloError> {
        let resp = self
            .http
            .delete(format!("{}/labels/{}", self.base_url, label_id))
            .query(&self.auth())
            .send()
            .await?;
        Self::check(resp, "delete label").await?;
        Ok(())
    }
}
