//! In-memory `BoardService` for tests: records every write call and can be
//! told to fail specific operations.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::LabelColor;
use crate::errors::TrelloError;

use super::client::BoardService;
use super::models::{Board, BoardList, Card, Label, NewCard, names_match};

#[derive(Debug, Clone)]
pub struct FakeBoard {
    pub short_id: String,
    pub db_id: String,
    pub lists: Vec<BoardList>,
    pub labels: Vec<Label>,
}

#[derive(Debug, Default)]
struct Inner {
    boards: Vec<FakeBoard>,
    next_id: u64,
    created_cards: Vec<NewCard>,
    card_create_calls: usize,
    attachments: Vec<(String, String, Vec<u8>)>,
    deleted_labels: Vec<String>,
    fail_label_reads: bool,
    fail_card_create: Option<(u16, String)>,
    fail_attachments_named: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeBoardService {
    inner: Mutex<Inner>,
}

impl FakeBoardService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a board reachable by either its short or database id.
    pub fn add_board(&self, short_id: &str, db_id: &str) {
        self.inner.lock().unwrap().boards.push(FakeBoard {
            short_id: short_id.into(),
            db_id: db_id.into(),
            lists: Vec::new(),
            labels: Vec::new(),
        });
    }

    pub fn add_list(&self, board_id: &str, name: &str) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("list-{}", inner.next_id);
        let board = inner
            .board_mut(board_id)
            .expect("add_list: unknown fake board");
        board.lists.push(BoardList {
            id: id.clone(),
            name: name.into(),
        });
        id
    }

    pub fn add_label(&self, board_id: &str, name: &str) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("label-{}", inner.next_id);
        let board = inner
            .board_mut(board_id)
            .expect("add_label: unknown fake board");
        board.labels.push(Label {
            id: id.clone(),
            name: name.into(),
            color: None,
        });
        id
    }

    /// Make every `labels()` call fail with a 500.
    pub fn fail_label_reads(&self) {
        self.inner.lock().unwrap().fail_label_reads = true;
    }

    pub fn fail_card_create(&self, status: u16, message: &str) {
        self.inner.lock().unwrap().fail_card_create = Some((status, message.into()));
    }

    /// Make uploads of the attachment with this exact name fail.
    pub fn fail_attachment(&self, name: &str) {
        self.inner
            .lock()
            .unwrap()
            .fail_attachments_named
            .push(name.into());
    }

    pub fn card_create_calls(&self) -> usize {
        self.inner.lock().unwrap().card_create_calls
    }

    pub fn created_cards(&self) -> Vec<NewCard> {
        self.inner.lock().unwrap().created_cards.clone()
    }

    pub fn attachment_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .attachments
            .iter()
            .map(|(_, name, _)| name.clone())
            .collect()
    }

    pub fn labels_on(&self, board_id: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .board(board_id)
            .map(|b| b.labels.iter().map(|l| l.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn deleted_labels(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted_labels.clone()
    }
}

impl Inner {
    fn board(&self, board_id: &str) -> Option<&FakeBoard> {
        self.boards
            .iter()
            .find(|b| b.short_id == board_id || b.db_id == board_id)
    }

    fn board_mut(&mut self, board_id: &str) -> Option<&mut FakeBoard> {
        self.boards
            .iter_mut()
            .find(|b| b.short_id == board_id || b.db_id == board_id)
    }
}

fn not_found(operation: &'static str) -> TrelloError {
    TrelloError::Api {
        operation,
        status: 404,
        message: "board not found".into(),
    }
}

#[async_trait]
impl BoardService for FakeBoardService {
    async fn board(&self, board_id: &str) -> Result<Board, TrelloError> {
        let inner = self.inner.lock().unwrap();
        let board = inner.board(board_id).ok_or(not_found("fetch board"))?;
        Ok(Board {
            id: board.db_id.clone(),
            name: format!("Board {}", board.short_id),
        })
    }

    async fn lists(&self, board_id: &str) -> Result<Vec<BoardList>, TrelloError> {
        let inner = self.inner.lock().unwrap();
        let board = inner.board(board_id).ok_or(not_found("list lists"))?;
        Ok(board.lists.clone())
    }

    async fn labels(&self, board_id: &str) -> Result<Vec<Label>, TrelloError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_label_reads {
            return Err(TrelloError::Api {
                operation: "list labels",
                status: 500,
                message: "injected failure".into(),
            });
        }
        let board = inner.board(board_id).ok_or(not_found("list labels"))?;
        Ok(board.labels.clone())
    }

    async fn create_label(
        &self,
        board_db_id: &str,
        name: &str,
        _color: LabelColor,
    ) -> Result<Label, TrelloError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let label = Label {
            id: format!("label-{}", inner.next_id),
            name: name.into(),
            color: None,
        };
        let board = inner
            .board_mut(board_db_id)
            .ok_or(not_found("create label"))?;
        board.labels.push(label.clone());
        Ok(label)
    }

    async fn create_card(&self, card: &NewCard) -> Result<Card, TrelloError> {
        let mut inner = self.inner.lock().unwrap();
        inner.card_create_calls += 1;
        if let Some((status, message)) = inner.fail_card_create.clone() {
            return Err(TrelloError::Api {
                operation: "create card",
                status,
                message,
            });
        }
        inner.next_id += 1;
        let id = format!("card-{}", inner.next_id);
        inner.created_cards.push(card.clone());
        Ok(Card {
            id,
            short_url: None,
        })
    }

    async fn create_attachment(
        &self,
        card_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), TrelloError> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .fail_attachments_named
            .iter()
            .any(|n| names_match(n, file_name))
        {
            return Err(TrelloError::Api {
                operation: "create attachment",
                status: 400,
                message: "injected failure".into(),
            });
        }
        inner
            .attachments
            .push((card_id.into(), file_name.into(), bytes));
        Ok(())
    }

    async fn delete_label(&self, label_id: &str) -> Result<(), TrelloError> {
        let mut inner = self.inner.lock().unwrap();
        for board in &mut inner.boards {
            board.labels.retain(|l| l.id != label_id);
        }
        inner.deleted_labels.push(label_id.into());
        Ok(())
    }
}
