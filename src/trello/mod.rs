//! Trello integration — wire types and HTTP client.
//!
//! Everything that talks to `api.trello.com` lives here, behind the
//! [`BoardService`] trait so the resolver, pipeline, and provisioner can be
//! exercised against an in-memory fake.
//!
//! Two kinds of board identifier exist, and they are easy to mix up:
//!
//! - **short id** — the token from the board's browser URL (e.g. `CxCc1Ofe`).
//!   This is what operators put in the config file, and it works for all
//!   read endpoints (fetch board, list lists, list labels).
//! - **database id** — the long hex id Trello assigns internally. Label
//!   creation requires it; it is obtained by fetching the board via its
//!   short id.
//!
//! | Module   | Responsibility                                         |
//! |----------|--------------------------------------------------------|
//! | `models` | Serde wire types: `Board`, `BoardList`, `Label`, `Card`, `NewCard` |
//! | `client` | `TrelloClient` (reqwest) + the `BoardService` trait    |

pub mod client;
pub mod models;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{BoardService, TrelloClient};
pub use models::{Board, BoardList, Card, Label, NewCard, names_match};
