//! pitboard — a small web service that files pit help requests as Trello
//! cards.
//!
//! Submissions arrive from the public browser form or the key-protected
//! field API, flow through the [`submit`] pipeline (validation → board and
//! list resolution → label resolution → card creation → best-effort
//! attachment upload), and land on the configured board's "incoming" list.
//! [`provision`] keeps the label taxonomy present on every board.

pub mod config;
pub mod errors;
pub mod provision;
pub mod registry;
pub mod server;
pub mod submit;
pub mod trello;
