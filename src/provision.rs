//! Label provisioning — make the configured taxonomy exist on every board.
//!
//! Runs at `serve` startup and via the `verify-labels` subcommand, never per
//! submission. Matching is by case-insensitive name, so repeated runs create
//! nothing new. A failure on one board/label pair is logged and skipped;
//! the service starts with some labels missing rather than not at all.

use crate::config::AppConfig;
use crate::trello::{BoardService, names_match};

/// What a provisioning pass did, for the startup log line and for tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProvisionSummary {
    pub boards_checked: usize,
    pub labels_created: usize,
    /// Board/label pairs that could not be checked or created.
    pub failures: usize,
}

/// Ensure every configured label exists on every configured board.
pub async fn verify_labels(config: &AppConfig, service: &dyn BoardService) -> ProvisionSummary {
    let mut summary = ProvisionSummary::default();

    for board in &config.boards {
        let existing = match service.labels(&board.board_id).await {
            Ok(labels) => labels,
            Err(err) => {
                tracing::warn!(board_id = %board.board_id, error = %err, "could not list labels; skipping board");
                summary.failures += config.labels.len();
                continue;
            }
        };
        // Creation needs the board's database id, not the short config id.
        let board_db_id = match service.board(&board.board_id).await {
            Ok(board) => board.id,
            Err(err) => {
                tracing::warn!(board_id = %board.board_id, error = %err, "could not fetch board; skipping board");
                summary.failures += config.labels.len();
                continue;
            }
        };
        summary.boards_checked += 1;
        tracing::info!(
            board_id = %board.board_id,
            existing = existing.len(),
            "checking label taxonomy"
        );

        for spec in &config.labels {
            if existing.iter().any(|label| names_match(&label.name, &spec.name)) {
                continue;
            }
            match service.create_label(&board_db_id, &spec.name, spec.color).await {
                Ok(_) => {
                    tracing::info!(board_id = %board.board_id, label = %spec.name, "created label");
                    summary.labels_created += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        board_id = %board.board_id,
                        label = %spec.name,
                        error = %err,
                        "could not create label; skipping"
                    );
                    summary.failures += 1;
                }
            }
        }
    }

    summary
}

/// Delete every label on one board, including operator-created ones.
///
/// Irreversible. Only reachable from the `nuke-labels` subcommand, behind
/// its interactive confirmation — never from startup or submission handling.
pub async fn delete_all_labels_on_board(board_id: &str, service: &dyn BoardService) -> usize {
    let labels = match service.labels(board_id).await {
        Ok(labels) => labels,
        Err(err) => {
            tracing::warn!(board_id, error = %err, "could not list labels; nothing deleted");
            return 0;
        }
    };

    let mut deleted = 0;
    for label in labels {
        match service.delete_label(&label.id).await {
            Ok(()) => {
                tracing::info!(board_id, label = %label.name, "deleted label");
                deleted += 1;
            }
            Err(err) => {
                tracing::warn!(board_id, label = %label.name, error = %err, "could not delete label");
            }
        }
    }
    deleted
}

/// Delete every label on every configured board. See
/// [`delete_all_labels_on_board`] for the warnings that apply.
pub async fn delete_all_labels_on_all_boards(
    config: &AppConfig,
    service: &dyn BoardService,
) -> usize {
    let mut deleted = 0;
    for board in &config.boards {
        deleted += delete_all_labels_on_board(&board.board_id, service).await;
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trello::fake::FakeBoardService;

    fn two_board_config() -> AppConfig {
        toml::from_str(
            r#"
            [server]
            default_event = "Off Season"

            [trello]
            app_key = "k"
            user_token = "t"

            [[boards]]
            event = "Off Season"
            board_id = "offS1234"

            [[boards]]
            event = "Regional"
            board_id = "regB5678"

            [[labels]]
            name = "Mechanical"
            color = "orange"

            [[labels]]
            name = "High priority"
            color = "red"
            "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn creates_missing_labels_on_every_board() {
        let config = two_board_config();
        let service = FakeBoardService::new();
        service.add_board("offS1234", "db-1");
        service.add_board("regB5678", "db-2");
        // One board already has one of the two labels.
        service.add_label("offS1234", "mechanical");

        let summary = verify_labels(&config, &service).await;
        assert_eq!(summary.boards_checked, 2);
        assert_eq!(summary.labels_created, 3);
        assert_eq!(summary.failures, 0);
        assert_eq!(service.labels_on("offS1234").len(), 2);
        assert_eq!(service.labels_on("regB5678").len(), 2);
    }

    #[tokio::test]
    async fn second_run_creates_nothing() {
        let config = two_board_config();
        let service = FakeBoardService::new();
        service.add_board("offS1234", "db-1");
        service.add_board("regB5678", "db-2");

        let first = verify_labels(&config, &service).await;
        assert_eq!(first.labels_created, 4);

        let second = verify_labels(&config, &service).await;
        assert_eq!(second.labels_created, 0);
        assert_eq!(second.failures, 0);
        assert_eq!(service.labels_on("offS1234").len(), 2);
    }

    #[tokio::test]
    async fn unreachable_board_is_skipped_not_fatal() {
        let config = two_board_config();
        let service = FakeBoardService::new();
        // Only the second configured board exists.
        service.add_board("regB5678", "db-2");

        let summary = verify_labels(&config, &service).await;
        assert_eq!(summary.boards_checked, 1);
        assert_eq!(summary.labels_created, 2);
        assert_eq!(summary.failures, 2);
    }

    #[tokio::test]
    async fn nuke_deletes_every_label_on_every_board() {
        let config = two_board_config();
        let service = FakeBoardService::new();
        service.add_board("offS1234", "db-1");
        service.add_board("regB5678", "db-2");
        service.add_label("offS1234", "Mechanical");
        service.add_label("offS1234", "Custom pit label");
        service.add_label("regB5678", "High priority");

        let deleted = delete_all_labels_on_all_boards(&config, &service).await;
        assert_eq!(deleted, 3);
        assert!(service.labels_on("offS1234").is_empty());
        assert!(service.labels_on("regB5678").is_empty());
        assert_eq!(service.deleted_labels().len(), 3);
    }
}
