//! Configuration for pitboard, read from a TOML file once at startup.
//!
//! The loaded [`AppConfig`] is immutable for the life of the process and is
//! shared behind an `Arc` by every concurrent submission. There is no hot
//! reload; restart the service after editing the file.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! port = 3000
//! default_event = "Off Season"
//! api_key = "change-me"        # optional; enables POST /api/submit
//! max_body_mb = 25
//! dev_mode = false
//!
//! [trello]
//! app_key = "..."
//! user_token = "..."
//!
//! [[boards]]
//! event = "Off Season"
//! board_id = "CxCc1Ofe"
//! enabled = true
//!
//! [[labels]]
//! name = "Mechanical"
//! color = "orange"
//! ```

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Trello's closed set of label colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelColor {
    Yellow,
    Purple,
    Blue,
    Red,
    Green,
    Orange,
    Black,
    Sky,
    Pink,
    Lime,
}

impl LabelColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yellow => "yellow",
            Self::Purple => "purple",
            Self::Blue => "blue",
            Self::Red => "red",
            Self::Green => "green",
            Self::Orange => "orange",
            Self::Black => "black",
            Self::Sky => "sky",
            Self::Pink => "pink",
            Self::Lime => "lime",
        }
    }
}

impl std::str::FromStr for LabelColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yellow" => Ok(Self::Yellow),
            "purple" => Ok(Self::Purple),
            "blue" => Ok(Self::Blue),
            "red" => Ok(Self::Red),
            "green" => Ok(Self::Green),
            "orange" => Ok(Self::Orange),
            "black" => Ok(Self::Black),
            "sky" => Ok(Self::Sky),
            "pink" => Ok(Self::Pink),
            "lime" => Ok(Self::Lime),
            _ => Err(format!("Invalid label color: {}", s)),
        }
    }
}

impl fmt::Display for LabelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event-to-board mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Event name as shown in the form's dropdown. Case-insensitive key.
    pub event: String,
    /// Short board id, as seen in the board's browser URL. Used for lookup
    /// endpoints; card/label creation resolves the long database id from it.
    pub board_id: String,
    /// Disabled boards are kept in the file but never resolved or advertised.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// One label that must exist on every configured board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSpec {
    pub name: String,
    pub color: LabelColor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Pre-selected event in the form dropdown. Must name a configured board.
    pub default_event: String,
    /// Shared key for the privileged `/api/submit` path. When unset, that
    /// path rejects every request.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request body ceiling, which also bounds total attachment size.
    #[serde(default = "default_max_body_mb")]
    pub max_body_mb: usize,
    /// Binds 0.0.0.0 and adds a permissive CORS layer for frontend work.
    #[serde(default)]
    pub dev_mode: bool,
}

/// Trello API credentials. `Debug` is implemented by hand so the token can
/// never leak through a log line or error chain.
#[derive(Clone, Serialize, Deserialize)]
pub struct TrelloCredentials {
    pub app_key: String,
    pub user_token: String,
}

impl fmt::Debug for TrelloCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrelloCredentials")
            .field("app_key", &"<redacted>")
            .field("user_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub trello: TrelloCredentials,
    #[serde(default)]
    pub boards: Vec<BoardConfig>,
    #[serde(default)]
    pub labels: Vec<LabelSpec>,
}

fn default_enabled() -> bool {
    true
}

fn default_port() -> u16 {
    3000
}

fn default_max_body_mb() -> usize {
    25
}

impl AppConfig {
    /// Load and validate the config file at `path`.
    ///
    /// When the file does not exist, a commented template is written to the
    /// expected location and an error asks the operator to fill it in — a
    /// fresh container volume starts empty, so this is the common first-run
    /// path.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, CONFIG_TEMPLATE)
                .with_context(|| format!("Failed to write template to {}", path.display()))?;
            bail!(
                "No config file found. A template was written to {}; fill in your \
                 Trello app key, user token, and board ids, then start again.",
                path.display()
            );
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would fail at runtime in confusing ways.
    pub fn validate(&self) -> Result<()> {
        if self.trello.app_key.trim().is_empty() || self.trello.user_token.trim().is_empty() {
            bail!(
                "Trello app key and user token must both be set. See the README for \
                 how to obtain them."
            );
        }
        if let Some(key) = &self.server.api_key {
            if key.trim().is_empty() {
                bail!(
                    "api_key must not be empty; remove the setting entirely to \
                     disable the API submission path"
                );
            }
        }
        if self.boards.is_empty() {
            bail!("At least one [[boards]] entry is required");
        }
        if self.labels.is_empty() {
            bail!("At least one [[labels]] entry is required");
        }
        for board in &self.boards {
            if board.event.trim().is_empty() {
                bail!("A [[boards]] entry has an empty event name");
            }
            if board.board_id.trim().is_empty() {
                bail!("Board for event '{}' has an empty board_id", board.event);
            }
        }
        // At most one enabled board per event name, compared case-insensitively.
        let enabled: Vec<&BoardConfig> = self.boards.iter().filter(|b| b.enabled).collect();
        for (i, a) in enabled.iter().enumerate() {
            for b in &enabled[i + 1..] {
                if a.event.trim().eq_ignore_ascii_case(b.event.trim()) {
                    bail!("Event '{}' has more than one enabled board", a.event);
                }
            }
        }
        let default = self.server.default_event.trim();
        match self
            .boards
            .iter()
            .find(|b| b.event.trim().eq_ignore_ascii_case(default))
        {
            None => bail!(
                "default_event '{}' does not match any configured board",
                self.server.default_event
            ),
            Some(board) if !board.enabled => {
                tracing::warn!(
                    event = %self.server.default_event,
                    "default_event points at a disabled board; the form will pre-select \
                     an event that cannot be submitted"
                );
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Event names to advertise to the form, in file order, enabled only.
    pub fn enabled_events(&self) -> Vec<&str> {
        self.boards
            .iter()
            .filter(|b| b.enabled)
            .map(|b| b.event.as_str())
            .collect()
    }

    pub fn max_body_bytes(&self) -> usize {
        self.server.max_body_mb * 1024 * 1024
    }
}

const CONFIG_TEMPLATE: &str = r#"# pitboard configuration.
# Fill in your Trello credentials and board ids, then restart the service.
# The app key and user token come from https://trello.com/power-ups/admin —
# see the README for a walkthrough.

[server]
port = 3000
# Event pre-selected in the form dropdown; must match a [[boards]] event below.
default_event = "Off Season"
# Uncomment to enable the key-protected /api/submit path (used by field staff
# tooling). Requests must send this value in the x-api-key header.
# api_key = "change-me"
max_body_mb = 25
dev_mode = false

[trello]
app_key = ""
user_token = ""

# One entry per event. board_id is the short id from the board's URL.
[[boards]]
event = "Off Season"
board_id = ""
enabled = true

# Label taxonomy, created on every configured board at startup if missing.
[[labels]]
name = "Mechanical"
color = "orange"

[[labels]]
name = "Electrical"
color = "yellow"

[[labels]]
name = "Programming"
color = "blue"

[[labels]]
name = "Inspection"
color = "purple"

[[labels]]
name = "High priority"
color = "red"

[[labels]]
name = "Medium priority"
color = "sky"

[[labels]]
name = "Low priority"
color = "green"

[[labels]]
name = "FTA"
color = "black"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> AppConfig {
        toml::from_str(
            r#"
            [server]
            default_event = "Off Season"

            [trello]
            app_key = "k"
            user_token = "t"

            [[boards]]
            event = "Off Season"
            board_id = "CxCc1Ofe"

            [[labels]]
            name = "Mechanical"
            color = "orange"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn minimal_config_parses_and_validates() {
        let config = minimal_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.max_body_mb, 25);
        assert!(config.boards[0].enabled, "enabled should default to true");
    }

    #[test]
    fn duplicate_enabled_events_rejected_case_insensitively() {
        let mut config = minimal_config();
        config.boards.push(BoardConfig {
            event: "OFF SEASON".into(),
            board_id: "zZz9aBcD".into(),
            enabled: true,
        });
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("more than one enabled board"), "{err}");
    }

    #[test]
    fn duplicate_event_allowed_when_one_is_disabled() {
        let mut config = minimal_config();
        config.boards.push(BoardConfig {
            event: "Off Season".into(),
            board_id: "zZz9aBcD".into(),
            enabled: false,
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_event_must_name_a_board() {
        let mut config = minimal_config();
        config.server.default_event = "Worlds".into();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("default_event"), "{err}");
    }

    #[test]
    fn missing_credentials_rejected() {
        let mut config = minimal_config();
        config.trello.user_token = "".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_api_key_rejected() {
        // An empty shared secret would silently open the privileged path;
        // the setting must be absent or non-blank.
        for key in ["", "   "] {
            let mut config = minimal_config();
            config.server.api_key = Some(key.into());
            let err = config.validate().unwrap_err().to_string();
            assert!(err.contains("api_key"), "{err}");
        }
        let mut config = minimal_config();
        config.server.api_key = Some("sekrit".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn enabled_events_skips_disabled_boards() {
        let mut config = minimal_config();
        config.boards.push(BoardConfig {
            event: "Regional".into(),
            board_id: "aAa1bBcC".into(),
            enabled: false,
        });
        assert_eq!(config.enabled_events(), vec!["Off Season"]);
    }

    #[test]
    fn label_color_round_trips_through_str() {
        for color in [
            LabelColor::Yellow,
            LabelColor::Red,
            LabelColor::Sky,
            LabelColor::Black,
        ] {
            assert_eq!(color.as_str().parse::<LabelColor>().unwrap(), color);
        }
        assert!("mauve".parse::<LabelColor>().is_err());
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = TrelloCredentials {
            app_key: "super-secret-key".into(),
            user_token: "super-secret-token".into(),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn missing_file_writes_template_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("pitboard.toml");
        let err = AppConfig::load(&path).unwrap_err().to_string();
        assert!(err.contains("template"), "{err}");
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[trello]"));
    }

    #[test]
    fn template_is_parseable_toml() {
        // The template intentionally fails validate() (empty credentials),
        // but it must at least deserialize once filled in.
        let parsed: Result<AppConfig, _> = toml::from_str(CONFIG_TEMPLATE);
        assert!(parsed.is_ok(), "{:?}", parsed.err());
    }
}
