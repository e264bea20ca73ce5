//! Application-level configuration loading: game tunables, face assets and
//! leaderboard sizing.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::game::{DeckError, Difficulty, GameRules, ScoreRules, TimeLimits};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MEMORY_MATCH_CONFIG_PATH";
/// Number of rows returned by leaderboard queries unless configured otherwise.
const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
/// Seconds a hosted session may go without a command before it is evicted.
const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 600;

/// Configuration that cannot host a playable game.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The face pool cannot deal every difficulty.
    #[error(transparent)]
    Faces(#[from] DeckError),
    /// A setting that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    /// Sessions would be evicted while still running.
    #[error("session_idle_ttl_secs ({ttl_secs}) must exceed the preview and the one-second tick")]
    IdleTtlTooShort {
        /// Configured value.
        ttl_secs: u64,
    },
}

/// Maps face ids to the image shown for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceCatalog {
    assets: Vec<String>,
}

impl FaceCatalog {
    /// Catalog with the stock `/static/images/{n}.jpg` image for every face.
    pub fn numbered(total_faces: u32) -> Self {
        Self {
            assets: (1..=total_faces)
                .map(|face| format!("/static/images/{face}.jpg"))
                .collect(),
        }
    }

    /// Catalog with one image per face, face 1 first.
    pub fn new(assets: Vec<String>) -> Self {
        Self { assets }
    }

    /// Image for a 1-based face id. Unknown faces resolve to face 1's image.
    pub fn asset_for(&self, face_id: u32) -> &str {
        let index = face_id.checked_sub(1).map(|index| index as usize);
        index
            .and_then(|index| self.assets.get(index))
            .or_else(|| self.assets.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Number of faces with an image.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether no image is configured.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    rules: GameRules,
    faces: FaceCatalog,
    leaderboard_limit: usize,
    session_idle_ttl: Duration,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        total_faces = app_config.rules.total_faces,
                        leaderboard_limit = app_config.leaderboard_limit,
                        "loaded game configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Reject configurations that would fail at deal time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rules.ensure_dealable()?;
        if self.leaderboard_limit == 0 {
            return Err(ConfigError::Zero("leaderboard_limit"));
        }
        if Difficulty::ALL
            .into_iter()
            .any(|difficulty| self.rules.time_limit(difficulty) == 0)
        {
            return Err(ConfigError::Zero("time_limits"));
        }
        if self.session_idle_ttl <= self.rules.preview.max(Duration::from_secs(1)) {
            return Err(ConfigError::IdleTtlTooShort {
                ttl_secs: self.session_idle_ttl.as_secs(),
            });
        }
        Ok(())
    }

    /// Game tunables.
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Face images.
    pub fn faces(&self) -> &FaceCatalog {
        &self.faces
    }

    /// Rows returned by leaderboard queries.
    pub fn leaderboard_limit(&self) -> usize {
        self.leaderboard_limit
    }

    /// How long a session may go without a command before it is evicted.
    pub fn session_idle_ttl(&self) -> Duration {
        self.session_idle_ttl
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    total_faces: Option<u32>,
    face_assets: Option<Vec<String>>,
    preview_secs: Option<u64>,
    resolve_delay_ms: Option<u64>,
    scoring: Option<ScoreRules>,
    time_limits: Option<TimeLimits>,
    leaderboard_limit: Option<usize>,
    session_idle_ttl_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = GameRules::default();
        let total_faces = value
            .total_faces
            .or_else(|| {
                value
                    .face_assets
                    .as_ref()
                    .map(|assets| assets.len() as u32)
            })
            .unwrap_or(defaults.total_faces);

        let rules = GameRules {
            total_faces,
            preview: value
                .preview_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.preview),
            resolve_delay: value
                .resolve_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.resolve_delay),
            time_limits: value.time_limits.unwrap_or(defaults.time_limits),
            scoring: value.scoring.unwrap_or(defaults.scoring),
        };
        let faces = value
            .face_assets
            .map(FaceCatalog::new)
            .unwrap_or_else(|| FaceCatalog::numbered(total_faces));

        Self {
            rules,
            faces,
            leaderboard_limit: value.leaderboard_limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT),
            session_idle_ttl: Duration::from_secs(
                value
                    .session_idle_ttl_secs
                    .unwrap_or(DEFAULT_SESSION_IDLE_TTL_SECS),
            ),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AppConfig {
        serde_json::from_str::<RawConfig>(json).unwrap().into()
    }

    #[test]
    fn empty_document_matches_defaults() {
        let config = parse("{}");
        assert_eq!(config.rules(), &GameRules::default());
        assert_eq!(config.leaderboard_limit(), 10);
        assert_eq!(config.faces().len(), 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn shipped_config_keeps_ten_second_preview() {
        let config = parse(include_str!("../config/app.json"));
        assert_eq!(config.rules().preview, Duration::from_secs(10));
        assert_eq!(config.rules(), &GameRules::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let config = parse(
            r#"{
                "preview_secs": 3,
                "time_limits": { "easy": 20, "normal": 30, "hard": 45 },
                "scoring": { "base": 500, "penalty_per_second": 1 },
                "leaderboard_limit": 5
            }"#,
        );
        assert_eq!(config.rules().preview, Duration::from_secs(3));
        assert_eq!(config.rules().resolve_delay, Duration::from_millis(300));
        assert_eq!(config.rules().time_limit(Difficulty::Hard), 45);
        assert_eq!(config.rules().scoring.base, 500);
        assert_eq!(config.leaderboard_limit(), 5);
    }

    #[test]
    fn face_assets_size_the_pool() {
        let assets: Vec<String> = (1..=16).map(|n| format!("/img/{n}.png")).collect();
        let config = parse(&serde_json::json!({ "face_assets": assets }).to_string());
        assert_eq!(config.rules().total_faces, 16);
        assert_eq!(config.faces().asset_for(16), "/img/16.png");
    }

    #[test]
    fn small_face_pool_fails_validation() {
        let config = parse(r#"{ "total_faces": 8 }"#);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Faces(DeckError::InsufficientFaces {
                difficulty: Difficulty::Normal,
                ..
            }))
        ));
    }

    #[test]
    fn zero_leaderboard_limit_fails_validation() {
        let config = parse(r#"{ "leaderboard_limit": 0 }"#);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero("leaderboard_limit"))
        ));
    }

    #[test]
    fn idle_ttl_must_outlast_the_preview() {
        assert_eq!(parse("{}").session_idle_ttl(), Duration::from_secs(600));
        let config = parse(r#"{ "session_idle_ttl_secs": 10 }"#);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IdleTtlTooShort { ttl_secs: 10 })
        ));
        assert!(parse(r#"{ "session_idle_ttl_secs": 11 }"#).validate().is_ok());
    }

    #[test]
    fn missing_asset_falls_back_to_first_face() {
        let catalog = FaceCatalog::new(vec!["/a.jpg".into(), "/b.jpg".into()]);
        assert_eq!(catalog.asset_for(2), "/b.jpg");
        assert_eq!(catalog.asset_for(7), "/a.jpg");
        assert_eq!(catalog.asset_for(0), "/a.jpg");
        assert_eq!(FaceCatalog::numbered(15).asset_for(3), "/static/images/3.jpg");
    }
}
