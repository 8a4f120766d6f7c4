// Configuration loading and parsing (league.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::ledger::RosterConfig;
use crate::sync::RetryPolicy;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the tables in league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
    #[serde(default)]
    sync: SyncConfig,
    #[serde(default)]
    database: DatabaseSection,
    #[serde(default)]
    data: DataSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    /// Stable league identifier, used as the ledger key.
    pub id: String,
    pub name: String,
    /// Auction budget each team starts with.
    pub initial_budget: f64,
    /// Smallest legal bid.
    #[serde(default = "default_min_bid")]
    pub min_bid: f64,
    /// The team reference the feed uses for the user's own picks.
    #[serde(default = "default_team_ref")]
    pub my_team_ref: String,
    pub roster: RosterSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterSection {
    pub hitters: usize,
    pub pitchers: usize,
    #[serde(default)]
    pub bench: usize,
}

/// Reconnection backoff tuning. Every field has a sensible default, so
/// the whole `[sync]` table may be omitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            initial_delay_ms: 5000,
            max_delay_ms: 30_000,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: "draft-tracker.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// JSON array of projection records for the player pool.
    pub projections: String,
}

impl Default for DataSection {
    fn default() -> Self {
        DataSection {
            projections: "data/projections.json".to_string(),
        }
    }
}

fn default_min_bid() -> f64 {
    1.0
}

fn default_team_ref() -> String {
    "me".to_string()
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub sync: SyncConfig,
    pub db_path: String,
    pub projections_path: String,
}

impl LeagueConfig {
    pub fn roster_config(&self) -> RosterConfig {
        RosterConfig {
            hitters: self.roster.hitters,
            pitchers: self.roster.pitchers,
            bench: self.roster.bench,
        }
    }
}

impl SyncConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` relative to
/// the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy
/// defaults. Prefer `load_config()` which handles default initialization
/// automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let league_path = base_dir.join("config").join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    let config = Config {
        league: league_file.league,
        sync: league_file.sync,
        db_path: league_file.database.path,
        projections_path: league_file.data.projections,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        // Skip .example template files
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, skip it
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;

    if league.id.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.id".into(),
            message: "must not be empty".into(),
        });
    }

    if league.initial_budget <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "league.initial_budget".into(),
            message: format!("must be greater than 0, got {}", league.initial_budget),
        });
    }

    if league.min_bid <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "league.min_bid".into(),
            message: format!("must be greater than 0, got {}", league.min_bid),
        });
    }

    if league.min_bid > league.initial_budget {
        return Err(ConfigError::ValidationError {
            field: "league.min_bid".into(),
            message: format!(
                "must not exceed the initial budget of {}",
                league.initial_budget
            ),
        });
    }

    if league.roster.hitters + league.roster.pitchers == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.roster".into(),
            message: "hitters and pitchers must not both be 0".into(),
        });
    }

    let sync = &config.sync;
    if sync.initial_delay_ms == 0 {
        return Err(ConfigError::ValidationError {
            field: "sync.initial_delay_ms".into(),
            message: "must be greater than 0".into(),
        });
    }

    if sync.max_delay_ms < sync.initial_delay_ms {
        return Err(ConfigError::ValidationError {
            field: "sync.max_delay_ms".into(),
            message: format!(
                "must be at least initial_delay_ms ({})",
                sync.initial_delay_ms
            ),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
