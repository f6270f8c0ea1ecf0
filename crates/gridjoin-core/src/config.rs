// Configuration loading and parsing (pipeline.toml, teams.toml).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

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
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub data_paths: DataPaths,
    pub player_pool: PlayerPoolConfig,
    pub vegas: VegasConfig,
    pub output: OutputConfig,
    pub reconcile: ReconcileConfig,
    pub teams: TeamsConfig,
}

// ---------------------------------------------------------------------------
// pipeline.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire pipeline.toml file.
#[derive(Debug, Clone, Deserialize)]
struct PipelineFile {
    data_paths: DataPaths,
    #[serde(default)]
    player_pool: PlayerPoolConfig,
    #[serde(default)]
    vegas: VegasConfig,
    #[serde(default)]
    output: OutputConfig,
    #[serde(default)]
    reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub pass_defense: String,
    pub player_pool: String,
    pub vegas: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerPoolConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for PlayerPoolConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

impl PlayerPoolConfig {
    /// The delimiter as the single byte the CSV reader wants. Validation
    /// guarantees exactly one ASCII character.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b';')
    }
}

fn default_delimiter() -> String {
    ";".into()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VegasConfig {
    /// Only reshape games from these seasons. Empty means every season.
    #[serde(default)]
    pub seasons: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    /// Joined table as CSV.
    #[serde(default)]
    pub csv: Option<String>,
    /// Player rows dropped by a join, with the reason.
    #[serde(default)]
    pub quarantine: Option<String>,
    /// JSON run summary.
    #[serde(default)]
    pub summary: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            preview_rows: default_preview_rows(),
            csv: None,
            quarantine: None,
            summary: None,
        }
    }
}

fn default_preview_rows() -> usize {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    /// How many offending rows to keep per drop reason.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Turn any dropped row into a pipeline failure.
    #[serde(default)]
    pub fail_on_unmatched: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            fail_on_unmatched: false,
        }
    }
}

fn default_sample_size() -> usize {
    5
}

// ---------------------------------------------------------------------------
// teams.toml structs
// ---------------------------------------------------------------------------

/// Explicit team key table: full name to abbreviation, plus extra code
/// aliases layered over the built-in ones.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamsConfig {
    pub teams: BTreeMap<String, String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/pipeline.toml` and
/// `config/teams.toml`, relative to the given `base_dir`. Relative data and
/// output paths are left as written (resolved against the working directory).
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- pipeline.toml (required) ---
    let pipeline_path = config_dir.join("pipeline.toml");
    let pipeline_text = read_file(&pipeline_path)?;
    let pipeline: PipelineFile =
        toml::from_str(&pipeline_text).map_err(|e| ConfigError::ParseError {
            path: pipeline_path.clone(),
            source: e,
        })?;

    // --- teams.toml (required) ---
    let teams_path = config_dir.join("teams.toml");
    let teams_text = read_file(&teams_path)?;
    let teams: TeamsConfig =
        toml::from_str(&teams_text).map_err(|e| ConfigError::ParseError {
            path: teams_path.clone(),
            source: e,
        })?;

    let config = Config {
        data_paths: pipeline.data_paths,
        player_pool: pipeline.player_pool,
        vegas: pipeline.vegas,
        output: pipeline.output,
        reconcile: pipeline.reconcile,
        teams,
    };

    validate(&config)?;

    Ok(config)
}

/// Files the pipeline reads from `config/`, each seeded from `defaults/`.
pub const CONFIG_FILES: [&str; 2] = ["pipeline.toml", "teams.toml"];

/// Seed `config/` with any of `CONFIG_FILES` it lacks, copied from
/// `defaults/`. Files already in `config/` are never overwritten; anything
/// else in `defaults/` (such as `.example` templates) is ignored. Returns the
/// paths that were written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        if config_dir.is_dir() {
            return Ok(Vec::new());
        }
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no defaults/ or config/ directory under {}; run gridjoin from the workspace root",
                base_dir.display()
            ),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create {}: {e}", config_dir.display()),
    })?;

    let mut seeded = Vec::new();
    for name in CONFIG_FILES {
        let target = config_dir.join(name);
        if target.exists() {
            debug!("{} already present, leaving it alone", target.display());
            continue;
        }
        let source = defaults_dir.join(name);
        if !source.is_file() {
            warn!("defaults/ has no {}; config/{} must be written by hand", name, name);
            continue;
        }
        std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
        })?;
        info!("Seeded {} from defaults", target.display());
        seeded.push(target);
    }

    Ok(seeded)
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
    let paths = &config.data_paths;
    let path_fields: &[(&str, &str)] = &[
        ("data_paths.pass_defense", paths.pass_defense.as_str()),
        ("data_paths.player_pool", paths.player_pool.as_str()),
        ("data_paths.vegas", paths.vegas.as_str()),
    ];
    for (name, val) in path_fields {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    let delimiter = &config.player_pool.delimiter;
    if delimiter.len() != 1 || !delimiter.is_ascii() {
        return Err(ConfigError::ValidationError {
            field: "player_pool.delimiter".into(),
            message: format!("must be a single ASCII character, got {delimiter:?}"),
        });
    }

    if config.reconcile.sample_size == 0 {
        return Err(ConfigError::ValidationError {
            field: "reconcile.sample_size".into(),
            message: "must be > 0".into(),
        });
    }

    if config.teams.teams.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "teams".into(),
            message: "team key table must list at least one team".into(),
        });
    }

    if let Some(code) = config.teams.aliases.keys().find(|c| crate::teams::is_builtin_alias(c)) {
        return Err(ConfigError::ValidationError {
            field: format!("aliases.{}", code.trim()),
            message: "built-in team code aliases cannot be overridden".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
