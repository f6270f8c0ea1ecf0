// Raw CSV loading for the three input sources.
//
// The player pool and pass-defense exports carry open-ended stat columns that
// are passed through to the output, so they are read into a header-indexed
// `RawTable`. The spreads file has a fixed schema and deserializes straight
// into `RawGameOdds`.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{DataPaths, PlayerPoolConfig};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path} has no `{column}` column")]
    MissingColumn { path: String, column: String },
}

// ---------------------------------------------------------------------------
// Header-indexed table
// ---------------------------------------------------------------------------

/// A CSV file held as its (de-duplicated) header plus raw string records.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Where the table came from; used in error messages.
    pub source: String,
    pub headers: Vec<String>,
    pub records: Vec<csv::StringRecord>,
}

impl RawTable {
    /// Position of a named column, or `MissingColumn`.
    pub fn column(&self, name: &str) -> Result<usize, SourceError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SourceError::MissingColumn {
                path: self.source.clone(),
                column: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Field accessor that tolerates short records.
pub fn field(record: &csv::StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

/// Give repeated header names a `.1`, `.2`, ... suffix so every column is
/// addressable by name.
pub fn dedupe_headers(headers: &csv::StringRecord) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .iter()
        .map(|h| {
            let h = h.trim().to_string();
            let n = seen.entry(h.clone()).or_insert(0);
            let name = if *n == 0 { h } else { format!("{h}.{n}") };
            *n += 1;
            name
        })
        .collect()
}

fn read_table_from_reader<R: Read>(
    rdr: R,
    delimiter: u8,
    source: &str,
) -> Result<RawTable, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(rdr);

    let headers = dedupe_headers(reader.headers()?);
    let mut records = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => {
                if record.iter().all(str::is_empty) {
                    continue;
                }
                records.push(record);
            }
            Err(e) => {
                warn!("skipping malformed row in {}: {}", source, e);
            }
        }
    }

    debug!("{}: {} columns, {} rows", source, headers.len(), records.len());
    Ok(RawTable {
        source: source.to_string(),
        headers,
        records,
    })
}

// ---------------------------------------------------------------------------
// Spreads / totals
// ---------------------------------------------------------------------------

/// Columns every spreads file must carry.
pub const GAME_ODDS_COLUMNS: [&str; 7] = [
    "schedule_season",
    "schedule_week",
    "team_home",
    "team_away",
    "team_favorite_id",
    "spread_favorite",
    "over_under_line",
];

/// One scheduled game from the historical spreads file. Other columns
/// (schedule_date, scores, stadium, weather) are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawGameOdds {
    pub schedule_season: i32,
    pub schedule_week: String,
    pub team_home: String,
    pub team_away: String,
    #[serde(default)]
    pub team_favorite_id: String,
    pub spread_favorite: Option<f64>,
    pub over_under_line: Option<f64>,
}

fn load_game_odds_from_reader<R: Read>(
    rdr: R,
    source: &str,
) -> Result<Vec<RawGameOdds>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(rdr);

    let headers = reader.headers().map_err(|e| SourceError::Csv {
        path: source.to_string(),
        source: e,
    })?;
    for column in GAME_ODDS_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(SourceError::MissingColumn {
                path: source.to_string(),
                column: column.to_string(),
            });
        }
    }

    let mut games = Vec::new();
    for result in reader.deserialize::<RawGameOdds>() {
        match result {
            Ok(game) => games.push(game),
            Err(e) => {
                warn!("skipping malformed game row in {}: {}", source, e);
            }
        }
    }
    Ok(games)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// All three inputs, loaded but not yet normalized.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub pass_defense: RawTable,
    pub player_pool: RawTable,
    pub game_odds: Vec<RawGameOdds>,
}

fn open(path: &Path) -> Result<std::fs::File, SourceError> {
    std::fs::File::open(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn load_table(path: &Path, delimiter: u8) -> Result<RawTable, SourceError> {
    let file = open(path)?;
    let source = path.display().to_string();
    read_table_from_reader(file, delimiter, &source).map_err(|e| SourceError::Csv {
        path: source.clone(),
        source: e,
    })
}

/// Load the season pass-defense table (comma-delimited).
pub fn load_pass_defense(path: &Path) -> Result<RawTable, SourceError> {
    load_table(path, b',')
}

/// Load the weekly player pool.
pub fn load_player_pool(path: &Path, delimiter: u8) -> Result<RawTable, SourceError> {
    load_table(path, delimiter)
}

/// Load the historical spreads and totals file.
pub fn load_game_odds(path: &Path) -> Result<Vec<RawGameOdds>, SourceError> {
    let file = open(path)?;
    load_game_odds_from_reader(file, &path.display().to_string())
}

/// Load every input named in the config.
pub fn load_all(paths: &DataPaths, pool: &PlayerPoolConfig) -> Result<SourceTables, SourceError> {
    Ok(SourceTables {
        pass_defense: load_pass_defense(Path::new(&paths.pass_defense))?,
        player_pool: load_player_pool(Path::new(&paths.player_pool), pool.delimiter_byte())?,
        game_odds: load_game_odds(Path::new(&paths.vegas))?,
    })
}

/// Reader-based variants for callers that already hold the data in memory.
pub mod from_reader {
    use super::*;

    pub fn table<R: Read>(rdr: R, delimiter: u8, source: &str) -> Result<RawTable, SourceError> {
        read_table_from_reader(rdr, delimiter, source).map_err(|e| SourceError::Csv {
            path: source.to_string(),
            source: e,
        })
    }

    pub fn game_odds<R: Read>(rdr: R, source: &str) -> Result<Vec<RawGameOdds>, SourceError> {
        load_game_odds_from_reader(rdr, source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
