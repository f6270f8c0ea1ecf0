// Output: console preview, joined CSV, quarantine CSV and the JSON summary.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::join::{FinalRecord, FinalTable, JoinReport, UnmatchedPlayer};
use crate::vegas::ReshapeReport;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error writing {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// Leading columns, before the player pool's passthrough stats.
const KEY_HEADERS: [&str; 7] = [
    "Player Name",
    "Season_Week",
    "Team Abbr",
    "Team",
    "h/a",
    "Oppt Abbr",
    "Oppt",
];

/// Trailing columns from the team odds.
const ODDS_HEADERS: [&str; 3] = ["spread", "game total", "team_total"];

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// Output header. A defense column whose name is already taken gets a `_def`
/// suffix.
pub fn headers(table: &FinalTable) -> Vec<String> {
    let mut out: Vec<String> = KEY_HEADERS.iter().map(|h| h.to_string()).collect();
    out.extend(table.player_columns.iter().cloned());

    let mut taken: HashSet<String> = out.iter().cloned().collect();
    taken.extend(ODDS_HEADERS.iter().map(|h| h.to_string()));
    for column in &table.defense_columns {
        let name = if taken.contains(column) {
            format!("{column}_def")
        } else {
            column.clone()
        };
        taken.insert(name.clone());
        out.push(name);
    }

    out.extend(ODDS_HEADERS.iter().map(|h| h.to_string()));
    out
}

/// One output row, aligned with `headers`.
pub fn fields(record: &FinalRecord) -> Vec<String> {
    let p = &record.player;
    let mut out = vec![
        p.name.clone(),
        p.season_week.to_string(),
        p.team.clone(),
        record.team_name.clone().unwrap_or_default(),
        p.home_away.to_string(),
        p.opponent.clone(),
        record.opponent_name.clone(),
    ];
    out.extend(p.stats.iter().cloned());
    out.extend(record.defense.stats.iter().cloned());
    out.push(record.odds.spread.to_string());
    out.push(record.odds.game_total.to_string());
    out.push(record.odds.team_total.to_string());
    out
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

pub fn write_csv<W: Write>(table: &FinalTable, writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(headers(table))?;
    for record in &table.rows {
        wtr.write_record(fields(record))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_quarantine<W: Write>(rows: &[UnmatchedPlayer], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Player Name", "Season_Week", "Team Abbr", "Oppt Abbr", "reason"])?;
    for row in rows {
        let reason = row.reason.to_string();
        wtr.write_record([
            row.name.as_str(),
            row.season_week.as_str(),
            row.team.as_str(),
            row.opponent.as_str(),
            reason.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn create(path: &Path) -> Result<std::fs::File, ReportError> {
    let io_err = |e| ReportError::Io {
        path: path.display().to_string(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::File::create(path).map_err(io_err)
}

pub fn write_csv_file(table: &FinalTable, path: &Path) -> Result<(), ReportError> {
    write_csv(table, create(path)?).map_err(|e| ReportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn write_quarantine_file(rows: &[UnmatchedPlayer], path: &Path) -> Result<(), ReportError> {
    write_quarantine(rows, create(path)?).map_err(|e| ReportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// The first `limit` rows as a column-aligned text table.
pub fn render_preview(table: &FinalTable, limit: usize) -> String {
    let header = headers(table);
    let rows: Vec<Vec<String>> = table.rows.iter().take(limit).map(fields).collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = line(&header);
    out.push('\n');
    for row in &rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    if table.len() > limit {
        out.push_str(&format!("[{} of {} rows]\n", rows.len(), table.len()));
    }
    out
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Everything worth knowing about one run, as written to `output.summary`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub player_rows: usize,
    pub unrecognized_home_away: usize,
    pub defense_teams: usize,
    pub unknown_team_names: Vec<String>,
    pub unknown_abbreviations: Vec<String>,
    pub odds: ReshapeReport,
    pub join: JoinReport,
}

pub fn write_summary_file(summary: &RunSummary, path: &Path) -> Result<(), ReportError> {
    let file = create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
