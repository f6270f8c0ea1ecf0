// End-to-end run: load, normalize, resolve team keys, reshape odds, join,
// reconcile, write outputs.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::join::{self, FinalTable, JoinReport};
use crate::normalize;
use crate::report::{self, ReportError, RunSummary};
use crate::sources::{self, SourceError, SourceTables};
use crate::teams::{AliasTable, TeamKeyError, TeamKeyMap};
use crate::vegas::{self, ReshapeOptions};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("invalid team key table: {0}")]
    TeamKeys(#[from] TeamKeyError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("{dropped} player rows and {other} other rows failed to match; see the join report")]
    Unmatched { dropped: usize, other: usize },
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub table: FinalTable,
    pub report: JoinReport,
    pub summary: RunSummary,
}

/// Load the configured inputs from disk and run the whole pipeline.
pub fn run(config: &Config) -> Result<PipelineOutcome, PipelineError> {
    info!("Loading sources...");
    let tables = sources::load_all(&config.data_paths, &config.player_pool)?;
    info!(
        "Loaded {} pass-defense rows, {} player rows, {} games",
        tables.pass_defense.len(),
        tables.player_pool.len(),
        tables.game_odds.len()
    );
    run_tables(&tables, config)
}

/// Run every stage after loading. Outputs named in `config.output` are
/// written; the preview is left to the caller.
pub fn run_tables(tables: &SourceTables, config: &Config) -> Result<PipelineOutcome, PipelineError> {
    let aliases = AliasTable::with_extra(&config.teams.aliases);
    let keys = TeamKeyMap::new(&config.teams.teams)?;
    info!("Team key table has {} teams", keys.len());

    let players = normalize::normalize_player_pool(&tables.player_pool, &aliases)?;
    let defense = normalize::normalize_pass_defense(&tables.pass_defense)?;

    let coverage = keys.coverage(defense.team_names(), players.abbreviations());
    if coverage.is_complete() {
        debug!("Team key table covers every team in the inputs");
    } else {
        if !coverage.unknown_names.is_empty() {
            warn!(
                "pass-defense teams missing from the team key table: {:?}",
                coverage.unknown_names
            );
        }
        if !coverage.unknown_abbreviations.is_empty() {
            warn!(
                "player pool abbreviations missing from the team key table: {:?}",
                coverage.unknown_abbreviations
            );
        }
    }

    let odds = vegas::reshape(
        &tables.game_odds,
        &keys,
        &aliases,
        &ReshapeOptions {
            seasons: config.vegas.seasons.clone(),
            sample_size: config.reconcile.sample_size,
        },
    );

    let joined = join::join(
        &players,
        &defense,
        &odds.rows,
        &keys,
        config.reconcile.sample_size,
    );

    let summary = RunSummary {
        generated_at: chrono::Utc::now(),
        player_rows: players.records.len(),
        unrecognized_home_away: players.unrecognized_home_away,
        defense_teams: defense.records.len(),
        unknown_team_names: coverage.unknown_names,
        unknown_abbreviations: coverage.unknown_abbreviations,
        odds: odds.report,
        join: joined.report.clone(),
    };

    // The summary and quarantine are written before the strict check so a
    // failed run still leaves its diagnostics behind.
    if let Some(path) = &config.output.summary {
        report::write_summary_file(&summary, Path::new(path))?;
        info!("Wrote run summary to {}", path);
    }
    if let Some(path) = &config.output.quarantine {
        report::write_quarantine_file(&joined.quarantine, Path::new(path))?;
        info!("Wrote {} quarantined rows to {}", joined.quarantine.len(), path);
    }

    if config.reconcile.fail_on_unmatched && joined.report.has_drops() {
        let dropped = joined.report.dropped_players();
        let other = joined.report.defense_without_key.count + joined.report.odds_conflicts.count;
        return Err(PipelineError::Unmatched { dropped, other });
    }

    if let Some(path) = &config.output.csv {
        report::write_csv_file(&joined.table, Path::new(path))?;
        info!("Wrote {} rows to {}", joined.table.len(), path);
    }

    Ok(PipelineOutcome {
        table: joined.table,
        report: joined.report,
        summary,
    })
}
