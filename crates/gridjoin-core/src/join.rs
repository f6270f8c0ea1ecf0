// Join players to their opponent's pass defense and their own team's odds.
//
// Three equi-joins, all inner: defense -> team key (full name), player ->
// keyed defense (opponent abbreviation), result -> team odds (season-week +
// team abbreviation). Anything an inner join would drop is recorded in the
// `JoinReport` and the quarantine list.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::normalize::{DefenseTable, PlayerPool, PlayerWeekRecord, SeasonWeek, TeamDefenseRecord};
use crate::reconcile::Drops;
use crate::teams::TeamKeyMap;
use crate::vegas::TeamOddsRecord;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One player-week with opponent defense and team odds attached.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalRecord {
    pub player: PlayerWeekRecord,
    /// Full name of the player's team, when the key table knows it.
    pub team_name: Option<String>,
    pub opponent_name: String,
    pub defense: TeamDefenseRecord,
    pub odds: TeamOddsRecord,
}

/// The joined table, one row per (player, week), in player pool order.
#[derive(Debug, Clone)]
pub struct FinalTable {
    pub player_columns: Vec<String>,
    pub defense_columns: Vec<String>,
    pub rows: Vec<FinalRecord>,
}

impl FinalTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a row by its index key.
    pub fn find(&self, player: &str, season_week: &str) -> Option<&FinalRecord> {
        self.rows
            .iter()
            .find(|r| r.player.name == player && r.player.season_week.as_str() == season_week)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    NoDefenseForOpponent,
    NoOddsForTeamWeek,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NoDefenseForOpponent => f.write_str("no_defense_for_opponent"),
            DropReason::NoOddsForTeamWeek => f.write_str("no_odds_for_team_week"),
        }
    }
}

/// A player row that did not make it into the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedPlayer {
    pub name: String,
    pub season_week: SeasonWeek,
    pub team: String,
    pub opponent: String,
    pub reason: DropReason,
}

impl UnmatchedPlayer {
    fn new(player: &PlayerWeekRecord, reason: DropReason) -> Self {
        Self {
            name: player.name.clone(),
            season_week: player.season_week.clone(),
            team: player.team.clone(),
            opponent: player.opponent.clone(),
            reason,
        }
    }
}

/// (season-week, team) pair that appeared more than once in the odds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OddsKey {
    pub season_week: SeasonWeek,
    pub team: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinReport {
    pub players_in: usize,
    pub rows_out: usize,
    /// Defense rows whose team name is not in the key table.
    pub defense_without_key: Drops<String>,
    pub unmatched_opponent: Drops<UnmatchedPlayer>,
    pub unmatched_odds: Drops<UnmatchedPlayer>,
    /// Later duplicates of an odds key, ignored so no player row fans out.
    pub odds_conflicts: Drops<OddsKey>,
}

impl JoinReport {
    /// Player rows lost to either join.
    pub fn dropped_players(&self) -> usize {
        self.unmatched_opponent.count + self.unmatched_odds.count
    }

    /// Anything at all that did not line up.
    pub fn has_drops(&self) -> bool {
        self.dropped_players() > 0
            || !self.defense_without_key.is_empty()
            || !self.odds_conflicts.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Joined {
    pub table: FinalTable,
    pub report: JoinReport,
    /// Every dropped player row, unsampled.
    pub quarantine: Vec<UnmatchedPlayer>,
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

pub fn join(
    players: &PlayerPool,
    defense: &DefenseTable,
    odds: &[TeamOddsRecord],
    keys: &TeamKeyMap,
    sample_size: usize,
) -> Joined {
    // a. defense rows keyed by abbreviation
    let mut defense_without_key = Drops::new(sample_size);
    let mut defense_by_abbr: HashMap<&str, (&str, &TeamDefenseRecord)> = HashMap::new();
    for (name, record) in &defense.records {
        match keys.abbreviation(name) {
            Some(abbr) => {
                defense_by_abbr.insert(abbr, (name.as_str(), record));
            }
            None => defense_without_key.record(name.clone()),
        }
    }

    // odds keyed by (season-week, team); first row wins
    let mut odds_conflicts = Drops::new(sample_size);
    let mut odds_by_key: HashMap<(&SeasonWeek, &str), &TeamOddsRecord> = HashMap::new();
    for row in odds {
        let key = (&row.season_week, row.team.as_str());
        if odds_by_key.contains_key(&key) {
            odds_conflicts.record(OddsKey {
                season_week: row.season_week.clone(),
                team: row.team.clone(),
            });
            continue;
        }
        odds_by_key.insert(key, row);
    }

    let mut unmatched_opponent = Drops::new(sample_size);
    let mut unmatched_odds = Drops::new(sample_size);
    let mut quarantine = Vec::new();
    let mut rows = Vec::with_capacity(players.records.len());

    for player in &players.records {
        // b. opponent defense
        let Some((opponent_name, defense_row)) = defense_by_abbr.get(player.opponent.as_str())
        else {
            let miss = UnmatchedPlayer::new(player, DropReason::NoDefenseForOpponent);
            unmatched_opponent.record(miss.clone());
            quarantine.push(miss);
            continue;
        };

        // c. team odds for the week
        let Some(odds_row) = odds_by_key.get(&(&player.season_week, player.team.as_str())) else {
            let miss = UnmatchedPlayer::new(player, DropReason::NoOddsForTeamWeek);
            unmatched_odds.record(miss.clone());
            quarantine.push(miss);
            continue;
        };

        rows.push(FinalRecord {
            player: player.clone(),
            team_name: keys.full_name(&player.team).map(String::from),
            opponent_name: opponent_name.to_string(),
            defense: (*defense_row).clone(),
            odds: (*odds_row).clone(),
        });
    }

    let report = JoinReport {
        players_in: players.records.len(),
        rows_out: rows.len(),
        defense_without_key,
        unmatched_opponent,
        unmatched_odds,
        odds_conflicts,
    };
    log_report(&report);

    Joined {
        table: FinalTable {
            player_columns: players.stat_columns.clone(),
            defense_columns: defense.stat_columns.clone(),
            rows,
        },
        report,
        quarantine,
    }
}

fn log_report(report: &JoinReport) {
    info!(
        "Joined {} of {} player rows",
        report.rows_out, report.players_in
    );
    if !report.defense_without_key.is_empty() {
        warn!(
            "{} defense rows have no team key: {:?}",
            report.defense_without_key.count, report.defense_without_key.samples
        );
    }
    if !report.unmatched_opponent.is_empty() {
        warn!(
            "{} player rows dropped, opponent has no defense row; e.g. {:?}",
            report.unmatched_opponent.count, report.unmatched_opponent.samples
        );
    }
    if !report.unmatched_odds.is_empty() {
        warn!(
            "{} player rows dropped, no odds for team and week; e.g. {:?}",
            report.unmatched_odds.count, report.unmatched_odds.samples
        );
    }
    if !report.odds_conflicts.is_empty() {
        warn!(
            "{} duplicate odds keys ignored; e.g. {:?}",
            report.odds_conflicts.count, report.odds_conflicts.samples
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
