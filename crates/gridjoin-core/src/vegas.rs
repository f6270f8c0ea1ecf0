// Reshape per-game betting lines into per-team rows with implied totals.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::normalize::SeasonWeek;
use crate::reconcile::Drops;
use crate::sources::RawGameOdds;
use crate::teams::{AliasTable, TeamKeyMap};

/// Favorite id the spreads file uses for a game with no favorite.
pub const PICK_EM: &str = "PICK";

/// One team's line for one week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamOddsRecord {
    pub season_week: SeasonWeek,
    pub team: String,
    /// Negative for the favorite, positive for the underdog.
    pub spread: f64,
    pub game_total: f64,
    pub team_total: f64,
}

/// Points each side is expected to score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpliedTotals {
    pub favorite: f64,
    pub underdog: f64,
}

/// `spread` is the favorite's spread, negative by convention. A positive
/// spread is not rejected; it just yields a favorite total below the
/// underdog's.
pub fn implied_totals(over_under: f64, spread: f64) -> ImpliedTotals {
    let favorite = (over_under - spread) / 2.0;
    ImpliedTotals {
        favorite,
        underdog: favorite + spread,
    }
}

// ---------------------------------------------------------------------------
// Reshape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownHomeTeam,
    UnknownAwayTeam,
    FavoriteMatchesNeitherTeam,
    MissingSpread,
    MissingTotal,
}

/// A game that produced no team rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedGame {
    pub season_week: SeasonWeek,
    pub home: String,
    pub away: String,
    pub favorite: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReshapeReport {
    pub games_in: usize,
    pub games_out_of_season: usize,
    pub pick_em: usize,
    pub rows_out: usize,
    pub skipped: Drops<SkippedGame>,
}

#[derive(Debug, Clone)]
pub struct ReshapedOdds {
    pub rows: Vec<TeamOddsRecord>,
    pub report: ReshapeReport,
}

#[derive(Debug, Clone, Default)]
pub struct ReshapeOptions {
    /// Only keep these seasons. Empty keeps all.
    pub seasons: Vec<i32>,
    pub sample_size: usize,
}

enum Side {
    Home,
    Away,
}

/// Turn each game into a favorite row and an underdog row. Favorite rows come
/// first, then underdog rows, then everything is stably sorted by season-week.
pub fn reshape(
    games: &[RawGameOdds],
    keys: &TeamKeyMap,
    aliases: &AliasTable,
    options: &ReshapeOptions,
) -> ReshapedOdds {
    let mut favorites = Vec::new();
    let mut underdogs = Vec::new();
    let mut skipped = Drops::new(options.sample_size);
    let mut games_out_of_season = 0;
    let mut pick_em = 0;

    for game in games {
        if !options.seasons.is_empty() && !options.seasons.contains(&game.schedule_season) {
            games_out_of_season += 1;
            continue;
        }

        let season_week = SeasonWeek::new(game.schedule_season, &game.schedule_week);
        let favorite_id = aliases.canonicalize(&game.team_favorite_id);
        let skip = |reason| SkippedGame {
            season_week: season_week.clone(),
            home: game.team_home.clone(),
            away: game.team_away.clone(),
            favorite: favorite_id.clone(),
            reason,
        };

        let Some(home) = keys.abbreviation(&game.team_home) else {
            skipped.record(skip(SkipReason::UnknownHomeTeam));
            continue;
        };
        let Some(away) = keys.abbreviation(&game.team_away) else {
            skipped.record(skip(SkipReason::UnknownAwayTeam));
            continue;
        };
        let Some(spread) = game.spread_favorite else {
            skipped.record(skip(SkipReason::MissingSpread));
            continue;
        };
        let Some(over_under) = game.over_under_line else {
            skipped.record(skip(SkipReason::MissingTotal));
            continue;
        };

        let is_pick_em = favorite_id == PICK_EM || spread == 0.0;
        if is_pick_em {
            pick_em += 1;
        }
        let favorite_side = if favorite_id == home {
            Side::Home
        } else if favorite_id == away {
            Side::Away
        } else if is_pick_em {
            Side::Home
        } else {
            skipped.record(skip(SkipReason::FavoriteMatchesNeitherTeam));
            continue;
        };
        let (favorite, underdog) = match favorite_side {
            Side::Home => (home, away),
            Side::Away => (away, home),
        };

        let totals = implied_totals(over_under, spread);
        favorites.push(TeamOddsRecord {
            season_week: season_week.clone(),
            team: favorite.to_string(),
            spread,
            game_total: over_under,
            team_total: totals.favorite,
        });
        underdogs.push(TeamOddsRecord {
            season_week,
            team: underdog.to_string(),
            spread: 0.0 - spread,
            game_total: over_under,
            team_total: totals.underdog,
        });
    }

    let mut rows = favorites;
    rows.append(&mut underdogs);
    rows.sort_by(|a, b| a.season_week.cmp(&b.season_week));

    if !skipped.is_empty() {
        warn!(
            "{} of {} games could not be reshaped into team odds",
            skipped.count,
            games.len()
        );
        for sample in &skipped.samples {
            debug!("skipped game: {:?}", sample);
        }
    }
    info!(
        "Reshaped {} games into {} team odds rows",
        games.len() - games_out_of_season - skipped.count,
        rows.len()
    );

    ReshapedOdds {
        report: ReshapeReport {
            games_in: games.len(),
            games_out_of_season,
            pick_em,
            rows_out: rows.len(),
            skipped,
        },
        rows,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
