// Integration tests for the gridjoin pipeline.
//
// These run every stage through the library's public API, either over the
// fixture CSVs in tests/fixtures or over small in-memory tables.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use gridjoin_core::config::*;
use gridjoin_core::join::DropReason;
use gridjoin_core::pipeline::{self, PipelineError};
use gridjoin_core::report;
use gridjoin_core::sources::{self, from_reader, SourceError, SourceTables};

// ===========================================================================
// Test helpers
// ===========================================================================

fn fixture(name: &str) -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .display()
        .to_string()
}

/// The shipped team table, so fixture runs exercise the real key set.
fn default_teams() -> TeamsConfig {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../defaults/teams.toml");
    let text = fs::read_to_string(&path).expect("defaults/teams.toml should exist");
    toml::from_str(&text).expect("defaults/teams.toml should parse")
}

/// Build a test-ready Config pointing at the fixtures (no config files).
fn inline_config() -> Config {
    Config {
        data_paths: DataPaths {
            pass_defense: fixture("pass_defense.csv"),
            player_pool: fixture("fd_week_17.csv"),
            vegas: fixture("spreads.csv"),
        },
        player_pool: PlayerPoolConfig::default(),
        vegas: VegasConfig::default(),
        output: OutputConfig::default(),
        reconcile: ReconcileConfig::default(),
        teams: default_teams(),
    }
}

fn temp_dir(name: &str) -> PathBuf {
    let tmp = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&tmp);
    fs::create_dir_all(&tmp).unwrap();
    tmp
}

fn two_team_tables() -> SourceTables {
    let defense = "\
Rk,Tm,G,Cmp,Att,Yds,TD,Int,Rate
1,Home Team,16,300,500,3000,20,10,85.0
2,Away Team,16,320,520,3300,24,8,92.5
,League Total,32,620,1020,6300,44,18,88.8";
    let players = "\
Week;Year;GID;Name;Pos;Team;h/a;Oppt;FD points;FD salary
1;2020;1;Player, Home;QB;hom;h;awy;20.0;8000
1;2020;2;Player, Away;QB;awy;a;hom;15.0;7000";
    let odds = "\
schedule_date,schedule_season,schedule_week,team_home,team_away,team_favorite_id,spread_favorite,over_under_line
09/13/2020,2020,1,Home Team,Away Team,HOM,-3,45";

    SourceTables {
        pass_defense: from_reader::table(defense.as_bytes(), b',', "defense").unwrap(),
        player_pool: from_reader::table(players.as_bytes(), b';', "players").unwrap(),
        game_odds: from_reader::game_odds(odds.as_bytes(), "odds").unwrap(),
    }
}

fn two_team_config() -> Config {
    let mut teams = BTreeMap::new();
    teams.insert("Home Team".to_string(), "HOM".to_string());
    teams.insert("Away Team".to_string(), "AWY".to_string());
    Config {
        data_paths: DataPaths {
            pass_defense: "unused".into(),
            player_pool: "unused".into(),
            vegas: "unused".into(),
        },
        player_pool: PlayerPoolConfig::default(),
        vegas: VegasConfig::default(),
        output: OutputConfig::default(),
        reconcile: ReconcileConfig::default(),
        teams: TeamsConfig {
            teams,
            aliases: BTreeMap::new(),
        },
    }
}

// ===========================================================================
// Two-team league
// ===========================================================================

#[test]
fn two_team_league_end_to_end() {
    let outcome = pipeline::run_tables(&two_team_tables(), &two_team_config()).unwrap();
    let table = &outcome.table;
    assert_eq!(table.len(), 2);

    let home = table.find("Home Player", "2020week1").expect("home player row");
    assert_eq!(home.player.team, "HOM");
    assert_eq!(home.team_name.as_deref(), Some("Home Team"));
    assert_eq!(home.opponent_name, "Away Team");
    assert_eq!(home.odds.spread, -3.0);
    assert_eq!(home.odds.team_total, 24.0);
    assert_eq!(home.odds.game_total, 45.0);
    assert_eq!(home.player.home_away.as_flag(), Some(1));

    let away = table.find("Away Player", "2020week1").expect("away player row");
    assert_eq!(away.odds.spread, 3.0);
    assert_eq!(away.odds.team_total, 21.0);
    assert_eq!(away.opponent_name, "Home Team");
    assert_eq!(away.player.home_away.as_flag(), Some(0));

    // Each player carries the opponent's defense, minus the dropped columns.
    assert_eq!(table.defense_columns, vec!["Yds", "Rate"]);
    assert_eq!(home.defense.stats, vec!["3300", "92.5"]);
    assert_eq!(away.defense.stats, vec!["3000", "85.0"]);

    assert!(!outcome.report.has_drops());
    assert_eq!(outcome.summary.odds.rows_out, 2);
}

// ===========================================================================
// Fixture files
// ===========================================================================

#[test]
fn fixture_run_joins_every_matchable_player_once() {
    let outcome = pipeline::run(&inline_config()).unwrap();
    let table = &outcome.table;

    assert_eq!(outcome.report.players_in, 10);
    assert_eq!(table.len(), 8);

    let mut names: Vec<&str> = table.rows.iter().map(|r| r.player.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 8, "no player may appear twice");

    let wilson = table.find("Russell Wilson", "2019week17").unwrap();
    assert_eq!(wilson.player.opponent, "SF");
    assert_eq!(wilson.opponent_name, "San Francisco 49ers");
    assert_eq!(wilson.odds.spread, 3.5);
    assert_eq!(wilson.odds.team_total, 21.75);

    let garoppolo = table.find("Jimmy Garoppolo", "2019week17").unwrap();
    assert_eq!(garoppolo.player.team, "SF");
    assert_eq!(garoppolo.odds.spread, -3.5);
    assert_eq!(garoppolo.odds.team_total, 25.25);

    let brees = table.find("Drew Brees", "2019week17").unwrap();
    assert_eq!(brees.player.team, "NO");
    assert_eq!(brees.odds.team_total, 29.75);
    assert_eq!(brees.player.home_away.to_string(), "0");

    let grier = table.find("Will Grier", "2019week17").unwrap();
    assert_eq!(grier.odds.spread, 13.0);
    assert_eq!(grier.odds.team_total, 16.75);

    let mahomes = table.find("Patrick Mahomes", "2019week17").unwrap();
    assert_eq!(mahomes.player.team, "KC");
    assert_eq!(mahomes.odds.team_total, 27.0);
    assert_eq!(mahomes.team_name.as_deref(), Some("Kansas City Chiefs"));
}

#[test]
fn fixture_run_reports_what_it_dropped() {
    let outcome = pipeline::run(&inline_config()).unwrap();
    let report = &outcome.report;

    assert_eq!(report.unmatched_opponent.count, 1);
    assert_eq!(report.unmatched_opponent.samples[0].name, "Josh Allen");
    assert_eq!(report.unmatched_opponent.samples[0].opponent, "NYJ");
    assert_eq!(report.unmatched_odds.count, 1);
    assert_eq!(report.unmatched_odds.samples[0].name, "Aaron Rodgers");
    assert_eq!(report.unmatched_odds.samples[0].team, "GB");
    assert!(report.defense_without_key.is_empty());
    assert!(report.odds_conflicts.is_empty());

    let odds = &outcome.summary.odds;
    assert_eq!(odds.games_in, 6);
    assert_eq!(odds.skipped.count, 1);
    assert_eq!(odds.rows_out, 10);
    assert!(outcome.summary.unknown_team_names.is_empty());
    assert!(outcome.summary.unknown_abbreviations.is_empty());
    assert_eq!(outcome.summary.defense_teams, 9);
}

#[test]
fn season_filter_limits_odds() {
    let mut config = inline_config();
    config.vegas.seasons = vec![2019];
    let outcome = pipeline::run(&config).unwrap();

    assert_eq!(outcome.summary.odds.games_out_of_season, 2);
    assert_eq!(outcome.summary.odds.rows_out, 8);
    assert_eq!(outcome.table.len(), 8);
}

#[test]
fn strict_mode_fails_on_any_drop() {
    let mut config = inline_config();
    config.reconcile.fail_on_unmatched = true;

    match pipeline::run(&config).unwrap_err() {
        PipelineError::Unmatched { dropped, other } => {
            assert_eq!(dropped, 2);
            assert_eq!(other, 0);
        }
        other => panic!("expected Unmatched, got: {other}"),
    }
}

#[test]
fn strict_mode_passes_a_clean_run() {
    let mut config = two_team_config();
    config.reconcile.fail_on_unmatched = true;
    let outcome = pipeline::run_tables(&two_team_tables(), &config).unwrap();
    assert_eq!(outcome.table.len(), 2);
}

#[test]
fn outputs_are_written_where_configured() {
    let tmp = temp_dir("gridjoin_pipeline_outputs");
    let mut config = inline_config();
    config.output.csv = Some(tmp.join("out/final.csv").display().to_string());
    config.output.quarantine = Some(tmp.join("out/unmatched.csv").display().to_string());
    config.output.summary = Some(tmp.join("out/summary.json").display().to_string());

    pipeline::run(&config).unwrap();

    let final_csv = fs::read_to_string(tmp.join("out/final.csv")).unwrap();
    let mut lines = final_csv.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with(
        "Player Name,Season_Week,Team Abbr,Team,h/a,Oppt Abbr,Oppt,Pos,FD points,FD salary,Cmp%,Yds,"
    ));
    assert!(header.ends_with(",Rate,Sk,Yds.1,spread,game total,team_total"));
    assert_eq!(lines.count(), 8);
    assert!(final_csv.contains("Russell Wilson,2019week17,SEA,Seattle Seahawks,1,SF,San Francisco 49ers,QB,"));

    let quarantine = fs::read_to_string(tmp.join("out/unmatched.csv")).unwrap();
    assert!(quarantine.contains("Josh Allen,2019week17,BUF,NYJ,no_defense_for_opponent"));
    assert!(quarantine.contains("Aaron Rodgers,2019week17,GB,DET,no_odds_for_team_week"));

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.join("out/summary.json")).unwrap()).unwrap();
    assert_eq!(summary["player_rows"], 10);
    assert_eq!(summary["join"]["rows_out"], 8);
    assert_eq!(summary["join"]["unmatched_odds"]["count"], 1);
    assert_eq!(
        summary["join"]["unmatched_opponent"]["samples"][0]["reason"],
        "no_defense_for_opponent"
    );
    assert!(summary["generated_at"].is_string());

    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn strict_failure_still_writes_quarantine() {
    let tmp = temp_dir("gridjoin_pipeline_strict_quarantine");
    let mut config = inline_config();
    config.reconcile.fail_on_unmatched = true;
    config.output.csv = Some(tmp.join("final.csv").display().to_string());
    config.output.quarantine = Some(tmp.join("unmatched.csv").display().to_string());

    assert!(pipeline::run(&config).is_err());
    assert!(tmp.join("unmatched.csv").exists());
    assert!(!tmp.join("final.csv").exists());

    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn preview_shows_head_of_table() {
    let outcome = pipeline::run(&inline_config()).unwrap();
    let preview = report::render_preview(&outcome.table, 3);
    let lines: Vec<&str> = preview.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("Player Name"));
    assert!(lines[1].starts_with("Russell Wilson"));
    assert_eq!(lines[4], "[3 of 8 rows]");
}

// ===========================================================================
// Failure modes
// ===========================================================================

#[test]
fn missing_input_file_is_reported_with_its_path() {
    let mut config = inline_config();
    config.data_paths.vegas = fixture("no_such_file.csv");

    match pipeline::run(&config).unwrap_err() {
        PipelineError::Source(SourceError::Io { path, .. }) => {
            assert!(path.ends_with("no_such_file.csv"));
        }
        other => panic!("expected Source(Io), got: {other}"),
    }
}

#[test]
fn missing_contract_column_fails_the_run() {
    let mut tables = two_team_tables();
    tables.player_pool = from_reader::table(
        "Week;Year;Name;Team;h/a\n1;2020;Player, Home;hom;h".as_bytes(),
        b';',
        "players",
    )
    .unwrap();

    match pipeline::run_tables(&tables, &two_team_config()).unwrap_err() {
        PipelineError::Source(SourceError::MissingColumn { column, .. }) => {
            assert_eq!(column, "Oppt");
        }
        other => panic!("expected MissingColumn, got: {other}"),
    }
}

#[test]
fn duplicate_abbreviation_in_team_table_fails_the_run() {
    let mut config = two_team_config();
    config
        .teams
        .teams
        .insert("Other Team".to_string(), "HOM".to_string());

    assert!(matches!(
        pipeline::run_tables(&two_team_tables(), &config),
        Err(PipelineError::TeamKeys(_))
    ));
}

#[test]
fn loader_reads_fixture_files() {
    let tables = sources::load_all(&inline_config().data_paths, &PlayerPoolConfig::default()).unwrap();
    assert_eq!(tables.pass_defense.len(), 12);
    assert_eq!(tables.player_pool.len(), 10);
    assert_eq!(tables.game_odds.len(), 6);
}

#[test]
fn quarantine_reasons_match_report() {
    let tmp = temp_dir("gridjoin_pipeline_reasons");
    let mut config = inline_config();
    config.output.quarantine = Some(tmp.join("q.csv").display().to_string());
    let outcome = pipeline::run(&config).unwrap();

    let text = fs::read_to_string(tmp.join("q.csv")).unwrap();
    let no_defense = text
        .lines()
        .filter(|l| l.ends_with(&DropReason::NoDefenseForOpponent.to_string()))
        .count();
    assert_eq!(no_defense, outcome.report.unmatched_opponent.count);

    let _ = fs::remove_dir_all(&tmp);
}
