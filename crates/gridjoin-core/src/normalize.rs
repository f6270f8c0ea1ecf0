// Per-source cleanup of the player pool and pass-defense tables.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::sources::{field, RawTable, SourceError};
use crate::teams::AliasTable;

// ---------------------------------------------------------------------------
// Keys and flags
// ---------------------------------------------------------------------------

/// Season-week join key, written as `<year>week<week>` (e.g. `2019week17`).
/// Sorting is lexical on that string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SeasonWeek(String);

impl SeasonWeek {
    pub fn new(year: impl fmt::Display, week: impl fmt::Display) -> Self {
        Self(format!("{year}week{week}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeasonWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Home/away flag from the player pool. `h` and `a` are recoded to 1 and 0;
/// anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomeAway {
    Home,
    Away,
    Unrecognized(String),
}

impl HomeAway {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "h" => HomeAway::Home,
            "a" => HomeAway::Away,
            other => HomeAway::Unrecognized(other.to_string()),
        }
    }

    pub fn as_flag(&self) -> Option<u8> {
        match self {
            HomeAway::Home => Some(1),
            HomeAway::Away => Some(0),
            HomeAway::Unrecognized(_) => None,
        }
    }
}

impl fmt::Display for HomeAway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomeAway::Home => f.write_str("1"),
            HomeAway::Away => f.write_str("0"),
            HomeAway::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

/// Turn "Last, First" into "First Last". Every comma-separated token is
/// trimmed and the token order reversed; a name without a comma is returned
/// as-is.
pub fn reverse_name(name: &str) -> String {
    if !name.contains(',') {
        return name.to_string();
    }
    name.rsplit(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Player pool
// ---------------------------------------------------------------------------

/// Player pool columns consumed by normalization. Year, Week and GID are
/// folded into the season-week key and not passed through.
const PLAYER_KEY_COLUMNS: [&str; 7] = ["Name", "Team", "Oppt", "h/a", "Year", "Week", "GID"];

/// One player's line for one week.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerWeekRecord {
    pub name: String,
    pub team: String,
    pub opponent: String,
    pub season_week: SeasonWeek,
    pub home_away: HomeAway,
    /// Values for `PlayerPool::stat_columns`, in the same order.
    pub stats: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PlayerPool {
    pub stat_columns: Vec<String>,
    pub records: Vec<PlayerWeekRecord>,
    /// Rows whose h/a value was neither `h` nor `a`.
    pub unrecognized_home_away: usize,
}

impl PlayerPool {
    /// Distinct team and opponent codes, sorted.
    pub fn abbreviations(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self
            .records
            .iter()
            .flat_map(|r| [r.team.as_str(), r.opponent.as_str()])
            .collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }
}

pub fn normalize_player_pool(
    table: &RawTable,
    aliases: &AliasTable,
) -> Result<PlayerPool, SourceError> {
    let name_idx = table.column("Name")?;
    let team_idx = table.column("Team")?;
    let oppt_idx = table.column("Oppt")?;
    let ha_idx = table.column("h/a")?;
    let year_idx = table.column("Year")?;
    let week_idx = table.column("Week")?;

    let stat_idx: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !PLAYER_KEY_COLUMNS.contains(&h.as_str()))
        .map(|(i, _)| i)
        .collect();
    let stat_columns = stat_idx.iter().map(|&i| table.headers[i].clone()).collect();

    let mut unrecognized_home_away = 0;
    let mut records = Vec::with_capacity(table.len());
    for record in &table.records {
        let home_away = HomeAway::parse(field(record, ha_idx));
        if let HomeAway::Unrecognized(raw) = &home_away {
            unrecognized_home_away += 1;
            debug!("unrecognized h/a value {:?} for {}", raw, field(record, name_idx));
        }

        records.push(PlayerWeekRecord {
            name: reverse_name(field(record, name_idx)),
            team: aliases.canonicalize(field(record, team_idx)),
            opponent: aliases.canonicalize(field(record, oppt_idx)),
            season_week: SeasonWeek::new(field(record, year_idx), field(record, week_idx)),
            home_away,
            stats: stat_idx.iter().map(|&i| field(record, i).to_string()).collect(),
        });
    }

    if unrecognized_home_away > 0 {
        warn!(
            "{} player rows carry an h/a value other than 'h' or 'a'; kept as-is",
            unrecognized_home_away
        );
    }
    info!("Normalized {} player-week rows", records.len());

    Ok(PlayerPool {
        stat_columns,
        records,
        unrecognized_home_away,
    })
}

// ---------------------------------------------------------------------------
// Pass defense
// ---------------------------------------------------------------------------

/// Summary rows at the bottom of the pass-defense export.
pub const SUMMARY_ROWS: [&str; 3] = ["Avg Team", "League Total", "Avg Tm/G"];

/// Columns not carried into the joined output.
pub const DROPPED_DEFENSE_COLUMNS: [&str; 6] = ["Rk", "G", "Cmp", "Att", "TD", "Int"];

#[derive(Debug, Clone, PartialEq)]
pub struct TeamDefenseRecord {
    pub team: String,
    /// Values for `DefenseTable::stat_columns`, in the same order.
    pub stats: Vec<String>,
}

/// Season pass-defense stats keyed by team full name, ascending.
#[derive(Debug, Clone)]
pub struct DefenseTable {
    pub stat_columns: Vec<String>,
    pub records: BTreeMap<String, TeamDefenseRecord>,
}

impl DefenseTable {
    pub fn get(&self, team: &str) -> Option<&TeamDefenseRecord> {
        self.records.get(team)
    }

    pub fn team_names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}

pub fn normalize_pass_defense(table: &RawTable) -> Result<DefenseTable, SourceError> {
    let team_idx = table.column("Tm")?;

    let stat_idx: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != team_idx && !DROPPED_DEFENSE_COLUMNS.contains(&h.as_str()))
        .map(|(i, _)| i)
        .collect();
    let stat_columns = stat_idx.iter().map(|&i| table.headers[i].clone()).collect();

    let mut records = BTreeMap::new();
    for record in &table.records {
        let team = field(record, team_idx).to_string();
        if team.is_empty() || SUMMARY_ROWS.contains(&team.as_str()) {
            continue;
        }
        let row = TeamDefenseRecord {
            team: team.clone(),
            stats: stat_idx.iter().map(|&i| field(record, i).to_string()).collect(),
        };
        if records.insert(team.clone(), row).is_some() {
            warn!("duplicate pass-defense row for '{}', using latest", team);
        }
    }

    info!("Normalized pass defense for {} teams", records.len());
    Ok(DefenseTable {
        stat_columns,
        records,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::from_reader;

    fn pool(csv_data: &str) -> PlayerPool {
        let table = from_reader::table(csv_data.as_bytes(), b';', "pool").unwrap();
        normalize_player_pool(&table, &AliasTable::default()).unwrap()
    }

    // -- Name reversal --

    #[test]
    fn reverses_last_first() {
        assert_eq!(reverse_name("Smith, John"), "John Smith");
        assert_eq!(reverse_name("Wilson,Russell"), "Russell Wilson");
    }

    #[test]
    fn single_token_name_unchanged() {
        assert_eq!(reverse_name("Seahawks"), "Seahawks");
        assert_eq!(reverse_name("John Smith"), "John Smith");
    }

    #[test]
    fn reverses_every_comma_token() {
        assert_eq!(reverse_name("Jr., Smith, John"), "John Smith Jr.");
    }

    // -- Season-week key --

    #[test]
    fn season_week_key_format() {
        assert_eq!(SeasonWeek::new(2019, "17").as_str(), "2019week17");
        assert_eq!(SeasonWeek::new(2020, "1").as_str(), "2020week1");
        assert_eq!(SeasonWeek::new("2019", "17"), SeasonWeek::new(2019, 17));
    }

    // -- Home/away --

    #[test]
    fn home_away_recoding() {
        assert_eq!(HomeAway::parse("h").as_flag(), Some(1));
        assert_eq!(HomeAway::parse("a").as_flag(), Some(0));
        assert_eq!(HomeAway::parse("h").to_string(), "1");
        assert_eq!(HomeAway::parse("a").to_string(), "0");
    }

    #[test]
    fn unknown_home_away_passes_through() {
        let flag = HomeAway::parse("n");
        assert_eq!(flag, HomeAway::Unrecognized("n".into()));
        assert_eq!(flag.as_flag(), None);
        assert_eq!(flag.to_string(), "n");
    }

    // -- Player pool --

    #[test]
    fn player_pool_normalizes_every_key_column() {
        let pool = pool(
            "\
Week;Year;GID;Name;Pos;Team;h/a;Oppt;FD points;FD salary
17;2019;1234;Wilson, Russell;QB;sea;h;sfo;22.5;8200
17;2019;5678;Garoppolo, Jimmy;QB;sfo;a;sea;18.1;7600",
        );

        assert_eq!(pool.stat_columns, vec!["Pos", "FD points", "FD salary"]);
        assert_eq!(pool.records.len(), 2);

        let r = &pool.records[0];
        assert_eq!(r.name, "Russell Wilson");
        assert_eq!(r.team, "SEA");
        assert_eq!(r.opponent, "SF");
        assert_eq!(r.season_week.as_str(), "2019week17");
        assert_eq!(r.home_away, HomeAway::Home);
        assert_eq!(r.stats, vec!["QB", "22.5", "8200"]);

        let r = &pool.records[1];
        assert_eq!(r.team, "SF");
        assert_eq!(r.opponent, "SEA");
        assert_eq!(r.home_away, HomeAway::Away);
    }

    #[test]
    fn only_zero_and_one_flags_for_h_and_a_rows() {
        let pool = pool(
            "\
Week;Year;GID;Name;Team;h/a;Oppt
1;2020;1;A, B;kan;h;tam
1;2020;2;C, D;tam;a;kan
1;2020;3;E, F;nwe;a;nor
1;2020;4;G, H;nor;h;nwe",
        );
        let flags: Vec<Option<u8>> = pool.records.iter().map(|r| r.home_away.as_flag()).collect();
        assert!(flags.iter().all(|f| matches!(f, Some(0) | Some(1))));
        assert_eq!(pool.unrecognized_home_away, 0);
        assert_eq!(pool.abbreviations(), vec!["KC", "NE", "NO", "TB"]);
    }

    #[test]
    fn unrecognized_home_away_is_counted() {
        let pool = pool(
            "\
Week;Year;GID;Name;Team;h/a;Oppt
1;2020;1;A, B;kan;x;tam",
        );
        assert_eq!(pool.unrecognized_home_away, 1);
        assert_eq!(pool.records[0].home_away.to_string(), "x");
    }

    #[test]
    fn player_pool_missing_column_is_an_error() {
        let table = from_reader::table(
            "Week;Year;GID;Name;Team;h/a\n1;2020;1;A, B;kan;h".as_bytes(),
            b';',
            "pool.csv",
        )
        .unwrap();
        let err = normalize_player_pool(&table, &AliasTable::default()).unwrap_err();
        match err {
            SourceError::MissingColumn { column, .. } => assert_eq!(column, "Oppt"),
            other => panic!("expected MissingColumn, got: {other}"),
        }
    }

    // -- Pass defense --

    const DEFENSE_CSV: &str = "\
Rk,Tm,G,Cmp,Att,Cmp%,Yds,TD,TD%,Int,Y/A,Rate,Sk,Yds
2,Seattle Seahawks,16,383,589,65.0,4165,22,3.7,16,7.2,90.5,28,185
1,San Francisco 49ers,16,330,530,62.3,2707,20,3.8,12,5.4,82.6,48,303
,Avg Team,16,352,560,62.9,3739,25,4.4,12,6.9,92.0,42,280
,League Total,16,11275,17928,62.9,119660,784,4.4,376,6.9,92.0,1344,8968
,Avg Tm/G,1,22,35,62.9,234,2,4.4,1,6.9,92.0,3,17";

    #[test]
    fn pass_defense_drops_summary_rows_and_columns() {
        let table = from_reader::table(DEFENSE_CSV.as_bytes(), b',', "defense").unwrap();
        let defense = normalize_pass_defense(&table).unwrap();

        assert_eq!(
            defense.stat_columns,
            vec!["Cmp%", "Yds", "TD%", "Y/A", "Rate", "Sk", "Yds.1"]
        );
        assert_eq!(defense.records.len(), 2);
        assert!(defense.get("Avg Team").is_none());
        assert!(defense.get("League Total").is_none());

        let sf = defense.get("San Francisco 49ers").unwrap();
        assert_eq!(sf.stats, vec!["62.3", "2707", "3.8", "5.4", "82.6", "48", "303"]);
    }

    #[test]
    fn pass_defense_sorted_by_team_name() {
        let table = from_reader::table(DEFENSE_CSV.as_bytes(), b',', "defense").unwrap();
        let defense = normalize_pass_defense(&table).unwrap();
        let names: Vec<&str> = defense.team_names().collect();
        assert_eq!(names, vec!["San Francisco 49ers", "Seattle Seahawks"]);
    }

    #[test]
    fn duplicate_defense_row_keeps_latest() {
        let csv_data = "\
Tm,Yds
Buffalo Bills,2750
Buffalo Bills,2800";
        let table = from_reader::table(csv_data.as_bytes(), b',', "defense").unwrap();
        let defense = normalize_pass_defense(&table).unwrap();
        assert_eq!(defense.records.len(), 1);
        assert_eq!(defense.get("Buffalo Bills").unwrap().stats, vec!["2800"]);
    }

    #[test]
    fn pass_defense_without_team_column_is_an_error() {
        let table = from_reader::table("Team,Yds\nBills,1".as_bytes(), b',', "defense").unwrap();
        assert!(matches!(
            normalize_pass_defense(&table),
            Err(SourceError::MissingColumn { .. })
        ));
    }
}
