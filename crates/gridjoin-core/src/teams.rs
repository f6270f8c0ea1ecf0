// Team identity: abbreviation aliases and the full-name/abbreviation map.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use thiserror::Error;
use tracing::warn;

/// Abbreviation rewrites that always apply. The player pool export uses
/// three-letter codes for these six teams where the other sources use two.
pub const BUILTIN_ALIASES: [(&str, &str); 6] = [
    ("SFO", "SF"),
    ("KAN", "KC"),
    ("NWE", "NE"),
    ("NOR", "NO"),
    ("GNB", "GB"),
    ("TAM", "TB"),
];

pub fn is_builtin_alias(code: &str) -> bool {
    let code = code.trim().to_uppercase();
    BUILTIN_ALIASES.iter().any(|(from, _)| *from == code)
}

// ---------------------------------------------------------------------------
// Alias table
// ---------------------------------------------------------------------------

/// Built-in aliases plus any extra rewrites supplied by configuration.
#[derive(Debug, Clone)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::with_extra(&BTreeMap::new())
    }
}

impl AliasTable {
    /// Extra entries are keyed by their uppercased source code. Built-in codes
    /// cannot be overridden; such entries are ignored with a warning.
    pub fn with_extra(extra: &BTreeMap<String, String>) -> Self {
        let mut aliases: HashMap<String, String> = BUILTIN_ALIASES
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        for (from, to) in extra {
            if is_builtin_alias(from) {
                warn!("ignoring alias for built-in code '{}'", from.trim());
                continue;
            }
            aliases.insert(from.trim().to_uppercase(), to.trim().to_uppercase());
        }
        Self { aliases }
    }

    /// Trim, uppercase and rewrite a raw team code.
    pub fn canonicalize(&self, code: &str) -> String {
        let upper = code.trim().to_uppercase();
        match self.aliases.get(&upper) {
            Some(to) => to.clone(),
            None => upper,
        }
    }
}

// ---------------------------------------------------------------------------
// Team key map
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TeamKeyError {
    #[error("team key table is empty")]
    Empty,

    #[error("team `{name}` is listed twice (as {first} and {second})")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },

    #[error("abbreviation `{abbreviation}` is claimed by both `{first}` and `{second}`")]
    DuplicateAbbreviation {
        abbreviation: String,
        first: String,
        second: String,
    },
}

/// One-to-one mapping between team full names and abbreviations, indexed in
/// both directions.
#[derive(Debug, Clone)]
pub struct TeamKeyMap {
    by_name: BTreeMap<String, String>,
    by_abbreviation: HashMap<String, String>,
}

/// Names and codes seen in the data that the team key table does not cover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    pub unknown_names: Vec<String>,
    pub unknown_abbreviations: Vec<String>,
}

impl Coverage {
    pub fn is_complete(&self) -> bool {
        self.unknown_names.is_empty() && self.unknown_abbreviations.is_empty()
    }
}

impl TeamKeyMap {
    /// Build the map, rejecting any name or abbreviation that appears twice.
    /// Names and abbreviations are trimmed; abbreviations are uppercased.
    pub fn new<I, N, A>(pairs: I) -> Result<Self, TeamKeyError>
    where
        I: IntoIterator<Item = (N, A)>,
        N: AsRef<str>,
        A: AsRef<str>,
    {
        let mut by_name: BTreeMap<String, String> = BTreeMap::new();
        let mut by_abbreviation: HashMap<String, String> = HashMap::new();

        for (name, abbreviation) in pairs {
            let name = name.as_ref().trim().to_string();
            let abbreviation = abbreviation.as_ref().trim().to_uppercase();

            if let Some(existing) = by_name.get(&name) {
                return Err(TeamKeyError::DuplicateName {
                    name,
                    first: existing.clone(),
                    second: abbreviation,
                });
            }
            if let Some(existing) = by_abbreviation.get(&abbreviation) {
                return Err(TeamKeyError::DuplicateAbbreviation {
                    abbreviation,
                    first: existing.clone(),
                    second: name,
                });
            }

            by_name.insert(name.clone(), abbreviation.clone());
            by_abbreviation.insert(abbreviation, name);
        }

        if by_name.is_empty() {
            return Err(TeamKeyError::Empty);
        }

        Ok(Self {
            by_name,
            by_abbreviation,
        })
    }

    pub fn abbreviation(&self, full_name: &str) -> Option<&str> {
        self.by_name.get(full_name.trim()).map(String::as_str)
    }

    pub fn full_name(&self, abbreviation: &str) -> Option<&str> {
        self.by_abbreviation
            .get(&abbreviation.trim().to_uppercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// (full name, abbreviation) pairs in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_name.iter().map(|(n, a)| (n.as_str(), a.as_str()))
    }

    /// Report which of the given full names and abbreviations the map cannot
    /// resolve. Output is sorted and de-duplicated.
    pub fn coverage<'a, N, A>(&self, names: N, abbreviations: A) -> Coverage
    where
        N: IntoIterator<Item = &'a str>,
        A: IntoIterator<Item = &'a str>,
    {
        let unknown_names: BTreeSet<&str> = names
            .into_iter()
            .filter(|n| self.abbreviation(n).is_none())
            .collect();
        let unknown_abbreviations: BTreeSet<&str> = abbreviations
            .into_iter()
            .filter(|a| self.full_name(a).is_none())
            .collect();

        Coverage {
            unknown_names: unknown_names.into_iter().map(String::from).collect(),
            unknown_abbreviations: unknown_abbreviations
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
