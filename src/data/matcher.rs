use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::model::{fold_case, Dataset, Normalization, VoterRecord};
use crate::error::{ConfigError, SearchError};

// ---------------------------------------------------------------------------
// Match mode
// ---------------------------------------------------------------------------

/// How query text is compared with the two search columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum MatchMode {
    /// Case-insensitive containment on one or both fields.
    #[default]
    Substring,
    /// Case-folded, trimmed equality on both fields.
    Exact,
}

impl MatchMode {
    /// Canonical form the roll is loaded with for this mode.
    pub fn normalization(self) -> Normalization {
        match self {
            MatchMode::Substring => Normalization::Trim,
            MatchMode::Exact => Normalization::TrimUpper,
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Substring => write!(f, "substring"),
            MatchMode::Exact => write!(f, "exact"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substring" => Ok(MatchMode::Substring),
            "exact" => Ok(MatchMode::Exact),
            _ => Err(ConfigError::InvalidMode(s.trim().to_string())),
        }
    }
}

impl TryFrom<String> for MatchMode {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryField {
    Name,
    RelationName,
}

impl fmt::Display for QueryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryField::Name => write!(f, "voter name"),
            QueryField::RelationName => write!(f, "relation name"),
        }
    }
}

/// User input for one search. Both parts are trimmed on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    name: String,
    relation_name: String,
}

impl Query {
    pub fn new(name: &str, relation_name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            relation_name: relation_name.trim().to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn relation_name(&self) -> &str {
        &self.relation_name
    }

    /// Check the query is runnable under `mode` without looking at any data.
    pub fn validate(&self, mode: MatchMode) -> Result<(), SearchError> {
        match mode {
            MatchMode::Substring if self.name.is_empty() && self.relation_name.is_empty() => {
                Err(SearchError::EmptyQuery)
            }
            MatchMode::Exact if self.name.is_empty() => {
                Err(SearchError::MissingField(QueryField::Name))
            }
            MatchMode::Exact if self.relation_name.is_empty() => {
                Err(SearchError::MissingField(QueryField::RelationName))
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Return indices of records matching `query`, in roll order.
pub fn matched_indices(
    dataset: &Dataset,
    mode: MatchMode,
    query: &Query,
) -> Result<Vec<usize>, SearchError> {
    match mode {
        MatchMode::Substring => substring_indices(dataset, query.name(), query.relation_name()),
        MatchMode::Exact => exact_indices(dataset, query.name(), query.relation_name()),
    }
}

/// Records whose name contains `name_part` and whose relation name contains
/// `rel_part`, both case-insensitively and literally. An empty part is no constraint,
/// but at least one part must be given.
pub fn substring_indices(
    dataset: &Dataset,
    name_part: &str,
    rel_part: &str,
) -> Result<Vec<usize>, SearchError> {
    let query = Query::new(name_part, rel_part);
    query.validate(MatchMode::Substring)?;
    if dataset.is_empty() {
        return Ok(Vec::new());
    }

    let name_key = fold_case(query.name());
    let rel_key = fold_case(query.relation_name());
    Ok(collect_indices(dataset, |rec| {
        (name_key.is_empty() || rec.name_key().contains(name_key.as_str()))
            && (rel_key.is_empty() || rec.relation_key().contains(rel_key.as_str()))
    }))
}

/// Records whose name and relation name both equal the case-folded inputs.
pub fn exact_indices(
    dataset: &Dataset,
    name: &str,
    relation_name: &str,
) -> Result<Vec<usize>, SearchError> {
    let query = Query::new(name, relation_name);
    query.validate(MatchMode::Exact)?;
    if dataset.is_empty() {
        return Ok(Vec::new());
    }

    let name_key = fold_case(query.name());
    let rel_key = fold_case(query.relation_name());
    Ok(collect_indices(dataset, |rec| {
        rec.name_key() == name_key && rec.relation_key() == rel_key
    }))
}

fn collect_indices(dataset: &Dataset, keep: impl Fn(&VoterRecord) -> bool) -> Vec<usize> {
    dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, rec)| keep(rec))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::ColumnNames;
    use crate::data::model::{CellValue, RawTable};

    fn roll(rows: &[(&str, &str)], mode: MatchMode) -> Dataset {
        let header = ["FM_NAME_V2", "RLN_FM_NM_V2"].map(|h| CellValue::String(h.to_string()));
        let mut table = RawTable::with_header(&header);
        for (name, rel) in rows {
            table.push_row(vec![
                CellValue::String(name.to_string()),
                CellValue::String(rel.to_string()),
            ]);
        }
        Dataset::from_table(
            table,
            &ColumnNames::default(),
            mode.normalization(),
            PathBuf::from("test.xlsx"),
        )
        .unwrap()
    }

    fn sample(mode: MatchMode) -> Dataset {
        roll(
            &[
                ("ராமு", "முருகேசன்"),
                (" Ramu ", "Murugesan"),
                ("ராமசாமி", "கந்தசாமி"),
                ("Ramya", "Murugan"),
                ("வள்ளி", "ராமு"),
            ],
            mode,
        )
    }

    #[test]
    fn substring_name_only() {
        let ds = sample(MatchMode::Substring);
        assert_eq!(substring_indices(&ds, "ராம", "").unwrap(), vec![0, 2]);
        assert_eq!(substring_indices(&ds, "ram", "").unwrap(), vec![1, 3]);
    }

    #[test]
    fn substring_fields_compose_with_and() {
        let ds = sample(MatchMode::Substring);
        assert_eq!(substring_indices(&ds, "ram", "MURUGE").unwrap(), vec![1]);
        assert_eq!(substring_indices(&ds, "ராமு", "வேறு").unwrap(), Vec::<usize>::new());
        assert_eq!(substring_indices(&ds, "", "ராமு").unwrap(), vec![4]);
    }

    #[test]
    fn substring_is_literal() {
        let ds = roll(&[("a.b", "x"), ("axb", "x"), ("(k)", "y")], MatchMode::Substring);
        assert_eq!(substring_indices(&ds, "a.b", "").unwrap(), vec![0]);
        assert_eq!(substring_indices(&ds, "(k", "").unwrap(), vec![2]);
        assert_eq!(substring_indices(&ds, "*", "").unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn substring_requires_some_input() {
        let ds = sample(MatchMode::Substring);
        assert_eq!(substring_indices(&ds, "  ", "").unwrap_err(), SearchError::EmptyQuery);
    }

    #[test]
    fn exact_folds_case_and_trims() {
        let ds = sample(MatchMode::Exact);
        assert_eq!(ds.records()[1].name(), "RAMU");
        assert_eq!(exact_indices(&ds, " ramu", "MURUGESAN ").unwrap(), vec![1]);
        assert_eq!(exact_indices(&ds, "ram", "murugesan").unwrap(), Vec::<usize>::new());
        assert_eq!(exact_indices(&ds, "ராமு", "முருகேசன்").unwrap(), vec![0]);
    }

    #[test]
    fn exact_requires_both_fields() {
        let ds = sample(MatchMode::Exact);
        assert_eq!(
            exact_indices(&ds, "", "murugesan").unwrap_err(),
            SearchError::MissingField(QueryField::Name)
        );
        assert_eq!(
            exact_indices(&ds, "ramu", " ").unwrap_err(),
            SearchError::MissingField(QueryField::RelationName)
        );
    }

    #[test]
    fn exact_results_are_within_substring_results() {
        let queries = [
            ("ramu", "murugesan"),
            ("ராமு", "முருகேசன்"),
            ("RAMYA", "murugan"),
            ("வள்ளி", "ராமு"),
            ("ram", "muru"),
        ];
        for mode in [MatchMode::Substring, MatchMode::Exact] {
            let ds = sample(mode);
            for (name, rel) in queries {
                let exact = exact_indices(&ds, name, rel).unwrap();
                let sub = substring_indices(&ds, name, rel).unwrap();
                assert!(exact.iter().all(|i| sub.contains(i)), "{name}/{rel} in {mode}");
            }
        }
    }

    #[test]
    fn empty_roll_short_circuits() {
        let ds = Dataset::empty(ColumnNames::default(), Normalization::Trim);
        assert!(substring_indices(&ds, "ராமு", "").unwrap().is_empty());
        assert!(exact_indices(&ds, "ramu", "murugesan").unwrap().is_empty());
        assert_eq!(substring_indices(&ds, "", "").unwrap_err(), SearchError::EmptyQuery);
    }

    #[test]
    fn mode_parses_and_displays() {
        assert_eq!(" Exact ".parse::<MatchMode>().unwrap(), MatchMode::Exact);
        assert_eq!("substring".parse::<MatchMode>().unwrap(), MatchMode::Substring);
        assert!("regex".parse::<MatchMode>().is_err());
        assert_eq!(MatchMode::Exact.to_string(), "exact");
    }
}
