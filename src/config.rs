use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::matcher::MatchMode;
use crate::error::ConfigError;

/// Names a JSON config file to start from.
pub const CONFIG_ENV: &str = "VOTER_SEARCH_CONFIG";
/// Overrides `roll_path`.
pub const ROLL_PATH_ENV: &str = "VOTER_ROLL_PATH";
/// Overrides `mode` (`substring` | `exact`).
pub const MODE_ENV: &str = "VOTER_SEARCH_MODE";

/// Source column names of the fields the search treats specially.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub name: String,
    pub relation_name: String,
    /// Long display column, passed through untouched.
    pub part_name: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            name: "FM_NAME_V2".to_string(),
            relation_name: "RLN_FM_NM_V2".to_string(),
            part_name: "2025 Part name".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Spreadsheet (or csv/json/parquet export) holding the roll.
    pub roll_path: PathBuf,
    pub mode: MatchMode,
    pub columns: ColumnNames,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            roll_path: PathBuf::from("old_data.xlsx"),
            mode: MatchMode::default(),
            columns: ColumnNames::default(),
        }
    }
}

impl SearchConfig {
    pub fn new(roll_path: impl Into<PathBuf>, mode: MatchMode) -> Self {
        Self {
            roll_path: roll_path.into(),
            mode,
            ..Self::default()
        }
    }

    /// Read a JSON config; missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build from the process environment (see [`CONFIG_ENV`], [`ROLL_PATH_ENV`], [`MODE_ENV`]).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`SearchConfig::from_env`] with an explicit variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_ENV) {
            Some(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        if let Some(path) = lookup(ROLL_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            config.roll_path = PathBuf::from(path.trim());
        }
        if let Some(mode) = lookup(MODE_ENV).filter(|m| !m.trim().is_empty()) {
            config.mode = mode.parse()?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_point_at_the_roll_columns() {
        let config = SearchConfig::default();
        assert_eq!(config.roll_path, PathBuf::from("old_data.xlsx"));
        assert_eq!(config.mode, MatchMode::Substring);
        assert_eq!(config.columns.name, "FM_NAME_V2");
        assert_eq!(config.columns.relation_name, "RLN_FM_NM_V2");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"mode": "exact", "columns": {{"name": "VOTER"}}}}"#).unwrap();

        let config = SearchConfig::from_file(file.path()).unwrap();
        assert_eq!(config.mode, MatchMode::Exact);
        assert_eq!(config.columns.name, "VOTER");
        assert_eq!(config.columns.relation_name, "RLN_FM_NM_V2");
        assert_eq!(config.roll_path, PathBuf::from("old_data.xlsx"));
    }

    #[test]
    fn mode_in_config_file_ignores_case() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"mode": " Exact "}}"#).unwrap();
        assert_eq!(SearchConfig::from_file(file.path()).unwrap().mode, MatchMode::Exact);
    }

    #[test]
    fn unknown_mode_in_config_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"mode": "fuzzy"}}"#).unwrap();
        let err = SearchConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn environment_overrides_apply() {
        let vars: HashMap<&str, &str> =
            HashMap::from([(ROLL_PATH_ENV, " rolls/123.xlsx "), (MODE_ENV, "EXACT")]);
        let config = SearchConfig::from_vars(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.roll_path, PathBuf::from("rolls/123.xlsx"));
        assert_eq!(config.mode, MatchMode::Exact);
    }

    #[test]
    fn bad_mode_is_rejected() {
        let err = SearchConfig::from_vars(|k| (k == MODE_ENV).then(|| "fuzzy".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMode(ref m) if m == "fuzzy"));
    }

    #[test]
    fn missing_config_file_is_a_read_error() {
        let err = SearchConfig::from_vars(|k| {
            (k == CONFIG_ENV).then(|| "/nonexistent/voter-search.json".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
