use std::sync::{Arc, OnceLock};

use crate::config::SearchConfig;
use crate::data::matcher::{matched_indices, MatchMode, Query};
use crate::data::model::{Dataset, VoterRecord};
use crate::error::{DataLoadError, SearchError};
use crate::store::RollStore;

/// Shown for a record with no part name.
pub const MISSING_PART_NAME: &str = "—";

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// Matching rows of one search, in roll order.
#[derive(Debug, Clone)]
pub struct SearchResults {
    dataset: Arc<Dataset>,
    indices: Vec<usize>,
}

impl SearchResults {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Row positions in the roll.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn records(&self) -> impl Iterator<Item = &VoterRecord> + '_ {
        self.indices
            .iter()
            .filter_map(|&i| self.dataset.record(i))
    }

    /// Every column of the roll, in source order.
    pub fn columns(&self) -> &[String] {
        &self.dataset.columns
    }

    /// All columns except the long part-name column.
    pub fn display_columns(&self) -> Vec<String> {
        let part = &self.dataset.column_names().part_name;
        self.dataset
            .columns
            .iter()
            .filter(|c| *c != part)
            .cloned()
            .collect()
    }

    /// `(voter name, part name)` pairs for showing the long column separately.
    pub fn part_name_rows(&self) -> Vec<(&str, &str)> {
        self.records()
            .map(|r| (r.name(), r.part_name().unwrap_or(MISSING_PART_NAME)))
            .collect()
    }
}

/// Result of a search that ran. An empty match is not an error.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Found(SearchResults),
    NoMatch,
}

impl SearchOutcome {
    pub fn results(&self) -> Option<&SearchResults> {
        match self {
            SearchOutcome::Found(results) => Some(results),
            SearchOutcome::NoMatch => None,
        }
    }

    pub fn len(&self) -> usize {
        self.results().map_or(0, SearchResults::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// VoterSearch – the query interface
// ---------------------------------------------------------------------------

/// Query interface for a presentation layer: one roll, loaded once, searched per request.
#[derive(Debug)]
pub struct VoterSearch {
    config: SearchConfig,
    store: RollStore,
}

impl VoterSearch {
    pub fn new(config: SearchConfig) -> Self {
        let store = RollStore::new(
            config.roll_path.clone(),
            config.columns.clone(),
            config.mode.normalization(),
        );
        Self { config, store }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Configured match mode.
    pub fn mode(&self) -> MatchMode {
        self.config.mode
    }

    pub fn store(&self) -> &RollStore {
        &self.store
    }

    /// Load the roll now instead of on the first search.
    pub fn preload(&self) -> Result<Arc<Dataset>, DataLoadError> {
        self.store.load()
    }

    /// Whether there is any data to search. A presenter should not offer a
    /// search form when this is false.
    pub fn is_available(&self) -> bool {
        self.store.load().is_ok_and(|ds| !ds.is_empty())
    }

    /// Search with the configured mode.
    pub fn search(&self, name: &str, relation_name: &str) -> Result<SearchOutcome, SearchError> {
        self.search_with(self.config.mode, name, relation_name)
    }

    /// Search with an explicit mode. The query is validated before the roll is touched.
    pub fn search_with(
        &self,
        mode: MatchMode,
        name: &str,
        relation_name: &str,
    ) -> Result<SearchOutcome, SearchError> {
        let query = Query::new(name, relation_name);
        if let Err(e) = query.validate(mode) {
            log::warn!("Rejected {mode} search: {e}");
            return Err(e);
        }

        let dataset = self.store.load()?;
        let indices = matched_indices(&dataset, mode, &query)?;
        log::debug!(
            "{mode} search name={:?} relation={:?}: {} of {} records",
            query.name(),
            query.relation_name(),
            indices.len(),
            dataset.len()
        );

        if indices.is_empty() {
            return Ok(SearchOutcome::NoMatch);
        }
        Ok(SearchOutcome::Found(SearchResults { dataset, indices }))
    }
}

// ---------------------------------------------------------------------------
// Process-wide instance
// ---------------------------------------------------------------------------

static SHARED: OnceLock<VoterSearch> = OnceLock::new();

/// Install the process-wide search. The first call wins; later configs are ignored.
/// The roll itself is still parsed lazily (call [`VoterSearch::preload`] to load eagerly).
pub fn init_shared(config: SearchConfig) -> &'static VoterSearch {
    SHARED.get_or_init(|| VoterSearch::new(config))
}

/// The process-wide search, if [`init_shared`] has run.
pub fn shared() -> Option<&'static VoterSearch> {
    SHARED.get()
}
