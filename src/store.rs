use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::config::ColumnNames;
use crate::data::loader::load_file;
use crate::data::model::{Dataset, Normalization};
use crate::error::DataLoadError;

/// Load-once cache of the roll.
///
/// The file is parsed on the first [`RollStore::load`] call and the outcome,
/// success or failure, is kept for the lifetime of the store. Concurrent first
/// calls block on a single parse.
#[derive(Debug)]
pub struct RollStore {
    path: PathBuf,
    columns: ColumnNames,
    normalization: Normalization,
    cell: OnceLock<Result<Arc<Dataset>, DataLoadError>>,
    parses: AtomicUsize,
}

impl RollStore {
    pub fn new(path: impl Into<PathBuf>, columns: ColumnNames, normalization: Normalization) -> Self {
        Self {
            path: path.into(),
            columns,
            normalization,
            cell: OnceLock::new(),
            parses: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// The cached roll, parsing it first if needed.
    pub fn load(&self) -> Result<Arc<Dataset>, DataLoadError> {
        self.cell
            .get_or_init(|| {
                self.parses.fetch_add(1, Ordering::SeqCst);
                match load_file(&self.path, &self.columns, self.normalization) {
                    Ok(dataset) => {
                        log::info!(
                            "Loaded {} voters ({} columns) from {} [{:?}]",
                            dataset.len(),
                            dataset.columns.len(),
                            self.path.display(),
                            self.normalization,
                        );
                        Ok(Arc::new(dataset))
                    }
                    Err(e) => {
                        log::error!("Failed to load voter roll: {e}");
                        Err(e)
                    }
                }
            })
            .clone()
    }

    /// Whether a load has been attempted.
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// How many times the file has been parsed (0 or 1).
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }
}
