//! Electoral roll lookup by voter name and relation (father's / husband's) name.
//!
//! The roll is read once from a spreadsheet, kept in memory, and filtered per
//! query with either case-insensitive substring matching or case-folded exact
//! matching on both names. Rendering is left to the caller.

pub mod config;
pub mod data;
pub mod error;
pub mod state;
pub mod store;

pub use config::{ColumnNames, SearchConfig};
pub use data::matcher::{MatchMode, Query, QueryField};
pub use data::model::{CellValue, Dataset, Normalization, RawTable, VoterRecord};
pub use error::{ConfigError, DataLoadError, SearchError};
pub use state::{init_shared, shared, SearchOutcome, SearchResults, VoterSearch};
pub use store::RollStore;
