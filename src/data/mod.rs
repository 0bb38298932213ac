//! Data layer: core types, loading, and matching.
//!
//! Architecture:
//! ```text
//!  .xlsx / .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → RawTable → Dataset (search columns normalized)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ Dataset   │  Vec<VoterRecord>, ordered column list
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ matcher   │  substring / exact predicates → matching indices
//!   └──────────┘
//! ```

pub mod loader;
pub mod matcher;
pub mod model;
pub mod xlsx;
