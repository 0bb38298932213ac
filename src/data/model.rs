use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::ColumnNames;
use crate::error::DataLoadError;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the roll
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value as it comes out of the source file.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date string kept as text for simplicity.
    Date(String),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Classify a raw number: integral values become `Integer`.
    pub fn from_number(v: f64) -> Self {
        if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 {
            CellValue::Integer(v as i64)
        } else {
            CellValue::Float(v)
        }
    }

    /// Text form used for the search columns. Empty cells become `""`.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Float(v) if v.is_finite() && v.fract() == 0.0 => format!("{v:.0}"),
            other => other.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) | CellValue::Date(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// RawTable – what every format reader produces
// ---------------------------------------------------------------------------

/// Header plus rows, in source order, before any normalization.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Build a table from a header row, applying spreadsheet header conventions:
    /// blank names become `Unnamed: <idx>`, repeated names get `.1`, `.2`, ... suffixes.
    pub fn with_header(header: &[CellValue]) -> Self {
        let mut columns: Vec<String> = Vec::with_capacity(header.len());
        for (idx, cell) in header.iter().enumerate() {
            let base = match cell.to_text().trim() {
                "" => format!("Unnamed: {idx}"),
                _ => cell.to_text(),
            };
            let mut candidate = base.clone();
            let mut suffix = 1;
            while columns.contains(&candidate) {
                candidate = format!("{base}.{suffix}");
                suffix += 1;
            }
            columns.push(candidate);
        }
        RawTable {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Null);
        self.rows.push(row);
    }
}

// ---------------------------------------------------------------------------
// Normalization – how the two search columns are canonicalized at load time
// ---------------------------------------------------------------------------

/// Canonical form applied to `name` and `relation_name` when the roll is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalization {
    /// Strip surrounding whitespace only.
    Trim,
    /// Strip surrounding whitespace and upper-case.
    TrimUpper,
}

impl Normalization {
    pub fn apply(self, raw: &str) -> String {
        match self {
            Normalization::Trim => raw.trim().to_string(),
            Normalization::TrimUpper => fold_case(raw.trim()),
        }
    }
}

/// Case folding shared by both matchers. Tamil has no case, so this only
/// affects Latin (transliterated) spellings.
pub fn fold_case(s: &str) -> String {
    s.to_uppercase()
}

static NULL_CELL: CellValue = CellValue::Null;

// ---------------------------------------------------------------------------
// VoterRecord – one row of the roll
// ---------------------------------------------------------------------------

/// A single roll entry. All source columns are kept; the two search fields
/// are stored normalized alongside their case-folded match keys.
#[derive(Debug, Clone, PartialEq)]
pub struct VoterRecord {
    name: String,
    relation_name: String,
    part_name: Option<String>,
    name_key: String,
    relation_key: String,
    /// Every source column: column_name → value.
    pub values: BTreeMap<String, CellValue>,
}

impl VoterRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn relation_name(&self) -> &str {
        &self.relation_name
    }

    /// The long "part name" display field, if the roll has one and it is non-empty.
    pub fn part_name(&self) -> Option<&str> {
        self.part_name.as_deref()
    }

    pub(crate) fn name_key(&self) -> &str {
        &self.name_key
    }

    pub(crate) fn relation_key(&self) -> &str {
        &self.relation_key
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column)
    }

    /// Values for `columns` in the given order; absent columns read as `Null`.
    pub fn values_in<'a>(&'a self, columns: &'a [String]) -> impl Iterator<Item = &'a CellValue> + 'a {
        columns
            .iter()
            .map(|c| self.values.get(c).unwrap_or(&NULL_CELL))
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded roll
// ---------------------------------------------------------------------------

/// The immutable, ordered roll with its column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Ordered list of source column names.
    pub columns: Vec<String>,
    records: Vec<VoterRecord>,
    column_names: ColumnNames,
    normalization: Normalization,
}

impl Dataset {
    /// An empty roll that still knows its configured columns.
    pub fn empty(column_names: ColumnNames, normalization: Normalization) -> Self {
        Dataset {
            columns: Vec::new(),
            records: Vec::new(),
            column_names,
            normalization,
        }
    }

    /// Build the roll from a parsed table, checking that both search columns exist.
    pub fn from_table(
        table: RawTable,
        column_names: &ColumnNames,
        normalization: Normalization,
        source: PathBuf,
    ) -> Result<Self, DataLoadError> {
        let position = |column: &str| {
            table
                .columns
                .iter()
                .position(|c| c == column)
                .ok_or_else(|| DataLoadError::MissingColumn {
                    path: source.clone(),
                    column: column.to_string(),
                })
        };
        let name_idx = position(&column_names.name)?;
        let relation_idx = position(&column_names.relation_name)?;
        let part_idx = table
            .columns
            .iter()
            .position(|c| *c == column_names.part_name);

        let RawTable { columns, rows } = table;
        let records = rows
            .into_iter()
            .map(|mut row| {
                row.resize(columns.len(), CellValue::Null);
                let name = normalization.apply(&row[name_idx].to_text());
                let relation_name = normalization.apply(&row[relation_idx].to_text());
                let part_name = part_idx
                    .map(|i| row[i].to_text())
                    .filter(|p| !p.trim().is_empty());
                row[name_idx] = CellValue::String(name.clone());
                row[relation_idx] = CellValue::String(relation_name.clone());
                let values = columns.iter().cloned().zip(row).collect();
                VoterRecord {
                    name_key: fold_case(&name),
                    relation_key: fold_case(&relation_name),
                    name,
                    relation_name,
                    part_name,
                    values,
                }
            })
            .collect();

        Ok(Dataset {
            columns,
            records,
            column_names: column_names.clone(),
            normalization,
        })
    }

    pub fn records(&self) -> &[VoterRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&VoterRecord> {
        self.records.get(index)
    }

    pub fn column_names(&self) -> &ColumnNames {
        &self.column_names
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the roll is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
