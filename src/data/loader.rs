use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Dataset, Normalization, RawTable};
use super::xlsx;
use crate::config::ColumnNames;
use crate::error::DataLoadError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a voter roll from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` – first worksheet, header in the first row (the usual case)
/// * `.csv`            – header row, one record per line
/// * `.json`           – `[{ "FM_NAME_V2": "...", "RLN_FM_NM_V2": "...", ... }, ...]`
/// * `.parquet`        – flat table of string / numeric / boolean columns
///
/// The name and relation-name columns must be present; every other column is
/// carried through as-is.
pub fn load_file(
    path: &Path,
    columns: &ColumnNames,
    normalization: Normalization,
) -> Result<Dataset, DataLoadError> {
    if !path.exists() {
        return Err(DataLoadError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "xlsx" | "xlsm" => xlsx::read_first_sheet(path),
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        _ => {
            return Err(DataLoadError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: ext,
            })
        }
    }
    .map_err(|e| DataLoadError::Unreadable {
        path: path.to_path_buf(),
        cause: format!("{e:#}"),
    })?;

    Dataset::from_table(table, columns, normalization, path.to_path_buf())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, then one voter per record.
fn load_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    let header: Vec<CellValue> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| CellValue::String(h.to_string()))
        .collect();

    let mut table = RawTable::with_header(&header);
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        table.push_row(record.iter().map(guess_cell_type).collect());
    }
    Ok(table)
}

fn guess_cell_type(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    // `f64` also parses "nan" / "inf"; those are names here, not numbers.
    if s.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records', force_ascii=False)`).
/// Columns are ordered by first appearance.
fn load_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut objects = Vec::with_capacity(records.len());
    let mut header: Vec<CellValue> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !header.iter().any(|h| h.as_str() == Some(key.as_str())) {
                header.push(CellValue::String(key.clone()));
            }
        }
        objects.push(obj);
    }

    let mut table = RawTable::with_header(&header);
    for obj in objects {
        let row = header
            .iter()
            .map(|h| {
                h.as_str()
                    .and_then(|key| obj.get(key))
                    .map(json_to_cell)
                    .unwrap_or(CellValue::Null)
            })
            .collect();
        table.push_row(row);
    }
    Ok(table)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet export of the roll (`df.to_parquet()` / `df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let header: Vec<CellValue> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| CellValue::String(f.name().clone()))
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut table = RawTable::with_header(&header);
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        if batch.num_columns() != header.len() {
            bail!(
                "record batch has {} columns, schema has {}",
                batch.num_columns(),
                header.len()
            );
        }
        let columns = batch
            .schema()
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, col)| readable_column(field.name(), col))
            .collect::<Result<Vec<_>>>()?;
        for row in 0..batch.num_rows() {
            let cells = columns
                .iter()
                .map(|col| extract_cell(col, row))
                .collect::<Result<Vec<_>>>()?;
            table.push_row(cells);
        }
    }
    Ok(table)
}

/// Cast a column to one of the types [`extract_cell`] reads: narrower integers
/// widen to `Int64`, `Float16` to `Float64`, anything else (dictionary-encoded
/// strings, string views, dates, timestamps, decimals) is rendered as text.
/// Nested columns are rejected.
fn readable_column(name: &str, col: &ArrayRef) -> Result<ArrayRef> {
    let target = match col.data_type() {
        DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Int32
        | DataType::Int64
        | DataType::Float32
        | DataType::Float64
        | DataType::Boolean => return Ok(Arc::clone(col)),
        DataType::Int8
        | DataType::Int16
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => DataType::Int64,
        DataType::Float16 => DataType::Float64,
        DataType::List(_)
        | DataType::LargeList(_)
        | DataType::FixedSizeList(..)
        | DataType::Struct(_)
        | DataType::Map(..)
        | DataType::Union(..) => {
            bail!("column '{name}' is nested ({:?})", col.data_type())
        }
        _ => DataType::Utf8,
    };
    cast(col.as_ref(), &target).with_context(|| {
        format!(
            "column '{name}' of type {:?} cannot be read as {target:?}",
            col.data_type()
        )
    })
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &ArrayRef, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let any = col.as_any();
    let cell = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|s| CellValue::String(s.value(row).to_string())),
        DataType::LargeUtf8 => Some(CellValue::String(
            col.as_string::<i64>().value(row).to_string(),
        )),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| CellValue::Integer(a.value(row) as i64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| CellValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| CellValue::Float(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| CellValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| CellValue::Bool(a.value(row))),
        _ => None,
    };
    cell.with_context(|| format!("unexpected column type {:?}", col.data_type()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_cells_are_typed() {
        assert_eq!(guess_cell_type(""), CellValue::Null);
        assert_eq!(guess_cell_type("41"), CellValue::Integer(41));
        assert_eq!(guess_cell_type("2.5"), CellValue::Float(2.5));
        assert_eq!(guess_cell_type("1e3"), CellValue::Float(1000.0));
        assert_eq!(guess_cell_type("true"), CellValue::Bool(true));
        assert_eq!(guess_cell_type("ராமு"), CellValue::String("ராமு".to_string()));
    }

    #[test]
    fn float_words_stay_text() {
        for word in ["Nan", "NaN", "inf", "Infinity", "-INF"] {
            assert_eq!(guess_cell_type(word), CellValue::String(word.to_string()), "{word}");
        }
    }
}
