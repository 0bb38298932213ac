//! Minimal `.xlsx` support: read the first worksheet into a [`RawTable`], and
//! write a single-sheet workbook with inline strings.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use anyhow::{Context, Result};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::model::{CellValue, RawTable};

const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const DEFAULT_SHEET: &str = "xl/worksheets/sheet1.xml";

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Parse the first worksheet (in workbook order). The first non-empty row is the header.
pub fn read_first_sheet(path: &Path) -> Result<RawTable> {
    let file = File::open(path).context("opening workbook")?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).context("workbook is not a zip archive")?;

    let sheet_path = first_sheet_path(&mut archive)?;
    let shared = match read_part(&mut archive, SHARED_STRINGS)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let xml = read_part(&mut archive, &sheet_path)?
        .with_context(|| format!("workbook has no part '{sheet_path}'"))?;

    let mut rows = parse_sheet(&xml, &shared)?.into_iter();
    let header = rows.next().context("first worksheet is empty")?;
    let mut table = RawTable::with_header(&header);
    for row in rows {
        table.push_row(row);
    }
    Ok(table)
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("opening '{name}'")),
    };
    let mut text = String::new();
    part.read_to_string(&mut text)
        .with_context(|| format!("reading '{name}'"))?;
    Ok(Some(text))
}

/// Resolve the zip path of the first `<sheet>` through the workbook relationships.
fn first_sheet_path<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    let Some(workbook) = read_part(archive, WORKBOOK)? else {
        return Ok(DEFAULT_SHEET.to_string());
    };
    let rel_id = first_sheet_rel_id(&workbook)?.context("workbook lists no sheets")?;
    let Some(rels) = read_part(archive, WORKBOOK_RELS)? else {
        return Ok(DEFAULT_SHEET.to_string());
    };
    let target = relationship_target(&rels, &rel_id)?
        .with_context(|| format!("no relationship '{rel_id}' for the first sheet"))?;

    Ok(match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    })
}

fn first_sheet_rel_id(xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().context("parsing workbook.xml")? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                // `r:id`; `sheetId` has a different local name.
                return attribute(&e, b"id");
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn relationship_target(xml: &str, id: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().context("parsing workbook relationships")? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if attribute(&e, b"Id")?.as_deref() == Some(id) {
                    return attribute(&e, b"Target");
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Value of the attribute with the given local name, prefix ignored.
fn attribute(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.context("malformed attribute")?;
        if attr.key.local_name().as_ref() == local {
            let value = attr.unescape_value().context("malformed attribute value")?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    // Phonetic runs (`rPh`) carry reading hints, not cell text.
    let mut in_phonetic = false;

    loop {
        match reader.read_event().context("parsing sharedStrings.xml")? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Text(t) if in_text && !in_phonetic => {
                current.push_str(&t.unescape().context("malformed shared string")?);
            }
            Event::CData(c) if in_text && !in_phonetic => {
                current.push_str(&String::from_utf8_lossy(&c));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// A `<c>` element being read.
struct PendingCell {
    col: usize,
    kind: Option<String>,
    text: String,
}

/// Rows of the sheet in order. Rows without any value are dropped.
fn parse_sheet(xml: &str, shared: &[String]) -> Result<Vec<Vec<CellValue>>> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut row: Option<Vec<CellValue>> = None;
    let mut cell: Option<PendingCell> = None;
    let mut next_col = 0;
    let mut capture = false;

    loop {
        match reader.read_event().context("parsing worksheet")? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row = Some(Vec::new());
                    next_col = 0;
                }
                b"c" => {
                    let col = cell_column(&e, next_col)?;
                    next_col = col + 1;
                    cell = Some(PendingCell {
                        col,
                        kind: attribute(&e, b"t")?,
                        text: String::new(),
                    });
                }
                // `v` holds the value, `t` the text of an inline string; `f` is skipped.
                b"v" | b"t" => capture = cell.is_some(),
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                next_col = cell_column(&e, next_col)? + 1;
            }
            Event::Text(t) if capture => {
                if let Some(cell) = cell.as_mut() {
                    cell.text.push_str(&t.unescape().context("malformed cell text")?);
                }
            }
            Event::CData(c) if capture => {
                if let Some(cell) = cell.as_mut() {
                    cell.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    if let (Some(pending), Some(values)) = (cell.take(), row.as_mut()) {
                        let value = cell_value(pending.kind.as_deref(), &pending.text, shared)?;
                        if values.len() <= pending.col {
                            values.resize(pending.col + 1, CellValue::Null);
                        }
                        values[pending.col] = value;
                    }
                }
                b"row" => {
                    if let Some(values) = row.take() {
                        if values.iter().any(|v| !v.is_null()) {
                            rows.push(values);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

fn cell_column(e: &BytesStart<'_>, fallback: usize) -> Result<usize> {
    Ok(attribute(e, b"r")?
        .and_then(|r| column_index(&r))
        .unwrap_or(fallback))
}

fn cell_value(kind: Option<&str>, raw: &str, shared: &[String]) -> Result<CellValue> {
    let value = match kind {
        Some("s") => {
            let idx: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("bad shared string index '{raw}'"))?;
            let text = shared
                .get(idx)
                .with_context(|| format!("shared string {idx} out of range"))?;
            text_cell(text)
        }
        Some("inlineStr") | Some("str") => text_cell(raw),
        Some("b") => CellValue::Bool(raw.trim() == "1"),
        Some("d") => CellValue::Date(raw.trim().to_string()),
        Some("e") => CellValue::Null,
        _ if raw.trim().is_empty() => CellValue::Null,
        _ => raw
            .trim()
            .parse::<f64>()
            .map(CellValue::from_number)
            .with_context(|| format!("bad numeric cell '{raw}'"))?,
    };
    Ok(value)
}

fn text_cell(text: &str) -> CellValue {
    if text.is_empty() {
        CellValue::Null
    } else {
        CellValue::String(text.to_string())
    }
}

/// Zero-based column of an A1-style reference (`"AB12"` → 27).
fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let n = letters.iter().fold(0usize, |acc, b| {
        acc * 26 + (b.to_ascii_uppercase() - b'A') as usize + 1
    });
    Some(n - 1)
}

/// Letters of a zero-based column (`27` → `"AB"`).
fn column_letters(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// Write `rows` (header first) as a single-sheet workbook.
pub fn write_sheet(path: &Path, rows: &[Vec<CellValue>]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", ROOT_RELS_XML.to_string()),
        (WORKBOOK, WORKBOOK_XML.to_string()),
        (WORKBOOK_RELS, WORKBOOK_RELS_XML.to_string()),
        (DEFAULT_SHEET, sheet_xml(rows)),
    ];
    for (name, body) in parts {
        zip.start_file(name, options)
            .with_context(|| format!("adding '{name}'"))?;
        zip.write_all(body.as_bytes())
            .with_context(|| format!("writing '{name}'"))?;
    }
    zip.finish().context("finishing workbook")?;
    Ok(())
}

fn sheet_xml(rows: &[Vec<CellValue>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            let reference = format!("{}{}", column_letters(c), r + 1);
            let cell = match value {
                CellValue::Null => continue,
                CellValue::String(s) | CellValue::Date(s) => format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    escape(s.as_str())
                ),
                CellValue::Integer(i) => format!(r#"<c r="{reference}"><v>{i}</v></c>"#),
                CellValue::Float(f) => format!(r#"<c r="{reference}"><v>{f}</v></c>"#),
                CellValue::Bool(b) => {
                    format!(r#"<c r="{reference}" t="b"><v>{}</v></c>"#, u8::from(*b))
                }
            };
            xml.push_str(&cell);
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    #[test]
    fn column_references() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("Z9"), Some(25));
        assert_eq!(column_index("AB12"), Some(27));
        assert_eq!(column_index("12"), None);
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn shared_strings_join_runs_and_skip_phonetics() {
        let xml = r#"<sst><si><t>ராமு</t></si><si><r><t>Mur</t></r><r><t>ugesan</t></r><rPh><t>x</t></rPh></si><si/><si><t>a &amp; b</t></si></sst>"#;
        let strings = parse_shared_strings(xml).unwrap();
        assert_eq!(strings, vec!["ராமு", "Murugesan", "", "a & b"]);
    }

    #[test]
    fn sheet_cells_by_type_and_position() {
        let shared = vec!["FM_NAME_V2".to_string(), "ராமு".to_string()];
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="inlineStr"><is><t>AGE</t></is></c></row>
            <row r="2"><c r="A2" t="s"><v>1</v></c><c r="B2" t="str"><f>A2</f><v>calc</v></c><c r="C2"><v>42</v></c><c r="D2" t="b"><v>1</v></c><c r="E2" t="e"><v>#N/A</v></c><c r="F2" s="3"/></row>
            <row r="3"><c r="A3" s="1"/></row>
            <row r="4"><c t="inlineStr"><is><t>x</t></is></c><c><v>2.5</v></c></row>
        </sheetData></worksheet>"#;
        let rows = parse_sheet(xml, &shared).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![s("FM_NAME_V2"), CellValue::Null, s("AGE")]);
        assert_eq!(
            rows[1],
            vec![
                s("ராமு"),
                s("calc"),
                CellValue::Integer(42),
                CellValue::Bool(true),
                CellValue::Null,
            ]
        );
        assert_eq!(rows[2], vec![s("x"), CellValue::Float(2.5)]);
    }

    #[test]
    fn shared_index_out_of_range_is_an_error() {
        let xml = r#"<worksheet><sheetData><row><c t="s"><v>5</v></c></row></sheetData></worksheet>"#;
        assert!(parse_sheet(xml, &[]).is_err());
    }

    #[test]
    fn first_sheet_follows_workbook_order() {
        let workbook = r#"<workbook xmlns:r="rel"><sheets><sheet name="Roll" sheetId="7" r:id="rId3"/><sheet name="Other" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
        let rels = r#"<Relationships><Relationship Id="rId1" Target="worksheets/sheet1.xml"/><Relationship Id="rId3" Target="/xl/worksheets/roll.xml"/></Relationships>"#;
        assert_eq!(first_sheet_rel_id(workbook).unwrap().as_deref(), Some("rId3"));
        assert_eq!(
            relationship_target(rels, "rId3").unwrap().as_deref(),
            Some("/xl/worksheets/roll.xml")
        );
        assert_eq!(relationship_target(rels, "rId9").unwrap(), None);
    }

    #[test]
    fn written_workbook_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roll.xlsx");
        let rows = vec![
            vec![s("SL"), s("FM_NAME_V2"), s("RLN_FM_NM_V2")],
            vec![CellValue::Integer(1), s("ராமு <R&M>"), s("முருகேசன்")],
            vec![CellValue::Integer(2), CellValue::Null, s(" கந்தசாமி ")],
        ];
        write_sheet(&path, &rows).unwrap();

        let table = read_first_sheet(&path).unwrap();
        assert_eq!(table.columns, vec!["SL", "FM_NAME_V2", "RLN_FM_NM_V2"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], s("ராமு <R&M>"));
        assert_eq!(table.rows[1][1], CellValue::Null);
        assert_eq!(table.rows[1][2], s(" கந்தசாமி "));
    }

    #[test]
    fn non_zip_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roll.xlsx");
        std::fs::write(&path, "FM_NAME_V2,RLN_FM_NM_V2\n").unwrap();
        let err = read_first_sheet(&path).unwrap_err();
        assert!(format!("{err:#}").contains("not a zip archive"));
    }
}
