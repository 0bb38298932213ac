// benches/search.rs
use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use voter_search::data::matcher::{exact_indices, substring_indices};
use voter_search::{CellValue, ColumnNames, Dataset, MatchMode, RawTable};

const GIVEN: &[&str] = &["ராமு", "முருகன்", "வள்ளி", "லட்சுமி", "Ramu", "Selvi", "கந்தசாமி"];
const RELATION: &[&str] = &["முருகேசன்", "ராமசாமி", "நடராஜன்", "Murugesan", "Palanisamy"];

/// A constituency-sized roll: tens of thousands of rows.
fn synthetic_roll(rows: usize, mode: MatchMode) -> Dataset {
    let header = ["SL_NO", "FM_NAME_V2", "RLN_FM_NM_V2", "AGE"]
        .map(|h| CellValue::String(h.to_string()));
    let mut table = RawTable::with_header(&header);
    for i in 0..rows {
        table.push_row(vec![
            CellValue::Integer(i as i64),
            CellValue::String(format!("{} {}", GIVEN[i % GIVEN.len()], i % 97)),
            CellValue::String(RELATION[(i / 7) % RELATION.len()].to_string()),
            CellValue::Integer(18 + (i % 70) as i64),
        ]);
    }
    Dataset::from_table(
        table,
        &ColumnNames::default(),
        mode.normalization(),
        PathBuf::from("bench.xlsx"),
    )
    .expect("synthetic roll has the search columns")
}

fn bench_search(c: &mut Criterion) {
    let substring_roll = synthetic_roll(50_000, MatchMode::Substring);
    let exact_roll = synthetic_roll(50_000, MatchMode::Exact);

    c.bench_function("substring_name", |b| {
        b.iter(|| {
            let hits = substring_indices(black_box(&substring_roll), black_box("ராமு"), "");
            black_box(hits.map(|h| h.len()))
        })
    });

    c.bench_function("substring_both", |b| {
        b.iter(|| {
            let hits = substring_indices(black_box(&substring_roll), black_box("ramu"), "muru");
            black_box(hits.map(|h| h.len()))
        })
    });

    c.bench_function("exact_both", |b| {
        b.iter(|| {
            let hits = exact_indices(black_box(&exact_roll), black_box("ramu 12"), "murugesan");
            black_box(hits.map(|h| h.len()))
        })
    });
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
