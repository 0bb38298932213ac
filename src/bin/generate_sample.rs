use std::path::PathBuf;

use anyhow::Result;
use voter_search::data::xlsx::write_sheet;
use voter_search::{CellValue, ColumnNames};

const GIVEN_NAMES: &[&str] = &[
    "ராமு", "முருகன்", "கந்தசாமி", "வள்ளி", "லட்சுமி", "செல்வி", "பழனிசாமி", "சுப்பிரமணியம்",
    "மாரியம்மாள்", "கருப்பசாமி", "ராஜேஸ்வரி", "வேலுசாமி", "சரஸ்வதி", "ஆறுமுகம்", "பொன்னம்மாள்",
];

const RELATION_NAMES: &[&str] = &[
    "முருகேசன்", "ராமசாமி", "கந்தசாமி", "நடராஜன்", "பெரியசாமி", "சின்னசாமி", "ரங்கசாமி",
    "கோவிந்தசாமி", "மாணிக்கம்", "துரைசாமி",
];

const PART_NAMES: &[&str] = &[
    "ஊராட்சி ஒன்றிய தொடக்கப்பள்ளி, ஆனைமலை சாலை, பொள்ளாச்சி - கிழக்குப் பகுதி வார்டு 1",
    "அரசு மேல்நிலைப்பள்ளி, கோட்டூர் சாலை, பொள்ளாச்சி - வடக்குப் பகுதி வார்டு 4",
    "நகராட்சி நடுநிலைப்பள்ளி, மகாலிங்கபுரம், பொள்ளாச்சி - மேற்குப் பகுதி வார்டு 9",
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_roll.xlsx"));
    let rows_wanted: usize = match std::env::args().nth(2) {
        Some(n) => n.parse()?,
        None => 500,
    };

    let columns = ColumnNames::default();
    let header = [
        "SL_NO",
        columns.name.as_str(),
        "RLN_TYPE",
        columns.relation_name.as_str(),
        "AGE",
        "GENDER",
        columns.part_name.as_str(),
    ];

    let mut rng = SimpleRng::new(42);
    let mut rows: Vec<Vec<CellValue>> = Vec::with_capacity(rows_wanted + 1);
    rows.push(
        header
            .iter()
            .map(|h| CellValue::String(h.to_string()))
            .collect(),
    );

    for sl in 1..=rows_wanted {
        let female = rng.below(2) == 0;
        let relation_type = if female && rng.below(3) == 0 { "H" } else { "F" };
        // Leave a few part names blank; the roll has gaps there too.
        let part = if rng.below(20) == 0 {
            CellValue::Null
        } else {
            CellValue::String(rng.pick(PART_NAMES).to_string())
        };
        rows.push(vec![
            CellValue::Integer(sl as i64),
            CellValue::String(format!(" {} ", rng.pick(GIVEN_NAMES))),
            CellValue::String(relation_type.to_string()),
            CellValue::String(rng.pick(RELATION_NAMES).to_string()),
            CellValue::Integer(18 + rng.below(70) as i64),
            CellValue::String(if female { "F" } else { "M" }.to_string()),
            part,
        ]);
    }

    write_sheet(&output_path, &rows)?;
    log::info!("Wrote {rows_wanted} voters to {}", output_path.display());
    println!("Wrote {rows_wanted} voters to {}", output_path.display());
    Ok(())
}
