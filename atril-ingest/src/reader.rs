//! CSV sheet reader.
//!
//! The first record is the header row and defines the keys of every data row.
//! Rows follow the usual sheet-to-json conventions: blank cells are left out,
//! blank rows are skipped, empty headers become `__EMPTY`, `__EMPTY_1`, ...
//! and repeated headers get `_1`, `_2` suffixes.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, trace};

use crate::types::SheetRow;

const BOM: char = '\u{feff}';
const CANDIDATE_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Read the first sheet of a CSV export.
pub fn read_sheet(path: impl AsRef<Path>) -> Result<Vec<SheetRow>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_sheet_from(file).with_context(|| format!("reading sheet {}", path.display()))
}

/// Read sheet rows from any reader (UTF-8, optional BOM).
pub fn read_sheet_from(mut reader: impl Read) -> Result<Vec<SheetRow>> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .context("sheet is not valid UTF-8 text")?;
    let text = text.strip_prefix(BOM).unwrap_or(&text);

    let delimiter = sniff_delimiter(text);
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(false)
        .from_reader(text.as_bytes());

    let mut records = rdr.records();
    let Some(header) = records.next() else {
        debug!("sheet has no header row");
        return Ok(Vec::new());
    };
    let header = header.context("parsing header row")?;
    let mut keys = HeaderKeys::default();
    for cell in header.iter() {
        keys.push(cell);
    }
    let columns = keys.len();

    let mut rows = Vec::new();
    for result in records {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                let line = err.position().map(|p| p.line()).unwrap_or_default();
                return Err(err).with_context(|| format!("parsing row at line {line}"));
            }
        };
        let line = record.position().map(|p| record_line(text, p)).unwrap_or_default();
        let mut row = SheetRow::new().with_line(line);
        for (i, value) in record.iter().enumerate() {
            // Cells past the last header get generated `__EMPTY` keys.
            while keys.len() <= i {
                keys.push("");
            }
            row.push(keys.get(i), value);
        }
        if row.is_empty() {
            trace!(line, "skipping blank row");
        } else {
            rows.push(row);
        }
    }

    debug!(
        delimiter = %(delimiter as char).escape_default(),
        columns,
        rows = rows.len(),
        "read sheet"
    );
    Ok(rows)
}

/// Pick the candidate delimiter that occurs most often in the header line.
fn sniff_delimiter(text: &str) -> u8 {
    let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .max_by_key(|d| {
            let count = first_line.bytes().filter(|b| b == d).count();
            // Ties keep the earlier candidate (comma first).
            (count, std::cmp::Reverse(CANDIDATE_DELIMITERS.iter().position(|c| c == d)))
        })
        .unwrap_or(b',')
}

/// 1-based line a record starts on.
///
/// The reader stamps a record with its position before skipping empty lines,
/// so any line terminators at that offset are counted here.
fn record_line(text: &str, pos: &csv::Position) -> u64 {
    let start = usize::try_from(pos.byte()).unwrap_or(usize::MAX);
    let skipped = text
        .as_bytes()
        .get(start..)
        .unwrap_or_default()
        .iter()
        .take_while(|b| matches!(b, b'\n' | b'\r'))
        .filter(|b| **b == b'\n')
        .count();
    pos.line() + skipped as u64
}

/// Unique row keys built from raw header cells.
#[derive(Default)]
struct HeaderKeys {
    seen: HashSet<String>,
    keys: Vec<String>,
}

impl HeaderKeys {
    fn push(&mut self, cell: &str) {
        let base = if cell.trim().is_empty() { "__EMPTY" } else { cell };
        let mut key = base.to_string();
        let mut n = 1;
        while self.seen.contains(&key) {
            key = format!("{base}_{n}");
            n += 1;
        }
        self.seen.insert(key.clone());
        self.keys.push(key);
    }

    fn get(&self, i: usize) -> &str {
        self.keys.get(i).map(String::as_str).unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}
