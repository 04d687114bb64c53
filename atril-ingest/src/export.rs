//! Inventory export as CSV: `id`, the canonical columns, then every overflow
//! column seen in any record.

use std::collections::BTreeSet;
use std::io::Write;

use anyhow::{Context, Result};
use atril_core::{Field, InventoryRecord};

/// Write the inventory verbatim. Missing cells are written empty.
pub fn write_inventory_csv<W: Write>(records: &[InventoryRecord], out: W) -> Result<()> {
    let extra: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.metadata.keys().map(String::as_str))
        .collect();

    let mut wtr = csv::Writer::from_writer(out);
    let header = std::iter::once("id")
        .chain(Field::ALL.iter().map(|f| f.name()))
        .chain(extra.iter().copied());
    wtr.write_record(header).context("writing header")?;

    for record in records {
        let cells = std::iter::once(record.id.as_str())
            .chain(Field::ALL.iter().map(|f| record.get(*f).unwrap_or_default()))
            .chain(
                extra
                    .iter()
                    .map(|k| record.metadata.get(*k).map(String::as_str).unwrap_or_default()),
            );
        wtr.write_record(cells)
            .with_context(|| format!("writing record {}", record.id))?;
    }
    wtr.flush().context("flushing export")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_has_canonical_then_overflow_columns() {
        let mut a = InventoryRecord::new("1").with(Field::Instrumento, "Violín");
        a.metadata.insert("Color".into(), "Café".into());
        let mut b = InventoryRecord::new("2").with(Field::Marca, "Yamaha");
        b.metadata.insert("Año".into(), "2019".into());

        let mut buf = Vec::new();
        write_inventory_csv(&[a, b], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(header.len(), 1 + Field::ALL.len() + 2);
        assert_eq!(header[0], "id");
        assert_eq!(header[1], "Instrumento");
        assert_eq!(&header[header.len() - 2..], &["Año", "Color"]);

        let first: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(first[1], "Violín");
        assert_eq!(first[first.len() - 1], "Café");
        assert_eq!(first[first.len() - 2], "");
    }
}
