use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::CanonicalRecord;
use crate::util::ensure_directory;

const CSV_HEADER: &str = "product_name,manufacturer,pages";

pub(super) fn write_products_csv(path: &Path, records: &[CanonicalRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let file = File::create(path)
        .with_context(|| format!("failed to create csv file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(render_products_csv(records).as_bytes())
        .with_context(|| format!("failed to write csv file: {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to finalize csv file: {}", path.display()))?;

    Ok(())
}

fn render_products_csv(records: &[CanonicalRecord]) -> String {
    let mut out = String::with_capacity(64 * (records.len() + 1));
    out.push_str(CSV_HEADER);
    out.push_str("\r\n");

    for record in records {
        let row = [
            escape_csv_cell(&record.product_name),
            escape_csv_cell(&record.manufacturer),
            escape_csv_cell(&pages_json(&record.pages)),
        ];
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }

    out
}

// `[2, 5, 9]`
fn pages_json(pages: &[u32]) -> String {
    let joined = pages
        .iter()
        .map(u32::to_string)
        .collect::<Vec<String>>()
        .join(", ");
    format!("[{joined}]")
}

fn escape_csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, manufacturer: &str, pages: &[u32]) -> CanonicalRecord {
        CanonicalRecord {
            identity_key: String::new(),
            product_name: name.to_string(),
            manufacturer: manufacturer.to_string(),
            pages: pages.to_vec(),
        }
    }

    #[test]
    fn renders_header_and_quoted_page_arrays() {
        let csv = render_products_csv(&[
            record("EGC5 - AL - 1/2\" Eggcrate Grid", "Krueger", &[2, 5, 9]),
            record("5HCF23", "Krueger", &[16]),
        ]);
        let lines = csv.split("\r\n").collect::<Vec<&str>>();
        assert_eq!(lines[0], "product_name,manufacturer,pages");
        assert_eq!(
            lines[1],
            "\"EGC5 - AL - 1/2\"\" Eggcrate Grid\",Krueger,\"[2, 5, 9]\""
        );
        assert_eq!(lines[2], "5HCF23,Krueger,[16]");
        assert_eq!(lines[3], "");
    }

    #[test]
    fn empty_record_set_still_has_header() {
        assert_eq!(render_products_csv(&[]), "product_name,manufacturer,pages\r\n");
    }

    #[test]
    fn quotes_commas_in_names() {
        assert_eq!(
            escape_csv_cell("Hard Ceiling Frame, Aluminum"),
            "\"Hard Ceiling Frame, Aluminum\""
        );
        assert_eq!(escape_csv_cell("plain"), "plain");
    }

    #[test]
    fn write_creates_parent_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("doc_products.csv");

        write_products_csv(&path, &[record("X", "Y", &[1])]).expect("write should succeed");

        let written = std::fs::read_to_string(&path).expect("read back");
        assert!(written.starts_with("product_name,manufacturer,pages\r\n"));
        assert!(written.contains("X,Y,[1]"));
    }
}
