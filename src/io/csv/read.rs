//! CSV reading operations.

use std::{fs, io::Cursor, path::Path, sync::Arc};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerReader, prelude::{CsvReadOptions, CsvReader, DataType, Field, Schema}};

use super::UTF8_BOM;

/// Reads a CSV file that may start with a UTF-8 BOM, forcing `text_columns` to be strings.
pub(crate) fn read_csv_with_text_columns(path: &Path, text_columns: &[&str]) -> Result<DataFrame> {
    let bytes = fs::read(path)
        .with_context(|| format!("[io::csv::read] Failed to open CSV file: {}", path.display()))?;
    read_csv_bytes(&bytes, text_columns)
        .with_context(|| format!("[io::csv::read] Failed to read CSV from {:?}", path))
}

/// Read DataFrame from CSV bytes, skipping a leading BOM.
/// Column types are inferred from every row, not a prefix.
pub(crate) fn read_csv_bytes(bytes: &[u8], text_columns: &[&str]) -> Result<DataFrame> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    // Force text columns to be read as strings (period labels like 2005 must not become integers)
    let schema = Arc::new(Schema::from_iter(
        text_columns.iter().map(|name| Field::new((*name).into(), DataType::String))
    ));
    let options = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_schema_overwrite(Some(schema));

    CsvReader::new(Cursor::new(bytes))
        .with_options(options)
        .finish()
        .context("[io::csv::read] Failed to read CSV from bytes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bom_is_skipped_and_text_columns_kept() {
        let bytes = b"\xEF\xBB\xBFname,year,UV_Value\nBeijing,2005,0.25\n";
        let df = read_csv_bytes(bytes, &["year"]).unwrap();

        assert_eq!(df.get_column_names_str(), ["name", "year", "UV_Value"]);
        assert_eq!(df.column("year").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("UV_Value").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn late_fractional_values_widen_the_column() {
        let mut text = String::from("longitude,latitude,value\n");
        for i in 0..150 {
            text.push_str(&format!("{},{},1\n", 100 + i % 20, 30 + i % 10));
        }
        text.push_str("116.5,39.9,0.25\n");

        let df = read_csv_bytes(text.as_bytes(), &[]).unwrap();
        assert_eq!(df.height(), 151);
        assert_eq!(df.column("longitude").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("value").unwrap().dtype(), &DataType::Float64);
    }
}
