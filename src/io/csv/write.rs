//! CSV writing operations.

use std::{fs::File, io::{BufWriter, Write}, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::CsvWriter};

use super::UTF8_BOM;

/// Write a DataFrame to a CSV file as UTF-8 with a leading BOM, so non-Latin
/// region names survive a round trip through spreadsheet tools.
pub(crate) fn write_csv_with_bom(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::csv::write] Failed to create CSV file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(UTF8_BOM)?;
    CsvWriter::new(&mut writer)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("[io::csv::write] Failed to write CSV to {:?}", path))?;
    writer.flush()
        .with_context(|| format!("[io::csv::write] Failed to flush {:?}", path))
}
