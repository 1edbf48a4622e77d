//! CSV format reading and writing operations.

mod read;
mod write;

pub(crate) use read::*;
pub(crate) use write::*;

/// Byte-order mark written ahead of panel files so spreadsheet tools detect UTF-8.
pub(crate) const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
