//! Tabular export of imported files.
//!
//! One row per file, editions in page order, primary document first.

use serde::Serialize;
use std::io::Write;

use crate::models::ImportResult;

/// A row of the file table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRow<'a> {
    pub edition: usize,
    pub identifier: &'a str,
    pub primary: bool,
    pub name: &'a str,
    pub file_type: &'a str,
    pub url: &'a str,
    pub editor: &'a str,
    pub license: &'a str,
}

/// Flatten a result into file rows. Absent values become empty strings.
pub fn file_rows(result: &ImportResult) -> Vec<FileRow<'_>> {
    result
        .editions
        .iter()
        .flat_map(|edition| {
            let meta = &edition.metadata;
            edition.all_files().map(move |file| FileRow {
                edition: edition.index.get(),
                identifier: meta.identifier.as_deref().unwrap_or(""),
                primary: std::ptr::eq(file, &edition.primary),
                name: &file.name,
                file_type: file.file_type.as_str(),
                url: file.url.as_deref().unwrap_or(""),
                editor: meta.editor.as_deref().unwrap_or(""),
                license: meta.license.as_deref().unwrap_or(""),
            })
        })
        .collect()
}

/// Write the file table as CSV with a header row.
pub fn write_files_csv<W: Write>(result: &ImportResult, writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in file_rows(result) {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}
