//! Gallery export
//!
//! Single charts download as their PNG bytes; the whole gallery downloads as
//! a DEFLATE ZIP archive with ordinal-prefixed entry names.

use crate::error::{LabError, LabResult};
use crate::gallery::GalleryEntry;
use chrono::{DateTime, Datelike, Local, Timelike};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const PNG_MIME: &str = "image/png";
pub const ZIP_MIME: &str = "application/zip";

/// A file ready to hand to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub filename: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Keep ASCII letters, digits, `-`, `_` and `.`; replace everything else with `_`
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "plot".to_string()
    } else {
        cleaned
    }
}

/// Name of the `ordinal`-th (1-based) image inside an archive
pub fn archive_entry_name(ordinal: usize, name: &str) -> String {
    format!("{:02}_{}.png", ordinal, sanitize_name(name))
}

/// `gallery_YYYYMMDD_HHMMSS.zip`
pub fn archive_filename(now: DateTime<Local>) -> String {
    format!("gallery_{}.zip", now.format("%Y%m%d_%H%M%S"))
}

/// One saved chart as a PNG download; bytes are passed through unchanged
pub fn export_single(entry: &GalleryEntry) -> ExportedFile {
    ExportedFile {
        filename: format!("{}.png", sanitize_name(&entry.name)),
        mime: PNG_MIME,
        bytes: entry.artifact.png().to_vec(),
    }
}

/// Every entry, in order, as one ZIP archive. An empty slice gives an empty archive.
pub fn export_archive(entries: &[GalleryEntry], now: DateTime<Local>) -> LabResult<ExportedFile> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (index, entry) in entries.iter().enumerate() {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip_timestamp(entry.created_at));
        let name = archive_entry_name(index + 1, &entry.name);
        zip.start_file(name.as_str(), options)?;
        zip.write_all(entry.artifact.png())
            .map_err(|err| LabError::Export(format!("failed to write {}: {}", name, err)))?;
    }

    let bytes = zip.finish()?.into_inner();
    tracing::info!(entries = entries.len(), bytes = bytes.len(), "built gallery archive");

    Ok(ExportedFile {
        filename: archive_filename(now),
        mime: ZIP_MIME,
        bytes,
    })
}

/// ZIP stores local wall-clock time; dates outside 1980..2107 fall back to the format's epoch
fn zip_timestamp(at: DateTime<Local>) -> zip::DateTime {
    u16::try_from(at.year())
        .ok()
        .and_then(|year| {
            zip::DateTime::from_date_and_time(
                year,
                at.month() as u8,
                at.day() as u8,
                at.hour() as u8,
                at.minute() as u8,
                at.second().min(59) as u8,
            )
            .ok()
        })
        .unwrap_or_default()
}
