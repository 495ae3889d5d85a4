//! Packaging of aggregation results.
//!
//! Each operator's encoded surface becomes one entry of an uncompressed ZIP
//! archive; the archive as a whole is the aggregate response body. Entry
//! names are the lower-case operator names.

use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::SurfaceQueryError;

/// Build an uncompressed ZIP archive with one named entry per payload.
pub fn build_archive(entries: &[(String, Bytes)]) -> Result<Vec<u8>, SurfaceQueryError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, payload) in entries {
        writer.start_file(name, options)?;
        writer.write_all(payload)?;
    }
    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
