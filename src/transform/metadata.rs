//! Capture-date extraction from EXIF metadata.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDateTime;
use exif::{In, Tag, Value};

use crate::error::TransformError;

/// EXIF ASCII date layout.
const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Tags consulted for the capture date, in order of preference.
const DATE_TAGS: [Tag; 2] = [Tag::DateTimeOriginal, Tag::DateTime];

/// Read the capture date of an image.
///
/// # Errors
///
/// Returns `Open` if the file cannot be read, `MissingDate` if there is no
/// EXIF block or no date tag, and `InvalidDate` if the tag is malformed.
pub fn capture_date(path: &Path) -> Result<NaiveDateTime, TransformError> {
    let file = File::open(path).map_err(|e| TransformError::Open {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let exif = match exif::Reader::new().read_from_container(&mut BufReader::new(file)) {
        Ok(exif) => exif,
        Err(exif::Error::Io(e)) => {
            return Err(TransformError::Open {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No usable EXIF block");
            return Err(TransformError::MissingDate {
                path: path.display().to_string(),
            });
        }
    };

    let raw = DATE_TAGS
        .iter()
        .find_map(|tag| exif.get_field(*tag, In::PRIMARY))
        .and_then(|field| match field.value {
            Value::Ascii(ref parts) => parts.first().cloned(),
            _ => None,
        })
        .ok_or_else(|| TransformError::MissingDate {
            path: path.display().to_string(),
        })?;

    parse_exif_date(&raw).ok_or_else(|| TransformError::InvalidDate {
        path: path.display().to_string(),
        value: String::from_utf8_lossy(&raw).into_owned(),
    })
}

/// Parse a raw EXIF ASCII date (`2024:09:04 07:54:27`).
fn parse_exif_date(raw: &[u8]) -> Option<NaiveDateTime> {
    let text = std::str::from_utf8(raw).ok()?;
    NaiveDateTime::parse_from_str(text.trim_end_matches('\0').trim(), EXIF_DATE_FORMAT).ok()
}

/// Overlay text for a capture date, `2024/09/04 07:54`.
#[must_use]
pub fn overlay_label(date: &NaiveDateTime) -> String {
    date.format("%Y/%m/%d %H:%M").to_string()
}
