//! Embedded image metadata access.
//!
//! The resolver only needs two things from a photo: the raw capture
//! timestamp string and the raw GPS tags. Interpreting either (timestamp
//! parsing, DMS conversion) is the caller's business.

use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use exif::{Exif, In, Tag, Value};
use shoebox_types::{Result, ShoeboxError};
use tracing::debug;

/// Raw GPS geotag as stored in image metadata: degrees/minutes/seconds per
/// axis plus the hemisphere reference letter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsTags {
    pub latitude: (f64, f64, f64),
    pub latitude_ref: char,
    pub longitude: (f64, f64, f64),
    pub longitude_ref: char,
}

pub trait CaptureMetadata: Send + Sync {
    /// Raw embedded capture timestamp (`YYYY:MM:DD HH:MM:SS`), if any.
    fn capture_timestamp(&self, path: &Path) -> Result<Option<String>>;

    /// Raw GPS tags when both axes and their references are present.
    fn gps_tags(&self, path: &Path) -> Result<Option<GpsTags>>;
}

/// Reads metadata straight out of the image file.
#[derive(Debug, Clone, Default)]
pub struct ExifReader;

impl ExifReader {
    pub fn new() -> Self {
        Self
    }

    /// `Ok(None)` when the file carries no readable metadata container; an
    /// I/O failure is an error.
    fn read(&self, path: &Path) -> Result<Option<Exif>> {
        let file = File::open(path).map_err(|err| {
            metadata_error(format!("unable to open {}: {err}", path.display()))
        })?;
        let mut reader = BufReader::new(&file);
        match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Ok(Some(exif)),
            Err(err) => {
                debug!(path = %path.display(), %err, "no metadata container");
                Ok(None)
            }
        }
    }
}

impl CaptureMetadata for ExifReader {
    fn capture_timestamp(&self, path: &Path) -> Result<Option<String>> {
        let Some(exif) = self.read(path)? else {
            return Ok(None);
        };
        for tag in [Tag::DateTimeOriginal, Tag::DateTime] {
            if let Some(value) = ascii_value(&exif, tag) {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn gps_tags(&self, path: &Path) -> Result<Option<GpsTags>> {
        let Some(exif) = self.read(path)? else {
            return Ok(None);
        };
        let latitude = rational_triplet(&exif, Tag::GPSLatitude);
        let latitude_ref = reference_char(&exif, Tag::GPSLatitudeRef);
        let longitude = rational_triplet(&exif, Tag::GPSLongitude);
        let longitude_ref = reference_char(&exif, Tag::GPSLongitudeRef);

        match (latitude, latitude_ref, longitude, longitude_ref) {
            (Some(latitude), Some(latitude_ref), Some(longitude), Some(longitude_ref)) => {
                Ok(Some(GpsTags {
                    latitude,
                    latitude_ref,
                    longitude,
                    longitude_ref,
                }))
            }
            _ => Ok(None),
        }
    }
}

fn ascii_value(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    if let Value::Ascii(ref blocks) = field.value {
        let raw = blocks.first()?;
        let text = std::str::from_utf8(raw).ok()?;
        if !text.is_empty() {
            return Some(text.to_owned());
        }
    }
    None
}

fn rational_triplet(exif: &Exif, tag: Tag) -> Option<(f64, f64, f64)> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    if let Value::Rational(ref parts) = field.value {
        if parts.len() == 3 {
            return Some((parts[0].to_f64(), parts[1].to_f64(), parts[2].to_f64()));
        }
    }
    None
}

fn reference_char(exif: &Exif, tag: Tag) -> Option<char> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    field.display_value().to_string().chars().next()
}

/// In-memory metadata source keyed by path. Serves tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    entries: HashMap<PathBuf, StaticEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct StaticEntry {
    pub timestamp: Option<String>,
    pub gps: Option<GpsTags>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, path: impl Into<PathBuf>, entry: StaticEntry) -> Self {
        self.entries.insert(path.into(), entry);
        self
    }
}

impl CaptureMetadata for StaticMetadata {
    fn capture_timestamp(&self, path: &Path) -> Result<Option<String>> {
        Ok(self
            .entries
            .get(path)
            .and_then(|entry| entry.timestamp.clone()))
    }

    fn gps_tags(&self, path: &Path) -> Result<Option<GpsTags>> {
        Ok(self.entries.get(path).and_then(|entry| entry.gps))
    }
}

pub fn metadata_error(message: impl Into<String>) -> ShoeboxError {
    ShoeboxError::Metadata(message.into())
}
