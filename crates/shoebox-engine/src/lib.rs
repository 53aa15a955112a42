//! Label resolution engine.
//!
//! Decides, one file at a time, which `<label> <day>` folder a media file
//! belongs in. Label sources are consulted in a fixed precedence order:
//! operator answer (explicit mode), sibling flight-log telemetry, embedded
//! GPS tags, the day cache, and finally the operator again. The first source
//! producing a label wins.

pub mod dispatch;
pub mod prompt;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use shoebox_exif::CaptureMetadata;
use shoebox_geo::{dms_to_decimal, place_label, Geocoder};
use shoebox_telemetry::SrtParser;
use shoebox_types::{
    config::ResolverConfig,
    geo::GeoFix,
    label::{LabelCache, MediaKind, Resolution},
    Result, ShoeboxError,
};
use tracing::{debug, warn};

use crate::prompt::LabelPrompt;

/// Embedded capture timestamps come out of image metadata in this shape.
const CAPTURE_TIMESTAMP_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Extensions a companion flight log may carry.
const TELEMETRY_EXTENSIONS: [&str; 2] = ["SRT", "srt"];

pub struct LabelResolver<M, G, P>
where
    M: CaptureMetadata,
    G: Geocoder,
    P: LabelPrompt,
{
    metadata: M,
    geocoder: G,
    prompt: P,
    parser: SrtParser,
    cache: LabelCache,
    config: ResolverConfig,
}

impl<M, G, P> LabelResolver<M, G, P>
where
    M: CaptureMetadata,
    G: Geocoder,
    P: LabelPrompt,
{
    pub fn new(config: ResolverConfig, metadata: M, geocoder: G, prompt: P) -> Self {
        Self {
            metadata,
            geocoder,
            prompt,
            parser: SrtParser::new(),
            cache: LabelCache::new(),
            config,
        }
    }

    pub fn cache(&self) -> &LabelCache {
        &self.cache
    }

    /// Fully resolves one file: classification, day bucket, label.
    pub async fn resolve(&mut self, path: &Path) -> Result<Resolution> {
        let kind = self.classify(path);
        let day = self.day_key(path, kind)?;
        let label = self.resolve_label(path, kind, day).await?;
        // First writer wins; a later divergent label names its own folder
        // without touching the day's cached entry.
        self.cache.record(day, &label);
        debug!(path = %path.display(), %day, label, "resolved");
        Ok(Resolution::new(day, label))
    }

    fn classify(&self, path: &Path) -> MediaKind {
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.config.is_image_extension(ext))
            .unwrap_or(false);
        if is_image {
            MediaKind::Image
        } else {
            MediaKind::Other
        }
    }

    /// Images are dated by their embedded capture timestamp; everything else
    /// by the filesystem creation date (modification date where the platform
    /// cannot report creation).
    fn day_key(&self, path: &Path, kind: MediaKind) -> Result<NaiveDate> {
        match kind {
            MediaKind::Image => {
                let raw = self.metadata.capture_timestamp(path)?.ok_or_else(|| {
                    resolve_error(format!("{} has no capture timestamp", path.display()))
                })?;
                let parsed = NaiveDateTime::parse_from_str(&raw, CAPTURE_TIMESTAMP_FORMAT)
                    .map_err(|err| {
                        resolve_error(format!(
                            "{} has a bad capture timestamp {raw:?}: {err}",
                            path.display()
                        ))
                    })?;
                Ok(parsed.date())
            }
            MediaKind::Other => {
                let metadata = std::fs::metadata(path).map_err(|err| {
                    resolve_error(format!("unable to stat {}: {err}", path.display()))
                })?;
                let stamp = metadata.created().or_else(|_| metadata.modified()).map_err(
                    |err| {
                        resolve_error(format!(
                            "{} has no usable filesystem timestamp: {err}",
                            path.display()
                        ))
                    },
                )?;
                Ok(DateTime::<Local>::from(stamp).date_naive())
            }
        }
    }

    async fn resolve_label(
        &self,
        path: &Path,
        kind: MediaKind,
        day: NaiveDate,
    ) -> Result<String> {
        // Explicit mode: the operator names each new day and that answer is
        // authoritative; no geocoding branch runs. Days already named fall
        // through to the cache.
        if self.config.explicit_labels {
            if !self.cache.contains(day) {
                return self.prompt.request_label(day).await;
            }
        } else {
            if kind == MediaKind::Other && self.config.telemetry_assist {
                if let Some(label) = self.telemetry_label(path).await? {
                    return Ok(label);
                }
            }
            if kind == MediaKind::Image {
                if let Some(label) = self.geotag_label(path).await? {
                    return Ok(label);
                }
            }
        }

        if let Some(label) = self.cache.get(day) {
            return Ok(label.to_owned());
        }
        self.prompt.request_label(day).await
    }

    /// First fix of the sibling flight log, reverse geocoded.
    async fn telemetry_label(&self, path: &Path) -> Result<Option<String>> {
        let Some(log_path) = sibling_log(path) else {
            return Ok(None);
        };
        let text = std::fs::read_to_string(&log_path).map_err(|err| {
            resolve_error(format!("unable to read {}: {err}", log_path.display()))
        })?;
        let Some(record) = self.parser.records(&text).next().transpose()? else {
            return Ok(None);
        };
        self.lookup_label(record.fix()).await
    }

    /// Embedded GPS tags, converted from DMS and reverse geocoded.
    async fn geotag_label(&self, path: &Path) -> Result<Option<String>> {
        let Some(tags) = self.metadata.gps_tags(path)? else {
            return Ok(None);
        };
        let fix = GeoFix::new(
            dms_to_decimal(tags.latitude, tags.latitude_ref),
            dms_to_decimal(tags.longitude, tags.longitude_ref),
        );
        self.lookup_label(fix).await
    }

    /// Shared geocode step. A failed or empty lookup is "no label found",
    /// never an error; the precedence chain continues.
    async fn lookup_label(&self, fix: GeoFix) -> Result<Option<String>> {
        let address = match self.geocoder.reverse(fix).await {
            Ok(address) => address,
            Err(err) => {
                warn!(%fix, %err, "reverse geocoding failed");
                return Ok(None);
            }
        };
        let label = place_label(address.as_ref());
        if label.is_empty() {
            Ok(None)
        } else {
            Ok(Some(label))
        }
    }
}

/// Companion flight log of a media file: same base name, log extension.
fn sibling_log(path: &Path) -> Option<PathBuf> {
    TELEMETRY_EXTENSIONS
        .iter()
        .map(|ext| path.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

pub fn resolve_error(message: impl Into<String>) -> ShoeboxError {
    ShoeboxError::Resolve(message.into())
}
