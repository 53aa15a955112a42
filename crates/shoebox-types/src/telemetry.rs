use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::geo::GeoFix;

/// Camera exposure parameters logged with every telemetry frame. The values
/// are carried verbatim; nothing downstream interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureSettings {
    pub iso: u32,
    /// Shutter ratio as logged, e.g. `1/640.0`.
    pub shutter: String,
    pub fnum: u32,
    pub ev: u32,
    pub color_temp: u32,
    pub color_mode: String,
    pub focal_len: u32,
}

/// One decoded entry from a flight telemetry log. A record only exists when
/// every field matched the log grammar; there are no partial records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub frame_index: u32,
    /// Frame interval within the recording, milliseconds from stream start.
    pub frame_start_ms: i64,
    pub frame_end_ms: i64,
    pub frame_count: u32,
    /// Inter-frame delay in milliseconds.
    pub diff_time_ms: u32,
    /// Wall-clock timestamp of the frame, sub-second precision.
    pub timestamp: NaiveDateTime,
    pub exposure: ExposureSettings,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl TelemetryRecord {
    /// The coordinate pair of this frame, for reverse geocoding.
    pub fn fix(&self) -> GeoFix {
        GeoFix::new(self.latitude, self.longitude)
    }
}
