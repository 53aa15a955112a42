//! Flight telemetry log parsing.
//!
//! Recording hardware drops a subtitle-like side-car file next to each video.
//! Every valid block carries the frame interval, a wall-clock timestamp,
//! camera exposure settings, and a GPS fix. Blocks that do not match the
//! grammar are skipped without comment; only a malformed number inside an
//! otherwise matching block is an error.

use std::{fs, path::Path};

use chrono::NaiveDateTime;
use regex::{CaptureMatches, Captures, Regex};
use shoebox_types::{
    telemetry::{ExposureSettings, TelemetryRecord},
    Result, ShoeboxError,
};

/// Record grammar. Anchored on the exact literal tokens the hardware emits;
/// any deviation disqualifies the whole block rather than degrading to a
/// partial record.
const RECORD_PATTERN: &str = concat!(
    r"(?P<index>[0-9]+)\r?\n",
    r"(?P<frame_start>[0-9]{2}:[0-9]{2}:[0-9]{2},[0-9]{3})",
    r" --> ",
    r"(?P<frame_end>[0-9]{2}:[0-9]{2}:[0-9]{2},[0-9]{3})\r?\n",
    r#"<font size="[0-9]+">FrameCnt: (?P<frame_count>[0-9]+), DiffTime: (?P<frame_time>[0-9]+)ms\r?\n"#,
    r"(?P<timestamp>[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}\.[0-9]+)\r?\n",
    r"\[iso : (?P<iso>[0-9]+)\] ",
    r"\[shutter : (?P<shutter>[0-9]+/[0-9]+\.[0-9]+)\] ",
    r"\[fnum : (?P<fnum>[0-9]+)\] ",
    r"\[ev : (?P<ev>[0-9]+)\] ",
    r"\[ct : (?P<ct>[0-9]+)\] ",
    r"\[color_md : (?P<color_md>[a-zA-Z]+)\] ",
    r"\[focal_len : (?P<focal_len>[0-9]+)\] ",
    r"\[latitude: (?P<latitude>-?[0-9]+\.[0-9]+)\] ",
    r"\[longitude: (?P<longitude>-?[0-9]+\.[0-9]+)\] ",
    r"\[altitude: (?P<altitude>-?[0-9]+\.[0-9]+)\] </font>",
);

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parser for flight telemetry logs. Compiles the record grammar once and
/// can be reused across files.
pub struct SrtParser {
    pattern: Regex,
}

impl SrtParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(RECORD_PATTERN).expect("record grammar compiles"),
        }
    }

    /// Lazily scans `text` for telemetry records, in file order. The
    /// iterator yields `Err` only when a matched block contains a value that
    /// fails numeric or timestamp conversion.
    pub fn records<'r, 't>(&'r self, text: &'t str) -> Records<'r, 't> {
        Records {
            matches: self.pattern.captures_iter(text),
        }
    }

    /// Reads a log file and collects every record in it.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<TelemetryRecord>> {
        let path_ref = path.as_ref();
        let text = fs::read_to_string(path_ref).map_err(|err| {
            telemetry_error(format!(
                "unable to read telemetry log {}: {err}",
                path_ref.display()
            ))
        })?;
        self.records(&text).collect()
    }
}

impl Default for SrtParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy, finite, non-restartable sequence of telemetry records.
pub struct Records<'r, 't> {
    matches: CaptureMatches<'r, 't>,
}

impl Iterator for Records<'_, '_> {
    type Item = Result<TelemetryRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.matches.next().map(|caps| decode_record(&caps))
    }
}

fn decode_record(caps: &Captures<'_>) -> Result<TelemetryRecord> {
    let exposure = ExposureSettings {
        iso: integer(caps, "iso")?,
        shutter: caps["shutter"].to_owned(),
        fnum: integer(caps, "fnum")?,
        ev: integer(caps, "ev")?,
        color_temp: integer(caps, "ct")?,
        color_mode: caps["color_md"].to_owned(),
        focal_len: integer(caps, "focal_len")?,
    };

    let raw_timestamp = &caps["timestamp"];
    let timestamp = NaiveDateTime::parse_from_str(raw_timestamp, TIMESTAMP_FORMAT)
        .map_err(|err| telemetry_error(format!("bad frame timestamp {raw_timestamp:?}: {err}")))?;

    Ok(TelemetryRecord {
        frame_index: integer(caps, "index")?,
        frame_start_ms: timecode_ms(&caps["frame_start"])?,
        frame_end_ms: timecode_ms(&caps["frame_end"])?,
        frame_count: integer(caps, "frame_count")?,
        diff_time_ms: integer(caps, "frame_time")?,
        timestamp,
        exposure,
        latitude: float(caps, "latitude")?,
        longitude: float(caps, "longitude")?,
        altitude: float(caps, "altitude")?,
    })
}

fn integer(caps: &Captures<'_>, group: &str) -> Result<u32> {
    let raw = &caps[group];
    raw.parse()
        .map_err(|err| telemetry_error(format!("bad {group} value {raw:?}: {err}")))
}

fn float(caps: &Captures<'_>, group: &str) -> Result<f64> {
    let raw = &caps[group];
    raw.parse()
        .map_err(|err| telemetry_error(format!("bad {group} value {raw:?}: {err}")))
}

/// Milliseconds represented by an `HH:MM:SS,mmm` subtitle timecode.
fn timecode_ms(raw: &str) -> Result<i64> {
    let (clock, millis) = raw
        .split_once(',')
        .ok_or_else(|| telemetry_error(format!("bad timecode {raw:?}")))?;
    let mut total: i64 = 0;
    for piece in clock.split(':') {
        let value: i64 = piece
            .parse()
            .map_err(|err| telemetry_error(format!("bad timecode {raw:?}: {err}")))?;
        total = total * 60 + value;
    }
    let millis: i64 = millis
        .parse()
        .map_err(|err| telemetry_error(format!("bad timecode {raw:?}: {err}")))?;
    Ok(total * 1000 + millis)
}

pub fn telemetry_error(message: impl Into<String>) -> ShoeboxError {
    ShoeboxError::Telemetry(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK_ONE: &str = "1\n\
00:00:00,000 --> 00:00:00,033\n\
<font size=\"28\">FrameCnt: 1, DiffTime: 33ms\n\
2023-05-01 10:00:00.123456\n\
[iso : 100] [shutter : 1/640.0] [fnum : 280] [ev : 0] [ct : 5500] \
[color_md : default] [focal_len : 240] [latitude: 39.739200] \
[longitude: -104.990300] [altitude: 1620.500000] </font>\n";

    const BLOCK_TWO: &str = "2\n\
00:00:00,033 --> 00:00:00,066\n\
<font size=\"28\">FrameCnt: 2, DiffTime: 33ms\n\
2023-05-01 10:00:00.156789\n\
[iso : 110] [shutter : 1/500.0] [fnum : 280] [ev : 0] [ct : 5480] \
[color_md : default] [focal_len : 240] [latitude: 39.739310] \
[longitude: -104.990180] [altitude: 1621.000000] </font>\n";

    #[test]
    fn parses_well_formed_blocks_in_file_order() {
        let text = format!("{BLOCK_ONE}\n{BLOCK_TWO}");
        let parser = SrtParser::new();
        let records: Vec<_> = parser
            .records(&text)
            .collect::<Result<_>>()
            .expect("both blocks valid");

        assert_eq!(records.len(), 2);
        let first = &records[0];
        assert_eq!(first.frame_index, 1);
        assert_eq!(first.frame_start_ms, 0);
        assert_eq!(first.frame_end_ms, 33);
        assert_eq!(first.frame_count, 1);
        assert_eq!(first.diff_time_ms, 33);
        assert_eq!(first.exposure.iso, 100);
        assert_eq!(first.exposure.shutter, "1/640.0");
        assert_eq!(first.exposure.color_mode, "default");
        assert_eq!(first.latitude, 39.7392);
        assert_eq!(first.longitude, -104.9903);
        assert_eq!(first.altitude, 1620.5);
        assert_eq!(
            first.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2023-05-01 10:00:00"
        );
        assert_eq!(records[1].frame_index, 2);
        assert_eq!(records[1].exposure.iso, 110);
    }

    #[test]
    fn skips_blocks_missing_a_bracketed_field() {
        let broken = BLOCK_TWO.replace("[ev : 0] ", "");
        let text = format!("{BLOCK_ONE}\n{broken}");
        let parser = SrtParser::new();
        let records: Vec<_> = parser
            .records(&text)
            .collect::<Result<_>>()
            .expect("remaining block valid");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].frame_index, 1);
    }

    #[test]
    fn unrecognized_text_is_not_an_error() {
        let parser = SrtParser::new();
        let mut records = parser.records("no telemetry here\njust prose\n");
        assert!(records.next().is_none());
    }

    #[test]
    fn numeric_overflow_in_a_matched_block_is_fatal() {
        let text = BLOCK_ONE.replace("[iso : 100]", "[iso : 99999999999]");
        let parser = SrtParser::new();
        let result: Result<Vec<_>> = parser.records(&text).collect();
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_timestamp_in_a_matched_block_is_fatal() {
        let text = BLOCK_ONE.replace("2023-05-01 10:00:00.123456", "2023-99-01 10:00:00.123456");
        let parser = SrtParser::new();
        let result: Result<Vec<_>> = parser.records(&text).collect();
        assert!(result.is_err());
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let text = BLOCK_ONE.replace('\n', "\r\n");
        let parser = SrtParser::new();
        let records: Vec<_> = parser
            .records(&text)
            .collect::<Result<_>>()
            .expect("block valid");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn parse_file_collects_records() {
        let temp_path = std::env::temp_dir().join("shoebox-telemetry-test.srt");
        std::fs::write(&temp_path, BLOCK_ONE).expect("write temp log");

        let parser = SrtParser::new();
        let records = parser.parse_file(&temp_path).expect("parse temp log");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fix().latitude, 39.7392);

        std::fs::remove_file(&temp_path).expect("cleanup temp log");
    }
}
