use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Coarse classification of a media file, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    /// Carries embedded capture metadata (EXIF).
    Image,
    /// Video or anything else; dated by filesystem timestamps.
    Other,
}

/// Day-to-label mapping for one processing run. The first label recorded for
/// a day is authoritative; later writes for the same day are ignored.
#[derive(Debug, Clone, Default)]
pub struct LabelCache {
    entries: HashMap<NaiveDate, String>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, day: NaiveDate) -> Option<&str> {
        self.entries.get(&day).map(String::as_str)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.entries.contains_key(&day)
    }

    /// Records a label for a day unless one exists already. Returns whether
    /// the entry was inserted.
    pub fn record(&mut self, day: NaiveDate, label: &str) -> bool {
        if self.entries.contains_key(&day) {
            return false;
        }
        self.entries.insert(day, label.to_owned());
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The engine's verdict for one file: which day bucket it belongs to and the
/// label naming its destination folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub day: NaiveDate,
    pub label: String,
}

impl Resolution {
    pub fn new(day: NaiveDate, label: impl Into<String>) -> Self {
        Self {
            day,
            label: label.into(),
        }
    }

    /// Destination folder name: the label, a space, and the ISO day string.
    pub fn folder_name(&self) -> String {
        format!("{} {}", self.label, self.day.format("%Y-%m-%d"))
    }
}
