use chrono::NaiveDateTime;

use crate::zone::{Zone, ZoneThresholds};

/// Format used when a timestamp is persisted or logged.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Une mesure RSSI horodatée. Immuable une fois créée.
///
/// # Example
/// ```
/// use bd_core::Sample;
/// use chrono::NaiveDate;
/// let ts = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let s = Sample::new(ts, -62);
/// assert_eq!(s.rssi, -62);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    /// Horodatage local (wall-clock).
    pub timestamp: NaiveDateTime,
    /// Force du signal en dBm.
    pub rssi: i32,
}

impl Sample {
    #[must_use]
    pub fn new(timestamp: NaiveDateTime, rssi: i32) -> Self {
        Self { timestamp, rssi }
    }

    /// Classify this sample against `thresholds`.
    #[must_use]
    pub fn classify(self, thresholds: &ZoneThresholds) -> ClassifiedSample {
        ClassifiedSample {
            sample: self,
            zone: thresholds.classify(self.rssi),
        }
    }
}

/// A sample annotated with exactly one zone label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassifiedSample {
    pub sample: Sample,
    pub zone: Zone,
}

impl ClassifiedSample {
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> NaiveDateTime {
        self.sample.timestamp
    }

    #[inline]
    #[must_use]
    pub fn rssi(&self) -> i32 {
        self.sample.rssi
    }

    /// `true` unless the sample fell below the front threshold.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.zone != Zone::Noise
    }
}
