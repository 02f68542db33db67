use bd_core::{AnalyzerConfig, Sample};
use chrono::{NaiveDateTime, TimeDelta};

/// Paramètres du découpage en arrêts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentParams {
    /// Un écart strictement supérieur ouvre un nouveau segment.
    pub gap: TimeDelta,
    /// Les segments strictement plus courts sont abandonnés.
    pub min_duration: TimeDelta,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            gap: TimeDelta::seconds(30),
            min_duration: TimeDelta::minutes(1),
        }
    }
}

impl SegmentParams {
    #[must_use]
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            gap: delta_from_secs(config.segment_gap_secs),
            min_duration: delta_from_secs(config.min_stop_minutes * 60.0),
        }
    }
}

/// Seconds (fractional) to a microsecond-precision delta.
pub(crate) fn delta_from_secs(secs: f64) -> TimeDelta {
    TimeDelta::microseconds((secs * 1_000_000.0).round() as i64)
}

/// Run of consecutive samples separated by gaps no larger than the threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Index of the first sample in the sorted input.
    pub start_index: usize,
    /// One past the last sample.
    pub end_index: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Segment {
    #[must_use]
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Durée en minutes (fractionnaire).
    #[must_use]
    pub fn duration_minutes(&self) -> f64 {
        self.duration().num_microseconds().unwrap_or(i64::MAX) as f64 / 60_000_000.0
    }
}

/// Découpe une série déjà triée par temps en segments.
///
/// # Example
/// ```
/// use bd_analysis::segmentation::segments;
/// use bd_core::Sample;
/// use chrono::{NaiveDate, TimeDelta};
///
/// let t0 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let samples: Vec<Sample> = [0, 10, 60]
///     .iter()
///     .map(|&s| Sample::new(t0 + TimeDelta::seconds(s), -60))
///     .collect();
/// let segs = segments(&samples, TimeDelta::seconds(30));
/// assert_eq!(segs.len(), 2);
/// assert_eq!(segs[0].len(), 2);
/// ```
#[must_use]
pub fn segments(sorted: &[Sample], gap: TimeDelta) -> Vec<Segment> {
    let mut out = Vec::new();
    let Some(first) = sorted.first() else {
        return out;
    };

    let mut current = Segment {
        start_index: 0,
        end_index: 1,
        start: first.timestamp,
        end: first.timestamp,
    };
    for (i, pair) in sorted.windows(2).enumerate() {
        let next = pair[1];
        if next.timestamp - pair[0].timestamp > gap {
            out.push(current);
            current = Segment {
                start_index: i + 1,
                end_index: i + 2,
                start: next.timestamp,
                end: next.timestamp,
            };
        } else {
            current.end_index = i + 2;
            current.end = next.timestamp;
        }
    }
    out.push(current);
    out
}

/// Retire les échantillons appartenant à des arrêts trop courts.
///
/// The input is stable-sorted by timestamp first; the output keeps that
/// order. Applying the filter twice gives the same result as applying it once.
#[must_use]
pub fn filter_short_stops(samples: &[Sample], params: &SegmentParams) -> Vec<Sample> {
    let mut sorted = samples.to_vec();
    sorted.sort_by_key(|s| s.timestamp);

    let segs = segments(&sorted, params.gap);
    let mut kept = Vec::with_capacity(sorted.len());
    let mut dropped = 0usize;
    for seg in &segs {
        if seg.duration() < params.min_duration {
            log::debug!(
                "Arrêt court ignoré : {} mesures sur {:.2} min",
                seg.len(),
                seg.duration_minutes()
            );
            dropped += 1;
        } else {
            kept.extend_from_slice(&sorted[seg.start_index..seg.end_index]);
        }
    }
    if dropped > 0 {
        log::info!(
            "{dropped}/{} segments courts retirés ({} mesures conservées)",
            segs.len(),
            kept.len()
        );
    }
    kept
}
