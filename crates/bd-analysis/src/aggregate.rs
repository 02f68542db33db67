use std::collections::BTreeMap;

use bd_core::{ClassifiedSample, CycleStats, Dominance, MinuteCount, Sample, ZoneCounts};
use chrono::{DurationRound, NaiveDateTime, TimeDelta};

use crate::dedup::{DedupParams, cluster_devices};
use crate::zones::{valid_samples, zone_counts};

/// Résultat complet d'un cycle analysé.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleResult {
    pub cycle_index: u32,
    /// Samples after stop filtering, each with its zone.
    pub samples: Vec<ClassifiedSample>,
    pub zone_counts: ZoneCounts,
    /// Device clusters over non-noise samples.
    pub device_count: usize,
    pub stats: CycleStats,
    pub devices_per_minute: Vec<MinuteCount>,
}

/// Statistiques sommaires. `None` pour un cycle vide.
#[must_use]
pub fn cycle_stats(samples: &[ClassifiedSample]) -> Option<CycleStats> {
    let first = samples.first()?;
    let mut start = first.timestamp();
    let mut end = start;
    let mut min_rssi = first.rssi();
    let mut max_rssi = min_rssi;
    let mut sum = 0i64;

    for s in samples {
        start = start.min(s.timestamp());
        end = end.max(s.timestamp());
        min_rssi = min_rssi.min(s.rssi());
        max_rssi = max_rssi.max(s.rssi());
        sum += i64::from(s.rssi());
    }

    let zone_counts = zone_counts(samples);
    Some(CycleStats {
        start,
        end,
        count: samples.len(),
        mean_rssi: sum as f64 / samples.len() as f64,
        min_rssi,
        max_rssi,
        zone_counts,
        dominance: Dominance::from_counts(&zone_counts),
    })
}

fn minute_of(ts: NaiveDateTime) -> NaiveDateTime {
    ts.duration_trunc(TimeDelta::minutes(1)).unwrap_or(ts)
}

/// Appareils par minute d'horloge.
///
/// La série couvre sans trou la première à la dernière minute occupée ;
/// les minutes vides valent 0.
///
/// # Example
/// ```
/// use bd_analysis::aggregate::devices_per_minute;
/// use bd_core::Sample;
/// use chrono::{NaiveDate, TimeDelta};
///
/// let t0 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(8, 0, 10).unwrap();
/// let reps = [Sample::new(t0, -60), Sample::new(t0 + TimeDelta::minutes(2), -61)];
/// let series = devices_per_minute(&reps);
/// assert_eq!(series.iter().map(|m| m.devices).collect::<Vec<_>>(), vec![1, 0, 1]);
/// ```
#[must_use]
pub fn devices_per_minute(representatives: &[Sample]) -> Vec<MinuteCount> {
    let mut buckets: BTreeMap<NaiveDateTime, usize> = BTreeMap::new();
    for s in representatives {
        *buckets.entry(minute_of(s.timestamp)).or_default() += 1;
    }
    let (Some((&first, _)), Some((&last, _))) =
        (buckets.first_key_value(), buckets.last_key_value())
    else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let mut minute = first;
    while minute <= last {
        series.push(MinuteCount {
            minute,
            devices: buckets.get(&minute).copied().unwrap_or(0),
        });
        let Some(next) = minute.checked_add_signed(TimeDelta::minutes(1)) else {
            break;
        };
        minute = next;
    }
    series
}

/// Agrège un cycle classifié. `None` si aucun échantillon.
#[must_use]
pub fn aggregate(
    cycle_index: u32,
    samples: Vec<ClassifiedSample>,
    dedup: &DedupParams,
) -> Option<CycleResult> {
    let stats = cycle_stats(&samples)?;
    let devices = cluster_devices(&valid_samples(&samples), dedup);
    let devices_per_minute = devices_per_minute(&devices.representatives());

    Some(CycleResult {
        cycle_index,
        zone_counts: stats.zone_counts,
        device_count: devices.device_count(),
        devices_per_minute,
        stats,
        samples,
    })
}
