use bd_core::{ClassifiedSample, Sample, ZoneCounts, ZoneThresholds};

/// Classe chaque échantillon, ordre conservé.
#[must_use]
pub fn classify_all(samples: &[Sample], thresholds: &ZoneThresholds) -> Vec<ClassifiedSample> {
    samples.iter().map(|s| s.classify(thresholds)).collect()
}

/// Recompute the labels in place. Timestamps and RSSI are not touched.
pub fn reclassify(samples: &mut [ClassifiedSample], thresholds: &ZoneThresholds) {
    for s in samples {
        s.zone = thresholds.classify(s.sample.rssi);
    }
}

#[must_use]
pub fn zone_counts(samples: &[ClassifiedSample]) -> ZoneCounts {
    let mut counts = ZoneCounts::default();
    for s in samples {
        counts.add(s.zone);
    }
    counts
}

/// Échantillons hors bruit, dans l'ordre d'entrée.
#[must_use]
pub fn valid_samples(samples: &[ClassifiedSample]) -> Vec<Sample> {
    samples
        .iter()
        .filter(|s| s.is_valid())
        .map(|s| s.sample)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bd_core::Zone;
    use chrono::{NaiveDate, TimeDelta};

    fn samples(rssi: &[i32]) -> Vec<Sample> {
        let t0 = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        rssi.iter()
            .enumerate()
            .map(|(i, &r)| Sample::new(t0 + TimeDelta::seconds(i as i64), r))
            .collect()
    }

    #[test]
    fn counts_cover_every_sample() {
        let classified = classify_all(&samples(&[-40, -60, -90, -70]), &ZoneThresholds::default());
        let counts = zone_counts(&classified);
        assert_eq!(counts.total(), classified.len());
        assert_eq!(counts.valid(), 3);
        assert_eq!(counts.noise, 1);
        assert_eq!(valid_samples(&classified).len(), 3);
    }

    #[test]
    fn reclassify_is_idempotent_and_keeps_data() {
        let input = samples(&[-40, -52, -66, -86, -70]);
        let mut classified = classify_all(&input, &ZoneThresholds::default());
        let strict = ZoneThresholds::new(-75, -60, -45).unwrap();
        reclassify(&mut classified, &strict);
        let once = classified.clone();
        reclassify(&mut classified, &strict);
        assert_eq!(once, classified);
        assert!(classified.iter().zip(&input).all(|(c, s)| c.sample == *s));
        assert_eq!(classified[0].zone, Zone::Back);
        assert_eq!(classified[4].zone, Zone::Front);
    }

    #[test]
    fn reclassify_matches_fresh_classification() {
        let input = samples(&[-30, -64, -65, -84, -85]);
        let t = ZoneThresholds::new(-80, -64, -40).unwrap();
        let mut classified = classify_all(&input, &ZoneThresholds::default());
        reclassify(&mut classified, &t);
        assert_eq!(classified, classify_all(&input, &t));
    }
}
