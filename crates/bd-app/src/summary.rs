use bd_analysis::CycleResult;
use bd_core::{Zone, ZoneThresholds};

const RULE_WIDTH: usize = 60;

/// Texte de synthèse d'un cycle, une entrée par ligne de log.
///
/// `raw_count` est le nombre de mesures avant filtrage des arrêts courts ;
/// il n'est affiché que s'il diffère du nombre analysé.
#[must_use]
pub fn summary_lines(
    result: &CycleResult,
    thresholds: &ZoneThresholds,
    raw_count: usize,
) -> Vec<String> {
    let stats = &result.stats;
    let counts = &result.zone_counts;
    let rule = "=".repeat(RULE_WIDTH);

    let mut lines = vec![
        rule.clone(),
        format!("CYCLE {} : RÉPARTITION DES SIGNAUX DANS LE BUS", result.cycle_index),
        rule,
        format!("Période analysée : {:.1} minutes", stats.duration_minutes()),
        format!("Mesures RSSI : {}", stats.count),
    ];
    if raw_count != stats.count {
        lines.push(format!("Mesures brutes : {raw_count} (arrêts courts retirés)"));
    }
    lines.push(format!("RSSI moyen : {:.1} dBm", stats.mean_rssi));
    lines.push(format!(
        "Seuils : Front={}, Middle={}, Back={}",
        thresholds.front, thresholds.middle, thresholds.back
    ));
    lines.push(format!("Signaux valides : {}", counts.valid()));
    lines.push(format!("Bruit/pertes : {}", counts.noise));

    for zone in Zone::VALID {
        let share = counts.share(zone).unwrap_or(0.0) * 100.0;
        lines.push(format!(
            "{:<6}: {:>5} mesures ({share:5.1}%)",
            zone.label(),
            counts.get(zone)
        ));
    }
    lines.push(format!("Appareils distincts : {}", result.device_count));

    if let Some(dominance) = stats.dominance {
        lines.push(format!("Verdict : {dominance}"));
    }
    lines
}

pub fn log_summary(result: &CycleResult, thresholds: &ZoneThresholds, raw_count: usize) {
    for line in summary_lines(result, thresholds, raw_count) {
        log::info!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bd_analysis::dedup::DedupParams;
    use bd_core::Sample;
    use chrono::{NaiveDate, TimeDelta};

    fn result() -> CycleResult {
        let t0 = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let t = ZoneThresholds::default();
        let samples = [-40, -45, -42, -60, -90]
            .iter()
            .enumerate()
            .map(|(i, &r)| Sample::new(t0 + TimeDelta::seconds(i as i64 * 30), r).classify(&t))
            .collect();
        bd_analysis::aggregate::aggregate(7, samples, &DedupParams::default()).unwrap()
    }

    #[test]
    fn summary_reports_zones_and_verdict() {
        let lines = summary_lines(&result(), &ZoneThresholds::default(), 5);
        assert!(lines.iter().any(|l| l == "Signaux valides : 4"));
        assert!(lines.iter().any(|l| l == "Back  :     3 mesures ( 75.0%)"));
        assert!(lines.iter().any(|l| l == "Verdict : back-dominant"));
        assert!(!lines.iter().any(|l| l.starts_with("Mesures brutes")));
    }

    #[test]
    fn raw_count_is_shown_when_filtering_removed_samples() {
        let lines = summary_lines(&result(), &ZoneThresholds::default(), 12);
        assert!(lines.iter().any(|l| l == "Mesures brutes : 12 (arrêts courts retirés)"));
    }
}
