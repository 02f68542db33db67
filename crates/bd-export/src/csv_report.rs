use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bd_core::sample::TIMESTAMP_FORMAT;
use bd_core::traits::CycleReporter;
use bd_core::{ClassifiedSample, CycleStats, MinuteCount};
use serde::Serialize;

const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Serialize)]
struct SampleRow<'a> {
    timestamp: String,
    rssi: i32,
    location_label: &'a str,
}

#[derive(Serialize)]
struct StatsRow {
    cycle: u32,
    start_time: String,
    end_time: String,
    total_measurements: usize,
    mean_rssi: f64,
    min_rssi: i32,
    max_rssi: i32,
    front_signals: usize,
    middle_signals: usize,
    back_signals: usize,
    noise_signals: usize,
}

#[derive(Serialize)]
struct MinuteRow {
    minute: String,
    devices: usize,
}

/// Écrit les tables d'un cycle dans un dossier de sortie.
///
/// Fichiers produits (`n` = numéro de cycle) :
/// - `collected_data_cycle_{n}.csv`
/// - `summary_stats_cycle_{n}.csv`
/// - `devices_per_minute_cycle_{n}.csv`
///
/// Le dossier est créé au premier écrit. Une table vide n'écrit rien.
///
/// # Example
/// ```no_run
/// use bd_export::CsvReporter;
/// let reporter = CsvReporter::new("results");
/// ```
pub struct CsvReporter {
    output_dir: PathBuf,
}

impl CsvReporter {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn target(&self, stem: &str, cycle: u32) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Impossible de créer {}", self.output_dir.display())
        })?;
        Ok(self.output_dir.join(format!("{stem}_cycle_{cycle}.csv")))
    }

    fn write_rows<T: Serialize>(&self, stem: &str, cycle: u32, rows: &[T]) -> Result<()> {
        if rows.is_empty() {
            log::warn!("Cycle {cycle} : aucune donnée pour {stem}, rien n'est écrit");
            return Ok(());
        }
        let path = self.target(stem, cycle)?;
        let mut wtr = csv::Writer::from_path(&path)
            .with_context(|| format!("Ouverture impossible : {}", path.display()))?;
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        log::info!("Table enregistrée : {}", path.display());
        Ok(())
    }
}

impl CycleReporter for CsvReporter {
    fn write_cycle_csv(&mut self, cycle: u32, rows: &[ClassifiedSample]) -> Result<()> {
        let rows: Vec<SampleRow<'_>> = rows
            .iter()
            .map(|s| SampleRow {
                timestamp: s.timestamp().format(TIMESTAMP_FORMAT).to_string(),
                rssi: s.rssi(),
                location_label: s.zone.label(),
            })
            .collect();
        self.write_rows("collected_data", cycle, &rows)
    }

    fn write_cycle_stats(&mut self, cycle: u32, stats: &CycleStats) -> Result<()> {
        let row = StatsRow {
            cycle,
            start_time: stats.start.format(TIMESTAMP_FORMAT).to_string(),
            end_time: stats.end.format(TIMESTAMP_FORMAT).to_string(),
            total_measurements: stats.count,
            mean_rssi: stats.mean_rssi,
            min_rssi: stats.min_rssi,
            max_rssi: stats.max_rssi,
            front_signals: stats.zone_counts.front,
            middle_signals: stats.zone_counts.middle,
            back_signals: stats.zone_counts.back,
            noise_signals: stats.zone_counts.noise,
        };
        self.write_rows("summary_stats", cycle, &[row])
    }

    // Le graphique par minute est remplacé par sa table.
    fn render_devices_per_minute_chart(&mut self, cycle: u32, series: &[MinuteCount]) -> Result<()> {
        let rows: Vec<MinuteRow> = series
            .iter()
            .map(|m| MinuteRow {
                minute: m.minute.format(MINUTE_FORMAT).to_string(),
                devices: m.devices,
            })
            .collect();
        self.write_rows("devices_per_minute", cycle, &rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bd_core::{Dominance, Sample, Zone, ZoneCounts, ZoneThresholds};
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_micro_opt(8, 0, 0, 123_456)
            .unwrap()
    }

    fn classified(rssi: &[i32]) -> Vec<ClassifiedSample> {
        let t = ZoneThresholds::default();
        rssi.iter()
            .enumerate()
            .map(|(i, &r)| Sample::new(t0() + TimeDelta::seconds(i as i64 * 7), r).classify(&t))
            .collect()
    }

    #[test]
    fn collected_data_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = CsvReporter::new(dir.path().join("results"));
        reporter.write_cycle_csv(4, &classified(&[-40, -90])).unwrap();

        let content = fs::read_to_string(dir.path().join("results/collected_data_cycle_4.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "timestamp,rssi,location_label");
        assert_eq!(lines[1], "2024-05-01 08:00:00.123456,-40,Back");
        assert_eq!(lines[2], "2024-05-01 08:00:07.123456,-90,Noise");
        assert_eq!(fs::read_dir(dir.path().join("results")).unwrap().count(), 1);
    }

    #[test]
    fn summary_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = CsvReporter::new(dir.path());
        let stats = CycleStats {
            start: t0(),
            end: t0() + TimeDelta::minutes(2),
            count: 10,
            mean_rssi: -61.5,
            min_rssi: -90,
            max_rssi: -41,
            zone_counts: ZoneCounts {
                front: 2,
                middle: 3,
                back: 4,
                noise: 1,
            },
            dominance: Some(Dominance::Mixed),
        };
        reporter.write_cycle_stats(1, &stats).unwrap();

        let content = fs::read_to_string(dir.path().join("summary_stats_cycle_1.csv")).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some(
                "cycle,start_time,end_time,total_measurements,mean_rssi,min_rssi,max_rssi,\
                 front_signals,middle_signals,back_signals,noise_signals"
            )
        );
        assert_eq!(
            lines.next(),
            Some("1,2024-05-01 08:00:00.123456,2024-05-01 08:02:00.123456,10,-61.5,-90,-41,2,3,4,1")
        );
    }

    #[test]
    fn per_minute_series_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = CsvReporter::new(dir.path());
        let minute = t0() - TimeDelta::microseconds(123_456);
        let series = [
            MinuteCount { minute, devices: 3 },
            MinuteCount {
                minute: minute + TimeDelta::minutes(1),
                devices: 0,
            },
        ];
        reporter.render_devices_per_minute_chart(2, &series).unwrap();
        let content = fs::read_to_string(dir.path().join("devices_per_minute_cycle_2.csv")).unwrap();
        assert_eq!(content, "minute,devices\n2024-05-01 08:00:00,3\n2024-05-01 08:01:00,0\n");
    }

    #[test]
    fn empty_cycle_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("results");
        let mut reporter = CsvReporter::new(&out);
        reporter.write_cycle_csv(1, &[]).unwrap();
        reporter.render_devices_per_minute_chart(1, &[]).unwrap();
        assert!(!out.exists());
    }

    #[test]
    fn persisted_table_reloads_with_identical_labels() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = CsvReporter::new(dir.path());
        let written = classified(&[-40, -60, -90, -70, -50, -65, -85, -84]);
        reporter.write_cycle_csv(1, &written).unwrap();

        let reloaded = bd_source::replay::load_samples(&dir.path().join("collected_data_cycle_1.csv")).unwrap();
        let thresholds = ZoneThresholds::default();
        let relabeled: Vec<ClassifiedSample> = reloaded.iter().map(|s| s.classify(&thresholds)).collect();
        assert_eq!(relabeled, written);
        assert_eq!(relabeled[6].zone, Zone::Noise);
    }
}
