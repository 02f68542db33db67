use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::zone::ZoneThresholds;

/// Configuration complète de l'analyseur, hot-rechargeable.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
/// Lue une seule fois par cycle : elle ne change jamais pendant une collecte.
///
/// # Example
/// ```
/// use bd_core::config::AnalyzerConfig;
/// let config = AnalyzerConfig::default();
/// assert_eq!(config.baud_rate, 115_200);
/// assert_eq!(config.dedup_max_packets, 5);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AnalyzerConfig {
    // === Source ===
    /// Port série du collecteur (ex: "/dev/ttyUSB0", "COM3").
    pub port: String,
    /// Débit du lien série.
    pub baud_rate: u32,
    /// Dossier de sortie des tables CSV.
    pub output_dir: PathBuf,

    // === Zones ===
    /// Seuils RSSI front/middle/back.
    pub thresholds: ZoneThresholds,

    // === Segmentation ===
    /// Écart (secondes) au-delà duquel un nouveau segment commence.
    pub segment_gap_secs: f64,
    /// Durée minimale (minutes) d'un segment conservé.
    pub min_stop_minutes: f64,

    // === Dédoublonnage ===
    /// Tolérance RSSI (dBm) entre paquets d'un même appareil.
    pub dedup_rssi_tolerance: i32,
    /// Fenêtre temporelle (secondes) d'un même appareil.
    pub dedup_window_secs: f64,
    /// Nombre maximal de paquets regroupés en un seul appareil.
    pub dedup_max_packets: usize,

    // === Cycles ===
    /// Durée de collecte par cycle (minutes).
    pub collection_minutes: f64,
    /// Nombre de cycles. `None` = illimité.
    pub cycles: Option<u32>,
    /// Pause entre deux cycles (secondes).
    pub cycle_pause_secs: f64,
    /// Pause entre deux lectures non bloquantes du port (ms).
    pub poll_interval_ms: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            output_dir: PathBuf::from("results"),
            thresholds: ZoneThresholds::default(),
            segment_gap_secs: 30.0,
            min_stop_minutes: 1.0,
            dedup_rssi_tolerance: 5,
            dedup_window_secs: 2.0,
            dedup_max_packets: 5,
            collection_minutes: 2.0,
            cycles: None,
            cycle_pause_secs: 2.0,
            poll_interval_ms: 100,
        }
    }
}

impl AnalyzerConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    /// NaN and infinities fall back to the default before clamping.
    pub fn clamp_all(&mut self) {
        let defaults = Self::default();
        self.segment_gap_secs =
            finite_or(self.segment_gap_secs, defaults.segment_gap_secs).clamp(0.0, 86_400.0);
        self.min_stop_minutes =
            finite_or(self.min_stop_minutes, defaults.min_stop_minutes).clamp(0.0, 1_440.0);
        self.dedup_rssi_tolerance = self.dedup_rssi_tolerance.clamp(0, 100);
        self.dedup_window_secs =
            finite_or(self.dedup_window_secs, defaults.dedup_window_secs).clamp(0.0, 3_600.0);
        self.dedup_max_packets = self.dedup_max_packets.max(1);
        self.collection_minutes =
            finite_or(self.collection_minutes, defaults.collection_minutes).clamp(0.01, 1_440.0);
        self.cycle_pause_secs =
            finite_or(self.cycle_pause_secs, defaults.cycle_pause_secs).clamp(0.0, 3_600.0);
        self.poll_interval_ms = self.poll_interval_ms.clamp(1, 5_000);
        self.baud_rate = self.baud_rate.max(1);
        // 0 cycle = pas de limite
        if self.cycles == Some(0) {
            self.cycles = None;
        }
    }

    /// Collection deadline for one cycle.
    #[must_use]
    pub fn collection_duration(&self) -> Duration {
        Duration::from_secs_f64(self.collection_minutes * 60.0)
    }

    #[must_use]
    pub fn cycle_pause(&self) -> Duration {
        Duration::from_secs_f64(self.cycle_pause_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize, Default)]
struct ConfigFile {
    source: Option<SourceSection>,
    zones: Option<ZonesSection>,
    segmentation: Option<SegmentationSection>,
    dedup: Option<DedupSection>,
    schedule: Option<ScheduleSection>,
}

#[derive(Deserialize)]
struct SourceSection {
    port: Option<String>,
    baud_rate: Option<u32>,
    output_dir: Option<PathBuf>,
}

#[derive(Deserialize)]
struct ZonesSection {
    front: Option<i32>,
    middle: Option<i32>,
    back: Option<i32>,
}

#[derive(Deserialize)]
struct SegmentationSection {
    gap_seconds: Option<f64>,
    min_stop_minutes: Option<f64>,
}

#[derive(Deserialize)]
struct DedupSection {
    rssi_tolerance: Option<i32>,
    window_seconds: Option<f64>,
    max_packets: Option<usize>,
}

#[derive(Deserialize)]
struct ScheduleSection {
    collection_minutes: Option<f64>,
    cycles: Option<u32>,
    pause_seconds: Option<f64>,
    poll_interval_ms: Option<u64>,
}

/// Parse un document TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the TOML is malformed or the zone thresholds are
/// not ordered `front < middle < back`.
///
/// # Example
/// ```
/// use bd_core::config::parse_config;
/// let config = parse_config("[zones]\nback = -45\n").unwrap();
/// assert_eq!(config.thresholds.back, -45);
/// assert_eq!(config.thresholds.front, -85);
/// ```
pub fn parse_config(content: &str) -> Result<AnalyzerConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;
    let mut config = AnalyzerConfig::default();

    if let Some(s) = file.source {
        if let Some(v) = s.port {
            config.port = v;
        }
        if let Some(v) = s.baud_rate {
            config.baud_rate = v;
        }
        if let Some(v) = s.output_dir {
            config.output_dir = v;
        }
    }

    if let Some(z) = file.zones {
        config.thresholds.update(z.front, z.middle, z.back)?;
    }

    if let Some(s) = file.segmentation {
        if let Some(v) = s.gap_seconds {
            config.segment_gap_secs = v;
        }
        if let Some(v) = s.min_stop_minutes {
            config.min_stop_minutes = v;
        }
    }

    if let Some(d) = file.dedup {
        if let Some(v) = d.rssi_tolerance {
            config.dedup_rssi_tolerance = v;
        }
        if let Some(v) = d.window_seconds {
            config.dedup_window_secs = v;
        }
        if let Some(v) = d.max_packets {
            config.dedup_max_packets = v;
        }
    }

    if let Some(s) = file.schedule {
        if let Some(v) = s.collection_minutes {
            config.collection_minutes = v;
        }
        if s.cycles.is_some() {
            config.cycles = s.cycles;
        }
        if let Some(v) = s.pause_seconds {
            config.cycle_pause_secs = v;
        }
        if let Some(v) = s.poll_interval_ms {
            config.poll_interval_ms = v;
        }
    }

    config.clamp_all();
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use bd_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<AnalyzerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Configuration invalide dans {}", path.display()))
}
