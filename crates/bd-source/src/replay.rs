use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use bd_core::traits::LineSource;
use bd_core::{CoreError, Sample};
use chrono::{DateTime, NaiveDateTime};

use crate::error::SourceError;

/// Formats d'horodatage acceptés pour les tables rejouées, dans l'ordre.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Rejeu d'une capture brute du port série (mêmes lignes que le direct).
///
/// Le fichier est lu entièrement à l'ouverture et livré au premier `poll`.
///
/// # Example
/// ```no_run
/// use bd_source::replay::ReplaySource;
/// use std::path::Path;
/// let source = ReplaySource::open(Path::new("captures/evening.log")).unwrap();
/// ```
pub struct ReplaySource {
    data: Option<Vec<u8>>,
    name: String,
}

impl ReplaySource {
    /// Charge la capture en mémoire.
    ///
    /// # Errors
    /// Returns [`CoreError::SourceUnavailable`] if the file cannot be read.
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let mut data = fs::read(path).map_err(|e| CoreError::SourceUnavailable {
            name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        // La dernière ligne d'un fichier n'a pas toujours de '\n'
        if data.last().is_some_and(|&b| b != b'\n') {
            data.push(b'\n');
        }
        log::info!("Capture chargée : {} ({} octets)", path.display(), data.len());
        Ok(Self::from_bytes(path.display().to_string(), data))
    }

    /// Source en mémoire (tests, captures déjà chargées).
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            data: Some(data),
            name: name.into(),
        }
    }
}

impl LineSource for ReplaySource {
    fn poll(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        match self.data.take() {
            Some(data) => {
                buf.extend_from_slice(&data);
                Ok(data.len())
            }
            None => Ok(0),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_live(&self) -> bool {
        false
    }

    fn is_exhausted(&self) -> bool {
        self.data.is_none()
    }
}

/// Parse an absolute timestamp as written by the CSV reporter or by
/// third-party exports.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

/// Charge une table de mesures horodatées (`.csv` ou `.txt`), triée par temps.
///
/// - `.csv` : en-tête avec une colonne `timestamp` (ou `datetime`) et `rssi`,
///   colonnes supplémentaires ignorées (`location_label`, ...).
/// - `.txt` : lignes `datetime,rssi`, lignes d'en-tête contenant "rssi" ignorées.
///
/// Les lignes illisibles sont abandonnées silencieusement.
///
/// # Errors
/// Returns an error if the file cannot be read, has an unknown extension,
/// or a CSV header lacks the required columns.
pub fn load_samples(path: &Path) -> Result<Vec<Sample>, SourceError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let mut samples = match ext.as_str() {
        "csv" => load_csv(path)?,
        "txt" => load_txt(path)?,
        _ => {
            return Err(SourceError::UnsupportedExtension(PathBuf::from(path)));
        }
    };

    samples.sort_by_key(|s| s.timestamp);
    log::info!("{} mesures chargées depuis {}", samples.len(), path.display());
    Ok(samples)
}

fn load_csv(path: &Path) -> Result<Vec<Sample>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };
    let (Some(ts_idx), Some(rssi_idx)) = (column(&["timestamp", "datetime"]), column(&["rssi"]))
    else {
        return Err(SourceError::MissingColumns(PathBuf::from(path)));
    };

    let mut samples = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let parsed = record.ok().and_then(|r| {
            let timestamp = parse_timestamp(r.get(ts_idx)?)?;
            let rssi = r.get(rssi_idx)?.parse::<i32>().ok()?;
            Some(Sample::new(timestamp, rssi))
        });
        match parsed {
            Some(s) => samples.push(s),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        log::debug!("{skipped} lignes ignorées dans {}", path.display());
    }
    Ok(samples)
}

fn load_txt(path: &Path) -> Result<Vec<Sample>, SourceError> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut samples = Vec::new();
    // Octets bruts : une ligne non UTF-8 est rejetée seule
    for raw in reader.split(b'\n') {
        let raw = raw?;
        let Ok(line) = std::str::from_utf8(&raw) else {
            continue;
        };
        if !line.contains(',') || line.to_lowercase().contains("rssi") {
            continue;
        }
        let mut parts = line.trim().split(',');
        if let (Some(ts), Some(rssi), None) = (parts.next(), parts.next(), parts.next())
            && let (Some(timestamp), Ok(rssi)) = (parse_timestamp(ts), rssi.trim().parse::<i32>())
        {
            samples.push(Sample::new(timestamp, rssi));
        }
    }
    Ok(samples)
}
