use std::path::PathBuf;

use bd_core::{AnalyzerConfig, CoreError};
use clap::Parser;

/// busdist : répartition des passagers d'un bus par mesure RSSI arrière.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Port série du collecteur (ex: /dev/ttyUSB0, COM3).
    #[arg(short, long)]
    pub port: Option<String>,

    /// Débit du port série.
    #[arg(long)]
    pub baud: Option<u32>,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Dossier des tables CSV produites.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Durée de collecte par cycle, en minutes.
    #[arg(short, long)]
    pub minutes: Option<f64>,

    /// Nombre de cycles (0 = illimité).
    #[arg(long)]
    pub cycles: Option<u32>,

    /// Rejoue une capture brute du port série au lieu du lien direct.
    #[arg(long, conflicts_with = "table")]
    pub capture: Option<PathBuf>,

    /// Analyse une table enregistrée (.csv ou .txt) en une seule passe.
    #[arg(long)]
    pub table: Option<PathBuf>,

    /// Seuil de la zone avant (dBm).
    #[arg(long, allow_hyphen_values = true)]
    pub front: Option<i32>,

    /// Seuil de la zone milieu (dBm).
    #[arg(long, allow_hyphen_values = true)]
    pub middle: Option<i32>,

    /// Seuil de la zone arrière (dBm).
    #[arg(long, allow_hyphen_values = true)]
    pub back: Option<i32>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// `true` if any threshold override was given.
    #[must_use]
    pub fn has_threshold_override(&self) -> bool {
        self.front.is_some() || self.middle.is_some() || self.back.is_some()
    }
}

/// Valeurs de la ligne de commande qui priment sur le fichier de config.
///
/// Réappliquées après chaque rechargement à chaud.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub port: Option<String>,
    pub baud: Option<u32>,
    pub output_dir: Option<PathBuf>,
    pub minutes: Option<f64>,
    pub cycles: Option<u32>,
    pub front: Option<i32>,
    pub middle: Option<i32>,
    pub back: Option<i32>,
}

impl Overrides {
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            port: cli.port.clone(),
            baud: cli.baud,
            output_dir: cli.output_dir.clone(),
            minutes: cli.minutes,
            cycles: cli.cycles,
            front: cli.front,
            middle: cli.middle,
            back: cli.back,
        }
    }

    /// Apply every override, then re-clamp.
    ///
    /// # Errors
    /// Returns [`CoreError::ThresholdOrder`] if the overridden thresholds are
    /// misordered. `config` is left with its file thresholds in that case.
    pub fn apply(&self, config: &mut AnalyzerConfig) -> Result<(), CoreError> {
        if let Some(ref port) = self.port {
            config.port.clone_from(port);
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        if let Some(ref dir) = self.output_dir {
            config.output_dir.clone_from(dir);
        }
        if let Some(minutes) = self.minutes {
            config.collection_minutes = minutes;
        }
        if let Some(cycles) = self.cycles {
            config.cycles = Some(cycles);
        }
        config.clamp_all();
        config.thresholds.update(self.front, self.middle, self.back)
    }
}
