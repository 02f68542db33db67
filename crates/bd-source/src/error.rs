use std::path::PathBuf;

use thiserror::Error;

/// Errors originating from the source module (table replay).
#[derive(Error, Debug)]
pub enum SourceError {
    /// Extension de fichier inconnue pour le rejeu.
    #[error("Extension de rejeu non supportée : {}", .0.display())]
    UnsupportedExtension(PathBuf),

    /// En-tête CSV sans colonne d'horodatage ou de RSSI.
    #[error("Colonnes timestamp/rssi absentes dans {}", .0.display())]
    MissingColumns(PathBuf),

    /// Erreur de lecture du fichier.
    #[error("Erreur d'E/S : {0}")]
    Io(#[from] std::io::Error),

    /// Erreur de structure CSV.
    #[error("Erreur CSV : {0}")]
    Csv(#[from] csv::Error),
}
