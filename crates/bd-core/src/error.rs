use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Zone thresholds are not strictly increasing toward the rear.
    #[error("Seuils de zone invalides : front={front} middle={middle} back={back} (attendu front < middle < back)")]
    ThresholdOrder {
        /// Front threshold (dBm).
        front: i32,
        /// Middle threshold (dBm).
        middle: i32,
        /// Back threshold (dBm).
        back: i32,
    },

    /// Unsupported file or data format.
    #[error("Format non supporté : {format}")]
    UnsupportedFormat {
        /// The format string that is unsupported.
        format: String,
    },

    /// The sample source could not be opened. Fatal to the whole run.
    #[error("Source indisponible ({name}) : {reason}")]
    SourceUnavailable {
        /// Port name or file path.
        name: String,
        /// Underlying cause.
        reason: String,
    },
}
