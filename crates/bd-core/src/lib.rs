/// Configuration, types, and shared structures for busdist.
///
/// This crate contains the sample and zone types, the analyzer
/// configuration, and the traits shared across the busdist workspace.

pub mod clock;
pub mod config;
pub mod error;
pub mod sample;
pub mod stats;
pub mod traits;
pub mod zone;

pub use config::AnalyzerConfig;
pub use error::CoreError;
pub use sample::{ClassifiedSample, Sample};
pub use stats::{CycleStats, Dominance, MinuteCount, ZoneCounts};
pub use zone::{Zone, ZoneThresholds};
