/// Sample acquisition for busdist (serial link, capture replay, table replay).

pub mod assembler;
pub mod collector;
pub mod error;
pub mod parser;
pub mod replay;

#[cfg(feature = "serial")]
pub mod serial;

pub use collector::{CollectReport, CollectedCycle, CollectorHandle, CollectorSettings, StopReason};
pub use error::SourceError;
pub use parser::{LineOutcome, LineParser, ParseStats};
