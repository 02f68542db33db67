/// Analyse d'un cycle de mesures RSSI : arrêts, zones, appareils, synthèse.
///
/// Everything in this crate is pure: no I/O, no shared state. A cycle is
/// described by a [`pipeline::PipelineContext`] snapshot and produces a
/// [`aggregate::CycleResult`].

pub mod aggregate;
pub mod dedup;
pub mod pipeline;
pub mod segmentation;
pub mod zones;

pub use aggregate::CycleResult;
pub use pipeline::{CycleAnalysis, PipelineContext, run_cycle};
