use bd_core::{AnalyzerConfig, ClassifiedSample, CoreError, Sample, ZoneThresholds};

use crate::aggregate::{CycleResult, aggregate};
use crate::dedup::DedupParams;
use crate::segmentation::{SegmentParams, filter_short_stops};
use crate::zones::{classify_all, reclassify};

/// Paramètres figés pour la durée d'un cycle.
///
/// Construit depuis un instantané de la configuration ; un rechargement à
/// chaud n'affecte que le cycle suivant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PipelineContext {
    pub thresholds: ZoneThresholds,
    pub segments: SegmentParams,
    pub dedup: DedupParams,
}

impl PipelineContext {
    #[must_use]
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            thresholds: config.thresholds,
            segments: SegmentParams::from_config(config),
            dedup: DedupParams::from_config(config),
        }
    }
}

/// Analyse d'un cycle collecté : filtre des arrêts courts puis classification.
///
/// Keeps the filtered samples so thresholds can be changed afterwards and
/// the cycle re-classified without collecting again.
///
/// # Example
/// ```
/// use bd_analysis::pipeline::{CycleAnalysis, PipelineContext};
/// use bd_core::Sample;
/// use chrono::{NaiveDate, TimeDelta};
///
/// let t0 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let samples: Vec<Sample> = (0..=12)
///     .map(|i| Sample::new(t0 + TimeDelta::seconds(i * 10), -55))
///     .collect();
/// let analysis = CycleAnalysis::run(1, &samples, PipelineContext::default());
/// let result = analysis.result().unwrap();
/// assert_eq!(result.samples.len(), 13);
/// ```
#[derive(Clone, Debug)]
pub struct CycleAnalysis {
    cycle_index: u32,
    ctx: PipelineContext,
    raw_count: usize,
    classified: Vec<ClassifiedSample>,
}

impl CycleAnalysis {
    /// Sort, drop short stops, classify.
    #[must_use]
    pub fn run(cycle_index: u32, samples: &[Sample], ctx: PipelineContext) -> Self {
        let kept = filter_short_stops(samples, &ctx.segments);
        let classified = classify_all(&kept, &ctx.thresholds);
        log::debug!(
            "Cycle {cycle_index} : {} mesures, {} après filtrage",
            samples.len(),
            classified.len()
        );
        Self {
            cycle_index,
            ctx,
            raw_count: samples.len(),
            classified,
        }
    }

    #[must_use]
    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Mesures reçues avant filtrage.
    #[must_use]
    pub fn raw_count(&self) -> usize {
        self.raw_count
    }

    #[must_use]
    pub fn classified(&self) -> &[ClassifiedSample] {
        &self.classified
    }

    /// Partial threshold update followed by re-classification.
    ///
    /// # Errors
    /// Returns [`CoreError::ThresholdOrder`] if the new set is misordered;
    /// labels are left unchanged in that case.
    pub fn update_thresholds(
        &mut self,
        front: Option<i32>,
        middle: Option<i32>,
        back: Option<i32>,
    ) -> Result<(), CoreError> {
        self.ctx.thresholds.update(front, middle, back)?;
        reclassify(&mut self.classified, &self.ctx.thresholds);
        log::info!(
            "Seuils mis à jour : front={} middle={} back={}",
            self.ctx.thresholds.front,
            self.ctx.thresholds.middle,
            self.ctx.thresholds.back
        );
        Ok(())
    }

    /// Aggregated view, `None` if every sample was filtered out.
    #[must_use]
    pub fn result(&self) -> Option<CycleResult> {
        aggregate(self.cycle_index, self.classified.clone(), &self.ctx.dedup)
    }
}

/// Analyse complète d'un cycle en un appel.
#[must_use]
pub fn run_cycle(cycle_index: u32, samples: &[Sample], ctx: &PipelineContext) -> Option<CycleResult> {
    CycleAnalysis::run(cycle_index, samples, *ctx).result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bd_core::Zone;
    use chrono::{NaiveDate, TimeDelta};

    fn at(secs: i64, rssi: i32) -> Sample {
        let t0 = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        Sample::new(t0 + TimeDelta::seconds(secs), rssi)
    }

    fn long_stop() -> Vec<Sample> {
        // 2 minutes de mesures toutes les 10 s, RSSI alternés
        (0..=12)
            .map(|i| at(i * 10, if i % 2 == 0 { -48 } else { -70 }))
            .collect()
    }

    #[test]
    fn context_follows_config() {
        let config = AnalyzerConfig {
            dedup_max_packets: 3,
            segment_gap_secs: 10.0,
            ..AnalyzerConfig::default()
        };
        let ctx = PipelineContext::from_config(&config);
        assert_eq!(ctx.dedup.max_packets, 3);
        assert_eq!(ctx.segments.gap, TimeDelta::seconds(10));
        assert_eq!(ctx.thresholds, ZoneThresholds::default());
    }

    #[test]
    fn short_stop_only_cycle_has_no_result() {
        let samples = [at(0, -50), at(10, -50), at(20, -50)];
        let analysis = CycleAnalysis::run(1, &samples, PipelineContext::default());
        assert_eq!(analysis.raw_count(), 3);
        assert!(analysis.classified().is_empty());
        assert!(analysis.result().is_none());
    }

    #[test]
    fn every_sample_carries_one_label() {
        let result = run_cycle(2, &long_stop(), &PipelineContext::default()).unwrap();
        assert_eq!(result.zone_counts.total(), result.samples.len());
        assert_eq!(result.zone_counts.back, 7);
        assert_eq!(result.zone_counts.front, 6);
    }

    #[test]
    fn threshold_update_reclassifies_in_place() {
        let mut analysis = CycleAnalysis::run(1, &long_stop(), PipelineContext::default());
        let before: Vec<Sample> = analysis.classified().iter().map(|c| c.sample).collect();

        analysis.update_thresholds(None, Some(-75), None).unwrap();
        assert!(analysis.classified().iter().all(|c| c.zone != Zone::Front));
        let after: Vec<Sample> = analysis.classified().iter().map(|c| c.sample).collect();
        assert_eq!(before, after);
        assert_eq!(analysis.context().thresholds.middle, -75);
    }

    #[test]
    fn rejected_update_keeps_labels() {
        let mut analysis = CycleAnalysis::run(1, &long_stop(), PipelineContext::default());
        let labels: Vec<Zone> = analysis.classified().iter().map(|c| c.zone).collect();
        assert!(analysis.update_thresholds(Some(-40), None, None).is_err());
        let again: Vec<Zone> = analysis.classified().iter().map(|c| c.zone).collect();
        assert_eq!(labels, again);
    }
}
