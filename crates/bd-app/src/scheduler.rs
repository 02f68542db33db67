use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use arc_swap::ArcSwap;
use bd_analysis::{CycleAnalysis, PipelineContext};
use bd_core::clock::Clock;
use bd_core::traits::{CycleReporter, LineSource};
use bd_core::{AnalyzerConfig, CoreError, Sample};
use bd_source::collector::{CollectorSettings, StopReason, spawn_collector};

use crate::summary;

/// Granularité du sommeil interruptible entre deux cycles.
const PAUSE_STEP: Duration = Duration::from_millis(50);

/// Pourquoi la boucle de cycles s'est arrêtée.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunEnd {
    /// Nombre de cycles configuré atteint.
    CycleLimit,
    /// Ctrl+C.
    Interrupted,
    /// La source n'a pas pu être ouverte. Fatal.
    SourceUnavailable(String),
    /// Une source finie (capture rejouée) a tout livré.
    Exhausted,
}

/// Bilan d'une exécution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    /// Cycles analysés et rapportés.
    pub completed: u32,
    /// Cycles sans mesure exploitable.
    pub skipped: u32,
    pub end: RunEnd,
}

/// Enchaîne les cycles collecte → analyse → rapport.
///
/// `open_source` est rappelé à chaque cycle ; la source est fermée par le
/// collecteur à la fin de chaque cycle.
pub struct CycleScheduler<'a, F>
where
    F: FnMut(&AnalyzerConfig) -> Result<Box<dyn LineSource>, CoreError>,
{
    config: Arc<ArcSwap<AnalyzerConfig>>,
    open_source: F,
    reporter: &'a mut dyn CycleReporter,
    clock: Arc<dyn Clock>,
    stop: Arc<AtomicBool>,
    tap: Option<flume::Sender<Sample>>,
}

impl<'a, F> CycleScheduler<'a, F>
where
    F: FnMut(&AnalyzerConfig) -> Result<Box<dyn LineSource>, CoreError>,
{
    pub fn new(
        config: Arc<ArcSwap<AnalyzerConfig>>,
        open_source: F,
        reporter: &'a mut dyn CycleReporter,
        clock: Arc<dyn Clock>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            open_source,
            reporter,
            clock,
            stop,
            tap: None,
        }
    }

    /// Relaie une copie de chaque mesure vers un abonné externe.
    #[must_use]
    pub fn with_tap(mut self, tap: flume::Sender<Sample>) -> Self {
        self.tap = Some(tap);
        self
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Run cycles until the limit, an interrupt, source exhaustion or a
    /// source that cannot be opened.
    pub fn run(&mut self) -> RunOutcome {
        let mut cycle: u32 = 0;
        let mut completed = 0;
        let mut skipped = 0;

        let end = loop {
            if self.stopped() {
                break RunEnd::Interrupted;
            }
            // Un instantané par cycle : un rechargement n'affecte que le suivant
            let config = self.config.load_full();
            if config.cycles.is_some_and(|limit| cycle >= limit) {
                break RunEnd::CycleLimit;
            }
            cycle += 1;
            log::info!("=== Cycle {cycle} ===");

            let source = match (self.open_source)(&config) {
                Ok(source) => source,
                Err(e) => {
                    log::error!("{e}");
                    break RunEnd::SourceUnavailable(e.to_string());
                }
            };
            let live = source.is_live();

            let settings = CollectorSettings {
                cycle_start: self.clock.now(),
                duration: config.collection_duration(),
                poll_interval: config.poll_interval(),
            };
            log::info!(
                "Collecte sur {} pendant {:.1} min",
                source.name(),
                config.collection_minutes
            );
            let collected = spawn_collector(
                source,
                settings,
                Arc::clone(&self.clock),
                Arc::clone(&self.stop),
                self.tap.clone(),
            )
            .and_then(|handle| {
                // Le tampon n'est lu qu'une fois la source fermée
                while handle.is_collecting() {
                    thread::sleep(PAUSE_STEP);
                }
                handle.join()
            });

            let (samples, stop_reason) = match collected {
                Ok(c) => {
                    log::info!(
                        "Collecte terminée : {} mesures ({} lignes lues, {} rejetées)",
                        c.samples.len(),
                        c.report.stats.lines(),
                        c.report.stats.malformed
                    );
                    (c.samples, c.report.stop_reason)
                }
                Err(e) => {
                    log::error!("Cycle {cycle} : {e:#}");
                    (Vec::new(), StopReason::IoError(e.to_string()))
                }
            };

            let ctx = PipelineContext::from_config(&config);
            if self.process_cycle(cycle, &samples, ctx) {
                completed += 1;
            } else {
                skipped += 1;
            }

            match stop_reason {
                StopReason::Interrupted => break RunEnd::Interrupted,
                StopReason::Exhausted if !live => break RunEnd::Exhausted,
                _ => {}
            }
            if config.cycles.is_some_and(|limit| cycle >= limit) {
                break RunEnd::CycleLimit;
            }
            if !self.pause(config.cycle_pause()) {
                break RunEnd::Interrupted;
            }
        };

        log::info!("Fin : {completed} cycles analysés, {skipped} ignorés ({end:?})");
        RunOutcome {
            completed,
            skipped,
            end,
        }
    }

    /// Analyse et rapporte un cycle. `false` si le cycle est ignoré.
    fn process_cycle(&mut self, cycle: u32, samples: &[Sample], ctx: PipelineContext) -> bool {
        if samples.is_empty() {
            log::warn!("Cycle {cycle} : aucune donnée reçue, cycle ignoré");
            return false;
        }
        let analysis = CycleAnalysis::run(cycle, samples, ctx);
        let reported = report_analysis(&mut *self.reporter, &analysis);
        if !reported {
            log::warn!("Cycle {cycle} : uniquement des arrêts courts, cycle ignoré");
        }
        reported
    }

    /// Sommeil interruptible. `false` si l'arrêt a été demandé.
    fn pause(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(PAUSE_STEP.min(deadline - now));
        }
    }
}

/// Analyse en une passe d'une table enregistrée (horodatages absolus).
///
/// # Errors
/// Returns an error if the table cannot be loaded. Reporter failures are
/// logged, not returned.
pub fn run_table(
    path: &std::path::Path,
    config: &AnalyzerConfig,
    reporter: &mut dyn CycleReporter,
) -> Result<RunOutcome> {
    let samples = bd_source::replay::load_samples(path)?;
    let ctx = PipelineContext::from_config(config);
    let analysis = CycleAnalysis::run(1, &samples, ctx);

    if !report_analysis(reporter, &analysis) {
        log::warn!("{} : aucune mesure exploitable", path.display());
        return Ok(RunOutcome {
            completed: 0,
            skipped: 1,
            end: RunEnd::Exhausted,
        });
    }
    Ok(RunOutcome {
        completed: 1,
        skipped: 0,
        end: RunEnd::Exhausted,
    })
}

/// Rapport et synthèse d'une analyse. `false` si tout a été filtré.
fn report_analysis(reporter: &mut dyn CycleReporter, analysis: &CycleAnalysis) -> bool {
    let Some(result) = analysis.result() else {
        return false;
    };
    let ctx = analysis.context();
    if let Err(e) = report(reporter, &result, ctx) {
        log::error!("Cycle {} : échec du rapport : {e:#}", result.cycle_index);
    }
    summary::log_summary(&result, &ctx.thresholds, analysis.raw_count());
    true
}

/// Passe un cycle analysé à tous les rendus du reporter.
///
/// # Errors
/// Returns the first reporter error.
pub fn report(
    reporter: &mut dyn CycleReporter,
    result: &bd_analysis::CycleResult,
    ctx: &PipelineContext,
) -> Result<()> {
    let cycle = result.cycle_index;
    reporter.write_cycle_csv(cycle, &result.samples)?;
    reporter.write_cycle_stats(cycle, &result.stats)?;
    reporter.render_distribution_chart(cycle, &result.samples, &ctx.thresholds)?;
    reporter.render_devices_per_minute_chart(cycle, &result.devices_per_minute)?;
    Ok(())
}
