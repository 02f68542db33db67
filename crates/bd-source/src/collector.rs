// Collecteur d'un cycle :
//   - `spawn_collector` : lance le thread lecteur, retourne un `CollectorHandle`
//   - `run_collection`  : boucle poll → lignes → parseur → canal, jusqu'à
//                         l'échéance, l'arrêt utilisateur, l'épuisement ou une
//                         erreur d'E/S
//   - `SourceGuard`     : ferme la source exactement une fois, quel que soit
//                         le chemin de sortie (y compris panic)

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bd_core::Sample;
use bd_core::clock::Clock;
use bd_core::traits::LineSource;
use chrono::NaiveDateTime;

use crate::assembler::LineAssembler;
use crate::parser::{LineParser, ParseStats};

/// Raison de fin de collecte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Durée de collecte écoulée.
    Deadline,
    /// Arrêt demandé (Ctrl+C).
    Interrupted,
    /// Source finie entièrement lue.
    Exhausted,
    /// Erreur d'E/S : le cycle s'arrête, les mesures déjà lues sont gardées.
    IoError(String),
}

/// Paramètres d'une collecte.
#[derive(Clone, Copy, Debug)]
pub struct CollectorSettings {
    /// Origine des offsets millisecondes du firmware.
    pub cycle_start: NaiveDateTime,
    /// Durée maximale de collecte.
    pub duration: Duration,
    /// Pause entre deux `poll` sans données.
    pub poll_interval: Duration,
}

/// Bilan du thread lecteur.
#[derive(Clone, Debug)]
pub struct CollectReport {
    pub stop_reason: StopReason,
    pub stats: ParseStats,
    /// Octets d'une ligne incomplète abandonnés à l'arrêt.
    pub discarded_bytes: usize,
    pub elapsed: Duration,
}

/// Mesures d'un cycle terminé, dans l'ordre de décodage.
#[derive(Debug)]
pub struct CollectedCycle {
    pub samples: Vec<Sample>,
    pub report: CollectReport,
}

/// Ferme la source au drop et baisse le drapeau de collecte.
/// `close()` n'est appelé qu'une fois.
struct SourceGuard {
    source: Box<dyn LineSource>,
    collecting: Arc<AtomicBool>,
    closed: bool,
}

impl SourceGuard {
    fn new(source: Box<dyn LineSource>, collecting: Arc<AtomicBool>) -> Self {
        Self {
            source,
            collecting,
            closed: false,
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.source.close();
            self.collecting.store(false, Ordering::Release);
        }
    }
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        self.close();
    }
}

/// Poignée sur le thread lecteur d'un cycle.
pub struct CollectorHandle {
    thread: JoinHandle<CollectReport>,
    samples: flume::Receiver<Sample>,
    collecting: Arc<AtomicBool>,
}

impl CollectorHandle {
    /// `true` tant que la source est ouverte.
    #[must_use]
    pub fn is_collecting(&self) -> bool {
        self.collecting.load(Ordering::Acquire)
    }

    /// Attend la fin du thread lecteur puis vide le tampon du cycle.
    ///
    /// # Errors
    /// Returns an error if the reader thread panicked. The source has still
    /// been closed by its guard.
    pub fn join(self) -> anyhow::Result<CollectedCycle> {
        let report = self
            .thread
            .join()
            .map_err(|_| anyhow::anyhow!("Le thread de collecte a paniqué"))?;
        let samples: Vec<Sample> = self.samples.drain().collect();
        Ok(CollectedCycle { samples, report })
    }
}

/// Lance le thread lecteur d'un cycle.
///
/// `stop` est le drapeau d'arrêt partagé (Ctrl+C), observé à chaque tour.
/// `tap` reçoit une copie de chaque mesure pour un abonné externe ; il ne
/// bloque jamais le lecteur.
///
/// # Errors
/// Returns an error if the OS refuses to spawn the thread.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::AtomicBool;
/// use std::time::Duration;
/// use bd_core::clock::SystemClock;
/// use bd_source::collector::{spawn_collector, CollectorSettings, StopReason};
/// use bd_source::replay::ReplaySource;
///
/// let source = ReplaySource::from_bytes("mem", b"0,-60\n100,-61\n".to_vec());
/// let settings = CollectorSettings {
///     cycle_start: chrono::Local::now().naive_local(),
///     duration: Duration::from_secs(5),
///     poll_interval: Duration::from_millis(10),
/// };
/// let handle = spawn_collector(
///     Box::new(source), settings, Arc::new(SystemClock), Arc::new(AtomicBool::new(false)), None,
/// ).unwrap();
/// let cycle = handle.join().unwrap();
/// assert_eq!(cycle.samples.len(), 2);
/// assert_eq!(cycle.report.stop_reason, StopReason::Exhausted);
/// ```
pub fn spawn_collector(
    source: Box<dyn LineSource>,
    settings: CollectorSettings,
    clock: Arc<dyn Clock>,
    stop: Arc<AtomicBool>,
    tap: Option<flume::Sender<Sample>>,
) -> anyhow::Result<CollectorHandle> {
    let (tx, rx) = flume::unbounded();
    let collecting = Arc::new(AtomicBool::new(true));
    let name = source.name().to_string();
    // Gardée avant le spawn : un échec de création ferme quand même la source
    let guard = SourceGuard::new(source, Arc::clone(&collecting));

    let thread = thread::Builder::new()
        .name("bd-collector".to_string())
        .spawn(move || run_collection(guard, settings, clock.as_ref(), &stop, &tx, tap.as_ref()))?;

    log::debug!("Collecte démarrée sur {name} pour {:?}", settings.duration);
    Ok(CollectorHandle {
        thread,
        samples: rx,
        collecting,
    })
}

fn run_collection(
    mut guard: SourceGuard,
    settings: CollectorSettings,
    clock: &dyn Clock,
    stop: &AtomicBool,
    tx: &flume::Sender<Sample>,
    tap: Option<&flume::Sender<Sample>>,
) -> CollectReport {
    let mut assembler = LineAssembler::default();
    let mut parser = LineParser::new(settings.cycle_start);
    let mut chunk = Vec::with_capacity(4096);
    let mut lines = Vec::new();
    let started = Instant::now();

    let stop_reason = loop {
        if stop.load(Ordering::Relaxed) {
            break StopReason::Interrupted;
        }

        chunk.clear();
        match guard.source.poll(&mut chunk) {
            Ok(0) => {}
            Ok(_) => {
                assembler.push(&chunk);
                assembler.drain_lines(&mut lines);
                for line in lines.drain(..) {
                    let Some(sample) = parser.feed(&line, clock.now()) else {
                        continue;
                    };
                    // Le récepteur vit dans le CollectorHandle : un envoi raté
                    // signifie que plus personne n'attend ce cycle.
                    let _ = tx.send(sample);
                    if let Some(tap) = tap
                        && let Err(flume::TrySendError::Full(_)) = tap.try_send(sample)
                    {
                        log::trace!("Abonné saturé, mesure non relayée");
                    }
                }
            }
            Err(e) => {
                log::warn!("Erreur de lecture sur {} : {e}", guard.source.name());
                break StopReason::IoError(e.to_string());
            }
        }

        if guard.source.is_exhausted() {
            break StopReason::Exhausted;
        }
        if started.elapsed() >= settings.duration {
            break StopReason::Deadline;
        }
        thread::sleep(settings.poll_interval);
    };

    guard.close();
    let discarded_bytes = assembler.discard_partial();
    let stats = parser.stats();
    log::debug!(
        "Collecte terminée ({stop_reason:?}) : {} mesures, {} lignes de service, {} rejetées",
        stats.samples,
        stats.control,
        stats.malformed
    );

    CollectReport {
        stop_reason,
        stats,
        discarded_bytes,
        elapsed: started.elapsed(),
    }
}
