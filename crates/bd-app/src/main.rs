use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use bd_core::clock::SystemClock;
use bd_core::traits::LineSource;
use bd_core::{AnalyzerConfig, CoreError};
use bd_export::CsvReporter;
use bd_source::replay::ReplaySource;
use clap::Parser;

pub mod cli;
pub mod hotreload;
pub mod scheduler;
pub mod summary;

use scheduler::{CycleScheduler, RunEnd};

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    // 3. Charger la config, puis les overrides CLI
    let overrides = cli::Overrides::from_cli(&cli);
    let mut config = resolve_config(&cli)?;
    overrides.apply(&mut config)?;
    log::info!(
        "Seuils{} : front={} middle={} back={}",
        if cli.has_threshold_override() { " (ligne de commande)" } else { "" },
        config.thresholds.front,
        config.thresholds.middle,
        config.thresholds.back
    );

    let mut reporter = CsvReporter::new(config.output_dir.clone());

    // 4. Table enregistrée : une seule passe, pas de collecte
    if let Some(ref table) = cli.table {
        let outcome = scheduler::run_table(table, &config, &mut reporter)?;
        log::info!("Analyse terminée : {} cycle(s)", outcome.completed);
        return Ok(());
    }

    let config = Arc::new(ArcSwap::from_pointee(config));

    // 5. Hot-reload config (thread interne notify)
    let _watcher = if cli.config.exists() {
        match hotreload::spawn_config_watcher(&cli.config, &config, overrides) {
            Ok(w) => Some(w),
            Err(e) => {
                log::warn!("Surveillance de la config impossible : {e}");
                None
            }
        }
    } else {
        None
    };

    // 6. Ctrl+C : arrêt propre en fin de poll
    let stop = Arc::new(AtomicBool::new(false));
    let s = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        log::info!("Arrêt demandé");
        s.store(true, Ordering::SeqCst);
    })
    .context("Impossible d'installer le gestionnaire Ctrl+C")?;

    // 7. Boucle de cycles
    let capture = cli.capture.clone();
    let open_source = move |config: &AnalyzerConfig| -> Result<Box<dyn LineSource>, CoreError> {
        match capture {
            Some(ref path) => Ok(Box::new(ReplaySource::open(path)?)),
            None => open_serial(config),
        }
    };
    let outcome = CycleScheduler::new(
        config,
        open_source,
        &mut reporter,
        Arc::new(SystemClock),
        stop,
    )
    .run();

    match outcome.end {
        RunEnd::SourceUnavailable(reason) => {
            anyhow::bail!("Démarrage impossible : {reason}")
        }
        RunEnd::Interrupted => log::info!("Analyse arrêtée par l'utilisateur"),
        RunEnd::CycleLimit | RunEnd::Exhausted => {}
    }
    Ok(())
}

#[cfg(feature = "serial")]
fn open_serial(config: &AnalyzerConfig) -> Result<Box<dyn LineSource>, CoreError> {
    let source = bd_source::serial::SerialSource::open(&config.port, config.baud_rate)?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "serial"))]
fn open_serial(config: &AnalyzerConfig) -> Result<Box<dyn LineSource>, CoreError> {
    Err(CoreError::SourceUnavailable {
        name: config.port.clone(),
        reason: "support série non compilé (feature `serial`)".to_string(),
    })
}

/// Resolve config: missing file means defaults.
fn resolve_config(cli: &cli::Cli) -> Result<AnalyzerConfig> {
    if cli.config.exists() {
        bd_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(AnalyzerConfig::default())
    }
}
