use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use bd_core::AnalyzerConfig;
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::cli::Overrides;

/// Relit le fichier et réapplique les overrides CLI.
///
/// # Errors
/// Returns an error if the file is unreadable, invalid, or the overrides
/// produce misordered thresholds.
pub fn reload(path: &Path, overrides: &Overrides) -> Result<AnalyzerConfig> {
    let mut config = bd_core::config::load_config(path)?;
    overrides.apply(&mut config)?;
    Ok(config)
}

/// Lance un thread qui surveille le fichier config et met à jour l'ArcSwap.
///
/// Retourne le Watcher (doit rester vivant tant que l'app tourne). Le cycle
/// en cours garde son instantané ; la nouvelle config vaut au cycle suivant.
///
/// # Errors
/// Returns an error if the watcher cannot be created or the path cannot be watched.
pub fn spawn_config_watcher(
    config_path: &Path,
    config: &Arc<ArcSwap<AnalyzerConfig>>,
    overrides: Overrides,
) -> Result<impl Watcher + use<>> {
    let config = Arc::clone(config);
    let path = config_path.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res
            && matches!(event.kind, EventKind::Modify(_))
        {
            match reload(&path, &overrides) {
                Ok(new_config) => {
                    config.store(Arc::new(new_config));
                    log::info!("Config rechargée depuis {}", path.display());
                }
                Err(e) => {
                    // On garde l'ancienne config.
                    log::warn!("Erreur de rechargement config : {e:#}");
                }
            }
        }
    })?;

    watcher.watch(config_path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
