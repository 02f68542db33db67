use crate::sample::ClassifiedSample;
use crate::stats::{CycleStats, MinuteCount};
use crate::zone::ZoneThresholds;

/// Fournit des octets bruts au collecteur (lien série, fichier rejoué).
///
/// Implémenté par : `SerialSource`, `ReplaySource`.
///
/// # Example
/// ```
/// use bd_core::traits::LineSource;
///
/// struct Silent;
/// impl LineSource for Silent {
///     fn poll(&mut self, _buf: &mut Vec<u8>) -> std::io::Result<usize> { Ok(0) }
///     fn name(&self) -> &str { "silent" }
///     fn is_live(&self) -> bool { true }
/// }
/// ```
pub trait LineSource: Send + 'static {
    /// Ajoute à `buf` les octets disponibles et retourne leur nombre.
    ///
    /// Ne bloque JAMAIS : retourne `Ok(0)` s'il n'y a rien à lire.
    ///
    /// # Errors
    /// Any I/O failure of the underlying link. The collector ends the
    /// current cycle early but keeps what was already parsed.
    fn poll(&mut self, buf: &mut Vec<u8>) -> std::io::Result<usize>;

    /// Nom lisible pour les logs (port ou chemin).
    fn name(&self) -> &str;

    /// Indique si la source est un flux vivant (série) ou finie (fichier).
    fn is_live(&self) -> bool;

    /// `true` une fois qu'une source finie a tout livré.
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Libère la ressource sous-jacente. Appelé exactement une fois.
    fn close(&mut self) {}
}

/// Consomme les résultats d'un cycle (tables CSV, graphiques).
///
/// Les deux rendus graphiques sont optionnels : l'implémentation par
/// défaut ne fait rien.
pub trait CycleReporter {
    /// Persist every classified sample of the cycle.
    ///
    /// # Errors
    /// Returns an error if the destination cannot be written.
    fn write_cycle_csv(&mut self, cycle: u32, rows: &[ClassifiedSample]) -> anyhow::Result<()>;

    /// Persist the cycle summary statistics.
    ///
    /// # Errors
    /// Returns an error if the destination cannot be written.
    fn write_cycle_stats(&mut self, cycle: u32, stats: &CycleStats) -> anyhow::Result<()>;

    /// Scatter of RSSI over time with the threshold lines.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    fn render_distribution_chart(
        &mut self,
        cycle: u32,
        samples: &[ClassifiedSample],
        thresholds: &ZoneThresholds,
    ) -> anyhow::Result<()> {
        let _ = (cycle, samples, thresholds);
        Ok(())
    }

    /// Devices-per-minute line chart.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    fn render_devices_per_minute_chart(
        &mut self,
        cycle: u32,
        series: &[MinuteCount],
    ) -> anyhow::Result<()> {
        let _ = (cycle, series);
        Ok(())
    }
}
