use std::fmt;

use chrono::NaiveDateTime;

use crate::zone::Zone;

/// Compteurs par zone pour un cycle.
///
/// # Example
/// ```
/// use bd_core::stats::ZoneCounts;
/// use bd_core::zone::Zone;
/// let mut c = ZoneCounts::default();
/// c.add(Zone::Back);
/// c.add(Zone::Noise);
/// assert_eq!(c.valid(), 1);
/// assert_eq!(c.total(), 2);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZoneCounts {
    pub front: usize,
    pub middle: usize,
    pub back: usize,
    pub noise: usize,
}

impl ZoneCounts {
    pub fn add(&mut self, zone: Zone) {
        match zone {
            Zone::Front => self.front += 1,
            Zone::Middle => self.middle += 1,
            Zone::Back => self.back += 1,
            Zone::Noise => self.noise += 1,
        }
    }

    #[must_use]
    pub fn get(&self, zone: Zone) -> usize {
        match zone {
            Zone::Front => self.front,
            Zone::Middle => self.middle,
            Zone::Back => self.back,
            Zone::Noise => self.noise,
        }
    }

    /// Front + Middle + Back.
    #[must_use]
    pub fn valid(&self) -> usize {
        self.front + self.middle + self.back
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.valid() + self.noise
    }

    /// Part de `zone` parmi les signaux valides, `None` sans signal valide.
    #[must_use]
    pub fn share(&self, zone: Zone) -> Option<f64> {
        let valid = self.valid();
        if valid == 0 || zone == Zone::Noise {
            return None;
        }
        Some(self.get(zone) as f64 / valid as f64)
    }
}

/// Verdict grossier sur la répartition des passagers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dominance {
    /// Part arrière > 60 %.
    Back,
    /// Part arrière < 30 %.
    Front,
    Mixed,
}

impl Dominance {
    /// Back share above this ratio means back-dominant.
    pub const BACK_RATIO: f64 = 0.6;
    /// Back share below this ratio means front-dominant.
    pub const FRONT_RATIO: f64 = 0.3;

    /// Verdict from zone counts. `None` when no valid signal exists.
    #[must_use]
    pub fn from_counts(counts: &ZoneCounts) -> Option<Self> {
        let back_ratio = counts.share(Zone::Back)?;
        Some(if back_ratio > Self::BACK_RATIO {
            Self::Back
        } else if back_ratio < Self::FRONT_RATIO {
            Self::Front
        } else {
            Self::Mixed
        })
    }
}

impl fmt::Display for Dominance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Back => "back-dominant",
            Self::Front => "front-dominant",
            Self::Mixed => "mixed",
        })
    }
}

/// Statistiques sommaires d'un cycle classifié.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleStats {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub count: usize,
    pub mean_rssi: f64,
    pub min_rssi: i32,
    pub max_rssi: i32,
    pub zone_counts: ZoneCounts,
    pub dominance: Option<Dominance>,
}

impl CycleStats {
    /// Span between first and last sample, in minutes.
    #[must_use]
    pub fn duration_minutes(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 60_000.0
    }
}

/// Nombre d'appareils distincts observés pendant une minute d'horloge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinuteCount {
    /// Début de la minute (secondes tronquées).
    pub minute: NaiveDateTime,
    pub devices: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(front: usize, middle: usize, back: usize, noise: usize) -> ZoneCounts {
        ZoneCounts {
            front,
            middle,
            back,
            noise,
        }
    }

    #[test]
    fn dominance_thresholds() {
        assert_eq!(Dominance::from_counts(&counts(1, 1, 8, 0)), Some(Dominance::Back));
        assert_eq!(Dominance::from_counts(&counts(5, 3, 2, 9)), Some(Dominance::Front));
        assert_eq!(Dominance::from_counts(&counts(3, 3, 4, 0)), Some(Dominance::Mixed));
        assert_eq!(Dominance::from_counts(&counts(0, 0, 0, 4)), None);
    }

    #[test]
    fn exact_ratios_are_mixed() {
        // 6/10 n'est pas > 0.6, 3/10 n'est pas < 0.3
        assert_eq!(Dominance::from_counts(&counts(2, 2, 6, 0)), Some(Dominance::Mixed));
        assert_eq!(Dominance::from_counts(&counts(4, 3, 3, 0)), Some(Dominance::Mixed));
    }

    #[test]
    fn noise_is_excluded_from_shares() {
        let c = counts(1, 1, 2, 100);
        assert_eq!(c.share(Zone::Back), Some(0.5));
        assert_eq!(c.share(Zone::Noise), None);
        assert_eq!(c.total(), 104);
    }
}
