use std::collections::BTreeMap;

use bd_core::{AnalyzerConfig, Sample};
use chrono::{NaiveDateTime, TimeDelta};

use crate::segmentation::delta_from_secs;

/// Identifiant des échantillons jamais affectés par le parcours.
pub const UNASSIGNED: u32 = 0;

/// Paramètres du regroupement des paquets d'un même appareil.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DedupParams {
    /// Écart RSSI maximal avec l'ancre (dBm, inclusif).
    pub rssi_tolerance: i32,
    /// Fenêtre après l'ancre (inclusive).
    pub window: TimeDelta,
    /// Au-delà, seule l'ancre forme un groupe.
    pub max_packets: usize,
}

impl Default for DedupParams {
    fn default() -> Self {
        Self {
            rssi_tolerance: 5,
            window: TimeDelta::seconds(2),
            max_packets: 5,
        }
    }
}

impl DedupParams {
    #[must_use]
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            rssi_tolerance: config.dedup_rssi_tolerance,
            window: delta_from_secs(config.dedup_window_secs),
            max_packets: config.dedup_max_packets,
        }
    }
}

/// Un appareil présumé : les paquets regroupés et leur représentant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceCluster {
    /// [`UNASSIGNED`] for the bucket of skipped samples.
    pub id: u32,
    /// Positions in [`Deduplication::sorted`], ascending.
    pub members: Vec<usize>,
    /// First member by sort position.
    pub representative: Sample,
}

impl DeviceCluster {
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Résultat du dédoublonnage d'un cycle.
#[derive(Clone, Debug, Default)]
pub struct Deduplication {
    sorted: Vec<Sample>,
    assignments: Vec<u32>,
    clusters: Vec<DeviceCluster>,
}

impl Deduplication {
    /// Input samples, stable-sorted by timestamp.
    #[must_use]
    pub fn sorted(&self) -> &[Sample] {
        &self.sorted
    }

    /// Cluster id of each sorted sample.
    #[must_use]
    pub fn assignments(&self) -> &[u32] {
        &self.assignments
    }

    /// Clusters ordered by id.
    #[must_use]
    pub fn clusters(&self) -> &[DeviceCluster] {
        &self.clusters
    }

    #[must_use]
    pub fn device_count(&self) -> usize {
        self.clusters.len()
    }

    #[must_use]
    pub fn representatives(&self) -> Vec<Sample> {
        self.clusters.iter().map(|c| c.representative).collect()
    }
}

/// Regroupe les paquets proches en temps et en RSSI.
///
/// Parcours par index sur la série triée. L'ancre `i` retient comme candidats
/// tous les échantillons (de toute la série) dans `[t0, t0 + window]` et à
/// `rssi_tolerance` près. Si leur nombre ne dépasse pas `max_packets`, ils
/// reçoivent tous le nouvel identifiant et `i` avance de ce nombre ; sinon
/// seule l'ancre le reçoit et `i` avance de 1. L'identifiant augmente à
/// chaque itération.
///
/// Une affectation écrase la précédente. Les échantillons sautés sans
/// jamais être affectés restent dans le groupe [`UNASSIGNED`], qui compte
/// comme un groupe.
///
/// # Example
/// ```
/// use bd_analysis::dedup::{cluster_devices, DedupParams};
/// use bd_core::Sample;
/// use chrono::{NaiveDate, TimeDelta};
///
/// let t0 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let samples: Vec<Sample> = [(0, -40), (0, -42), (1, -41), (1, -80), (1, -81), (5, -40)]
///     .iter()
///     .map(|&(s, r)| Sample::new(t0 + TimeDelta::seconds(s), r))
///     .collect();
/// let dedup = cluster_devices(&samples, &DedupParams::default());
/// assert_eq!(dedup.device_count(), 3);
/// ```
#[must_use]
pub fn cluster_devices(samples: &[Sample], params: &DedupParams) -> Deduplication {
    let mut sorted = samples.to_vec();
    sorted.sort_by_key(|s| s.timestamp);

    let n = sorted.len();
    let tolerance = params.rssi_tolerance.max(0).unsigned_abs();
    let mut assignments = vec![UNASSIGNED; n];
    let mut next_id: u32 = 1;
    let mut i = 0;

    while i < n {
        let anchor = sorted[i];
        let horizon = anchor
            .timestamp
            .checked_add_signed(params.window)
            .unwrap_or(NaiveDateTime::MAX);
        // Série triée : la fenêtre temporelle est une tranche contiguë
        let lo = sorted.partition_point(|s| s.timestamp < anchor.timestamp);
        let hi = sorted.partition_point(|s| s.timestamp <= horizon);
        let candidates: Vec<usize> = (lo..hi)
            .filter(|&j| sorted[j].rssi.abs_diff(anchor.rssi) <= tolerance)
            .collect();

        if candidates.len() <= params.max_packets {
            for &j in &candidates {
                assignments[j] = next_id;
            }
            i += candidates.len().max(1);
        } else {
            assignments[i] = next_id;
            i += 1;
        }
        next_id += 1;
    }

    let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (idx, &id) in assignments.iter().enumerate() {
        groups.entry(id).or_default().push(idx);
    }
    let clusters: Vec<DeviceCluster> = groups
        .into_iter()
        .map(|(id, members)| DeviceCluster {
            id,
            representative: sorted[members[0]],
            members,
        })
        .collect();

    if let Some(skipped) = clusters.iter().find(|c| c.id == UNASSIGNED) {
        log::debug!("{} paquets jamais affectés (groupe 0)", skipped.len());
    }
    log::debug!("Dédoublonnage : {n} paquets -> {} appareils", clusters.len());

    Deduplication {
        sorted,
        assignments,
        clusters,
    }
}

/// Représentants des appareils distincts, ordonnés par identifiant de groupe.
#[must_use]
pub fn unique_devices(samples: &[Sample], params: &DedupParams) -> Vec<Sample> {
    cluster_devices(samples, params).representatives()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(secs: i64, rssi: i32) -> Sample {
        let t0 = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        Sample::new(t0 + TimeDelta::seconds(secs), rssi)
    }

    #[test]
    fn reference_scenario_gives_three_devices() {
        let samples = [at(0, -40), at(0, -42), at(1, -41), at(1, -80), at(1, -81), at(5, -40)];
        let dedup = cluster_devices(&samples, &DedupParams::default());
        assert_eq!(dedup.device_count(), 3);
        assert_eq!(dedup.assignments(), &[1, 1, 1, 2, 2, 3]);
        let reps: Vec<i32> = dedup.representatives().iter().map(|s| s.rssi).collect();
        assert_eq!(reps, vec![-40, -80, -40]);
    }

    #[test]
    fn overflow_assigns_only_the_anchor() {
        // 7 paquets identiques dans la fenêtre, max 5
        let samples: Vec<Sample> = (0..7).map(|_| at(0, -60)).collect();
        let dedup = cluster_devices(&samples, &DedupParams::default());
        // chaque ancre déborde : un groupe de taille 1 par paquet
        assert_eq!(dedup.device_count(), 7);
        assert!(dedup.clusters().iter().all(|c| c.len() == 1));
    }

    #[test]
    fn skipped_samples_form_the_unassigned_bucket() {
        // Ancre 0 : candidats {0, 1, 3} -> i saute à 3, le paquet 2 n'est
        // jamais ancre ni candidat.
        let samples = [at(0, -60), at(0, -61), at(1, -75), at(1, -60)];
        let dedup = cluster_devices(&samples, &DedupParams::default());
        assert_eq!(dedup.assignments(), &[1, 1, 0, 2]);
        assert_eq!(dedup.device_count(), 3);
        assert_eq!(dedup.clusters()[0].id, UNASSIGNED);
        assert_eq!(dedup.clusters()[0].representative.rssi, -75);
    }

    #[test]
    fn later_assignment_overwrites_earlier_one() {
        // Ancre 0 : candidats {0, 2} -> groupe 1, i = 2.
        // Ancre 2 (t=1) : candidats {2, 3} -> groupe 2 écrase 2, i = 4.
        let samples = [at(0, -60), at(0, -90), at(1, -63), at(2, -67)];
        let dedup = cluster_devices(&samples, &DedupParams::default());
        assert_eq!(dedup.assignments(), &[1, 0, 2, 2]);
        let sizes: Vec<usize> = dedup.clusters().iter().map(DeviceCluster::len).collect();
        assert_eq!(sizes, vec![1, 1, 2]);
    }

    #[test]
    fn never_increases_count_and_respects_cap() {
        let params = DedupParams::default();
        let samples: Vec<Sample> = (0..200)
            .map(|i| at(i / 3, -50 - (i * 7 % 23) as i32))
            .collect();
        let dedup = cluster_devices(&samples, &params);
        assert!(dedup.device_count() <= samples.len());
        let total: usize = dedup.clusters().iter().map(DeviceCluster::len).sum();
        assert_eq!(total, samples.len());
        for c in dedup.clusters().iter().filter(|c| c.id != UNASSIGNED) {
            assert!(c.len() <= params.max_packets, "cluster {} too large", c.id);
        }
    }

    #[test]
    fn representative_is_first_member() {
        let samples = [at(3, -50), at(2, -52), at(2, -51)];
        let dedup = cluster_devices(&samples, &DedupParams::default());
        assert_eq!(dedup.device_count(), 1);
        // tri stable : (2, -52) précède (2, -51)
        assert_eq!(dedup.clusters()[0].representative, at(2, -52));
    }

    #[test]
    fn empty_input_has_no_device() {
        assert!(unique_devices(&[], &DedupParams::default()).is_empty());
    }
}
