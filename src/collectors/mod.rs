pub mod nvr;
pub mod transform;

use serde::Serialize;

/// How a family is exposed to the scraper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

/// Static description of one exposed metric family.
#[derive(Debug, PartialEq, Eq)]
pub struct FamilyDesc {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub label_names: &'static [&'static str],
}

const NVR_LABELS: &[&str] = &["id", "name", "host", "mac"];

const HDD_STATE_LABELS: &[&str] = &["id", "name", "host", "mac", "hard_disk_state"];

const DISK_LABELS: &[&str] = &[
    "id",
    "name",
    "host",
    "mac",
    "hdd_slot",
    "hdd_model",
    "hdd_health",
    "hdd_state",
];

const SPACE_LABELS: &[&str] = &[
    "id",
    "name",
    "host",
    "mac",
    "device",
    "health",
    "action",
    "space_type",
];

const CAM_LABELS: &[&str] = &["name", "host", "cameraName", "cameraHost", "cameraMac"];

const CAM_STATE_LABELS: &[&str] = &[
    "name",
    "host",
    "cameraName",
    "cameraHost",
    "cameraMac",
    "cam_state",
];

/// The fixed set of families, in exposition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    CpuLoad,
    CpuTemperature,
    HardDriveState,
    HardDiskHealth,
    HardDiskSize,
    HardDiskPowerOnHours,
    HardDiskTemperature,
    StorageHealth,
    MemoryFree,
    MemoryAvailable,
    MemoryTotal,
    CamTxBytes,
    CamRxBytes,
    CamState,
}

impl Family {
    pub const COUNT: usize = 14;

    pub const ALL: [Family; Family::COUNT] = [
        Family::CpuLoad,
        Family::CpuTemperature,
        Family::HardDriveState,
        Family::HardDiskHealth,
        Family::HardDiskSize,
        Family::HardDiskPowerOnHours,
        Family::HardDiskTemperature,
        Family::StorageHealth,
        Family::MemoryFree,
        Family::MemoryAvailable,
        Family::MemoryTotal,
        Family::CamTxBytes,
        Family::CamRxBytes,
        Family::CamState,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn desc(self) -> &'static FamilyDesc {
        &FAMILIES[self.index()]
    }
}

static FAMILIES: [FamilyDesc; Family::COUNT] = [
    FamilyDesc {
        name: "unvr_cpu_load",
        help: "CPU Average Load",
        kind: MetricKind::Gauge,
        label_names: NVR_LABELS,
    },
    FamilyDesc {
        name: "unvr_cpu_temperature",
        help: "CPU Temperature",
        kind: MetricKind::Gauge,
        label_names: NVR_LABELS,
    },
    FamilyDesc {
        name: "unvr_hard_drive_state",
        help: "NVR Hard Drive State",
        kind: MetricKind::Gauge,
        label_names: HDD_STATE_LABELS,
    },
    FamilyDesc {
        name: "unvr_hard_disk_health",
        help: "NVR Hard Disk Health",
        kind: MetricKind::Gauge,
        label_names: DISK_LABELS,
    },
    FamilyDesc {
        name: "unvr_hard_disk_size",
        help: "NVR Hard Disk Size",
        kind: MetricKind::Gauge,
        label_names: DISK_LABELS,
    },
    FamilyDesc {
        name: "unvr_hard_disk_poweronhrs",
        help: "NVR Hard Disk Power On Hours",
        kind: MetricKind::Counter,
        label_names: DISK_LABELS,
    },
    FamilyDesc {
        name: "unvr_hard_disk_temperature",
        help: "NVR Hard Disk Temperature",
        kind: MetricKind::Gauge,
        label_names: DISK_LABELS,
    },
    FamilyDesc {
        name: "unvr_storage_health",
        help: "NVR Storage Health",
        kind: MetricKind::Gauge,
        label_names: SPACE_LABELS,
    },
    FamilyDesc {
        name: "unvr_memory_free",
        help: "Memory Free",
        kind: MetricKind::Gauge,
        label_names: NVR_LABELS,
    },
    FamilyDesc {
        name: "unvr_memory_available",
        help: "Memory Available",
        kind: MetricKind::Gauge,
        label_names: NVR_LABELS,
    },
    FamilyDesc {
        name: "unvr_memory_total",
        help: "Memory Total",
        kind: MetricKind::Gauge,
        label_names: NVR_LABELS,
    },
    FamilyDesc {
        name: "unvr_cam_txbytes",
        help: "Camera TX Bytes",
        kind: MetricKind::Counter,
        label_names: CAM_LABELS,
    },
    FamilyDesc {
        name: "unvr_cam_rxbytes",
        help: "Camera RX Bytes",
        kind: MetricKind::Counter,
        label_names: CAM_LABELS,
    },
    FamilyDesc {
        name: "unvr_cam_state",
        help: "Camera Status",
        kind: MetricKind::Gauge,
        label_names: CAM_STATE_LABELS,
    },
];

/// One labeled measurement. Label values line up with the family's label names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub label_values: Vec<String>,
    pub value: f64,
}

/// A family together with the samples of one refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub family: Family,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    pub fn desc(&self) -> &'static FamilyDesc {
        self.family.desc()
    }

    /// Label (name, value) pairs of every sample, in schema order.
    pub fn labeled_samples(&self) -> impl Iterator<Item = (Vec<(&'static str, &str)>, f64)> + '_ {
        let names = self.desc().label_names;
        self.samples.iter().map(move |s| {
            let labels = names
                .iter()
                .copied()
                .zip(s.label_values.iter().map(String::as_str))
                .collect();
            (labels, s.value)
        })
    }
}

/// Complete sample sets of all families, produced by a single transform.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSet {
    families: Vec<MetricFamily>,
}

impl MetricSet {
    pub fn families(&self) -> &[MetricFamily] {
        &self.families
    }

    pub fn get(&self, family: Family) -> &MetricFamily {
        &self.families[family.index()]
    }
}

/// Accumulates samples off to the side; nothing is visible until `build`.
#[derive(Debug)]
pub struct MetricSetBuilder {
    samples: [Vec<Sample>; Family::COUNT],
}

impl MetricSetBuilder {
    pub fn new() -> Self {
        Self {
            samples: Default::default(),
        }
    }

    pub fn push(&mut self, family: Family, label_values: Vec<String>, value: f64) {
        debug_assert_eq!(
            label_values.len(),
            family.desc().label_names.len(),
            "label arity mismatch for {}",
            family.desc().name
        );
        self.samples[family.index()].push(Sample {
            label_values,
            value,
        });
    }

    pub fn build(self) -> MetricSet {
        let families = Family::ALL
            .iter()
            .zip(self.samples)
            .map(|(family, samples)| MetricFamily {
                family: *family,
                samples,
            })
            .collect();
        MetricSet { families }
    }
}

impl Default for MetricSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_order_matches_table() {
        for (i, family) in Family::ALL.iter().enumerate() {
            assert_eq!(family.index(), i);
        }
        assert_eq!(Family::CpuLoad.desc().name, "unvr_cpu_load");
        assert_eq!(Family::CamState.desc().name, "unvr_cam_state");
    }

    #[test]
    fn test_counter_families() {
        let counters: Vec<_> = Family::ALL
            .iter()
            .filter(|f| f.desc().kind == MetricKind::Counter)
            .map(|f| f.desc().name)
            .collect();
        assert_eq!(
            counters,
            vec![
                "unvr_hard_disk_poweronhrs",
                "unvr_cam_txbytes",
                "unvr_cam_rxbytes"
            ]
        );
    }

    #[test]
    fn test_builder_yields_every_family() {
        let mut builder = MetricSetBuilder::new();
        builder.push(
            Family::MemoryTotal,
            vec!["id".into(), "nvr".into(), "10.0.0.1".into(), "aa".into()],
            1024.0,
        );
        let set = builder.build();

        assert_eq!(set.families().len(), Family::COUNT);
        assert_eq!(set.get(Family::MemoryTotal).samples.len(), 1);
        assert!(set.get(Family::CpuLoad).samples.is_empty());
    }

    #[test]
    fn test_labeled_samples_pairs_names_and_values() {
        let mut builder = MetricSetBuilder::new();
        builder.push(
            Family::HardDriveState,
            vec![
                "1".into(),
                "nvr".into(),
                "10.0.0.1".into(),
                "aa".into(),
                "ok".into(),
            ],
            2.0,
        );
        let set = builder.build();
        let (labels, value) = set
            .get(Family::HardDriveState)
            .labeled_samples()
            .next()
            .unwrap();
        assert_eq!(labels[4], ("hard_disk_state", "ok"));
        assert_eq!(value, 2.0);
    }
}
