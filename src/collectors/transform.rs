//! Maps the Protect bootstrap document onto the fixed metric families.
//!
//! The transform either yields a complete [`MetricSet`] or fails as a whole;
//! a half-populated set never leaves this module.

use super::{Family, MetricSet, MetricSetBuilder};
use serde::Deserialize;
use serde_json::Value;

/// Ordinal health code: good / connected.
pub const STATE_GOOD: f64 = 2.0;
/// Ordinal health code: transitional.
pub const STATE_TRANSITIONAL: f64 = 1.0;
/// Ordinal health code: bad / disconnected.
pub const STATE_BAD: f64 = 0.0;
/// Ordinal health code: unrecognised value.
pub const STATE_UNKNOWN: f64 = -1.0;

/// Output of one successful transform.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub metrics: MetricSet,
    /// Non-fatal oddities worth logging, e.g. unrecognised camera states.
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Bootstrap {
    nvr: Nvr,
    #[serde(default)]
    cameras: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Nvr {
    id: String,
    name: String,
    host: String,
    mac: String,
    hard_drive_state: Value,
    system_info: SystemInfo,
}

#[derive(Debug, Deserialize)]
struct SystemInfo {
    cpu: Cpu,
    memory: Memory,
    ustorage: UStorage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Cpu {
    average_load: f64,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct Memory {
    free: f64,
    available: f64,
    total: f64,
}

#[derive(Debug, Deserialize)]
struct UStorage {
    disks: Vec<Disk>,
    space: Vec<Space>,
}

#[derive(Debug, Deserialize)]
struct Disk {
    #[serde(default)]
    slot: Value,
    #[serde(default)]
    model: Value,
    #[serde(default)]
    healthy: Value,
    #[serde(default)]
    state: Value,
    size: Option<f64>,
    poweronhrs: Option<f64>,
    temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Space {
    device: Value,
    health: Value,
    action: Value,
    space_type: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Camera {
    connection_host: String,
    name: Value,
    host: Value,
    mac: Value,
    state: Value,
    stats: CameraStats,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CameraStats {
    rx_bytes: f64,
    tx_bytes: f64,
}

/// Render a JSON scalar as a label value. Null and absent fields become "".
pub fn label_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn hard_drive_state_value(state: &Value) -> f64 {
    if state.as_str() == Some("ok") {
        STATE_GOOD
    } else {
        STATE_BAD
    }
}

pub fn disk_health_value(healthy: &Value) -> f64 {
    if healthy.as_str() == Some("good") {
        STATE_GOOD
    } else {
        STATE_BAD
    }
}

pub fn space_health_value(health: &Value) -> f64 {
    if health.as_str() == Some("health") {
        STATE_GOOD
    } else {
        STATE_BAD
    }
}

/// Camera connection state, `None` when the device reports something unknown.
pub fn camera_state_value(state: &Value) -> Option<f64> {
    match state.as_str() {
        Some("CONNECTED") => Some(STATE_GOOD),
        Some("CONNECTING") => Some(STATE_TRANSITIONAL),
        Some("DISCONNECTED") => Some(STATE_BAD),
        _ => None,
    }
}

/// Build a complete replacement of every family from one bootstrap document.
pub fn transform(doc: &Value) -> Result<Transformed, serde_json::Error> {
    let bootstrap = Bootstrap::deserialize(doc)?;
    let nvr = &bootstrap.nvr;
    let info = &nvr.system_info;

    let basic = vec![
        nvr.id.clone(),
        nvr.name.clone(),
        nvr.host.clone(),
        nvr.mac.clone(),
    ];
    let with = |extra: &[&Value]| -> Vec<String> {
        let mut labels = basic.clone();
        labels.extend(extra.iter().map(|v| label_value(v)));
        labels
    };

    let mut out = MetricSetBuilder::new();
    let mut warnings = Vec::new();

    // CPU
    out.push(Family::CpuLoad, basic.clone(), info.cpu.average_load);
    out.push(Family::CpuTemperature, basic.clone(), info.cpu.temperature);

    // Hard drive
    out.push(
        Family::HardDriveState,
        with(&[&nvr.hard_drive_state]),
        hard_drive_state_value(&nvr.hard_drive_state),
    );

    for disk in &info.ustorage.disks {
        let labels = with(&[&disk.slot, &disk.model, &disk.healthy, &disk.state]);
        out.push(
            Family::HardDiskHealth,
            labels.clone(),
            disk_health_value(&disk.healthy),
        );
        out.push(
            Family::HardDiskSize,
            labels.clone(),
            disk.size.unwrap_or(0.0),
        );
        out.push(
            Family::HardDiskPowerOnHours,
            labels.clone(),
            disk.poweronhrs.unwrap_or(0.0),
        );
        out.push(
            Family::HardDiskTemperature,
            labels,
            disk.temperature.unwrap_or(0.0),
        );
    }

    for space in &info.ustorage.space {
        out.push(
            Family::StorageHealth,
            with(&[&space.device, &space.health, &space.action, &space.space_type]),
            space_health_value(&space.health),
        );
    }

    // Memory
    out.push(Family::MemoryFree, basic.clone(), info.memory.free);
    out.push(Family::MemoryAvailable, basic.clone(), info.memory.available);
    out.push(Family::MemoryTotal, basic.clone(), info.memory.total);

    // Cameras: only those attached to this NVR, others belong to a sibling collector
    for raw in &bootstrap.cameras {
        if raw.get("connectionHost").and_then(Value::as_str) != Some(nvr.host.as_str()) {
            continue;
        }
        let cam = Camera::deserialize(raw)?;
        let cam_labels = vec![
            nvr.name.clone(),
            cam.connection_host.clone(),
            label_value(&cam.name),
            label_value(&cam.host),
            label_value(&cam.mac),
        ];

        out.push(Family::CamRxBytes, cam_labels.clone(), cam.stats.rx_bytes);
        out.push(Family::CamTxBytes, cam_labels.clone(), cam.stats.tx_bytes);

        let state = camera_state_value(&cam.state).unwrap_or_else(|| {
            warnings.push(format!("Unknown camera state: {}", label_value(&cam.state)));
            STATE_UNKNOWN
        });
        let mut state_labels = cam_labels;
        state_labels.push(label_value(&cam.state));
        out.push(Family::CamState, state_labels, state);
    }

    Ok(Transformed {
        metrics: out.build(),
        warnings,
    })
}
