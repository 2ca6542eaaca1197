//! Prometheus exporter for UniFi Protect network video recorders.
//!
//! Each configured NVR gets its own [`collectors::nvr::NvrCollector`], refreshed
//! on its own interval by [`scheduler`]. Scrapes read the last complete
//! snapshot through [`registry::DeviceRegistry`] and never wait on a device.

pub mod collectors;
pub mod config;
pub mod errors;
pub mod registry;
pub mod scheduler;
pub mod server;
pub mod session;
