//! Explicit registry of device collectors, exposed to `prometheus-client`
//! as a single custom collector.
//!
//! Several NVRs export the same family names, so families are merged across
//! devices before encoding; each descriptor is written once per scrape.

use crate::collectors::nvr::{Families, Freshness, NvrCollector};
use crate::collectors::{Family, MetricKind};
use chrono::{DateTime, Utc};
use prometheus_client::collector::Collector;
use prometheus_client::encoding::{DescriptorEncoder, EncodeMetric};
use prometheus_client::metrics::counter::ConstCounter;
use prometheus_client::metrics::gauge::ConstGauge;
use prometheus_client::metrics::MetricType;
use std::fmt;
use std::sync::Arc;

/// Read side of a device collector, as seen by the scrape path.
pub trait DeviceSource: fmt::Debug + Send + Sync + 'static {
    fn host(&self) -> &str;

    fn collect(&self) -> Families;

    fn freshness(&self) -> Freshness;

    fn last_success(&self) -> Option<DateTime<Utc>>;
}

impl<A: Send + Sync + 'static> DeviceSource for NvrCollector<A> {
    fn host(&self) -> &str {
        NvrCollector::host(self)
    }

    fn collect(&self) -> Families {
        NvrCollector::collect(self)
    }

    fn freshness(&self) -> Freshness {
        NvrCollector::freshness(self)
    }

    fn last_success(&self) -> Option<DateTime<Utc>> {
        NvrCollector::last_success(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<Arc<dyn DeviceSource>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, device: Arc<dyn DeviceSource>) {
        self.devices.push(device);
    }

    pub fn devices(&self) -> &[Arc<dyn DeviceSource>] {
        &self.devices
    }

    /// Fresh families of every device; stale and uninitialized devices are skipped.
    pub fn scrape(&self) -> Vec<Families> {
        self.devices
            .iter()
            .map(|d| d.collect())
            .filter(|f| !f.is_empty())
            .collect()
    }
}

fn metric_type(kind: MetricKind) -> MetricType {
    match kind {
        MetricKind::Gauge => MetricType::Gauge,
        MetricKind::Counter => MetricType::Counter,
    }
}

impl Collector for DeviceRegistry {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), fmt::Error> {
        let scraped = self.scrape();
        if scraped.is_empty() {
            return Ok(());
        }

        for family in Family::ALL {
            let desc = family.desc();
            let mut family_encoder =
                encoder.encode_descriptor(desc.name, desc.help, None, metric_type(desc.kind))?;

            for device in &scraped {
                let Some(samples) = device.get(family) else {
                    continue;
                };
                for (labels, value) in samples.labeled_samples() {
                    let sample_encoder = family_encoder.encode_family(&labels)?;
                    match desc.kind {
                        MetricKind::Gauge => ConstGauge::new(value).encode(sample_encoder)?,
                        MetricKind::Counter => ConstCounter::new(value).encode(sample_encoder)?,
                    }
                }
            }
        }
        Ok(())
    }
}
