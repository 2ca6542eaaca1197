use super::transform::transform;
use super::{Family, MetricFamily, MetricSet};
use crate::errors::NvrError;
use crate::session::{DeviceApi, HttpDeviceApi, Session};
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Fetch+transform attempts per scheduled refresh.
pub const REFRESH_ATTEMPTS: u32 = 2;

pub const DEFAULT_STALENESS: Duration = Duration::from_secs(15);

/// One published, fully built metric set and when it was produced.
#[derive(Debug)]
pub struct Snapshot {
    pub metrics: MetricSet,
    pub refreshed_at: Instant,
    pub refreshed_wall: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Uninitialized,
    Fresh,
    Stale,
}

/// Families handed to a scrape. Empty when nothing fresh is available.
#[derive(Debug, Clone, Default)]
pub struct Families(Option<Arc<Snapshot>>);

impl Families {
    pub fn iter(&self) -> std::slice::Iter<'_, MetricFamily> {
        let families: &[MetricFamily] = match &self.0 {
            Some(snapshot) => snapshot.metrics.families(),
            None => &[],
        };
        families.iter()
    }

    pub fn get(&self, family: Family) -> Option<&MetricFamily> {
        self.0.as_ref().map(|s| s.metrics.get(family))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn len(&self) -> usize {
        self.iter().len()
    }
}

impl<'a> IntoIterator for &'a Families {
    type Item = &'a MetricFamily;
    type IntoIter = std::slice::Iter<'a, MetricFamily>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Per-device collector: refreshes from the NVR, serves the last good snapshot.
pub struct NvrCollector<A = HttpDeviceApi> {
    host: String,
    // held for a whole refresh so refreshes of one device never overlap;
    // collect() never touches it
    session: Mutex<Session<A>>,
    snapshot: ArcSwapOption<Snapshot>,
    staleness: Duration,
}

impl<A> fmt::Debug for NvrCollector<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NvrCollector")
            .field("host", &self.host)
            .field("staleness", &self.staleness)
            .finish_non_exhaustive()
    }
}

impl<A: DeviceApi> NvrCollector<A> {
    pub fn new(session: Session<A>, staleness: Duration) -> Self {
        Self {
            host: session.host().to_string(),
            session: Mutex::new(session),
            snapshot: ArcSwapOption::empty(),
            staleness,
        }
    }

    /// Poll the device and publish a new snapshot. A failed attempt is retried
    /// once; if both fail the previous snapshot stays visible and the last
    /// error is returned (already logged).
    pub async fn refresh(&self) -> Result<(), NvrError> {
        let session = self.session.lock().await;
        let mut attempt = 1;
        loop {
            match self.refresh_once(&session).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    error!(
                        host = %e.host(),
                        attempt,
                        error = %e,
                        "Unable to collect metrics from NVR"
                    );
                    if attempt >= REFRESH_ATTEMPTS {
                        return Err(e);
                    }
                    attempt += 1;
                }
            }
        }
    }

    async fn refresh_once(&self, session: &Session<A>) -> Result<(), NvrError> {
        let doc = session.fetch_status().await?;
        let transformed = transform(&doc).map_err(|e| NvrError::Protocol {
            host: self.host.clone(),
            detail: format!("malformed status document: {e}"),
        })?;

        for warning in &transformed.warnings {
            warn!(host = %self.host, "{warning}");
        }

        self.publish(transformed.metrics);
        Ok(())
    }

    fn publish(&self, metrics: MetricSet) {
        self.snapshot.store(Some(Arc::new(Snapshot {
            metrics,
            refreshed_at: Instant::now(),
            refreshed_wall: Utc::now(),
        })));
    }
}

impl<A> NvrCollector<A> {
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Current families, or nothing if the last success is too old.
    pub fn collect(&self) -> Families {
        self.collect_at(Instant::now())
    }

    pub fn collect_at(&self, now: Instant) -> Families {
        debug!(host = %self.host, "Incoming request");
        Families(self.snapshot.load_full().filter(|s| self.is_fresh(s, now)))
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness_at(Instant::now())
    }

    pub fn freshness_at(&self, now: Instant) -> Freshness {
        match self.snapshot.load_full() {
            None => Freshness::Uninitialized,
            Some(s) if self.is_fresh(&s, now) => Freshness::Fresh,
            Some(_) => Freshness::Stale,
        }
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.snapshot.load_full().map(|s| s.refreshed_wall)
    }

    /// The latest published snapshot regardless of age.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.load_full()
    }

    fn is_fresh(&self, snapshot: &Snapshot, now: Instant) -> bool {
        now.saturating_duration_since(snapshot.refreshed_at) < self.staleness
    }
}
