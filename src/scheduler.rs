use crate::collectors::nvr::NvrCollector;
use crate::session::DeviceApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Spawn the refresh loop of one device. Every device gets its own task, so a
/// hung NVR only delays its own refreshes. The first tick fires immediately.
pub fn spawn_refresh_loop<A>(collector: Arc<NvrCollector<A>>, period: Duration) -> JoinHandle<()>
where
    A: DeviceApi + 'static,
{
    tokio::spawn(async move {
        let mut tick = interval(period);
        // a slow refresh pushes the schedule back instead of bursting
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            host = %collector.host(),
            interval_secs = period.as_secs(),
            "Starting refresh loop"
        );

        loop {
            tick.tick().await;
            debug!(host = %collector.host(), "Refreshing");
            // failures are logged inside refresh(); the next tick retries
            if collector.refresh().await.is_ok() {
                debug!(host = %collector.host(), "Refresh done");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::nvr::DEFAULT_STALENESS;
    use crate::collectors::transform::tests::sample_doc;
    use crate::session::tests::{descriptor, ScriptedApi};
    use crate::session::{ApiResponse, Session};
    use reqwest::StatusCode;
    use std::sync::atomic::Ordering;

    #[tokio::test(start_paused = true)]
    async fn test_loop_refreshes_on_every_tick() {
        let api = Arc::new(ScriptedApi::with_bootstrap(
            (0..3)
                .map(|_| ApiResponse::new(StatusCode::OK, sample_doc().to_string()))
                .collect(),
        ));
        let collector = Arc::new(NvrCollector::new(
            Session::new(Arc::clone(&api), descriptor()),
            DEFAULT_STALENESS,
        ));

        let handle = spawn_refresh_loop(Arc::clone(&collector), Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(25)).await;
        handle.abort();

        // ticks at 0s, 10s, 20s
        assert_eq!(api.fetches.load(Ordering::SeqCst), 3);
        assert!(collector.snapshot().is_some());
    }
}
