//! Connectivity probe.
//!
//! Periodically requests a small asset from the origin. Any HTTP answer
//! counts as online; only a transport failure counts as offline. Every online
//! check fires the background-sync trigger of each registered tag, so writes
//! queued while online or kept by a failed drain are retried too.

use std::sync::Arc;
use std::time::Duration;

use souk_client::{ClientHook, HookEvent, Network, Request, Worker, WorkerEvent};
use url::Url;

pub struct ConnectivityProbe {
    worker: Arc<Worker>,
    hook: ClientHook,
    target: Url,
}

impl ConnectivityProbe {
    pub fn new(worker: Arc<Worker>, hook: ClientHook, target: Url) -> Self {
        Self { worker, hook, target }
    }

    /// Whether the origin answered a probe request.
    pub async fn check(network: &dyn Network, target: &Url) -> bool {
        match network.fetch(&Request::head(target.clone())).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(target = %target, error = %e, "connectivity probe failed");
                false
            }
        }
    }

    /// Probe once and feed the result to the hook.
    ///
    /// Returns the number of sync triggers fired.
    pub async fn tick(&self) -> usize {
        let was_online = self.hook.state().is_online;
        let online = Self::check(self.worker.network().as_ref(), &self.target).await;

        self.hook
            .handle(if online { HookEvent::Online } else { HookEvent::Offline })
            .await;

        if !online {
            return 0;
        }

        let tags = self.worker.sync().registry().take_pending().await;
        for tag in &tags {
            if was_online {
                tracing::debug!(tag = %tag, "firing pending sync");
            } else {
                tracing::info!(tag = %tag, "connectivity restored, firing sync");
            }
            if let Err(e) = self.worker.dispatch(WorkerEvent::Sync(tag.to_string())).await {
                tracing::warn!(tag = %tag, error = %e, "sync trigger failed");
            }
        }
        tags.len()
    }

    pub async fn run(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }
}
