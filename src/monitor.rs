use crate::evaluator::ThresholdEvaluator;
use crate::telemetry::{SubscriptionHandle, TelemetryFeed};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Keeps the evaluator subscribed to the feed for every provisioned asset.
///
/// Provisioning is the single writer of the handle map (startup load and the
/// provisioning API); the feed's forwarders never touch it.
pub struct SpeedMonitor {
    feed: Arc<TelemetryFeed>,
    evaluator: Arc<ThresholdEvaluator>,
    watched: Mutex<HashMap<String, SubscriptionHandle>>,
}

impl SpeedMonitor {
    pub fn new(feed: Arc<TelemetryFeed>, evaluator: Arc<ThresholdEvaluator>) -> Self {
        Self {
            feed,
            evaluator,
            watched: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe the evaluator to one asset's samples.
    pub fn watch(&self, asset_id: &str) {
        let evaluator = Arc::clone(&self.evaluator);
        let handle = self.feed.subscribe(asset_id, move |sample| {
            evaluator.on_speed_update(&sample.asset_id, sample.speed);
        });

        self.watched
            .lock()
            .expect("monitor handle map lock poisoned")
            .insert(asset_id.to_string(), handle);
    }

    /// Stop watching one asset. Returns true if it was watched.
    pub fn unwatch(&self, asset_id: &str) -> bool {
        let handle = self
            .watched
            .lock()
            .expect("monitor handle map lock poisoned")
            .remove(asset_id);

        match handle {
            Some(h) => self.feed.unsubscribe(&h),
            None => false,
        }
    }

    /// Reconcile subscriptions with the provisioned asset set: watch assets
    /// that are new, drop assets no longer under any agreement.
    pub fn sync(&self, assets: &HashSet<String>) {
        let current: HashSet<String> = self
            .watched
            .lock()
            .expect("monitor handle map lock poisoned")
            .keys()
            .cloned()
            .collect();

        for stale in current.difference(assets) {
            self.unwatch(stale);
        }
        for fresh in assets.difference(&current) {
            self.watch(fresh);
        }

        info!(watched = assets.len(), "Monitor subscriptions synced");
    }

    pub fn watched_assets(&self) -> HashSet<String> {
        self.watched
            .lock()
            .expect("monitor handle map lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}
