use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// One observed speed reading, stamped at receipt.
#[derive(Clone, Debug)]
pub struct SpeedSample {
    /// UUIDv7 identifier (time-ordered, for log correlation)
    pub sample_id: String,
    pub asset_id: String,
    pub speed: f64,
    pub received_at: DateTime<Utc>,
}

/// Returned by `subscribe`; required to unsubscribe.
///
/// Carries a generation token so a handle from a replaced subscription
/// cannot tear down its replacement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionHandle {
    asset_id: String,
    token: u64,
}

impl SubscriptionHandle {
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }
}

/// Result of offering a sample to the feed.
#[derive(Clone, Debug, PartialEq)]
pub enum EmitOutcome {
    /// Sample queued for the asset's observer
    Accepted(String),
    /// No observer registered for the asset — a normal state
    NoObserver,
    /// The asset's channel is full; the sample was dropped
    QueueFull,
}

struct AssetSubscription {
    token: u64,
    tx: mpsc::Sender<SpeedSample>,
    forwarder: JoinHandle<()>,
}

/// Per-asset speed sample fan-in.
///
/// Each subscribed asset gets a bounded channel and one forwarder task that
/// invokes the observer once per sample, in emission order. Samples for
/// distinct assets are processed in parallel; samples for one asset are
/// serialized through its single forwarder. `emit` never blocks the caller:
/// a full channel drops the sample with a warning.
///
/// At most one observer per asset: a second `subscribe` replaces the first,
/// which then receives no further samples.
pub struct TelemetryFeed {
    subscriptions: DashMap<String, AssetSubscription>,
    capacity: usize,
    next_token: AtomicU64,
}

impl TelemetryFeed {
    /// `capacity` bounds each asset's in-flight sample queue.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscriptions: DashMap::new(),
            capacity: capacity.max(1),
            next_token: AtomicU64::new(1),
        }
    }

    /// Register the observer for an asset, replacing any prior one.
    pub fn subscribe(
        &self,
        asset_id: &str,
        mut observer: impl FnMut(SpeedSample) + Send + 'static,
    ) -> SubscriptionHandle {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, mut rx) = mpsc::channel(self.capacity);

        let forwarder = tokio::spawn(async move {
            while let Some(sample) = rx.recv().await {
                observer(sample);
            }
        });

        let previous = self.subscriptions.insert(
            asset_id.to_string(),
            AssetSubscription {
                token,
                tx,
                forwarder,
            },
        );

        if let Some(prev) = previous {
            warn!(
                asset_id = %asset_id,
                "Observer replaced; prior observer detached"
            );
            prev.forwarder.abort();
        }

        debug!(asset_id = %asset_id, "Observer subscribed");

        SubscriptionHandle {
            asset_id: asset_id.to_string(),
            token,
        }
    }

    /// Remove a subscription. Stale handles (from a replaced subscription)
    /// are ignored and return false.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let removed = self
            .subscriptions
            .remove_if(&handle.asset_id, |_, sub| sub.token == handle.token);

        match removed {
            Some((asset_id, sub)) => {
                sub.forwarder.abort();
                debug!(asset_id = %asset_id, "Observer unsubscribed");
                true
            }
            None => false,
        }
    }

    /// Offer a speed reading for an asset.
    ///
    /// Stamps a `SpeedSample` (UUIDv7 id, receipt time) and queues it for
    /// the asset's observer. Never blocks.
    pub fn emit(&self, asset_id: &str, speed: f64) -> EmitOutcome {
        let entry = match self.subscriptions.get(asset_id) {
            Some(e) => e,
            None => {
                debug!(asset_id = %asset_id, "Sample for unobserved asset, dropping");
                return EmitOutcome::NoObserver;
            }
        };

        let sample = SpeedSample {
            sample_id: Uuid::now_v7().to_string(),
            asset_id: asset_id.to_string(),
            speed,
            received_at: Utc::now(),
        };
        let sample_id = sample.sample_id.clone();

        match entry.tx.try_send(sample) {
            Ok(()) => EmitOutcome::Accepted(sample_id),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(asset_id = %asset_id, "Telemetry channel full, dropping sample");
                EmitOutcome::QueueFull
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // Forwarder is gone but the entry lingers (e.g. aborted task)
                debug!(asset_id = %asset_id, "Telemetry channel closed, dropping sample");
                EmitOutcome::NoObserver
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }
}
