use crate::agreement::{Agreement, AgreementStore};
use crate::notify::{Notification, Recipient};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Evaluates speed samples against the active agreement's limit.
///
/// Stateless apart from its collaborators: the agreement store for lookups
/// and the notification queue for violations. Called from the per-asset
/// feed forwarders, so evaluation for one asset is naturally serialized.
pub struct ThresholdEvaluator {
    store: Arc<AgreementStore>,
    notifications: mpsc::Sender<Notification>,
}

impl ThresholdEvaluator {
    pub fn new(store: Arc<AgreementStore>, notifications: mpsc::Sender<Notification>) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Evaluate one speed sample for an asset.
    ///
    /// Non-finite or negative speeds are rejected with a warning. An asset
    /// with no active agreement is a no-op. On violation (strictly above the
    /// limit) two notifications are enqueued, company first then customer;
    /// each enqueue is attempted independently so a failure on one channel
    /// never suppresses the other.
    pub fn on_speed_update(&self, asset_id: &str, speed: f64) {
        if !speed.is_finite() || speed < 0.0 {
            warn!(
                asset_id = %asset_id,
                speed = speed,
                "Rejecting invalid speed sample"
            );
            return;
        }

        let agreement = match self.store.find_active(asset_id, Utc::now()) {
            Some(a) => a,
            None => {
                debug!(asset_id = %asset_id, "No active agreement, ignoring sample");
                return;
            }
        };

        if speed <= agreement.speed_limit {
            debug!(
                asset_id = %asset_id,
                speed = speed,
                limit = agreement.speed_limit,
                "Speed within limit"
            );
            return;
        }

        let message = format!("Speed exceeded: {:.1} > {:.1}", speed, agreement.speed_limit);
        info!(
            asset_id = %asset_id,
            agreement_id = %agreement.id,
            speed = speed,
            limit = agreement.speed_limit,
            "Speed limit exceeded"
        );

        self.enqueue(Recipient::Company, &agreement, &message);
        self.enqueue(Recipient::Customer, &agreement, &message);
    }

    fn enqueue(&self, recipient: Recipient, agreement: &Agreement, message: &str) {
        let notification = Notification {
            recipient,
            agreement: agreement.clone(),
            message: message.to_string(),
        };

        if let Err(e) = self.notifications.try_send(notification) {
            error!(
                error = %e,
                recipient = ?recipient,
                agreement_id = %agreement.id,
                "Notification queue unavailable, dropping notification"
            );
        }
    }
}
