use crate::notify::{Notification, PushDispatcher, Recipient};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Drains the notification queue and performs the push backend calls.
///
/// Runs as its own task so dispatch latency never backpressures telemetry
/// evaluation. Each notification is handled independently: a failure is
/// logged here and never propagates, and one channel's failure has no effect
/// on the next queued notification.
pub struct DispatchWorker {
    dispatcher: PushDispatcher,
    rx: mpsc::Receiver<Notification>,
}

impl DispatchWorker {
    pub fn new(dispatcher: PushDispatcher, rx: mpsc::Receiver<Notification>) -> Self {
        Self { dispatcher, rx }
    }

    pub async fn run(mut self) {
        info!("Dispatch worker started");

        while let Some(notification) = self.rx.recv().await {
            let result = match notification.recipient {
                Recipient::Company => {
                    self.dispatcher
                        .notify_company(&notification.agreement, &notification.message)
                        .await
                }
                Recipient::Customer => {
                    self.dispatcher
                        .notify_customer(&notification.agreement, &notification.message)
                        .await
                }
            };

            match result {
                Ok(()) => info!(
                    recipient = ?notification.recipient,
                    agreement_id = %notification.agreement.id,
                    asset_id = %notification.agreement.asset_id,
                    "Notification delivered"
                ),
                Err(e) => error!(
                    error = %e,
                    recipient = ?notification.recipient,
                    agreement_id = %notification.agreement.id,
                    asset_id = %notification.agreement.asset_id,
                    "Notification dispatch failed"
                ),
            }
        }

        info!("Dispatch worker stopped");
    }
}
