use crate::agreement::Agreement;
use std::fmt;

mod payload;
mod push;
mod worker;

pub use payload::{
    build_company_payload, build_customer_payload, PushData, PushMessage, PushNotification,
};
pub use push::PushDispatcher;
pub use worker::DispatchWorker;

/// Which logical channel a notification targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipient {
    /// Operating company broadcast (topic-addressed)
    Company,
    /// Responsible customer (device-addressed)
    Customer,
}

/// One pending push notification, produced by the evaluator and consumed by
/// the dispatch worker. Fire-and-forget: delivery status is observed only
/// for logging.
#[derive(Clone, Debug)]
pub struct Notification {
    pub recipient: Recipient,
    pub agreement: Agreement,
    pub message: String,
}

/// Dispatch failures, surfaced per call and logged at the worker boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// No device token registered for the customer
    UnresolvedRecipient(String),
    /// Push backend answered with a non-2xx status
    TransportRejected(u16),
    /// The call exceeded the configured per-request timeout
    TimedOut,
    /// Network-level failure before a status was received
    Unreachable(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnresolvedRecipient(customer_id) => {
                write!(f, "no device token registered for customer '{}'", customer_id)
            }
            DispatchError::TransportRejected(code) => {
                write!(f, "push backend rejected the request with status {}", code)
            }
            DispatchError::TimedOut => write!(f, "push backend call timed out"),
            DispatchError::Unreachable(detail) => {
                write!(f, "push backend unreachable: {}", detail)
            }
        }
    }
}

impl std::error::Error for DispatchError {}
