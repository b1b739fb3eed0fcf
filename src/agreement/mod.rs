use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

mod store;

pub use store::AgreementStore;

/// A rental agreement binding one asset to one customer for a time window.
///
/// Agreements are provisioned by an external system and immutable once
/// accepted into the store. The window is half-open: an agreement is active
/// for instants `t` with `start_time <= t < end_time`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agreement {
    /// Unique agreement identifier
    pub id: String,

    /// Identifier of the monitored vehicle
    pub asset_id: String,

    /// Identifier of the responsible customer
    pub customer_id: String,

    /// Speed limit in the same unit as incoming samples
    pub speed_limit: f64,

    /// Start of the rental window (inclusive)
    pub start_time: DateTime<Utc>,

    /// End of the rental window (exclusive)
    pub end_time: DateTime<Utc>,
}

/// Validation errors for provisioned agreements
#[derive(Debug, Clone, PartialEq)]
pub enum AgreementError {
    MissingId,
    MissingAssetId,
    MissingCustomerId,
    InvalidSpeedLimit(f64),
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl fmt::Display for AgreementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgreementError::MissingId => write!(f, "agreement id is required"),
            AgreementError::MissingAssetId => write!(f, "assetId is required"),
            AgreementError::MissingCustomerId => write!(f, "customerId is required"),
            AgreementError::InvalidSpeedLimit(v) => {
                write!(f, "speedLimit must be a finite positive number, got {}", v)
            }
            AgreementError::InvalidWindow { start, end } => {
                write!(f, "startTime {} must precede endTime {}", start, end)
            }
        }
    }
}

impl std::error::Error for AgreementError {}

impl Agreement {
    /// Validates a provisioned agreement before it enters the store.
    ///
    /// Rules:
    /// - id, assetId, customerId must be non-empty
    /// - speedLimit must be finite and positive
    /// - startTime must precede endTime
    pub fn validate(&self) -> Result<(), AgreementError> {
        if self.id.is_empty() {
            return Err(AgreementError::MissingId);
        }
        if self.asset_id.is_empty() {
            return Err(AgreementError::MissingAssetId);
        }
        if self.customer_id.is_empty() {
            return Err(AgreementError::MissingCustomerId);
        }
        if !self.speed_limit.is_finite() || self.speed_limit <= 0.0 {
            return Err(AgreementError::InvalidSpeedLimit(self.speed_limit));
        }
        if self.start_time >= self.end_time {
            return Err(AgreementError::InvalidWindow {
                start: self.start_time,
                end: self.end_time,
            });
        }
        Ok(())
    }

    /// True when `now` falls inside the half-open rental window.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now < self.end_time
    }
}
