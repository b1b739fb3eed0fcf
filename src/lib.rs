// Rental agreement model and active-agreement lookup
pub mod agreement;

// Device token resolution (customer -> handset)
pub mod directory;

// Threshold evaluation of speed samples
pub mod evaluator;

// Per-asset telemetry subscriptions and sample delivery
pub mod telemetry;

// Push notification construction and dispatch
pub mod notify;

// Feed <-> evaluator wiring for provisioned assets
pub mod monitor;

// HTTP API for sample ingestion and provisioning
pub mod api;

// Configuration and startup provisioning
pub mod config;
