// HTTP APIs: telemetry ingestion and provisioning

mod provisioning;
mod telemetry;

pub use provisioning::{create_provisioning_router, ProvisioningAppState};
pub use telemetry::{create_telemetry_router, TelemetryAppState};
