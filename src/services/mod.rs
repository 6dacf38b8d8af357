//! Service façade: typed operations composing the backend clients

pub mod automation;
pub mod health;
pub mod models;
pub mod observability;

pub use automation::AutomationService;
pub use health::{HealthOracle, JobIdMinter, PlaybookResultProvider, SimulatedHealth};
pub use observability::ObservabilityService;
