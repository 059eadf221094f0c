// Deployment control plane
//
// Everything that decides which physical index an alias points at lives
// here: color assignment, timestamped index lifecycle, readiness probing,
// and the coordinator that sequences swap / rollback / cleanup. The session
// manager builds on these pieces for streaming ingest.

mod alias;
mod color;
mod coordinator;
mod health;
pub mod ingest;
mod lifecycle;
mod state;

pub use alias::AliasRegistry;
pub use color::Color;
pub use coordinator::DeploymentCoordinator;
pub use health::{HealthProbe, ProbeStats, WaitOptions};
pub use lifecycle::IndexLifecycle;
pub use state::{timestamp_from_name, DeploymentState, DeploymentStatus, Strategy};
