pub mod build;
pub mod client;
pub mod edition;
pub mod health;
pub mod pool;
pub mod registry;

pub use build::{build_client, BuildError};
pub use client::{ClusterClient, ClusterFacts};
pub use edition::{Edition, EditionCache};
pub use health::HealthSupervisor;
pub use pool::{ClientPool, PoolError};
pub use registry::RegistryWatcher;
