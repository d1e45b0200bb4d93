pub mod core;
pub mod distribution;
pub mod environment;
pub mod orchestration;
pub mod security;

pub use crate::core::*;
pub use distribution::{Artifact, Distributor, Uploader};
pub use environment::{GithubActionsEnvironment, MemoryEnvironment};
pub use orchestration::{DistributionPipeline, Reporter};
pub use security::{SecretMasker, ServiceAccountAuthenticator, ServiceAccountKey};
