pub mod fixtures;
pub mod repositories;

pub use fixtures::{RequestSeedInfo, SeedDataset, SeedResult, VerificationResult};
pub use repositories::{
    DecisionCommand, InMemoryRequestRepository, RepositoryError, RequestRepository, ViewLimits,
};
