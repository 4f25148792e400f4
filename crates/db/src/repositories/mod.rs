use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use campusflow_core::domain::{Actor, Decision, Request, RequestDraft, RequestId};
use campusflow_core::errors::{ApplicationError, DomainError};
use campusflow_core::views::{DashboardSummary, RequestFilter};

pub mod memory;

pub use memory::{InMemoryRequestRepository, ViewLimits};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("request {0} was not found")]
    NotFound(RequestId),
    #[error(
        "request {request_id} changed concurrently (expected version {expected_version}, found {actual_version})"
    )]
    Conflict { request_id: RequestId, expected_version: u64, actual_version: u64 },
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Domain(error) => Self::Domain(error),
            RepositoryError::NotFound(id) => Self::NotFound { request_id: id.0 },
            RepositoryError::Conflict { request_id, expected_version, actual_version } => {
                Self::Conflict { request_id: request_id.0, expected_version, actual_version }
            }
        }
    }
}

/// A verdict on one step, as submitted through the repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCommand {
    pub step_index: usize,
    pub decision: Decision,
    pub notes: Option<String>,
    /// Version the caller last read. A mismatch fails with `Conflict`.
    pub expected_version: Option<u64>,
    pub correlation_id: String,
}

impl DecisionCommand {
    pub fn new(step_index: usize, decision: Decision) -> Self {
        Self {
            step_index,
            decision,
            notes: None,
            expected_version: None,
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn approve(step_index: usize) -> Self {
        Self::new(step_index, Decision::Approved)
    }

    pub fn reject(step_index: usize) -> Self {
        Self::new(step_index, Decision::Rejected)
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }
}

/// Owner of the canonical request collection.
///
/// `apply_decision` is the only mutation path for step state. Reads return snapshots.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn create(&self, draft: RequestDraft) -> Result<Request, RepositoryError>;

    async fn find_by_id(&self, id: &RequestId) -> Result<Request, RepositoryError>;

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, RepositoryError>;

    async fn apply_decision(
        &self,
        id: &RequestId,
        command: DecisionCommand,
        actor: &Actor,
    ) -> Result<Request, RepositoryError>;

    /// Counts and the most recent slice of the actor's dashboard scope.
    async fn dashboard(&self, actor: &Actor) -> Result<DashboardSummary, RepositoryError>;

    async fn recent_activity(&self) -> Result<Vec<Request>, RepositoryError>;
}
