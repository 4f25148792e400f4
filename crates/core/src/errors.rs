use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {message}")]
    Validation { fields: Vec<String>, message: String },
    #[error("invalid request type `{value}`")]
    InvalidRequestType { value: String },
    #[error("invalid transition on request {request_id} step {step_index}: {reason}")]
    InvalidTransition { request_id: String, step_index: usize, reason: String },
    #[error("actor `{actor_id}` may not act on request {request_id}: {reason}")]
    Forbidden { request_id: String, actor_id: String, reason: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn validation(fields: Vec<String>, message: impl Into<String>) -> Self {
        Self::Validation { fields, message: message.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("request {request_id} was not found")]
    NotFound { request_id: String },
    #[error(
        "request {request_id} changed concurrently (expected version {expected_version}, found {actual_version})"
    )]
    Conflict { request_id: String, expected_version: u64, actual_version: u64 },
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Forbidden { .. } => "You are not authorized to act on this approval step.",
            Self::NotFound { .. } => "The requested item could not be found.",
            Self::Conflict { .. } => {
                "This request was updated by someone else. Reload it and try again."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    /// Only conflicts are transient; every other kind fails the same way on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        let message = value.to_string();
        match value {
            ApplicationError::Domain(DomainError::Forbidden { .. }) => {
                Self::Forbidden { message, correlation_id }
            }
            ApplicationError::Domain(DomainError::InvariantViolation(_)) => {
                Self::Internal { message, correlation_id }
            }
            ApplicationError::Domain(
                DomainError::Validation { .. }
                | DomainError::InvalidRequestType { .. }
                | DomainError::InvalidTransition { .. },
            ) => Self::BadRequest { message, correlation_id },
            ApplicationError::NotFound { .. } => Self::NotFound { message, correlation_id },
            ApplicationError::Conflict { .. } => Self::Conflict { message, correlation_id },
            ApplicationError::Configuration(_) => Self::Internal { message, correlation_id },
        }
    }
}
