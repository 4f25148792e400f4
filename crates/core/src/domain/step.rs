use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::actor::{Actor, Department, Role};
use crate::domain::normalize_key;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(pub String);

impl StepId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Approved,
    Rejected,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// The verdict an actor renders on the active step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_key(value).as_str() {
            "approved" | "approve" => Some(Self::Approved),
            "rejected" | "reject" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl From<Decision> for StepStatus {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Approved => StepStatus::Approved,
            Decision::Rejected => StepStatus::Rejected,
        }
    }
}

/// Snapshot of the actor that decided a step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub department: Option<Department>,
}

impl From<&Actor> for Approver {
    fn from(actor: &Actor) -> Self {
        Self {
            id: actor.id.clone(),
            name: actor.name.clone(),
            role: actor.role,
            department: actor.department,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub id: StepId,
    pub department: Department,
    pub status: StepStatus,
    pub notes: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Approver>,
}

impl ApprovalStep {
    pub fn pending(department: Department) -> Self {
        Self {
            id: StepId::generate(),
            department,
            status: StepStatus::Pending,
            notes: None,
            decided_at: None,
            decided_by: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == StepStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::{ApprovalStep, Decision, StepStatus};
    use crate::domain::actor::Department;

    #[test]
    fn new_steps_start_pending_without_decision_metadata() {
        let step = ApprovalStep::pending(Department::Finance);

        assert!(step.is_pending());
        assert!(step.notes.is_none());
        assert!(step.decided_at.is_none());
        assert!(step.decided_by.is_none());
    }

    #[test]
    fn step_ids_are_unique() {
        let first = ApprovalStep::pending(Department::It);
        let second = ApprovalStep::pending(Department::It);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn decisions_map_onto_terminal_step_statuses() {
        assert_eq!(StepStatus::from(Decision::Approved), StepStatus::Approved);
        assert_eq!(StepStatus::from(Decision::Rejected), StepStatus::Rejected);
        assert!(StepStatus::Rejected.is_terminal());
        assert!(!StepStatus::Pending.is_terminal());
        assert_eq!(Decision::parse("Approve"), Some(Decision::Approved));
        assert_eq!(Decision::parse("pending"), None);
    }
}
