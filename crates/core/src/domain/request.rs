use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::actor::Role;
use crate::domain::normalize_key;
use crate::domain::step::{ApprovalStep, StepStatus};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    RoomBooking,
    EventHosting,
    EquipmentRequest,
    Maintenance,
}

impl RequestType {
    pub const ALL: [RequestType; 4] = [
        RequestType::RoomBooking,
        RequestType::EventHosting,
        RequestType::EquipmentRequest,
        RequestType::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoomBooking => "room_booking",
            Self::EventHosting => "event_hosting",
            Self::EquipmentRequest => "equipment_request",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_key(value).as_str() {
            "room booking" => Ok(Self::RoomBooking),
            "event hosting" => Ok(Self::EventHosting),
            "equipment request" => Ok(Self::EquipmentRequest),
            "maintenance" => Ok(Self::Maintenance),
            _ => Err(DomainError::InvalidRequestType { value: value.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_key(value).as_str() {
            "pending" => Some(Self::Pending),
            "in progress" => Some(Self::InProgress),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requestor details captured at submission time. Later profile changes do not propagate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requestor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub department: String,
}

impl Requestor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self { id: id.into(), name: name.into(), email: email.into(), department: department.into() }
    }
}

/// Unvalidated submission from the presentation layer.
///
/// `request_type` stays a raw string here so that unrecognized values surface as
/// [`DomainError::InvalidRequestType`] instead of being dropped by a form widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDraft {
    pub title: String,
    pub description: String,
    pub request_type: String,
    pub requestor: Requestor,
    pub requestor_role: Role,
    pub location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub faculty_name: Option<String>,
}

impl RequestDraft {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        request_type: impl Into<String>,
        requestor: Requestor,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            request_type: request_type.into(),
            requestor,
            requestor_role: Role::Staff,
            location: None,
            start_date: None,
            end_date: None,
            faculty_name: None,
        }
    }

    pub fn submitted_as(mut self, role: Role) -> Self {
        self.requestor_role = role;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_schedule(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_faculty_name(mut self, faculty_name: impl Into<String>) -> Self {
        self.faculty_name = Some(faculty_name.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub title: String,
    pub description: String,
    pub request_type: RequestType,
    pub requestor: Requestor,
    pub location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub faculty_name: Option<String>,
    pub steps: Vec<ApprovalStep>,
    pub current_step: usize,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped by the repository on every committed decision.
    pub version: u64,
}

impl Request {
    /// The step awaiting a decision, if the pointer still addresses one.
    pub fn active_step(&self) -> Option<&ApprovalStep> {
        self.steps.get(self.current_step)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Status implied by the step list alone.
    pub fn derived_status(&self) -> RequestStatus {
        if self.steps.iter().any(|step| step.status == StepStatus::Rejected) {
            return RequestStatus::Rejected;
        }
        if !self.steps.is_empty() && self.steps.iter().all(|step| step.status == StepStatus::Approved)
        {
            return RequestStatus::Approved;
        }
        match self.steps.first() {
            Some(first) if first.status == StepStatus::Approved => RequestStatus::InProgress,
            _ => RequestStatus::Pending,
        }
    }

    pub fn matches_text(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }

    pub fn check_invariants(&self) -> Result<(), DomainError> {
        let violation = |message: String| Err(DomainError::InvariantViolation(message));
        let step_count = self.steps.len();

        if step_count == 0 {
            return violation(format!("request {} has no approval steps", self.id));
        }
        if self.current_step > step_count {
            return violation(format!(
                "request {} current step {} exceeds step count {step_count}",
                self.id, self.current_step
            ));
        }
        if self.current_step == step_count && self.status != RequestStatus::Approved {
            return violation(format!(
                "request {} is past its last step but has status {}",
                self.id, self.status
            ));
        }

        for (index, step) in self.steps.iter().enumerate() {
            let expected_ok = match index.cmp(&self.current_step) {
                std::cmp::Ordering::Less => step.status == StepStatus::Approved,
                std::cmp::Ordering::Equal => match self.status {
                    RequestStatus::Rejected => step.status == StepStatus::Rejected,
                    _ => step.status == StepStatus::Pending,
                },
                std::cmp::Ordering::Greater => step.status == StepStatus::Pending,
            };
            if !expected_ok {
                return violation(format!(
                    "request {} step {index} ({}) has unexpected status {} for current step {}",
                    self.id,
                    step.department,
                    step.status.as_str(),
                    self.current_step
                ));
            }
            if step.status.is_terminal() != step.decided_at.is_some() {
                return violation(format!(
                    "request {} step {index} decision timestamp does not match its status",
                    self.id
                ));
            }
        }

        let derived = self.derived_status();
        if derived != self.status {
            return violation(format!(
                "request {} has status {} but its steps imply {derived}",
                self.id, self.status
            ));
        }
        if self.updated_at < self.created_at {
            return violation(format!("request {} was updated before it was created", self.id));
        }

        Ok(())
    }
}
