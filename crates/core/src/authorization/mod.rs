use serde::{Deserialize, Serialize};

use crate::domain::actor::{Actor, Department, Role};
use crate::domain::request::Request;
use crate::domain::step::StepStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationGrant {
    DepartmentMatch,
    /// A faculty member named as sponsor on a student request, first step only.
    FacultySponsor,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthorizationFailure {
    NoActiveStep { current_step: usize, step_count: usize },
    StepNotPending { step_index: usize, status: StepStatus },
    MissingDepartment { actor_id: String },
    DepartmentMismatch { actor_id: String, actor_department: Department, step_department: Department },
}

impl AuthorizationFailure {
    fn reason(&self) -> String {
        match self {
            Self::NoActiveStep { current_step, step_count } => {
                format!("no active step (current step {current_step} of {step_count})")
            }
            Self::StepNotPending { step_index, status } => {
                format!("step {step_index} is already {}", status.as_str())
            }
            Self::MissingDepartment { actor_id } => {
                format!("actor `{actor_id}` has no department")
            }
            Self::DepartmentMismatch { actor_id, actor_department, step_department } => {
                format!(
                    "actor `{actor_id}` belongs to {actor_department} but the active step is owned by {step_department}"
                )
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub allowed: bool,
    pub reason: String,
    pub grant: Option<AuthorizationGrant>,
    pub failure: Option<AuthorizationFailure>,
}

impl AuthorizationResult {
    fn allow(grant: AuthorizationGrant, reason: impl Into<String>) -> Self {
        Self { allowed: true, reason: reason.into(), grant: Some(grant), failure: None }
    }

    fn deny(failure: AuthorizationFailure) -> Self {
        Self { allowed: false, reason: failure.reason(), grant: None, failure: Some(failure) }
    }
}

/// Decides whether an actor may decide the active step of a request.
///
/// The department rule is the primary path: the active step must be pending and owned
/// by the actor's department. Role is not consulted. When `faculty_override` is on, a
/// faculty actor whose name matches the request's faculty annotation may also decide
/// step 0 regardless of department.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Authorizer {
    faculty_override: bool,
}

impl Default for Authorizer {
    fn default() -> Self {
        Self { faculty_override: true }
    }
}

impl Authorizer {
    pub fn new(faculty_override: bool) -> Self {
        Self { faculty_override }
    }

    pub fn faculty_override(&self) -> bool {
        self.faculty_override
    }

    pub fn evaluate(&self, request: &Request, actor: &Actor) -> AuthorizationResult {
        let Some(step) = request.active_step() else {
            return AuthorizationResult::deny(AuthorizationFailure::NoActiveStep {
                current_step: request.current_step,
                step_count: request.steps.len(),
            });
        };

        if step.status != StepStatus::Pending {
            return AuthorizationResult::deny(AuthorizationFailure::StepNotPending {
                step_index: request.current_step,
                status: step.status,
            });
        }

        if self.faculty_override && self.is_faculty_sponsor(request, actor) {
            return AuthorizationResult::allow(
                AuthorizationGrant::FacultySponsor,
                format!("actor `{}` is the named faculty sponsor", actor.id),
            );
        }

        let Some(actor_department) = actor.department else {
            return AuthorizationResult::deny(AuthorizationFailure::MissingDepartment {
                actor_id: actor.id.clone(),
            });
        };

        if actor_department != step.department {
            return AuthorizationResult::deny(AuthorizationFailure::DepartmentMismatch {
                actor_id: actor.id.clone(),
                actor_department,
                step_department: step.department,
            });
        }

        AuthorizationResult::allow(
            AuthorizationGrant::DepartmentMatch,
            format!("actor `{}` belongs to {}", actor.id, step.department),
        )
    }

    pub fn can_act(&self, request: &Request, actor: &Actor) -> bool {
        self.evaluate(request, actor).allowed
    }

    fn is_faculty_sponsor(&self, request: &Request, actor: &Actor) -> bool {
        if request.current_step != 0 || actor.role != Role::Faculty {
            return false;
        }
        request.faculty_name.as_deref().is_some_and(|sponsor| same_person(sponsor, &actor.name))
    }
}

/// Authorization with the default rules, faculty override enabled.
pub fn can_act(request: &Request, actor: &Actor) -> bool {
    Authorizer::default().can_act(request, actor)
}

pub(crate) fn same_person(left: &str, right: &str) -> bool {
    let left = left.trim();
    !left.is_empty() && left.to_lowercase() == right.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{can_act, AuthorizationFailure, AuthorizationGrant, Authorizer};
    use crate::domain::actor::{Actor, Department, Role};
    use crate::domain::request::{Request, RequestDraft, Requestor};
    use crate::domain::step::Decision;
    use crate::flows::engine::{ApprovalStateMachine, DecisionInput};

    fn staff(id: &str, department: Department) -> Actor {
        Actor::new(id, "Staff Member", "staff@campus.edu", Role::Staff, Some(department))
    }

    fn open(request_type: &str) -> Request {
        ApprovalStateMachine::default()
            .open(RequestDraft::new(
                "Science Lab Equipment",
                "Microscopes for the biology lab.",
                request_type,
                Requestor::new("101", "Dr. Jane Smith", "j.smith@campus.edu", "Science"),
            ))
            .expect("draft opens")
    }

    fn student_request(faculty_name: &str) -> Request {
        ApprovalStateMachine::default()
            .open(
                RequestDraft::new(
                    "Robotics Club Showcase",
                    "Evening showcase in the atrium.",
                    "event_hosting",
                    Requestor::new("301", "Sam Student", "sam@campus.edu", "Engineering"),
                )
                .submitted_as(Role::Student)
                .with_faculty_name(faculty_name),
            )
            .expect("student draft opens")
    }

    #[test]
    fn actor_in_step_department_may_act() {
        let request = open("maintenance");
        let result = Authorizer::default().evaluate(&request, &staff("u-fac", Department::Facilities));

        assert!(result.allowed);
        assert_eq!(result.grant, Some(AuthorizationGrant::DepartmentMatch));
    }

    #[test]
    fn it_actor_is_denied_on_facilities_step() {
        let request = open("room_booking");
        let result = Authorizer::default().evaluate(&request, &staff("u-it", Department::It));

        assert!(!result.allowed);
        assert_eq!(
            result.failure,
            Some(AuthorizationFailure::DepartmentMismatch {
                actor_id: "u-it".to_string(),
                actor_department: Department::It,
                step_department: Department::Facilities,
            })
        );
        assert!(result.reason.contains("owned by Facilities"));
    }

    #[test]
    fn actor_without_department_never_qualifies() {
        let request = open("maintenance");
        let actor = Actor::new("u-1", "Admin", "admin@campus.edu", Role::Admin, None);

        let result = Authorizer::default().evaluate(&request, &actor);
        assert_eq!(
            result.failure,
            Some(AuthorizationFailure::MissingDepartment { actor_id: "u-1".to_string() })
        );
    }

    #[test]
    fn role_does_not_influence_department_rule() {
        let request = open("equipment_request");
        let admin = Actor::new("u-2", "Admin", "admin@campus.edu", Role::Admin, Some(Department::Finance));
        assert!(can_act(&request, &admin));
    }

    #[test]
    fn terminal_requests_have_no_actionable_step() {
        let machine = ApprovalStateMachine::default();
        let approved = machine
            .decide(&open("maintenance"), DecisionInput::new(0, Decision::Approved))
            .expect("approve")
            .request;
        let result = Authorizer::default().evaluate(&approved, &staff("u-fac", Department::Facilities));
        assert!(matches!(result.failure, Some(AuthorizationFailure::NoActiveStep { .. })));

        let rejected = machine
            .decide(&open("maintenance"), DecisionInput::new(0, Decision::Rejected))
            .expect("reject")
            .request;
        let result = Authorizer::default().evaluate(&rejected, &staff("u-fac", Department::Facilities));
        assert!(matches!(result.failure, Some(AuthorizationFailure::StepNotPending { step_index: 0, .. })));
    }

    #[test]
    fn named_faculty_sponsor_may_act_on_first_step() {
        let request = student_request("Prof. Alan Chen");
        let sponsor = Actor::new(
            "f-1",
            "prof. alan chen",
            "a.chen@campus.edu",
            Role::Faculty,
            Some(Department::AcademicAffairs),
        );

        let result = Authorizer::default().evaluate(&request, &sponsor);
        assert!(result.allowed);
        assert_eq!(result.grant, Some(AuthorizationGrant::FacultySponsor));
    }

    #[test]
    fn faculty_sponsor_path_ends_after_first_step() {
        let request = ApprovalStateMachine::default()
            .decide(&student_request("Prof. Alan Chen"), DecisionInput::new(0, Decision::Approved))
            .expect("first step approved")
            .request;
        let sponsor = Actor::new("f-1", "Prof. Alan Chen", "a.chen@campus.edu", Role::Faculty, None);

        assert!(!can_act(&request, &sponsor));
    }

    #[test]
    fn faculty_sponsor_path_requires_faculty_role_and_enabled_override() {
        let request = student_request("Prof. Alan Chen");
        let impostor = Actor::new("s-2", "Prof. Alan Chen", "x@campus.edu", Role::Student, None);
        assert!(!can_act(&request, &impostor));

        let sponsor = Actor::new("f-1", "Prof. Alan Chen", "a.chen@campus.edu", Role::Faculty, None);
        assert!(!Authorizer::new(false).can_act(&request, &sponsor));
        assert!(Authorizer::new(true).can_act(&request, &sponsor));
    }
}
