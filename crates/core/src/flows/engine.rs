use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::domain::actor::Role;
use crate::domain::request::{Request, RequestDraft, RequestId, RequestStatus, RequestType};
use crate::domain::step::{ApprovalStep, Approver, Decision, StepStatus};
use crate::errors::DomainError;
use crate::flows::sequencer::{CampusSequencer, StepSequencer};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionInput {
    pub step_index: usize,
    pub decision: Decision,
    pub notes: Option<String>,
    pub approver: Option<Approver>,
}

impl DecisionInput {
    pub fn new(step_index: usize, decision: Decision) -> Self {
        Self { step_index, decision, notes: None, approver: None }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn decided_by(mut self, approver: Approver) -> Self {
        self.approver = Some(approver);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub request: Request,
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub step_index: usize,
    pub decision: Decision,
}

/// Stateless transition rules for a single request.
///
/// `open` turns a draft into a fresh request and `decide` applies one verdict to
/// the active step, returning an updated copy. Neither keeps anything between calls.
pub struct ApprovalStateMachine<S = CampusSequencer, C = SystemClock> {
    sequencer: S,
    clock: C,
}

impl<S, C> ApprovalStateMachine<S, C>
where
    S: StepSequencer,
    C: Clock,
{
    pub fn new(sequencer: S, clock: C) -> Self {
        Self { sequencer, clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn open(&self, draft: RequestDraft) -> Result<Request, DomainError> {
        let request_type = validate_draft(&draft)?;
        let departments = self.sequencer.sequence(request_type);
        if departments.is_empty() {
            return Err(DomainError::InvariantViolation(format!(
                "no approval steps are defined for request type `{request_type}`"
            )));
        }

        let faculty_name = match draft.requestor_role {
            Role::Student => non_blank(draft.faculty_name),
            _ => None,
        };
        let now = self.clock.now();

        Ok(Request {
            id: RequestId::generate(),
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            request_type,
            requestor: draft.requestor,
            location: non_blank(draft.location),
            start_date: draft.start_date,
            end_date: draft.end_date,
            faculty_name,
            steps: departments.into_iter().map(ApprovalStep::pending).collect(),
            current_step: 0,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    pub fn decide(
        &self,
        request: &Request,
        input: DecisionInput,
    ) -> Result<DecisionOutcome, DomainError> {
        let step_index = input.step_index;
        ensure_decidable(request, step_index)?;

        let now = self.next_timestamp(request.updated_at);
        let step_count = request.steps.len();
        let mut updated = request.clone();

        if let Some(step) = updated.steps.get_mut(step_index) {
            step.status = input.decision.into();
            step.notes = non_blank(input.notes);
            step.decided_at = Some(now);
            step.decided_by = input.approver;
        }

        match input.decision {
            Decision::Approved if step_index + 1 < step_count => {
                updated.current_step = step_index + 1;
                updated.status = RequestStatus::InProgress;
            }
            Decision::Approved => {
                updated.current_step = step_count;
                updated.status = RequestStatus::Approved;
            }
            Decision::Rejected => {
                updated.status = RequestStatus::Rejected;
            }
        }
        updated.updated_at = now;

        Ok(DecisionOutcome {
            from: request.status,
            to: updated.status,
            request: updated,
            step_index,
            decision: input.decision,
        })
    }

    // Strictly after the previous stamp, even if the clock has not moved.
    fn next_timestamp(&self, previous: DateTime<Utc>) -> DateTime<Utc> {
        self.clock.now().max(previous + Duration::microseconds(1))
    }
}

impl Default for ApprovalStateMachine<CampusSequencer, SystemClock> {
    fn default() -> Self {
        Self::new(CampusSequencer, SystemClock)
    }
}

/// Fails with `InvalidTransition` unless `step_index` addresses the active, pending step
/// of a request that is still open.
pub fn ensure_decidable(request: &Request, step_index: usize) -> Result<(), DomainError> {
    let invalid = |reason: String| DomainError::InvalidTransition {
        request_id: request.id.0.clone(),
        step_index,
        reason,
    };

    if request.is_terminal() {
        return Err(invalid(format!("request is already {}", request.status)));
    }
    if step_index != request.current_step {
        return Err(invalid(format!(
            "only the active step {} may be decided",
            request.current_step
        )));
    }
    let Some(step) = request.active_step() else {
        return Err(invalid("request has no active step".to_string()));
    };
    if step.status != StepStatus::Pending {
        return Err(invalid(format!("step was already {}", step.status.as_str())));
    }

    Ok(())
}

fn validate_draft(draft: &RequestDraft) -> Result<RequestType, DomainError> {
    let mut missing = Vec::new();
    if draft.title.trim().is_empty() {
        missing.push("title".to_string());
    }
    if draft.description.trim().is_empty() {
        missing.push("description".to_string());
    }
    if draft.request_type.trim().is_empty() {
        missing.push("type".to_string());
    }
    let sponsor_named = draft.faculty_name.as_deref().is_some_and(|name| !name.trim().is_empty());
    if draft.requestor_role == Role::Student && !sponsor_named {
        missing.push("faculty_name".to_string());
    }
    if !missing.is_empty() {
        let message = format!("missing required fields: {}", missing.join(", "));
        return Err(DomainError::validation(missing, message));
    }

    let request_type = draft.request_type.parse::<RequestType>()?;

    if let (Some(start), Some(end)) = (draft.start_date, draft.end_date) {
        if end < start {
            return Err(DomainError::validation(
                vec!["end_date".to_string()],
                "end date must not precede start date",
            ));
        }
    }

    Ok(request_type)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{ApprovalStateMachine, DecisionInput};
    use crate::clock::{Clock, ManualClock};
    use crate::domain::actor::{Actor, Department, Role};
    use crate::domain::request::{Request, RequestDraft, RequestStatus, RequestType, Requestor};
    use crate::domain::step::{Approver, Decision, StepStatus};
    use crate::errors::DomainError;
    use crate::flows::sequencer::{campus_sequence, CampusSequencer};

    fn machine() -> ApprovalStateMachine<CampusSequencer, ManualClock> {
        let start = Utc.with_ymd_and_hms(2025, 4, 18, 9, 15, 0).single().expect("valid time");
        ApprovalStateMachine::new(CampusSequencer, ManualClock::new(start))
    }

    fn draft(request_type: &str) -> RequestDraft {
        RequestDraft::new(
            "Main Hall Booking for Graduation Ceremony",
            "Need to book the Main Hall for the upcoming graduation ceremony.",
            request_type,
            Requestor::new("101", "Dr. Jane Smith", "j.smith@campus.edu", "Academic Affairs"),
        )
    }

    fn open(machine: &ApprovalStateMachine<CampusSequencer, ManualClock>, kind: &str) -> Request {
        machine.open(draft(kind)).expect("draft should open")
    }

    fn approve(
        machine: &ApprovalStateMachine<CampusSequencer, ManualClock>,
        request: &Request,
        step_index: usize,
    ) -> Request {
        machine
            .decide(request, DecisionInput::new(step_index, Decision::Approved))
            .expect("approval should apply")
            .request
    }

    #[test]
    fn maintenance_request_opens_with_single_pending_facilities_step() {
        let machine = machine();
        let request = open(&machine, "maintenance");

        assert_eq!(request.current_step, 0);
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.steps.len(), 1);
        assert_eq!(request.steps[0].department, Department::Facilities);
        assert_eq!(request.steps[0].status, StepStatus::Pending);
        assert_eq!(request.created_at, request.updated_at);
        request.check_invariants().expect("fresh request is consistent");
    }

    #[test]
    fn every_request_type_opens_with_its_full_pending_sequence() {
        let machine = machine();

        for request_type in RequestType::ALL {
            let request = open(&machine, request_type.as_str());
            let departments: Vec<Department> =
                request.steps.iter().map(|step| step.department).collect();

            assert_eq!(request.request_type, request_type);
            assert_eq!(departments, campus_sequence(request_type), "{request_type}");
            assert!(request.steps.iter().all(|step| step.status == StepStatus::Pending));
            assert_eq!(request.current_step, 0);
            assert_eq!(request.status, RequestStatus::Pending);
        }
    }

    #[test]
    fn open_rejects_missing_required_fields_together() {
        let machine = machine();
        let mut incomplete = draft("room_booking");
        incomplete.title = "  ".to_string();
        incomplete.description = String::new();

        let error = machine.open(incomplete).expect_err("blank fields must fail");
        assert_eq!(
            error,
            DomainError::Validation {
                fields: vec!["title".to_string(), "description".to_string()],
                message: "missing required fields: title, description".to_string(),
            }
        );
    }

    #[test]
    fn open_fails_fast_for_unrecognized_request_type() {
        let error = machine().open(draft("catering")).expect_err("unknown type must fail");
        assert!(matches!(error, DomainError::InvalidRequestType { ref value } if value == "catering"));
    }

    #[test]
    fn open_rejects_schedule_ending_before_it_starts() {
        let start = Utc.with_ymd_and_hms(2025, 5, 15, 16, 0, 0).single().expect("valid time");
        let error = machine()
            .open(draft("event_hosting").with_schedule(start, start - Duration::hours(6)))
            .expect_err("inverted schedule must fail");

        assert!(matches!(error, DomainError::Validation { ref fields, .. } if fields == &["end_date"]));
    }

    #[test]
    fn faculty_name_is_kept_only_for_student_submissions() {
        let machine = machine();

        let student = machine
            .open(
                draft("event_hosting").submitted_as(Role::Student).with_faculty_name(" Prof. Chen "),
            )
            .expect("student draft");
        assert_eq!(student.faculty_name.as_deref(), Some("Prof. Chen"));

        let staff = machine
            .open(draft("event_hosting").submitted_as(Role::Staff).with_faculty_name("Prof. Chen"))
            .expect("staff draft");
        assert_eq!(staff.faculty_name, None);
    }

    #[test]
    fn student_submission_requires_a_faculty_sponsor() {
        let machine = machine();

        for student_draft in [
            draft("event_hosting").submitted_as(Role::Student),
            draft("event_hosting").submitted_as(Role::Student).with_faculty_name("   "),
        ] {
            let error = machine.open(student_draft).expect_err("sponsor is required");
            assert!(
                matches!(error, DomainError::Validation { ref fields, .. } if fields == &["faculty_name"])
            );
        }

        let staff = machine.open(draft("event_hosting").submitted_as(Role::Staff));
        assert!(staff.is_ok());
    }

    #[test]
    fn approving_first_room_booking_step_advances_pointer() {
        let machine = machine();
        let request = open(&machine, "room_booking");

        let outcome = machine
            .decide(&request, DecisionInput::new(0, Decision::Approved))
            .expect("first approval");

        assert_eq!(outcome.from, RequestStatus::Pending);
        assert_eq!(outcome.to, RequestStatus::InProgress);
        assert_eq!(outcome.request.current_step, 1);
        assert_eq!(outcome.request.steps[0].status, StepStatus::Approved);
        assert!(outcome.request.steps[0].decided_at.is_some());
        outcome.request.check_invariants().expect("consistent after approval");
    }

    #[test]
    fn approving_every_step_completes_the_request() {
        let machine = machine();
        let mut request = open(&machine, "room_booking");
        for step_index in 0..3 {
            request = approve(&machine, &request, step_index);
        }

        assert_eq!(request.status, RequestStatus::Approved);
        assert_eq!(request.current_step, 3);
        assert!(request.steps.iter().all(|step| step.status == StepStatus::Approved));
        assert!(request.active_step().is_none());
        request.check_invariants().expect("consistent after full approval");
    }

    #[test]
    fn rejection_freezes_pointer_and_records_notes() {
        let machine = machine();
        let request = open(&machine, "equipment_request");
        let finance = Actor::new("201", "Fran Ledger", "f.ledger@campus.edu", Role::Staff, Some(Department::Finance));

        let rejected = machine
            .decide(
                &request,
                DecisionInput::new(0, Decision::Rejected)
                    .with_notes("insufficient budget")
                    .decided_by(Approver::from(&finance)),
            )
            .expect("rejection")
            .request;

        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(rejected.current_step, 0);
        assert_eq!(rejected.steps[0].department, Department::Finance);
        assert_eq!(rejected.steps[0].status, StepStatus::Rejected);
        assert_eq!(rejected.steps[0].notes.as_deref(), Some("insufficient budget"));
        assert_eq!(rejected.steps[0].decided_by.as_ref().map(|a| a.id.as_str()), Some("201"));
        rejected.check_invariants().expect("consistent after rejection");

        let error = machine
            .decide(&rejected, DecisionInput::new(1, Decision::Approved))
            .expect_err("later step on rejected request");
        assert!(matches!(error, DomainError::InvalidTransition { step_index: 1, .. }));

        let error = machine
            .decide(&rejected, DecisionInput::new(0, Decision::Approved))
            .expect_err("re-deciding the rejected step");
        assert!(matches!(error, DomainError::InvalidTransition { step_index: 0, .. }));
    }

    #[test]
    fn deciding_the_same_step_twice_fails_the_second_time() {
        let machine = machine();
        let request = open(&machine, "room_booking");
        let once = approve(&machine, &request, 0);

        let error = machine
            .decide(&once, DecisionInput::new(0, Decision::Approved))
            .expect_err("second identical decision");
        assert!(matches!(error, DomainError::InvalidTransition { step_index: 0, .. }));
    }

    #[test]
    fn deciding_a_future_step_is_an_invalid_transition() {
        let machine = machine();
        let request = open(&machine, "event_hosting");

        let error = machine
            .decide(&request, DecisionInput::new(2, Decision::Approved))
            .expect_err("skipping ahead");
        assert!(matches!(error, DomainError::InvalidTransition { step_index: 2, .. }));
    }

    #[test]
    fn approved_requests_accept_no_further_decisions() {
        let machine = machine();
        let request = approve(&machine, &open(&machine, "maintenance"), 0);
        assert_eq!(request.status, RequestStatus::Approved);

        let error = machine
            .decide(&request, DecisionInput::new(1, Decision::Approved))
            .expect_err("nothing left to decide");
        assert!(matches!(error, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn updated_at_strictly_increases_even_when_clock_stands_still() {
        let machine = machine();
        let request = open(&machine, "room_booking");

        let first = approve(&machine, &request, 0);
        assert!(first.updated_at > request.updated_at);

        let second = approve(&machine, &first, 1);
        assert!(second.updated_at > first.updated_at);

        machine.clock().advance(Duration::hours(2));
        let third = approve(&machine, &second, 2);
        assert_eq!(third.updated_at, machine.clock().now());
    }

    #[test]
    fn blank_notes_are_not_attached() {
        let machine = machine();
        let request = open(&machine, "maintenance");

        let decided = machine
            .decide(&request, DecisionInput::new(0, Decision::Approved).with_notes("   "))
            .expect("approval")
            .request;
        assert_eq!(decided.steps[0].notes, None);
    }

    #[test]
    fn decide_does_not_touch_the_input_request() {
        let machine = machine();
        let request = open(&machine, "room_booking");
        let snapshot = request.clone();

        let _ = approve(&machine, &request, 0);
        assert_eq!(request, snapshot);
    }
}
