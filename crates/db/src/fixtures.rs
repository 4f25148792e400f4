use chrono::{DateTime, TimeZone, Utc};

use campusflow_core::clock::ManualClock;
use campusflow_core::domain::{
    Actor, Department, Request, RequestDraft, RequestId, RequestStatus, Requestor, Role,
};
use campusflow_core::views::RequestFilter;

use crate::repositories::{DecisionCommand, RepositoryError, RequestRepository};

struct SeedDecision {
    at: (i32, u32, u32, u32, u32),
    actor_id: &'static str,
    actor_name: &'static str,
    actor_email: &'static str,
    department: Department,
    notes: &'static str,
}

struct SeedRequestContract {
    key: &'static str,
    title: &'static str,
    description: &'static str,
    request_type: &'static str,
    requestor: (&'static str, &'static str, &'static str, &'static str),
    location: Option<&'static str>,
    schedule: Option<((i32, u32, u32, u32, u32), (i32, u32, u32, u32, u32))>,
    created_at: (i32, u32, u32, u32, u32),
    decisions: &'static [SeedDecision],
    expected_status: RequestStatus,
    expected_current_step: usize,
    expected_departments: &'static [Department],
    description_for_report: &'static str,
}

/// Canonical demo requests: one room booking midway through its chain and one
/// untouched equipment request.
const SEED_REQUESTS: &[SeedRequestContract] = &[
    SeedRequestContract {
        key: "room-booking-in-progress",
        title: "Main Hall Booking for Graduation Ceremony",
        description: "Need to book the Main Hall for the upcoming graduation ceremony.",
        request_type: "room_booking",
        requestor: ("101", "Dr. Jane Smith", "j.smith@campus.edu", "Academic Affairs"),
        location: Some("Main Hall"),
        schedule: Some(((2025, 5, 15, 10, 0), (2025, 5, 15, 16, 0))),
        created_at: (2025, 4, 18, 9, 15),
        decisions: &[SeedDecision {
            at: (2025, 4, 20, 14, 30),
            actor_id: "201",
            actor_name: "Facilities Office",
            actor_email: "facilities@campus.edu",
            department: Department::Facilities,
            notes: "Space available for the requested time.",
        }],
        expected_status: RequestStatus::InProgress,
        expected_current_step: 1,
        expected_departments: &[Department::Facilities, Department::It, Department::AcademicAffairs],
        description_for_report: "Room booking approved by Facilities, awaiting IT",
    },
    SeedRequestContract {
        key: "equipment-request-pending",
        title: "Science Building Equipment Request",
        description: "Request for new microscopes for the biology lab.",
        request_type: "equipment_request",
        requestor: ("102", "Prof. Robert Chen", "r.chen@campus.edu", "Science"),
        location: None,
        schedule: None,
        created_at: (2025, 4, 22, 13, 45),
        decisions: &[],
        expected_status: RequestStatus::Pending,
        expected_current_step: 0,
        expected_departments: &[Department::Finance, Department::AcademicAffairs],
        description_for_report: "Equipment request awaiting Finance",
    },
];

/// Deterministic demo dataset, loaded only through the public repository operations.
pub struct SeedDataset;

impl SeedDataset {
    /// A clock positioned at the first seeded timestamp.
    pub fn clock() -> ManualClock {
        ManualClock::new(timestamp(SEED_REQUESTS[0].created_at))
    }

    /// Loads the dataset using whatever clock the repository was built with.
    pub async fn load<R>(repo: &R) -> Result<SeedResult, RepositoryError>
    where
        R: RequestRepository + ?Sized,
    {
        Self::load_with(repo, None).await
    }

    /// Loads the dataset, moving `clock` to each recorded timestamp first so that
    /// created and updated times match the fixtures exactly.
    pub async fn load_at<R>(repo: &R, clock: &ManualClock) -> Result<SeedResult, RepositoryError>
    where
        R: RequestRepository + ?Sized,
    {
        Self::load_with(repo, Some(clock)).await
    }

    async fn load_with<R>(
        repo: &R,
        clock: Option<&ManualClock>,
    ) -> Result<SeedResult, RepositoryError>
    where
        R: RequestRepository + ?Sized,
    {
        let mut requests_seeded = Vec::new();

        for contract in SEED_REQUESTS {
            if let Some(clock) = clock {
                clock.set(timestamp(contract.created_at));
            }
            let mut request = repo.create(contract.draft()).await?;

            for (step_index, decision) in contract.decisions.iter().enumerate() {
                if let Some(clock) = clock {
                    clock.set(timestamp(decision.at));
                }
                let actor = Actor::new(
                    decision.actor_id,
                    decision.actor_name,
                    decision.actor_email,
                    Role::Staff,
                    Some(decision.department),
                );
                request = repo
                    .apply_decision(
                        &request.id,
                        DecisionCommand::approve(step_index)
                            .with_notes(decision.notes)
                            .expecting_version(request.version)
                            .with_correlation_id(format!("seed-{}", contract.key)),
                        &actor,
                    )
                    .await?;
            }

            requests_seeded.push(RequestSeedInfo {
                key: contract.key,
                request_id: request.id,
                description: contract.description_for_report,
            });
        }

        Ok(SeedResult { requests_seeded })
    }

    /// Checks that every seeded request is present in the shape the fixtures promise.
    pub async fn verify<R>(repo: &R) -> Result<VerificationResult, RepositoryError>
    where
        R: RequestRepository + ?Sized,
    {
        let mut checks = Vec::new();

        for contract in SEED_REQUESTS {
            let matches = repo.list(&RequestFilter::new().with_text(contract.title)).await?;
            let found = matches
                .iter()
                .find(|request| request.title == contract.title && request.requestor.id == contract.requestor.0);
            checks.push((contract.key, found.is_some_and(|request| contract.is_satisfied_by(request))));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

impl SeedRequestContract {
    fn draft(&self) -> RequestDraft {
        let (id, name, email, department) = self.requestor;
        let mut draft = RequestDraft::new(
            self.title,
            self.description,
            self.request_type,
            Requestor::new(id, name, email, department),
        )
        .submitted_as(Role::Faculty);
        if let Some(location) = self.location {
            draft = draft.with_location(location);
        }
        if let Some((start, end)) = self.schedule {
            draft = draft.with_schedule(timestamp(start), timestamp(end));
        }
        draft
    }

    fn is_satisfied_by(&self, request: &Request) -> bool {
        let departments: Vec<Department> = request.steps.iter().map(|step| step.department).collect();
        let notes_match = self.decisions.iter().enumerate().all(|(index, decision)| {
            request.steps.get(index).and_then(|step| step.notes.as_deref()) == Some(decision.notes)
        });

        request.status == self.expected_status
            && request.current_step == self.expected_current_step
            && departments == self.expected_departments
            && notes_match
            && request.check_invariants().is_ok()
    }
}

fn timestamp((year, month, day, hour, minute): (i32, u32, u32, u32, u32)) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).single().unwrap_or_default()
}

#[derive(Debug)]
pub struct SeedResult {
    pub requests_seeded: Vec<RequestSeedInfo>,
}

#[derive(Debug)]
pub struct RequestSeedInfo {
    pub key: &'static str,
    pub request_id: RequestId,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use campusflow_core::domain::{RequestStatus, StepStatus};
    use campusflow_core::flows::{ApprovalStateMachine, CampusSequencer};

    use super::{timestamp, SeedDataset};
    use crate::repositories::{InMemoryRequestRepository, RequestRepository};

    #[tokio::test]
    async fn verify_seed_contract() {
        let clock = SeedDataset::clock();
        let repo =
            InMemoryRequestRepository::new(ApprovalStateMachine::new(CampusSequencer, clock.clone()));

        let seeded = SeedDataset::load_at(&repo, &clock).await.expect("load seed fixtures");
        let verification = SeedDataset::verify(&repo).await.expect("verify seed fixtures");

        assert_eq!(seeded.requests_seeded.len(), 2);
        assert!(verification.all_present, "{:?}", verification.checks);
    }

    #[tokio::test]
    async fn seeded_timestamps_match_fixture_timeline() {
        let clock = SeedDataset::clock();
        let repo =
            InMemoryRequestRepository::new(ApprovalStateMachine::new(CampusSequencer, clock.clone()));
        let seeded = SeedDataset::load_at(&repo, &clock).await.expect("load seed fixtures");

        let booking = repo.find_by_id(&seeded.requests_seeded[0].request_id).await.expect("find");
        assert_eq!(booking.status, RequestStatus::InProgress);
        assert_eq!(booking.created_at, timestamp((2025, 4, 18, 9, 15)));
        assert_eq!(booking.updated_at, timestamp((2025, 4, 20, 14, 30)));
        assert_eq!(booking.steps[0].status, StepStatus::Approved);
        assert_eq!(booking.steps[0].decided_at, Some(timestamp((2025, 4, 20, 14, 30))));
        assert_eq!(booking.version, 2);

        let equipment = repo.find_by_id(&seeded.requests_seeded[1].request_id).await.expect("find");
        assert_eq!(equipment.created_at, timestamp((2025, 4, 22, 13, 45)));
        assert_eq!(equipment.updated_at, equipment.created_at);
    }

    #[tokio::test]
    async fn verification_fails_on_an_empty_repository() {
        let repo = InMemoryRequestRepository::default();
        let verification = SeedDataset::verify(&repo).await.expect("verify");

        assert!(!verification.all_present);
        assert_eq!(verification.checks.len(), 2);
    }

    #[tokio::test]
    async fn loading_twice_appends_a_second_copy_that_still_verifies() {
        let repo = InMemoryRequestRepository::default();
        SeedDataset::load(&repo).await.expect("first load");
        SeedDataset::load(&repo).await.expect("second load");

        assert_eq!(repo.len().await, 4);
        assert!(SeedDataset::verify(&repo).await.expect("verify").all_present);
    }
}
