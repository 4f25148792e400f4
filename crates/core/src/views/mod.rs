use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::authorization::{same_person, Authorizer};
use crate::domain::actor::{Actor, Department, Role};
use crate::domain::request::{Request, RequestStatus};

/// Role-scoped slices of the request collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewScope {
    /// Requests whose active step the actor may decide right now.
    AwaitingActor { actor: Actor },
    SubmittedBy { requestor_id: String },
    /// Requests naming the faculty member, or with any step owned by their department.
    FacultyRelevant { name: String, department: Option<Department> },
    /// Pending requests naming the faculty member as sponsor.
    FacultyDirect { name: String },
}

impl ViewScope {
    pub fn matches(&self, request: &Request, authorizer: &Authorizer) -> bool {
        match self {
            Self::AwaitingActor { actor } => authorizer.can_act(request, actor),
            Self::SubmittedBy { requestor_id } => request.requestor.id == *requestor_id,
            Self::FacultyRelevant { name, department } => {
                names_faculty(request, name)
                    || department.is_some_and(|department| {
                        request.steps.iter().any(|step| step.department == department)
                    })
            }
            Self::FacultyDirect { name } => {
                request.status == RequestStatus::Pending && names_faculty(request, name)
            }
        }
    }
}

fn names_faculty(request: &Request, name: &str) -> bool {
    request.faculty_name.as_deref().is_some_and(|sponsor| same_person(sponsor, name))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Insertion,
    MostRecentlyUpdated,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub text: Option<String>,
    pub requestor_id: Option<String>,
    pub scope: Option<ViewScope>,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl RequestFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_requestor(mut self, requestor_id: impl Into<String>) -> Self {
        self.requestor_id = Some(requestor_id.into());
        self
    }

    pub fn with_scope(mut self, scope: ViewScope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn most_recent_first(mut self) -> Self {
        self.order = SortOrder::MostRecentlyUpdated;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, request: &Request, authorizer: &Authorizer) -> bool {
        if self.status.is_some_and(|status| request.status != status) {
            return false;
        }
        if let Some(text) = &self.text {
            if !request.matches_text(text) {
                return false;
            }
        }
        if let Some(requestor_id) = &self.requestor_id {
            if request.requestor.id != *requestor_id {
                return false;
            }
        }
        self.scope.as_ref().map_or(true, |scope| scope.matches(request, authorizer))
    }

    /// Filters, orders and truncates requests given in insertion order.
    pub fn apply<'a, I>(&self, requests: I, authorizer: &Authorizer) -> Vec<Request>
    where
        I: IntoIterator<Item = &'a Request>,
    {
        let mut selected: Vec<Request> = requests
            .into_iter()
            .filter(|request| self.matches(request, authorizer))
            .cloned()
            .collect();

        if self.order == SortOrder::MostRecentlyUpdated {
            // Stable sort keeps insertion order among equal timestamps.
            selected.sort_by_key(|request| Reverse(request.updated_at));
        }
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub approved: usize,
    pub rejected: usize,
    pub total: usize,
}

impl StatusCounts {
    pub fn tally<'a>(requests: impl IntoIterator<Item = &'a Request>) -> Self {
        let mut counts = Self::default();
        for request in requests {
            match request.status {
                RequestStatus::Pending => counts.pending += 1,
                RequestStatus::InProgress => counts.in_progress += 1,
                RequestStatus::Approved => counts.approved += 1,
                RequestStatus::Rejected => counts.rejected += 1,
            }
            counts.total += 1;
        }
        counts
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub counts: StatusCounts,
    pub recent: Vec<Request>,
}

pub fn summarize(
    requests: &[Request],
    scope: Option<&ViewScope>,
    authorizer: &Authorizer,
    recent_limit: usize,
) -> DashboardSummary {
    let scoped: Vec<&Request> = requests
        .iter()
        .filter(|request| scope.map_or(true, |scope| scope.matches(request, authorizer)))
        .collect();

    DashboardSummary {
        counts: StatusCounts::tally(scoped.iter().copied()),
        recent: recent_activity(scoped, recent_limit),
    }
}

/// The `limit` most recently updated requests, newest first.
pub fn recent_activity<'a>(
    requests: impl IntoIterator<Item = &'a Request>,
    limit: usize,
) -> Vec<Request> {
    RequestFilter::new().most_recent_first().limit(limit).apply(requests, &Authorizer::default())
}

/// Which slice of requests a dashboard shows for the given actor.
pub fn dashboard_scope_for(actor: &Actor) -> Option<ViewScope> {
    match actor.role {
        Role::Student => Some(ViewScope::SubmittedBy { requestor_id: actor.id.clone() }),
        Role::Faculty => Some(ViewScope::FacultyRelevant {
            name: actor.name.clone(),
            department: actor.department,
        }),
        Role::Admin | Role::Staff => None,
    }
}
