use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use campusflow_core::authorization::Authorizer;
use campusflow_core::clock::{Clock, SystemClock};
use campusflow_core::config::AppConfig;
use campusflow_core::domain::{Actor, Approver, Request, RequestDraft, RequestId};
use campusflow_core::errors::DomainError;
use campusflow_core::flows::{
    ensure_decidable, ApprovalStateMachine, CampusSequencer, DecisionInput, StepSequencer,
};
use campusflow_core::notifications::{NoopNotificationSink, NotificationEvent, NotificationSink};
use campusflow_core::views::{dashboard_scope_for, recent_activity, summarize};
use campusflow_core::views::{DashboardSummary, RequestFilter};

use super::{DecisionCommand, RepositoryError, RequestRepository};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewLimits {
    pub recent_activity: usize,
    pub dashboard_recent: usize,
}

impl Default for ViewLimits {
    fn default() -> Self {
        Self { recent_activity: 5, dashboard_recent: 3 }
    }
}

#[derive(Default)]
struct RequestStore {
    requests: HashMap<String, Request>,
    insertion_order: Vec<RequestId>,
}

impl RequestStore {
    fn ordered(&self) -> impl Iterator<Item = &Request> {
        self.insertion_order.iter().filter_map(|id| self.requests.get(&id.0))
    }
}

/// Process-local repository. One write guard spans lookup, authorization, decision and
/// commit, so decisions on a request are serialized and never partially applied.
pub struct InMemoryRequestRepository<S = CampusSequencer, C = SystemClock> {
    store: RwLock<RequestStore>,
    machine: ApprovalStateMachine<S, C>,
    authorizer: Authorizer,
    notifications: Arc<dyn NotificationSink>,
    limits: ViewLimits,
}

impl Default for InMemoryRequestRepository {
    fn default() -> Self {
        Self::new(ApprovalStateMachine::default())
    }
}

impl InMemoryRequestRepository {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::default().configured(config)
    }
}

impl<S, C> InMemoryRequestRepository<S, C>
where
    S: StepSequencer,
    C: Clock,
{
    pub fn new(machine: ApprovalStateMachine<S, C>) -> Self {
        Self {
            store: RwLock::new(RequestStore::default()),
            machine,
            authorizer: Authorizer::default(),
            notifications: Arc::new(NoopNotificationSink),
            limits: ViewLimits::default(),
        }
    }

    /// Applies the workflow section of `config`: override policy and view limits.
    pub fn configured(self, config: &AppConfig) -> Self {
        self.with_authorizer(Authorizer::new(config.workflow.faculty_override)).with_limits(
            ViewLimits {
                recent_activity: config.workflow.recent_activity_limit,
                dashboard_recent: config.workflow.dashboard_recent_limit,
            },
        )
    }

    pub fn with_authorizer(mut self, authorizer: Authorizer) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_notifications(mut self, notifications: Arc<dyn NotificationSink>) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn with_limits(mut self, limits: ViewLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    pub fn limits(&self) -> ViewLimits {
        self.limits
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.requests.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every request. Only for explicit teardown between runs.
    pub async fn clear(&self) {
        let mut store = self.store.write().await;
        store.requests.clear();
        store.insertion_order.clear();
    }

    fn forbidden(request: &Request, actor: &Actor, reason: String) -> DomainError {
        DomainError::Forbidden { request_id: request.id.0.clone(), actor_id: actor.id.clone(), reason }
    }
}

#[async_trait::async_trait]
impl<S, C> RequestRepository for InMemoryRequestRepository<S, C>
where
    S: StepSequencer + 'static,
    C: Clock + 'static,
{
    async fn create(&self, draft: RequestDraft) -> Result<Request, RepositoryError> {
        let correlation_id = Uuid::new_v4().to_string();
        let actor_id = draft.requestor.id.clone();
        let request = self.machine.open(draft)?;

        {
            let mut store = self.store.write().await;
            store.insertion_order.push(request.id.clone());
            store.requests.insert(request.id.0.clone(), request.clone());
        }

        info!(
            event_name = "workflow.request.created",
            correlation_id = %correlation_id,
            request_id = %request.id,
            actor_id = %actor_id,
            request_type = request.request_type.as_str(),
            step_count = request.steps.len(),
            "request created"
        );
        self.notifications.notify(NotificationEvent::created(&request, actor_id, correlation_id));

        Ok(request)
    }

    async fn find_by_id(&self, id: &RequestId) -> Result<Request, RepositoryError> {
        let store = self.store.read().await;
        store.requests.get(&id.0).cloned().ok_or_else(|| RepositoryError::NotFound(id.clone()))
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, RepositoryError> {
        let store = self.store.read().await;
        Ok(filter.apply(store.ordered(), &self.authorizer))
    }

    async fn apply_decision(
        &self,
        id: &RequestId,
        command: DecisionCommand,
        actor: &Actor,
    ) -> Result<Request, RepositoryError> {
        let DecisionCommand { step_index, decision, notes, expected_version, correlation_id } =
            command;

        let outcome = {
            let mut store = self.store.write().await;
            let Some(current) = store.requests.get(&id.0) else {
                return Err(RepositoryError::NotFound(id.clone()));
            };

            if let Some(expected_version) = expected_version {
                if expected_version != current.version {
                    warn!(
                        event_name = "workflow.decision.rejected",
                        correlation_id = %correlation_id,
                        request_id = %id,
                        actor_id = %actor.id,
                        expected_version,
                        actual_version = current.version,
                        "stale decision rejected"
                    );
                    return Err(RepositoryError::Conflict {
                        request_id: id.clone(),
                        expected_version,
                        actual_version: current.version,
                    });
                }
            }

            let checked = ensure_decidable(current, step_index).and_then(|()| {
                let authorization = self.authorizer.evaluate(current, actor);
                if authorization.allowed {
                    Ok(())
                } else {
                    Err(Self::forbidden(current, actor, authorization.reason))
                }
            });
            if let Err(error) = checked {
                warn!(
                    event_name = "workflow.decision.rejected",
                    correlation_id = %correlation_id,
                    request_id = %id,
                    actor_id = %actor.id,
                    step_index,
                    error = %error,
                    "decision rejected"
                );
                return Err(error.into());
            }

            let input = DecisionInput {
                step_index,
                decision,
                notes,
                approver: Some(Approver::from(actor)),
            };
            let next_version = current.version + 1;
            let mut outcome = self.machine.decide(current, input)?;
            outcome.request.version = next_version;
            store.requests.insert(id.0.clone(), outcome.request.clone());
            outcome
        };

        info!(
            event_name = "workflow.decision.applied",
            correlation_id = %correlation_id,
            request_id = %id,
            actor_id = %actor.id,
            step_index,
            decision = decision.as_str(),
            from = outcome.from.as_str(),
            to = outcome.to.as_str(),
            version = outcome.request.version,
            "decision applied"
        );
        self.notifications.notify(NotificationEvent::decided(
            &outcome.request,
            step_index,
            decision,
            actor.id.clone(),
            correlation_id,
        ));

        Ok(outcome.request)
    }

    async fn dashboard(&self, actor: &Actor) -> Result<DashboardSummary, RepositoryError> {
        let scope = dashboard_scope_for(actor);
        let store = self.store.read().await;
        let requests: Vec<Request> = store.ordered().cloned().collect();
        Ok(summarize(&requests, scope.as_ref(), &self.authorizer, self.limits.dashboard_recent))
    }

    async fn recent_activity(&self) -> Result<Vec<Request>, RepositoryError> {
        let store = self.store.read().await;
        Ok(recent_activity(store.ordered(), self.limits.recent_activity))
    }
}
