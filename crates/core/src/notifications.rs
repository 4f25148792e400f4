use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::domain::request::{Request, RequestId, RequestStatus, RequestType};
use crate::domain::step::Decision;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Created,
    Decided,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Decided => "decided",
        }
    }
}

/// Advisory side-channel event. Delivery is best effort and never affects workflow state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub event_id: String,
    pub kind: NotificationKind,
    pub request_id: RequestId,
    pub correlation_id: String,
    pub actor_id: String,
    pub title: String,
    pub message: String,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn created(
        request: &Request,
        actor_id: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        let first_department =
            request.steps.first().map(|step| step.department.as_str()).unwrap_or("no");
        Self::new(
            NotificationKind::Created,
            request,
            actor_id,
            correlation_id,
            "New approval request",
            format!(
                "{} \"{}\" is awaiting {first_department} approval",
                capitalize(type_label(request)),
                request.title
            ),
        )
        .with_metadata("status", request.status.as_str())
    }

    /// Built from the request as it stands after the decision on `step_index`.
    pub fn decided(
        request: &Request,
        step_index: usize,
        decision: Decision,
        actor_id: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        let department = request
            .steps
            .get(step_index)
            .map(|step| step.department.as_str())
            .unwrap_or("an unknown department");
        let label = type_label(request);

        let (title, message) = match (decision, request.status) {
            (Decision::Rejected, _) => (
                "Request rejected",
                format!("Your {label} \"{}\" has been rejected by {department}", request.title),
            ),
            (Decision::Approved, RequestStatus::Approved) => (
                "Request approved",
                format!(
                    "Your {label} \"{}\" has been approved by {department} and is complete",
                    request.title
                ),
            ),
            (Decision::Approved, _) => {
                let next = request
                    .active_step()
                    .map(|step| step.department.as_str())
                    .unwrap_or("the next department");
                (
                    "Approval step completed",
                    format!(
                        "Your {label} \"{}\" was approved by {department} and moved to {next}",
                        request.title
                    ),
                )
            }
        };

        Self::new(NotificationKind::Decided, request, actor_id, correlation_id, title, message)
            .with_metadata("decision", decision.as_str())
            .with_metadata("step_index", step_index.to_string())
            .with_metadata("department", department)
            .with_metadata("status", request.status.as_str())
    }

    fn new(
        kind: NotificationKind,
        request: &Request,
        actor_id: impl Into<String>,
        correlation_id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            kind,
            request_id: request.id.clone(),
            correlation_id: correlation_id.into(),
            actor_id: actor_id.into(),
            title: title.into(),
            message: message.into(),
            metadata: BTreeMap::new(),
            occurred_at: request.updated_at,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

fn type_label(request: &Request) -> &'static str {
    match request.request_type {
        RequestType::RoomBooking => "room booking request",
        RequestType::EventHosting => "event hosting request",
        RequestType::EquipmentRequest => "equipment request",
        RequestType::Maintenance => "maintenance request",
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: NotificationEvent);
}

/// Sink that drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotificationSink;

impl NotificationSink for NoopNotificationSink {
    fn notify(&self, _event: NotificationEvent) {}
}

/// Forwards events to the tracing subscriber as structured records.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, event: NotificationEvent) {
        info!(
            event_name = "workflow.notification.emitted",
            correlation_id = %event.correlation_id,
            request_id = %event.request_id,
            actor_id = %event.actor_id,
            kind = event.kind.as_str(),
            title = %event.title,
            "{}",
            event.message
        );
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub event: NotificationEvent,
    pub read: bool,
}

/// Entries kept by a default inbox before the oldest are evicted.
pub const DEFAULT_INBOX_CAPACITY: usize = 200;

/// In-memory inbox with read tracking. Clones share the same entries.
///
/// Holds at most `capacity` notifications; once full, each new event evicts the oldest.
#[derive(Clone)]
pub struct NotificationInbox {
    entries: Arc<Mutex<VecDeque<Notification>>>,
    capacity: usize,
}

impl Default for NotificationInbox {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_INBOX_CAPACITY)
    }
}

impl NotificationInbox {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))), capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.with_entries(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.with_entries(|entries| entries.iter().rev().cloned().collect())
    }

    pub fn unread_count(&self) -> usize {
        self.with_entries(|entries| entries.iter().filter(|entry| !entry.read).count())
    }

    /// Returns false when no notification has the given id.
    pub fn mark_read(&self, event_id: &str) -> bool {
        self.with_entries(|entries| {
            match entries.iter_mut().find(|entry| entry.event.event_id == event_id) {
                Some(entry) => {
                    entry.read = true;
                    true
                }
                None => false,
            }
        })
    }

    /// Returns how many notifications changed from unread to read.
    pub fn mark_all_read(&self) -> usize {
        self.with_entries(|entries| {
            let mut marked = 0;
            for entry in entries.iter_mut().filter(|entry| !entry.read) {
                entry.read = true;
                marked += 1;
            }
            marked
        })
    }

    /// Removes every notification, returning how many were dropped.
    pub fn clear(&self) -> usize {
        self.with_entries(|entries| {
            let dropped = entries.len();
            entries.clear();
            dropped
        })
    }

    fn with_entries<T>(&self, apply: impl FnOnce(&mut VecDeque<Notification>) -> T) -> T {
        match self.entries.lock() {
            Ok(mut entries) => apply(&mut *entries),
            Err(poisoned) => apply(&mut *poisoned.into_inner()),
        }
    }
}

impl NotificationSink for NotificationInbox {
    fn notify(&self, event: NotificationEvent) {
        let capacity = self.capacity;
        self.with_entries(|entries| {
            while entries.len() >= capacity {
                entries.pop_front();
            }
            entries.push_back(Notification { event, read: false });
        });
    }
}
