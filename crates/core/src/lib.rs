pub mod authorization;
pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod notifications;
pub mod views;

pub use authorization::{
    can_act, AuthorizationFailure, AuthorizationGrant, AuthorizationResult, Authorizer,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::{
    Actor, ApprovalStep, Approver, Decision, Department, Request, RequestDraft, RequestId,
    RequestStatus, RequestType, Requestor, Role, StepId, StepStatus,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{
    campus_sequence, ApprovalStateMachine, CampusSequencer, DecisionInput, DecisionOutcome,
    StepSequencer,
};
pub use notifications::{
    NoopNotificationSink, Notification, NotificationEvent, NotificationInbox, NotificationKind,
    NotificationSink, TracingNotificationSink,
};
pub use views::{
    dashboard_scope_for, recent_activity, summarize, DashboardSummary, RequestFilter, SortOrder,
    StatusCounts, ViewScope,
};
