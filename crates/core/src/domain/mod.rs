pub mod actor;
pub mod request;
pub mod step;

pub use actor::{Actor, Department, Role};
pub use request::{Request, RequestDraft, RequestId, RequestStatus, RequestType, Requestor};
pub use step::{ApprovalStep, Approver, Decision, StepId, StepStatus};

pub(crate) fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .replace(&['_', '-'][..], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
