pub mod engine;
pub mod sequencer;

pub use engine::{ensure_decidable, ApprovalStateMachine, DecisionInput, DecisionOutcome};
pub use sequencer::{campus_sequence, CampusSequencer, StepSequencer};
