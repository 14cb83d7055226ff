mod progress;
mod queue;
mod service;
mod state;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{SessionAction, SessionError};
pub use progress::SessionProgress;
pub use queue::SubmissionQueue;
pub use service::QuizSession;
pub use state::{QuestionState, QuestionStatus, SessionPhase};
pub use workflow::{AdvanceOutcome, SessionLoopService, Step};
