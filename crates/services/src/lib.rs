#![forbid(unsafe_code)]

pub mod analytics_service;
pub mod error;
pub mod navigation;
pub mod sessions;

pub use prep_core::Clock;
pub use sessions as session;

pub use analytics_service::{Analytics, AnalyticsService};
pub use error::{SessionAction, SessionError};
pub use navigation::{Destination, Navigator, NoopNavigator};

pub use sessions::{
    AdvanceOutcome, QuestionState, QuestionStatus, QuizSession, SessionLoopService, SessionPhase,
    SessionProgress, Step, SubmissionQueue,
};
