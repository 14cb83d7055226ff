//! Post-session navigation hook.

use prep_core::model::CourseId;

/// Where the learner should be taken once a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Results page after a successful submit.
    Analytics { course: CourseId },
    /// Course landing page after a quit.
    CourseHome { course: CourseId },
}

/// Receives navigation requests from the session workflow.
///
/// Called exactly once per terminal transition, after the backend acknowledged it.
pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: Destination);
}

/// Navigator that ignores every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _destination: Destination) {}
}
