use async_trait::async_trait;
use prep_core::RawPayload;
use prep_core::model::{CourseId, QuestionId, RemoteProgress};
use serde::Serialize;

use crate::error::RemoteError;

/// Body of `POST /{quiz|test}_progress/update_question/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuestionUpdate {
    pub question_id: QuestionId,
    pub selected_option: Option<usize>,
    pub is_flagged: bool,
}

/// Request layer between a session and the progress backend.
///
/// Implementations perform exactly one attempt per call: no retries, no backoff
/// and no idempotency key. Ordering between calls is the caller's concern.
#[async_trait]
pub trait SyncClient: Send + Sync {
    /// Fetch the question payload for a course, in whichever shape the backend serves.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport, status or decoding failures.
    async fn fetch_questions(&self, course: CourseId) -> Result<RawPayload, RemoteError>;

    /// Fetch the learner's progress record for a course.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport, status or decoding failures.
    async fn fetch_progress(&self, course: CourseId) -> Result<RemoteProgress, RemoteError>;

    /// Persist one question's selection and flag state.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the update was not accepted.
    async fn submit_question(&self, update: &QuestionUpdate) -> Result<(), RemoteError>;

    /// Submit the whole session for grading.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the submission was not accepted.
    async fn submit_session(&self, course: CourseId) -> Result<(), RemoteError>;

    /// Abandon the session.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the backend did not acknowledge the quit.
    async fn quit_session(&self, course: CourseId) -> Result<(), RemoteError>;

    /// Fetch the most recently submitted attempt.
    ///
    /// Returns `Ok(None)` when nothing has been submitted yet.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` for any failure other than the "no analytics" sentinel.
    async fn fetch_latest_analytics(
        &self,
        course: CourseId,
    ) -> Result<Option<RemoteProgress>, RemoteError>;
}
