use std::sync::Arc;

use prep_core::model::CourseId;
use prep_core::{AnalyticsReport, normalize};
use remote::SyncClient;
use tracing::debug;

use crate::error::SessionError;

/// Latest submitted attempt for a course, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analytics {
    NotSubmitted,
    Submitted(AnalyticsReport),
}

/// Loads and grades the most recently submitted attempt.
#[derive(Clone)]
pub struct AnalyticsService {
    client: Arc<dyn SyncClient>,
}

impl AnalyticsService {
    #[must_use]
    pub fn new(client: Arc<dyn SyncClient>) -> Self {
        Self { client }
    }

    /// Grade the latest submission against the course's current questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if either fetch fails. "Nothing submitted yet" is
    /// `Ok(Analytics::NotSubmitted)`, not an error.
    pub async fn latest(&self, course_id: CourseId) -> Result<Analytics, SessionError> {
        let (payload, submitted) = tokio::join!(
            self.client.fetch_questions(course_id),
            self.client.fetch_latest_analytics(course_id)
        );
        let Some(submitted) = submitted? else {
            debug!(course_id = %course_id, "no submitted attempt");
            return Ok(Analytics::NotSubmitted);
        };
        let normalized = normalize(&payload?, &format!("Course {course_id}"));
        Ok(Analytics::Submitted(AnalyticsReport::from_remote(
            &normalized.course,
            &submitted,
        )))
    }
}
