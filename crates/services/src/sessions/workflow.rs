use std::sync::Arc;

use prep_core::model::{Coordinate, CourseId};
use prep_core::{ResumePoint, normalize};
use remote::{QuestionUpdate, SyncClient};
use tracing::{info, warn};

use super::queue::SubmissionQueue;
use super::service::QuizSession;
use crate::Clock;
use crate::error::{SessionAction, SessionError};
use crate::navigation::{Destination, Navigator, NoopNavigator};

/// Where the session ended up after `continue` or `skip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Moved to the next question in document order.
    Moved(Coordinate),
    /// The question was the last one and the session was submitted.
    Completed,
}

/// Result of advancing past the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceOutcome {
    /// The update sent for the question that was left.
    pub update: QuestionUpdate,
    /// The update was not acknowledged. Local state is kept regardless.
    pub sync_failed: bool,
    pub step: Step,
}

/// Orchestrates session start, per-question sync and the terminal actions.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    client: Arc<dyn SyncClient>,
    navigator: Arc<dyn Navigator>,
    submissions: Arc<SubmissionQueue>,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(clock: Clock, client: Arc<dyn SyncClient>) -> Self {
        Self {
            clock,
            client,
            navigator: Arc::new(NoopNavigator),
            submissions: Arc::new(SubmissionQueue::new()),
        }
    }

    #[must_use]
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    /// Fetch questions and progress concurrently and open an active session at
    /// the resume point.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyContent` if nothing survives normalization and
    /// `SessionError::Remote` if either fetch fails.
    pub async fn start_session(&self, course_id: CourseId) -> Result<QuizSession, SessionError> {
        let (payload, progress) = tokio::join!(
            self.client.fetch_questions(course_id),
            self.client.fetch_progress(course_id)
        );
        let normalized = normalize(&payload?, &format!("Course {course_id}"));
        let progress = progress?;

        let mut session = QuizSession::new(course_id, normalized, self.clock.now())?;
        session.resume(&progress)?;
        Ok(session)
    }

    /// Refetch remote progress and replace the session's local records with it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the fetch fails or the session already ended.
    pub async fn reload(&self, session: &mut QuizSession) -> Result<ResumePoint, SessionError> {
        let progress = self.client.fetch_progress(session.course_id()).await?;
        session.resume(&progress)
    }

    /// Persist the current question and move on. On the last question this
    /// submits the session.
    ///
    /// A failed question update is logged and reported via
    /// [`AdvanceOutcome::sync_failed`]; it never blocks navigation.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside the `Active` phase, or
    /// `SessionError::SessionAction` if the final submit fails.
    pub async fn continue_current(
        &self,
        session: &mut QuizSession,
    ) -> Result<AdvanceOutcome, SessionError> {
        session.ensure_active()?;
        let update = session.current_update()?;
        self.advance(session, update).await
    }

    /// Record an explicit skip (null selection, current flag) and move on.
    ///
    /// # Errors
    ///
    /// Same as [`continue_current`](Self::continue_current).
    pub async fn skip_current(
        &self,
        session: &mut QuizSession,
    ) -> Result<AdvanceOutcome, SessionError> {
        session.ensure_active()?;
        let update = session.mark_skipped()?;
        self.advance(session, update).await
    }

    async fn advance(
        &self,
        session: &mut QuizSession,
        update: QuestionUpdate,
    ) -> Result<AdvanceOutcome, SessionError> {
        let sync_failed = !self.sync_question(&update).await;
        let step = match session.step_forward() {
            Some(next) => Step::Moved(next),
            None => {
                self.submit_unchecked(session).await?;
                Step::Completed
            }
        };
        Ok(AdvanceOutcome {
            update,
            sync_failed,
            step,
        })
    }

    async fn sync_question(&self, update: &QuestionUpdate) -> bool {
        match self.submissions.submit(self.client.as_ref(), update).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    question_id = %update.question_id,
                    error = %err,
                    "question update failed; keeping local state"
                );
                false
            }
        }
    }

    /// Submit a session whose submit confirmation is open.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ConfirmationRequired` without a pending submit
    /// confirmation. On backend failure returns `SessionError::SessionAction`
    /// and leaves the session `Active`.
    pub async fn submit(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        session.ensure_confirmed(SessionAction::Submit)?;
        self.submit_unchecked(session).await
    }

    async fn submit_unchecked(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        let course = session.course_id();
        session.begin_submitting();
        info!(course_id = %course, "submitting session");

        if let Err(source) = self.client.submit_session(course).await {
            session.abort_submitting();
            warn!(course_id = %course, error = %source, "session submit failed");
            return Err(SessionError::SessionAction {
                action: SessionAction::Submit,
                source,
            });
        }

        session.complete(self.clock.now());
        info!(course_id = %course, "session completed");
        self.navigator.navigate(Destination::Analytics { course });
        Ok(())
    }

    /// Abandon a session whose quit confirmation is open.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ConfirmationRequired` without a pending quit
    /// confirmation. On backend failure returns `SessionError::SessionAction`
    /// and leaves the session `Active`.
    pub async fn quit(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        session.ensure_confirmed(SessionAction::Quit)?;
        let course = session.course_id();

        if let Err(source) = self.client.quit_session(course).await {
            warn!(course_id = %course, error = %source, "session quit failed");
            return Err(SessionError::SessionAction {
                action: SessionAction::Quit,
                source,
            });
        }

        session.abandon(self.clock.now());
        info!(course_id = %course, "session abandoned");
        self.navigator.navigate(Destination::CourseHome { course });
        Ok(())
    }
}
