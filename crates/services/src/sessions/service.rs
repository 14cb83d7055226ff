use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use prep_core::model::{
    Coordinate, Course, CourseId, ProgressRecord, Question, QuestionId, RemoteProgress,
};
use prep_core::{
    BoolMatrix, CompletionStats, NormalizeReport, Normalized, ProgressIndex, ResumePoint,
    ResumptionResolver,
};
use remote::QuestionUpdate;
use tracing::info;

use super::progress::SessionProgress;
use super::state::{QuestionState, QuestionStatus, SessionPhase};
use crate::error::{SessionAction, SessionError};

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One quiz or test attempt over a course.
///
/// Owns the tree, its index, and every matrix derived from it as a single unit,
/// so a matrix can never outlive or disagree with the tree it was shaped from.
/// All local mutations happen here; remote calls are made by
/// [`SessionLoopService`](super::SessionLoopService).
pub struct QuizSession {
    course_id: CourseId,
    course: Course,
    index: ProgressIndex,
    completion: BoolMatrix,
    flags: BoolMatrix,
    seen: BoolMatrix,
    records: HashMap<QuestionId, ProgressRecord>,
    current: Option<Coordinate>,
    selected: Option<usize>,
    is_answered: bool,
    phase: SessionPhase,
    pending: Option<SessionAction>,
    resume_point: Option<ResumePoint>,
    report: NormalizeReport,
    stats: CompletionStats,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Build a session in the `Loading` phase from a normalized tree.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyContent` if the tree has no playable question.
    pub fn new(
        course_id: CourseId,
        normalized: Normalized,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let Normalized { course, report } = normalized;
        if course.is_empty() {
            return Err(SessionError::EmptyContent);
        }

        let index = ProgressIndex::build(&course);
        let completion = index.completion_matrix();
        let flags = index.flag_matrix();
        let seen = BoolMatrix::zeroed(index.shape());
        let stats = CompletionStats::compute(&completion, &flags);

        Ok(Self {
            course_id,
            course,
            index,
            completion,
            flags,
            seen,
            records: HashMap::new(),
            current: None,
            selected: None,
            is_answered: false,
            phase: SessionPhase::Loading,
            pending: None,
            resume_point: None,
            report,
            stats,
            started_at,
            finished_at: None,
        })
    }

    /// Replace all local progress with `remote` and move to the resume coordinate.
    ///
    /// Valid while `Loading` (first load) or `Active` (reload). Remote entries for
    /// questions that are not in the tree are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` for terminal or submitting sessions.
    pub fn resume(&mut self, remote: &RemoteProgress) -> Result<ResumePoint, SessionError> {
        if !matches!(self.phase, SessionPhase::Loading | SessionPhase::Active) {
            return Err(SessionError::NotActive { phase: self.phase });
        }
        let point = ResumptionResolver::new(&self.course, &self.index)
            .resolve(remote)
            .ok_or(SessionError::EmptyContent)?;

        self.records = remote
            .records()
            .into_iter()
            .filter(|(id, _)| self.index.coordinate_of(*id).is_some())
            .collect();
        self.completion = self.index.completion_matrix();
        self.flags = self.index.flag_matrix();
        self.seen = BoolMatrix::zeroed(self.index.shape());
        for (id, record) in &self.records {
            if let Some(at) = self.index.coordinate_of(*id) {
                self.completion.set(at, record.answered());
                self.flags.set(at, record.is_flagged);
            }
        }

        self.phase = SessionPhase::Active;
        self.pending = None;
        self.resume_point = Some(point);
        self.present(point.coordinate);
        self.refresh_stats();

        info!(
            course_id = %self.course_id,
            coordinate = %point.coordinate,
            reason = ?point.reason,
            "session resumed"
        );
        Ok(point)
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn current(&self) -> Option<Coordinate> {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current.and_then(|at| self.course.question(at))
    }

    /// Transient selection for the question on screen.
    #[must_use]
    pub fn selected_option(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.is_answered
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current
            .is_some_and(|at| self.course.next_coordinate(at).is_none())
    }

    #[must_use]
    pub fn record(&self, id: QuestionId) -> ProgressRecord {
        self.records.get(&id).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn completion(&self) -> &BoolMatrix {
        &self.completion
    }

    #[must_use]
    pub fn flags(&self) -> &BoolMatrix {
        &self.flags
    }

    #[must_use]
    pub fn stats(&self) -> &CompletionStats {
        &self.stats
    }

    #[must_use]
    pub fn normalize_report(&self) -> NormalizeReport {
        self.report
    }

    #[must_use]
    pub fn resume_point(&self) -> Option<ResumePoint> {
        self.resume_point
    }

    #[must_use]
    pub fn pending_confirmation(&self) -> Option<SessionAction> {
        self.pending
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    #[must_use]
    pub fn question_state(&self, at: Coordinate) -> Option<QuestionStatus> {
        let question = self.course.question(at)?;
        let record = self.record(question.id());
        let state = if record.answered() {
            QuestionState::Answered
        } else if self.seen.get(at) {
            QuestionState::Presented
        } else {
            QuestionState::Unseen
        };
        Some(QuestionStatus {
            state,
            is_flagged: self.flags.get(at),
            is_completed: self.completion.get(at),
        })
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            phase: self.phase,
            current: self.current,
            position: self
                .current
                .and_then(|at| self.course.coordinates().position(|c| c == at))
                .map(|p| p + 1),
            stats: self.stats.clone(),
        }
    }

    //
    // ─── LOCAL ACTIONS ─────────────────────────────────────────────────────────
    //

    /// Select an option on the current question. Selecting the already selected
    /// option clears the answer again.
    ///
    /// Returns the selection after the call. Does not contact the backend.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside the `Active` phase and
    /// `SessionError::InvalidOption` for an index past the last option.
    pub fn select_option(&mut self, index: usize) -> Result<Option<usize>, SessionError> {
        self.ensure_active()?;
        let (at, question) = self.current_slot()?;
        let (id, len) = (question.id(), question.options().len());
        if index >= len {
            return Err(SessionError::InvalidOption { index, len });
        }

        let record = self.records.entry(id).or_default();
        let selected = if record.selected_option == Some(index) {
            None
        } else {
            Some(index)
        };
        record.selected_option = selected;

        self.selected = selected;
        self.is_answered = selected.is_some();
        self.completion.set(at, selected.is_some());
        self.refresh_stats();
        Ok(selected)
    }

    /// Flag the current question. Persisted with its next submission.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside the `Active` phase.
    pub fn flag(&mut self) -> Result<bool, SessionError> {
        self.set_flag(true)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside the `Active` phase.
    pub fn unflag(&mut self) -> Result<bool, SessionError> {
        self.set_flag(false)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside the `Active` phase.
    pub fn toggle_flag(&mut self) -> Result<bool, SessionError> {
        let flagged = self.current.is_some_and(|at| self.flags.get(at));
        self.set_flag(!flagged)
    }

    fn set_flag(&mut self, value: bool) -> Result<bool, SessionError> {
        self.ensure_active()?;
        let (at, question) = self.current_slot()?;
        let id = question.id();
        self.records.entry(id).or_default().is_flagged = value;
        self.flags.set(at, value);
        self.refresh_stats();
        Ok(value)
    }

    /// Step back one question without submitting anything.
    ///
    /// Returns `None` (and stays put) on the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside the `Active` phase.
    pub fn previous(&mut self) -> Result<Option<Coordinate>, SessionError> {
        self.ensure_active()?;
        let (at, _) = self.current_slot()?;
        let previous = self.course.previous_coordinate(at);
        if let Some(previous) = previous {
            self.present(previous);
        }
        Ok(previous)
    }

    /// Move directly to `at`, e.g. from a question palette.
    ///
    /// An out-of-range coordinate is clamped to the nearest valid one. Returns
    /// the coordinate actually presented.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside the `Active` phase.
    pub fn jump_to(&mut self, at: Coordinate) -> Result<Coordinate, SessionError> {
        self.ensure_active()?;
        let target = self.course.clamp(at).ok_or(SessionError::EmptyContent)?;
        self.present(target);
        Ok(target)
    }

    /// Open the submit confirmation.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside the `Active` phase.
    pub fn request_submit(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.pending = Some(SessionAction::Submit);
        Ok(())
    }

    /// Open the quit confirmation.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside the `Active` phase.
    pub fn request_quit(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.pending = Some(SessionAction::Quit);
        Ok(())
    }

    pub fn cancel_confirmation(&mut self) {
        self.pending = None;
    }

    //
    // ─── CRATE-INTERNAL TRANSITIONS ────────────────────────────────────────────
    //

    pub(crate) fn ensure_active(&self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Active {
            Ok(())
        } else {
            Err(SessionError::NotActive { phase: self.phase })
        }
    }

    pub(crate) fn ensure_confirmed(&self, action: SessionAction) -> Result<(), SessionError> {
        self.ensure_active()?;
        if self.pending == Some(action) {
            Ok(())
        } else {
            Err(SessionError::ConfirmationRequired(action))
        }
    }

    /// Update carrying the current question's selection and flag.
    pub(crate) fn current_update(&self) -> Result<QuestionUpdate, SessionError> {
        let (_, question) = self.current_slot()?;
        let record = self.record(question.id());
        Ok(QuestionUpdate {
            question_id: question.id(),
            selected_option: record.selected_option,
            is_flagged: record.is_flagged,
        })
    }

    /// Clear the selection, mark the question complete, and return the explicit
    /// skip update (null selection, current flag).
    pub(crate) fn mark_skipped(&mut self) -> Result<QuestionUpdate, SessionError> {
        let (at, question) = self.current_slot()?;
        let id = question.id();
        let record = self.records.entry(id).or_default();
        record.selected_option = None;
        let update = QuestionUpdate {
            question_id: id,
            selected_option: None,
            is_flagged: record.is_flagged,
        };

        self.selected = None;
        self.is_answered = false;
        self.completion.set(at, true);
        self.refresh_stats();
        Ok(update)
    }

    /// Advance in document order. `None` when the current question is the last.
    pub(crate) fn step_forward(&mut self) -> Option<Coordinate> {
        let next = self.course.next_coordinate(self.current?)?;
        self.present(next);
        Some(next)
    }

    pub(crate) fn begin_submitting(&mut self) {
        self.phase = SessionPhase::Submitting;
    }

    pub(crate) fn abort_submitting(&mut self) {
        self.phase = SessionPhase::Active;
    }

    pub(crate) fn complete(&mut self, at: DateTime<Utc>) {
        self.phase = SessionPhase::Completed;
        self.pending = None;
        self.finished_at = Some(at);
    }

    pub(crate) fn abandon(&mut self, at: DateTime<Utc>) {
        self.phase = SessionPhase::Abandoned;
        self.pending = None;
        self.finished_at = Some(at);
    }

    fn current_slot(&self) -> Result<(Coordinate, &Question), SessionError> {
        self.current
            .and_then(|at| self.course.question(at).map(|q| (at, q)))
            .ok_or(SessionError::NotActive { phase: self.phase })
    }

    fn present(&mut self, at: Coordinate) {
        self.current = Some(at);
        self.seen.set(at, true);
        let record = self
            .course
            .question(at)
            .map(|q| self.record(q.id()))
            .unwrap_or_default();
        self.selected = record.selected_option;
        self.is_answered = record.answered();
    }

    fn refresh_stats(&mut self) {
        self.stats = CompletionStats::compute(&self.completion, &self.flags);
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("course_id", &self.course_id)
            .field("questions", &self.course.question_count())
            .field("current", &self.current)
            .field("phase", &self.phase)
            .field("pending", &self.pending)
            .field("records_len", &self.records.len())
            .field("started_at", &self.started_at)
            .field("finished_at", &self.finished_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
