use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use prep_core::RawPayload;
use prep_core::model::{CourseId, QuestionId, RemoteProgress, RemoteQuestionProgress};

use crate::client::{QuestionUpdate, SyncClient};
use crate::error::RemoteError;

/// Every call received by an [`InMemorySyncClient`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncCall {
    FetchQuestions(CourseId),
    FetchProgress(CourseId),
    SubmitQuestion(QuestionUpdate),
    SubmitSession(CourseId),
    QuitSession(CourseId),
    FetchAnalytics(CourseId),
}

#[derive(Default)]
struct MemoryState {
    payloads: HashMap<CourseId, RawPayload>,
    progress: HashMap<CourseId, RemoteProgress>,
    owners: HashMap<QuestionId, CourseId>,
    submitted: HashMap<CourseId, RemoteProgress>,
    calls: Vec<SyncCall>,
    fail_question_updates: bool,
    fail_session_actions: bool,
}

/// In-memory backend for tests and prototyping.
///
/// Behaves like the REST backend: question updates upsert the progress entry and
/// move the last-viewed pointer; submit snapshots the record as the latest
/// analytics and clears the live record; quit clears the live record.
#[derive(Clone, Default)]
pub struct InMemorySyncClient {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemorySyncClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, RemoteError> {
        self.state
            .lock()
            .map_err(|e| RemoteError::Backend(e.to_string()))
    }

    /// Seed the question payload for a course.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Backend` if the state lock is poisoned.
    pub fn insert_payload(&self, course: CourseId, payload: RawPayload) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        collect_owners(&mut state.owners, course, &payload);
        state.payloads.insert(course, payload);
        Ok(())
    }

    /// Seed the live progress record for a course.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Backend` if the state lock is poisoned.
    pub fn insert_progress(
        &self,
        course: CourseId,
        progress: RemoteProgress,
    ) -> Result<(), RemoteError> {
        self.lock()?.progress.insert(course, progress);
        Ok(())
    }

    /// Make subsequent `submit_question` calls fail.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Backend` if the state lock is poisoned.
    pub fn set_fail_question_updates(&self, fail: bool) -> Result<(), RemoteError> {
        self.lock()?.fail_question_updates = fail;
        Ok(())
    }

    /// Make subsequent `submit_session`/`quit_session` calls fail.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Backend` if the state lock is poisoned.
    pub fn set_fail_session_actions(&self, fail: bool) -> Result<(), RemoteError> {
        self.lock()?.fail_session_actions = fail;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RemoteError::Backend` if the state lock is poisoned.
    pub fn calls(&self) -> Result<Vec<SyncCall>, RemoteError> {
        Ok(self.lock()?.calls.clone())
    }

    /// Question updates received so far.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Backend` if the state lock is poisoned.
    pub fn question_updates(&self) -> Result<Vec<QuestionUpdate>, RemoteError> {
        Ok(self
            .lock()?
            .calls
            .iter()
            .filter_map(|call| match call {
                SyncCall::SubmitQuestion(update) => Some(*update),
                _ => None,
            })
            .collect())
    }

    /// Current live progress record for a course.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Backend` if the state lock is poisoned.
    pub fn progress(&self, course: CourseId) -> Result<RemoteProgress, RemoteError> {
        Ok(self.lock()?.progress.get(&course).cloned().unwrap_or_default())
    }
}

fn collect_owners(
    owners: &mut HashMap<QuestionId, CourseId>,
    course: CourseId,
    payload: &RawPayload,
) {
    let normalized = prep_core::normalize(payload, "");
    for (_, question) in normalized.course.questions() {
        owners.insert(question.id(), course);
    }
}

fn apply_update(progress: &mut RemoteProgress, update: &QuestionUpdate) {
    let entry = RemoteQuestionProgress {
        question: update.question_id,
        selected_option: update.selected_option,
        is_flagged: update.is_flagged,
    };
    match progress
        .questions
        .iter_mut()
        .find(|q| q.question == update.question_id)
    {
        Some(existing) => *existing = entry,
        None => progress.questions.push(entry),
    }
    progress.last_viewed_question = Some(update.question_id);
    progress.attempted_questions = u32::try_from(
        progress.questions.iter().filter(|q| q.answered()).count(),
    )
    .unwrap_or(u32::MAX);
}

#[async_trait]
impl SyncClient for InMemorySyncClient {
    async fn fetch_questions(&self, course: CourseId) -> Result<RawPayload, RemoteError> {
        let mut state = self.lock()?;
        state.calls.push(SyncCall::FetchQuestions(course));
        state
            .payloads
            .get(&course)
            .cloned()
            .ok_or(RemoteError::HttpStatus(reqwest::StatusCode::NOT_FOUND))
    }

    async fn fetch_progress(&self, course: CourseId) -> Result<RemoteProgress, RemoteError> {
        let mut state = self.lock()?;
        state.calls.push(SyncCall::FetchProgress(course));
        Ok(state.progress.get(&course).cloned().unwrap_or_default())
    }

    async fn submit_question(&self, update: &QuestionUpdate) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        state.calls.push(SyncCall::SubmitQuestion(*update));
        if state.fail_question_updates {
            return Err(RemoteError::Backend("question update rejected".into()));
        }
        let course = state
            .owners
            .get(&update.question_id)
            .copied()
            .ok_or(RemoteError::HttpStatus(reqwest::StatusCode::NOT_FOUND))?;
        apply_update(state.progress.entry(course).or_default(), update);
        Ok(())
    }

    async fn submit_session(&self, course: CourseId) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        state.calls.push(SyncCall::SubmitSession(course));
        if state.fail_session_actions {
            return Err(RemoteError::Backend("submit rejected".into()));
        }
        let snapshot = state.progress.remove(&course).unwrap_or_default();
        state.submitted.insert(course, snapshot);
        Ok(())
    }

    async fn quit_session(&self, course: CourseId) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        state.calls.push(SyncCall::QuitSession(course));
        if state.fail_session_actions {
            return Err(RemoteError::Backend("quit rejected".into()));
        }
        state.progress.remove(&course);
        Ok(())
    }

    async fn fetch_latest_analytics(
        &self,
        course: CourseId,
    ) -> Result<Option<RemoteProgress>, RemoteError> {
        let mut state = self.lock()?;
        state.calls.push(SyncCall::FetchAnalytics(course));
        Ok(state.submitted.get(&course).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> RawPayload {
        RawPayload::from_value(json!({
            "questions": [
                { "id": 1, "text": "Q1", "option0": "a", "option1": "b", "correct_option": 0 },
                { "id": 2, "text": "Q2", "option0": "a", "option1": "b", "correct_option": 1 }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn updates_move_last_viewed_and_upsert() {
        let client = InMemorySyncClient::new();
        let course = CourseId::new(1);
        client.insert_payload(course, payload()).unwrap();

        let update = |id, selected| QuestionUpdate {
            question_id: QuestionId::new(id),
            selected_option: selected,
            is_flagged: false,
        };
        client.submit_question(&update(1, Some(0))).await.unwrap();
        client.submit_question(&update(2, None)).await.unwrap();
        client.submit_question(&update(1, Some(1))).await.unwrap();

        let progress = client.progress(course).unwrap();
        assert_eq!(progress.last_viewed_question, Some(QuestionId::new(1)));
        assert_eq!(progress.questions.len(), 2);
        assert_eq!(progress.questions[0].selected_option, Some(1));
        assert_eq!(progress.attempted_questions, 1);
    }

    #[tokio::test]
    async fn submit_moves_record_to_analytics() {
        let client = InMemorySyncClient::new();
        let course = CourseId::new(1);
        client.insert_payload(course, payload()).unwrap();
        assert_eq!(client.fetch_latest_analytics(course).await.unwrap(), None);

        client
            .submit_question(&QuestionUpdate {
                question_id: QuestionId::new(2),
                selected_option: Some(1),
                is_flagged: true,
            })
            .await
            .unwrap();
        client.submit_session(course).await.unwrap();

        let analytics = client.fetch_latest_analytics(course).await.unwrap().unwrap();
        assert_eq!(analytics.questions.len(), 1);
        assert_eq!(client.progress(course).unwrap(), RemoteProgress::default());
    }

    #[tokio::test]
    async fn injected_failures_are_reported() {
        let client = InMemorySyncClient::new();
        client.set_fail_session_actions(true).unwrap();
        let err = client.quit_session(CourseId::new(1)).await.unwrap_err();
        assert!(matches!(err, RemoteError::Backend(_)));
        assert_eq!(
            client.calls().unwrap(),
            vec![SyncCall::QuitSession(CourseId::new(1))]
        );
    }
}
