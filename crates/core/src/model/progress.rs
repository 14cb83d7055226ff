use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

//
// ─── LOCAL RECORD ──────────────────────────────────────────────────────────────
//

/// Per-question learner state held by a session.
///
/// Created lazily on first interaction and replaced wholesale when the session
/// is reloaded from remote state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressRecord {
    pub selected_option: Option<usize>,
    pub is_flagged: bool,
}

impl ProgressRecord {
    #[must_use]
    pub fn answered(&self) -> bool {
        self.selected_option.is_some()
    }
}

//
// ─── REMOTE RECORD ─────────────────────────────────────────────────────────────
//

/// One entry of the remote per-question progress list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteQuestionProgress {
    #[serde(alias = "question_id")]
    pub question: QuestionId,
    #[serde(default)]
    pub selected_option: Option<usize>,
    #[serde(default)]
    pub is_flagged: bool,
}

impl RemoteQuestionProgress {
    #[must_use]
    pub fn answered(&self) -> bool {
        self.selected_option.is_some()
    }
}

/// Progress record as served by `/{quiz|test}_progress/{course}/progress/`.
///
/// The same body shape is returned by the latest-submitted-analytics endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProgress {
    #[serde(default)]
    pub attempted_questions: u32,
    #[serde(default, alias = "last_viewed_question_id")]
    pub last_viewed_question: Option<QuestionId>,
    #[serde(default)]
    pub questions: Vec<RemoteQuestionProgress>,
}

impl RemoteProgress {
    /// Ids whose `selected_option` is non-null. Flagging alone never counts.
    #[must_use]
    pub fn answered_ids(&self) -> HashSet<QuestionId> {
        self.entries()
            .into_iter()
            .filter(|(_, entry)| entry.answered())
            .map(|(id, _)| id)
            .collect()
    }

    /// Entries keyed by question id; a later duplicate replaces an earlier one.
    #[must_use]
    pub fn entries(&self) -> HashMap<QuestionId, RemoteQuestionProgress> {
        self.questions.iter().map(|q| (q.question, *q)).collect()
    }

    /// Fresh local records seeded from this remote state.
    #[must_use]
    pub fn records(&self) -> HashMap<QuestionId, ProgressRecord> {
        self.entries()
            .into_iter()
            .map(|(id, entry)| {
                (
                    id,
                    ProgressRecord {
                        selected_option: entry.selected_option,
                        is_flagged: entry.is_flagged,
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_wire_shape() {
        let progress: RemoteProgress = serde_json::from_value(json!({
            "attempted_questions": 2,
            "last_viewed_question": 2,
            "questions": [
                { "question": 1, "selected_option": 0, "is_flagged": false },
                { "question": "2", "selected_option": null, "is_flagged": true }
            ]
        }))
        .unwrap();

        assert_eq!(progress.attempted_questions, 2);
        assert_eq!(progress.last_viewed_question, Some(QuestionId::new(2)));
        assert_eq!(progress.questions.len(), 2);
        assert!(progress.questions[1].is_flagged);
    }

    #[test]
    fn missing_fields_default() {
        let progress: RemoteProgress =
            serde_json::from_value(json!({ "last_viewed_question": null })).unwrap();
        assert_eq!(progress, RemoteProgress::default());
    }

    #[test]
    fn flagged_without_selection_is_not_answered() {
        let progress: RemoteProgress = serde_json::from_value(json!({
            "questions": [
                { "question": 1, "selected_option": 2 },
                { "question": 2, "selected_option": null, "is_flagged": true }
            ]
        }))
        .unwrap();
        let answered = progress.answered_ids();
        assert!(answered.contains(&QuestionId::new(1)));
        assert!(!answered.contains(&QuestionId::new(2)));
    }

    #[test]
    fn later_duplicate_wins() {
        let progress: RemoteProgress = serde_json::from_value(json!({
            "questions": [
                { "question": 5, "selected_option": 1 },
                { "question": 5, "selected_option": null }
            ]
        }))
        .unwrap();
        assert!(progress.answered_ids().is_empty());
        assert_eq!(
            progress.records()[&QuestionId::new(5)],
            ProgressRecord::default()
        );
    }
}
