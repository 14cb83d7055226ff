//! Turns the two question payload shapes into one canonical `Course`.
//!
//! Malformed nodes are filtered out instead of failing the whole payload. Every
//! drop is counted in a [`NormalizeReport`] so callers can surface data-quality
//! problems without blocking the learner.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{Chapter, Course, Question, QuestionError, QuestionId, Subtopic};

//
// ─── RAW PAYLOADS ──────────────────────────────────────────────────────────────
//

/// Question fetch body, in either of the two shapes the backend serves.
///
/// Children are kept as raw JSON so that one broken node cannot poison the
/// deserialization of its siblings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawPayload {
    /// `{ chapters: [{ subtopics: [{ questions: [...] }] }] }`
    Nested {
        #[serde(default, alias = "title")]
        name: Option<String>,
        chapters: Vec<Value>,
    },
    /// `{ total_questions, questions: [...] }`
    Flat {
        #[serde(default)]
        total_questions: Option<u64>,
        questions: Vec<Value>,
    },
}

impl RawPayload {
    /// Parse a payload from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the value matches neither shape.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawChapter {
    #[serde(alias = "title", alias = "chapter_name")]
    name: Option<String>,
    subtopics: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSubtopic {
    #[serde(alias = "title", alias = "subtopic_name")]
    name: Option<String>,
    questions: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawQuestion {
    id: Option<Value>,
    text: Option<String>,
    question: Option<String>,
    option0: Option<String>,
    option1: Option<String>,
    option2: Option<String>,
    option3: Option<String>,
    options: Option<Vec<Value>>,
    correct_option: Option<Value>,
    #[serde(rename = "correctOption")]
    correct_option_alt: Option<Value>,
    explanation: Option<String>,
}

//
// ─── REPORT ────────────────────────────────────────────────────────────────────
//

/// Diagnostic counts of nodes removed during normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub dropped_questions: usize,
    pub dropped_subtopics: usize,
    pub dropped_chapters: usize,
}

impl NormalizeReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.total_dropped() == 0
    }

    #[must_use]
    pub fn total_dropped(&self) -> usize {
        self.dropped_questions + self.dropped_subtopics + self.dropped_chapters
    }
}

/// A canonical tree plus what was filtered to produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub course: Course,
    pub report: NormalizeReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DropReason {
    MissingId,
    DuplicateId(QuestionId),
    MissingPrompt,
    UnresolvedCorrectOption,
    Invalid(QuestionError),
    Unparseable,
}

//
// ─── NORMALIZER ────────────────────────────────────────────────────────────────
//

/// Normalize a raw question payload.
///
/// The flat shape becomes a single chapter holding a single subtopic, both named
/// `course_name`. The nested shape keeps its own name when it carries one.
#[must_use]
pub fn normalize(payload: &RawPayload, course_name: &str) -> Normalized {
    let mut pass = Pass::default();

    let course = match payload {
        RawPayload::Nested { name, chapters } => {
            let chapters = chapters
                .iter()
                .filter_map(|raw| pass.raw_chapter(raw))
                .collect();
            let name = name
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(course_name);
            Course::new(name, chapters)
        }
        RawPayload::Flat {
            total_questions,
            questions,
        } => {
            if let Some(expected) = total_questions.filter(|n| *n != questions.len() as u64) {
                debug!(
                    expected,
                    actual = questions.len(),
                    "total_questions disagrees with payload length"
                );
            }
            let questions: Vec<_> = questions
                .iter()
                .filter_map(|raw| pass.raw_question(raw))
                .collect();
            let chapters = if questions.is_empty() {
                Vec::new()
            } else {
                vec![Chapter::new(
                    course_name,
                    vec![Subtopic::new(course_name, questions)],
                )]
            };
            Course::new(course_name, chapters)
        }
    };

    pass.finish(course)
}

/// Re-apply the normalization rules to an existing tree.
///
/// A tree produced by [`normalize`] comes back unchanged with a clean report.
#[must_use]
pub fn normalize_course(course: &Course) -> Normalized {
    let mut pass = Pass::default();

    let chapters = course
        .chapters()
        .iter()
        .filter_map(|chapter| {
            let subtopics = chapter
                .subtopics()
                .iter()
                .filter_map(|subtopic| {
                    let questions = subtopic
                        .questions()
                        .iter()
                        .filter_map(|q| pass.accept(q.clone()))
                        .collect();
                    pass.keep_subtopic(subtopic.name(), questions)
                })
                .collect();
            pass.keep_chapter(chapter.name(), subtopics)
        })
        .collect();

    pass.finish(Course::new(course.name(), chapters))
}

#[derive(Default)]
struct Pass {
    seen: HashSet<QuestionId>,
    report: NormalizeReport,
}

impl Pass {
    fn finish(self, course: Course) -> Normalized {
        if !self.report.is_clean() {
            warn!(
                dropped_questions = self.report.dropped_questions,
                dropped_subtopics = self.report.dropped_subtopics,
                dropped_chapters = self.report.dropped_chapters,
                kept_questions = course.question_count(),
                "dropped malformed content nodes"
            );
        }
        Normalized {
            course,
            report: self.report,
        }
    }

    fn raw_chapter(&mut self, raw: &Value) -> Option<Chapter> {
        let Ok(chapter) = RawChapter::deserialize(raw) else {
            self.report.dropped_chapters += 1;
            return None;
        };
        let subtopics = chapter
            .subtopics
            .iter()
            .filter_map(|raw| self.raw_subtopic(raw))
            .collect();
        self.keep_chapter(chapter.name.as_deref().unwrap_or_default(), subtopics)
    }

    fn raw_subtopic(&mut self, raw: &Value) -> Option<Subtopic> {
        let Ok(subtopic) = RawSubtopic::deserialize(raw) else {
            self.report.dropped_subtopics += 1;
            return None;
        };
        let questions = subtopic
            .questions
            .iter()
            .filter_map(|raw| self.raw_question(raw))
            .collect();
        self.keep_subtopic(subtopic.name.as_deref().unwrap_or_default(), questions)
    }

    fn raw_question(&mut self, raw: &Value) -> Option<Question> {
        match canonical_question(raw) {
            Ok(question) => self.accept(question),
            Err(reason) => {
                self.reject(&reason);
                None
            }
        }
    }

    /// Final gate shared by both entry points: validation and id uniqueness.
    fn accept(&mut self, question: Question) -> Option<Question> {
        let revalidated = Question::new(
            question.id(),
            question.prompt(),
            question.options().to_vec(),
            question.correct_option(),
            question.explanation(),
        );
        match revalidated {
            Err(err) => {
                self.reject(&DropReason::Invalid(err));
                None
            }
            Ok(q) if !self.seen.insert(q.id()) => {
                self.reject(&DropReason::DuplicateId(q.id()));
                None
            }
            Ok(q) => Some(q),
        }
    }

    fn reject(&mut self, reason: &DropReason) {
        debug!(?reason, "dropping question");
        self.report.dropped_questions += 1;
    }

    fn keep_subtopic(&mut self, name: &str, questions: Vec<Question>) -> Option<Subtopic> {
        if questions.is_empty() {
            self.report.dropped_subtopics += 1;
            return None;
        }
        Some(Subtopic::new(name, questions))
    }

    fn keep_chapter(&mut self, name: &str, subtopics: Vec<Subtopic>) -> Option<Chapter> {
        if subtopics.is_empty() {
            self.report.dropped_chapters += 1;
            return None;
        }
        Some(Chapter::new(name, subtopics))
    }
}

fn canonical_question(raw: &Value) -> Result<Question, DropReason> {
    let raw = RawQuestion::deserialize(raw).map_err(|_| DropReason::Unparseable)?;

    let id = raw.id.as_ref().and_then(as_index).map(QuestionId::new);
    let prompt = raw
        .text
        .or(raw.question)
        .filter(|p| !p.trim().is_empty());
    let (id, prompt) = match (id, prompt) {
        (Some(id), Some(prompt)) => (id, prompt),
        (None, _) => return Err(DropReason::MissingId),
        (_, None) => return Err(DropReason::MissingPrompt),
    };

    let options = match raw.options {
        Some(list) if !list.is_empty() => list.iter().map(option_text).collect(),
        _ => {
            let mut slots: Vec<String> = [raw.option0, raw.option1, raw.option2, raw.option3]
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect();
            while slots.last().is_some_and(|s| s.trim().is_empty()) {
                slots.pop();
            }
            slots
        }
    };

    let correct = match (&raw.correct_option, &raw.correct_option_alt) {
        (Some(value), _) => resolve_correct(value, &options, CorrectKey::Index),
        (None, Some(value)) => resolve_correct(value, &options, CorrectKey::Text),
        (None, None) => None,
    }
    .ok_or(DropReason::UnresolvedCorrectOption)?;

    Question::new(
        id,
        prompt,
        options,
        correct,
        raw.explanation.unwrap_or_default(),
    )
    .map_err(DropReason::Invalid)
}

/// Non-negative integer from a JSON number or numeric string.
fn as_index(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn option_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => map
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// Which payload field carried the correct answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CorrectKey {
    /// `correct_option`: an option index.
    Index,
    /// `correctOption`: the answer as the learner sees it.
    Text,
}

/// Resolve the correct option against the option list.
///
/// `correct_option` is read as an index first, then as option text, then as a
/// letter `A`–`D`. `correctOption` is read as option text first, then as a
/// letter, then as an index, so numeric option texts are never mistaken for
/// positions.
fn resolve_correct(value: &Value, options: &[String], key: CorrectKey) -> Option<usize> {
    let text = value.as_str().map(str::trim);
    let by_index = || as_index(value).and_then(|i| usize::try_from(i).ok());
    let by_text = || text.and_then(|t| options.iter().position(|o| o.trim() == t));
    let by_letter = || text.and_then(letter_index);

    match key {
        CorrectKey::Index => by_index().or_else(by_text).or_else(by_letter),
        CorrectKey::Text => by_text().or_else(by_letter).or_else(by_index),
    }
}

fn letter_index(text: &str) -> Option<usize> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(letter @ ('A'..='D' | 'a'..='d')), None) => {
            Some(usize::from(letter.to_ascii_uppercase() as u8 - b'A'))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinate;
    use serde_json::json;

    fn payload(value: Value) -> RawPayload {
        RawPayload::from_value(value).unwrap()
    }

    #[test]
    fn flat_test_shape_becomes_single_branch() {
        let raw = payload(json!({
            "total_questions": 2,
            "questions": [
                { "id": 1, "text": "Q1", "option0": "a", "option1": "b", "option2": "c",
                  "option3": "d", "correct_option": 2, "explanation": "because" },
                { "id": 2, "text": "Q2", "option0": "yes", "option1": "no",
                  "correct_option": 0, "explanation": "" }
            ]
        }));

        let out = normalize(&raw, "Physics");
        assert!(out.report.is_clean());
        assert_eq!(out.course.name(), "Physics");
        assert_eq!(out.course.chapter_question_counts(), vec![2]);

        let q1 = out.course.question(Coordinate::ORIGIN).unwrap();
        assert_eq!(q1.options().len(), 4);
        assert_eq!(q1.correct_option(), 2);
        assert_eq!(q1.explanation(), "because");

        let q2 = out.course.question(Coordinate::new(0, 0, 1)).unwrap();
        assert_eq!(q2.options(), ["yes", "no"]);
    }

    #[test]
    fn nested_quiz_shape_with_string_correct_option() {
        let raw = payload(json!({
            "chapters": [{
                "name": "Algebra",
                "subtopics": [{
                    "name": "Linear",
                    "questions": [
                        { "id": "10", "question": "x + 1 = 2", "options": ["0", "1", "2"],
                          "correctOption": "1" },
                        { "id": 11, "question": "Capital of France?",
                          "options": ["Berlin", "Paris"], "correctOption": "Paris" },
                        { "id": 12, "question": "Pick B", "options": ["a", "b", "c"],
                          "correctOption": "B" }
                    ]
                }]
            }]
        }));

        let out = normalize(&raw, "fallback");
        assert!(out.report.is_clean());
        assert_eq!(out.course.name(), "fallback");
        let chapter = &out.course.chapters()[0];
        assert_eq!(chapter.name(), "Algebra");
        let questions = chapter.subtopics()[0].questions();
        assert_eq!(questions[0].id(), QuestionId::new(10));
        assert_eq!(questions[0].correct_option(), 1);
        assert_eq!(questions[1].correct_option(), 1);
        assert_eq!(questions[2].correct_option(), 1);
    }

    #[test]
    fn numeric_option_texts_resolve_by_field() {
        let raw = payload(json!({
            "chapters": [{
                "name": "Arithmetic",
                "subtopics": [{
                    "name": "Sums",
                    "questions": [
                        { "id": 1, "question": "1 + 1", "options": ["1", "2", "3", "4"],
                          "correctOption": "2" },
                        { "id": 2, "question": "2 + 2", "options": ["2", "4", "6", "8"],
                          "correctOption": "4" },
                        { "id": 3, "question": "3 + 3", "options": ["3", "6", "9"],
                          "correctOption": 2 },
                        { "id": 4, "text": "1 - 1", "option0": "2", "option1": "1",
                          "option2": "0", "correct_option": "2" }
                    ]
                }]
            }]
        }));

        let out = normalize(&raw, "c");
        assert!(out.report.is_clean());
        let questions = out.course.chapters()[0].subtopics()[0].questions();
        assert_eq!(questions.len(), 4);

        let answer = |q: &Question| q.options()[q.correct_option()].clone();
        assert_eq!(answer(&questions[0]), "2");
        assert_eq!(answer(&questions[1]), "4");
        assert_eq!(answer(&questions[2]), "9");
        assert_eq!(answer(&questions[3]), "0");
    }

    #[test]
    fn question_missing_id_and_prompt_is_dropped() {
        let raw = payload(json!({
            "questions": [
                { "option0": "a", "option1": "b", "correct_option": 0 },
                { "id": 2, "text": "kept", "option0": "a", "option1": "b", "correct_option": 1 }
            ]
        }));
        let out = normalize(&raw, "c");
        assert_eq!(out.course.question_count(), 1);
        assert_eq!(out.report.dropped_questions, 1);
    }

    #[test]
    fn empty_branches_are_dropped_recursively() {
        let raw = payload(json!({
            "chapters": [
                { "name": "bad", "subtopics": [
                    { "name": "all invalid", "questions": [ { "id": 1 }, "garbage" ] },
                    { "name": "empty", "questions": [] }
                ]},
                { "name": "good", "subtopics": [
                    { "name": "ok", "questions": [
                        { "id": 3, "text": "Q", "option0": "a", "option1": "b",
                          "correct_option": 0 }
                    ]}
                ]},
                42
            ]
        }));

        let out = normalize(&raw, "c");
        assert_eq!(out.course.chapters().len(), 1);
        assert_eq!(out.course.chapters()[0].name(), "good");
        assert_eq!(
            out.report,
            NormalizeReport {
                dropped_questions: 2,
                dropped_subtopics: 2,
                dropped_chapters: 2,
            }
        );
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let raw = payload(json!({
            "questions": [
                { "id": 1, "text": "first", "option0": "a", "option1": "b", "correct_option": 0 },
                { "id": 1, "text": "second", "option0": "a", "option1": "b", "correct_option": 0 }
            ]
        }));
        let out = normalize(&raw, "c");
        assert_eq!(out.course.question_count(), 1);
        assert_eq!(
            out.course.question(Coordinate::ORIGIN).unwrap().prompt(),
            "first"
        );
        assert_eq!(out.report.dropped_questions, 1);
    }

    #[test]
    fn option_gaps_and_bad_correct_option_are_dropped() {
        let raw = payload(json!({
            "questions": [
                { "id": 1, "text": "gap", "option0": "a", "option2": "c", "correct_option": 0 },
                { "id": 2, "text": "range", "option0": "a", "option1": "b", "correct_option": 3 },
                { "id": 3, "text": "unknown", "options": ["a", "b"], "correctOption": "zzz" },
                { "id": 4, "text": "trailing", "option0": "a", "option1": "b", "option2": "",
                  "correct_option": 1 }
            ]
        }));
        let out = normalize(&raw, "c");
        assert_eq!(out.report.dropped_questions, 3);
        let kept = out.course.question(Coordinate::ORIGIN).unwrap();
        assert_eq!(kept.id(), QuestionId::new(4));
        assert_eq!(kept.options().len(), 2);
    }

    #[test]
    fn all_invalid_payload_yields_empty_course() {
        let raw = payload(json!({ "questions": [ { "id": 1 } ] }));
        let out = normalize(&raw, "c");
        assert!(out.course.is_empty());
        assert!(out.course.chapters().is_empty());
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw = payload(json!({
            "chapters": [{
                "name": "Ch",
                "subtopics": [
                    { "name": "S1", "questions": [
                        { "id": 1, "text": "Q1", "option0": "a", "option1": "b",
                          "correct_option": 1 },
                        { "id": 2, "question": "Q2", "options": ["x", "y", "z"],
                          "correctOption": "z" }
                    ]},
                    { "name": "S2", "questions": [ { "id": 1, "text": "dup" } ] }
                ]
            }]
        }));
        let first = normalize(&raw, "Course");

        let again = normalize_course(&first.course);
        assert_eq!(again.course, first.course);
        assert!(again.report.is_clean());

        // The serialized canonical tree is itself a valid nested payload.
        let reparsed = payload(serde_json::to_value(&first.course).unwrap());
        let round = normalize(&reparsed, "other");
        assert_eq!(round.course, first.course);
        assert!(round.report.is_clean());
    }
}
