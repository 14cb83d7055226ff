//! Derived completion percentages and answer breakdowns.

use crate::index::BoolMatrix;
use crate::model::{Course, RemoteProgress};

/// `part / total × 100`, with an empty total reading as 0%.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / total as f64
}

//
// ─── COMPLETION ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChapterCompletion {
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
}

/// Completion derived from the local completion and flag matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionStats {
    pub completed: usize,
    pub total: usize,
    pub flagged: usize,
    pub overall_percent: f64,
    pub chapters: Vec<ChapterCompletion>,
}

impl CompletionStats {
    #[must_use]
    pub fn compute(completion: &BoolMatrix, flags: &BoolMatrix) -> Self {
        let shape = completion.shape();
        let chapters: Vec<_> = (0..completion.chapter_len())
            .map(|c| {
                let completed = completion.chapter_count_true(c);
                let total = shape.chapter_total(c);
                ChapterCompletion {
                    completed,
                    total,
                    percent: percent(completed, total),
                }
            })
            .collect();
        let total = chapters.iter().map(|c| c.total).sum();
        let completed = completion.count_true();

        Self {
            completed,
            total,
            flagged: flags.count_true(),
            overall_percent: percent(completed, total),
            chapters,
        }
    }

    /// Question count per chapter; always sums to `total`.
    #[must_use]
    pub fn chapter_question_counts(&self) -> Vec<usize> {
        self.chapters.iter().map(|c| c.total).collect()
    }
}

//
// ─── ANSWER BREAKDOWN ──────────────────────────────────────────────────────────
//

/// Correct/incorrect/skipped counts, derived from the remote record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerBreakdown {
    pub correct: usize,
    pub incorrect: usize,
    pub skipped: usize,
    pub flagged: usize,
    pub total: usize,
}

impl AnswerBreakdown {
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.correct + self.incorrect
    }

    #[must_use]
    pub fn accuracy_percent(&self) -> f64 {
        percent(self.correct, self.total)
    }

    fn absorb(&mut self, other: &Self) {
        self.correct += other.correct;
        self.incorrect += other.incorrect;
        self.skipped += other.skipped;
        self.flagged += other.flagged;
        self.total += other.total;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterBreakdown {
    pub name: String,
    pub breakdown: AnswerBreakdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsReport {
    pub overall: AnswerBreakdown,
    pub chapters: Vec<ChapterBreakdown>,
}

impl AnalyticsReport {
    /// Compare each question's remote selection against its correct option.
    ///
    /// A question with no remote entry, or with a null selection, is skipped and
    /// never incorrect. Flags are counted independently of the answer outcome.
    #[must_use]
    pub fn from_remote(course: &Course, remote: &RemoteProgress) -> Self {
        let entries = remote.entries();
        let chapters: Vec<_> = course
            .chapters()
            .iter()
            .map(|chapter| {
                let mut breakdown = AnswerBreakdown::default();
                for question in chapter.subtopics().iter().flat_map(|s| s.questions()) {
                    breakdown.total += 1;
                    let entry = entries.get(&question.id());
                    if entry.is_some_and(|e| e.is_flagged) {
                        breakdown.flagged += 1;
                    }
                    match entry.and_then(|e| e.selected_option) {
                        None => breakdown.skipped += 1,
                        Some(selected) if question.is_correct(selected) => breakdown.correct += 1,
                        Some(_) => breakdown.incorrect += 1,
                    }
                }
                ChapterBreakdown {
                    name: chapter.name().to_string(),
                    breakdown,
                }
            })
            .collect();

        let mut overall = AnswerBreakdown::default();
        for chapter in &chapters {
            overall.absorb(&chapter.breakdown);
        }
        Self { overall, chapters }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ProgressIndex, TreeShape};
    use crate::model::{Chapter, Coordinate, Question, QuestionId, Subtopic};
    use serde_json::json;

    fn question(id: u64, correct: usize) -> Question {
        Question::new(
            QuestionId::new(id),
            "Q",
            vec!["a".into(), "b".into(), "c".into()],
            correct,
            "",
        )
        .unwrap()
    }

    fn course() -> Course {
        Course::new(
            "c",
            vec![
                Chapter::new("one", vec![Subtopic::new("s", vec![question(1, 0), question(2, 1)])]),
                Chapter::new("two", vec![Subtopic::new("s", vec![question(3, 2), question(4, 0)])]),
            ],
        )
    }

    #[test]
    fn full_matrix_is_one_hundred_percent() {
        let shape = TreeShape::of(&course());
        let stats = CompletionStats::compute(
            &BoolMatrix::filled(&shape, true),
            &BoolMatrix::zeroed(&shape),
        );
        assert!((stats.overall_percent - 100.0).abs() < f64::EPSILON);
        for chapter in &stats.chapters {
            assert!((chapter.percent - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn partial_completion_per_chapter() {
        let index = ProgressIndex::build(&course());
        let mut completion = index.completion_matrix();
        let mut flags = index.flag_matrix();
        completion.set(Coordinate::new(0, 0, 0), true);
        flags.set(Coordinate::new(1, 0, 1), true);

        let stats = CompletionStats::compute(&completion, &flags);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.flagged, 1);
        assert!((stats.overall_percent - 25.0).abs() < f64::EPSILON);
        assert!((stats.chapters[0].percent - 50.0).abs() < f64::EPSILON);
        assert!(stats.chapters[1].percent.abs() < f64::EPSILON);
    }

    #[test]
    fn chapter_counts_sum_to_total() {
        let index = ProgressIndex::build(&course());
        let stats = CompletionStats::compute(&index.completion_matrix(), &index.flag_matrix());
        assert_eq!(
            stats.chapter_question_counts().iter().sum::<usize>(),
            stats.total
        );
        assert_eq!(stats.total, course().question_count());
    }

    #[test]
    fn empty_tree_is_zero_percent() {
        let shape = TreeShape::default();
        let zeroed = BoolMatrix::zeroed(&shape);
        let stats = CompletionStats::compute(&zeroed, &zeroed);
        assert_eq!(stats.total, 0);
        assert!(stats.overall_percent.abs() < f64::EPSILON);
    }

    #[test]
    fn breakdown_counts_missing_and_null_as_skipped() {
        let remote: RemoteProgress = serde_json::from_value(json!({
            "questions": [
                { "question": 1, "selected_option": 0 },
                { "question": 2, "selected_option": 2, "is_flagged": true },
                { "question": 3, "selected_option": null, "is_flagged": true }
            ]
        }))
        .unwrap();

        let report = AnalyticsReport::from_remote(&course(), &remote);
        assert_eq!(
            report.overall,
            AnswerBreakdown {
                correct: 1,
                incorrect: 1,
                skipped: 2,
                flagged: 2,
                total: 4,
            }
        );
        assert_eq!(report.chapters[0].name, "one");
        assert_eq!(report.chapters[0].breakdown.attempted(), 2);
        assert_eq!(report.chapters[1].breakdown.skipped, 2);
        assert!((report.overall.accuracy_percent() - 25.0).abs() < f64::EPSILON);
    }
}
