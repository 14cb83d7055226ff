use serde::Serialize;

use crate::model::coordinate::Coordinate;
use crate::model::question::Question;

//
// ─── TREE NODES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subtopic {
    name: String,
    questions: Vec<Question>,
}

impl Subtopic {
    #[must_use]
    pub fn new(name: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            name: name.into(),
            questions,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chapter {
    name: String,
    subtopics: Vec<Subtopic>,
}

impl Chapter {
    #[must_use]
    pub fn new(name: impl Into<String>, subtopics: Vec<Subtopic>) -> Self {
        Self {
            name: name.into(),
            subtopics,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn subtopics(&self) -> &[Subtopic] {
        &self.subtopics
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.subtopics.iter().map(|s| s.questions.len()).sum()
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// The session subject: chapters → subtopics → questions.
///
/// Navigation helpers walk the tree in document order and skip empty branches,
/// so they stay correct even for trees that were not normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    name: String,
    chapters: Vec<Chapter>,
}

impl Course {
    #[must_use]
    pub fn new(name: impl Into<String>, chapters: Vec<Chapter>) -> Self {
        Self {
            name: name.into(),
            chapters,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Total number of questions across every chapter.
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.chapters.iter().map(Chapter::question_count).sum()
    }

    #[must_use]
    pub fn chapter_question_counts(&self) -> Vec<usize> {
        self.chapters.iter().map(Chapter::question_count).collect()
    }

    /// True when there is no playable question at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.question_count() == 0
    }

    #[must_use]
    pub fn question(&self, at: Coordinate) -> Option<&Question> {
        self.chapters
            .get(at.chapter)?
            .subtopics
            .get(at.subtopic)?
            .questions
            .get(at.question)
    }

    #[must_use]
    pub fn contains(&self, at: Coordinate) -> bool {
        self.question(at).is_some()
    }

    /// Every valid coordinate in document order.
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.questions().map(|(at, _)| at)
    }

    /// Every question with its coordinate, in document order.
    pub fn questions(&self) -> impl Iterator<Item = (Coordinate, &Question)> + '_ {
        self.chapters.iter().enumerate().flat_map(|(c, chapter)| {
            chapter.subtopics.iter().enumerate().flat_map(move |(s, subtopic)| {
                subtopic
                    .questions
                    .iter()
                    .enumerate()
                    .map(move |(q, question)| (Coordinate::new(c, s, q), question))
            })
        })
    }

    #[must_use]
    pub fn first_coordinate(&self) -> Option<Coordinate> {
        self.coordinates().next()
    }

    #[must_use]
    pub fn last_coordinate(&self) -> Option<Coordinate> {
        self.coordinates().last()
    }

    /// The coordinate immediately following `from` in document order: next question
    /// in the subtopic, else first question of the next subtopic, else first
    /// question of the next chapter. `None` at the end of the tree or when `from`
    /// is not a valid coordinate.
    #[must_use]
    pub fn next_coordinate(&self, from: Coordinate) -> Option<Coordinate> {
        if !self.contains(from) {
            return None;
        }
        let chapter = &self.chapters[from.chapter];
        if from.question + 1 < chapter.subtopics[from.subtopic].questions.len() {
            return Some(Coordinate::new(from.chapter, from.subtopic, from.question + 1));
        }

        let later_in_chapter = chapter
            .subtopics
            .iter()
            .enumerate()
            .skip(from.subtopic + 1)
            .find(|(_, s)| !s.questions.is_empty())
            .map(|(s, _)| Coordinate::new(from.chapter, s, 0));
        if later_in_chapter.is_some() {
            return later_in_chapter;
        }

        self.chapters
            .iter()
            .enumerate()
            .skip(from.chapter + 1)
            .find_map(|(c, chapter)| {
                chapter
                    .subtopics
                    .iter()
                    .position(|s| !s.questions.is_empty())
                    .map(|s| Coordinate::new(c, s, 0))
            })
    }

    /// The coordinate immediately preceding `from` in document order.
    #[must_use]
    pub fn previous_coordinate(&self, from: Coordinate) -> Option<Coordinate> {
        if !self.contains(from) {
            return None;
        }
        if from.question > 0 {
            return Some(Coordinate::new(from.chapter, from.subtopic, from.question - 1));
        }

        let last_of = |c: usize, s: usize, subtopic: &Subtopic| {
            subtopic
                .questions
                .len()
                .checked_sub(1)
                .map(|q| Coordinate::new(c, s, q))
        };

        let chapter = &self.chapters[from.chapter];
        let earlier_in_chapter = chapter.subtopics[..from.subtopic]
            .iter()
            .enumerate()
            .rev()
            .find_map(|(s, subtopic)| last_of(from.chapter, s, subtopic));
        if earlier_in_chapter.is_some() {
            return earlier_in_chapter;
        }

        self.chapters[..from.chapter]
            .iter()
            .enumerate()
            .rev()
            .find_map(|(c, chapter)| {
                chapter
                    .subtopics
                    .iter()
                    .enumerate()
                    .rev()
                    .find_map(|(s, subtopic)| last_of(c, s, subtopic))
            })
    }

    /// Clamp an arbitrary coordinate to the nearest valid one.
    ///
    /// Indices past the end are pulled back to the last chapter/subtopic/question.
    /// Returns `None` only for an empty tree.
    #[must_use]
    pub fn clamp(&self, at: Coordinate) -> Option<Coordinate> {
        if self.contains(at) {
            return Some(at);
        }
        if self.is_empty() {
            return None;
        }
        let chapter = at.chapter.min(self.chapters.len() - 1);
        let subtopics = &self.chapters[chapter].subtopics;
        if !subtopics.is_empty() {
            let subtopic = at.subtopic.min(subtopics.len() - 1);
            if let Some(last_q) = subtopics[subtopic].questions.len().checked_sub(1) {
                return Some(Coordinate::new(chapter, subtopic, at.question.min(last_q)));
            }
        }
        // The clamped branch is empty; fall back to the nearest populated slot.
        let target = Coordinate::new(chapter, at.subtopic, at.question);
        self.coordinates()
            .take_while(|c| *c <= target)
            .last()
            .or_else(|| self.first_coordinate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;

    fn question(id: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            vec!["a".into(), "b".into()],
            0,
            "",
        )
        .unwrap()
    }

    fn subtopic(ids: &[u64]) -> Subtopic {
        Subtopic::new("s", ids.iter().copied().map(question).collect())
    }

    /// Chapter 0: [1, 2] [] [3]; chapter 1: []; chapter 2: [4]
    fn ragged() -> Course {
        Course::new(
            "ragged",
            vec![
                Chapter::new("c0", vec![subtopic(&[1, 2]), subtopic(&[]), subtopic(&[3])]),
                Chapter::new("c1", vec![subtopic(&[])]),
                Chapter::new("c2", vec![subtopic(&[4])]),
            ],
        )
    }

    #[test]
    fn counts_sum_to_total() {
        let course = ragged();
        let counts = course.chapter_question_counts();
        assert_eq!(counts, vec![3, 0, 1]);
        assert_eq!(counts.iter().sum::<usize>(), course.question_count());
    }

    #[test]
    fn next_skips_empty_branches() {
        let course = ragged();
        let walked: Vec<_> = std::iter::successors(course.first_coordinate(), |c| {
            course.next_coordinate(*c)
        })
        .map(|c| course.question(c).unwrap().id().value())
        .collect();
        assert_eq!(walked, vec![1, 2, 3, 4]);
    }

    #[test]
    fn previous_mirrors_next() {
        let course = ragged();
        let walked: Vec<_> = std::iter::successors(course.last_coordinate(), |c| {
            course.previous_coordinate(*c)
        })
        .map(|c| course.question(c).unwrap().id().value())
        .collect();
        assert_eq!(walked, vec![4, 3, 2, 1]);
    }

    #[test]
    fn next_of_invalid_coordinate_is_none() {
        assert_eq!(ragged().next_coordinate(Coordinate::new(9, 0, 0)), None);
    }

    #[test]
    fn clamp_pulls_back_to_last_slot() {
        let course = ragged();
        assert_eq!(
            course.clamp(Coordinate::new(0, 0, 9)),
            Some(Coordinate::new(0, 0, 1))
        );
        assert_eq!(
            course.clamp(Coordinate::new(7, 3, 3)),
            Some(Coordinate::new(2, 0, 0))
        );
        // chapter 1 has nothing; nearest populated slot before it
        assert_eq!(
            course.clamp(Coordinate::new(1, 0, 0)),
            Some(Coordinate::new(0, 2, 0))
        );
    }

    #[test]
    fn empty_course_has_no_coordinates() {
        let course = Course::new("empty", Vec::new());
        assert!(course.is_empty());
        assert_eq!(course.first_coordinate(), None);
        assert_eq!(course.clamp(Coordinate::ORIGIN), None);
    }
}
