//! Question-id lookup and tree-shaped boolean matrices.

use std::collections::HashMap;

use crate::model::{Coordinate, Course, QuestionId};

//
// ─── SHAPE ─────────────────────────────────────────────────────────────────────
//

/// Question count of every subtopic, grouped by chapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeShape(Vec<Vec<usize>>);

impl TreeShape {
    #[must_use]
    pub fn of(course: &Course) -> Self {
        Self(
            course
                .chapters()
                .iter()
                .map(|c| c.subtopics().iter().map(|s| s.questions().len()).collect())
                .collect(),
        )
    }

    #[must_use]
    pub fn chapters(&self) -> &[Vec<usize>] {
        &self.0
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.0.iter().flatten().sum()
    }

    #[must_use]
    pub fn chapter_total(&self, chapter: usize) -> usize {
        self.0.get(chapter).map_or(0, |s| s.iter().sum())
    }
}

//
// ─── MATRIX ────────────────────────────────────────────────────────────────────
//

/// Boolean per question, laid out exactly like the tree it was built from.
///
/// Used for completion, flag and seen state. A matrix never changes shape; build
/// a new one when the tree is rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolMatrix {
    cells: Vec<Vec<Vec<bool>>>,
}

impl BoolMatrix {
    #[must_use]
    pub fn zeroed(shape: &TreeShape) -> Self {
        Self::filled(shape, false)
    }

    #[must_use]
    pub fn filled(shape: &TreeShape, value: bool) -> Self {
        Self {
            cells: shape
                .chapters()
                .iter()
                .map(|c| c.iter().map(|&n| vec![value; n]).collect())
                .collect(),
        }
    }

    #[must_use]
    pub fn shape(&self) -> TreeShape {
        TreeShape(
            self.cells
                .iter()
                .map(|c| c.iter().map(Vec::len).collect())
                .collect(),
        )
    }

    /// Value at `at`; out-of-range coordinates read as `false`.
    #[must_use]
    pub fn get(&self, at: Coordinate) -> bool {
        self.cells
            .get(at.chapter)
            .and_then(|c| c.get(at.subtopic))
            .and_then(|s| s.get(at.question))
            .copied()
            .unwrap_or(false)
    }

    /// Set the value at `at`. Returns `false` when the coordinate is out of range.
    pub fn set(&mut self, at: Coordinate, value: bool) -> bool {
        match self
            .cells
            .get_mut(at.chapter)
            .and_then(|c| c.get_mut(at.subtopic))
            .and_then(|s| s.get_mut(at.question))
        {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn count_true(&self) -> usize {
        self.cells.iter().flatten().flatten().filter(|b| **b).count()
    }

    #[must_use]
    pub fn chapter_count_true(&self, chapter: usize) -> usize {
        self.cells
            .get(chapter)
            .map_or(0, |c| c.iter().flatten().filter(|b| **b).count())
    }

    #[must_use]
    pub fn chapter_len(&self) -> usize {
        self.cells.len()
    }
}

//
// ─── INDEX ─────────────────────────────────────────────────────────────────────
//

/// Lookup from question id to its coordinate, built once per tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressIndex {
    positions: HashMap<QuestionId, Coordinate>,
    shape: TreeShape,
}

impl ProgressIndex {
    /// Build the index in a single pass over the tree.
    ///
    /// If an id repeats, the first occurrence wins. Normalized trees never repeat ids.
    #[must_use]
    pub fn build(course: &Course) -> Self {
        let mut positions = HashMap::with_capacity(course.question_count());
        for (at, question) in course.questions() {
            positions.entry(question.id()).or_insert(at);
        }
        Self {
            positions,
            shape: TreeShape::of(course),
        }
    }

    #[must_use]
    pub fn coordinate_of(&self, id: QuestionId) -> Option<Coordinate> {
        self.positions.get(&id).copied()
    }

    #[must_use]
    pub fn shape(&self) -> &TreeShape {
        &self.shape
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// True if this index was built from a tree of the same shape as `course`.
    #[must_use]
    pub fn is_current_for(&self, course: &Course) -> bool {
        self.shape == TreeShape::of(course)
    }

    #[must_use]
    pub fn completion_matrix(&self) -> BoolMatrix {
        BoolMatrix::zeroed(&self.shape)
    }

    #[must_use]
    pub fn flag_matrix(&self) -> BoolMatrix {
        BoolMatrix::zeroed(&self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Chapter, Question, Subtopic};

    fn question(id: u64) -> Question {
        Question::new(QuestionId::new(id), "Q", vec!["a".into(), "b".into()], 0, "").unwrap()
    }

    fn course() -> Course {
        Course::new(
            "c",
            vec![
                Chapter::new(
                    "c0",
                    vec![
                        Subtopic::new("s0", vec![question(10), question(11)]),
                        Subtopic::new("s1", vec![question(12)]),
                    ],
                ),
                Chapter::new("c1", vec![Subtopic::new("s0", vec![question(13)])]),
            ],
        )
    }

    #[test]
    fn index_maps_ids_to_coordinates() {
        let index = ProgressIndex::build(&course());
        assert_eq!(index.len(), 4);
        assert_eq!(
            index.coordinate_of(QuestionId::new(12)),
            Some(Coordinate::new(0, 1, 0))
        );
        assert_eq!(
            index.coordinate_of(QuestionId::new(13)),
            Some(Coordinate::new(1, 0, 0))
        );
        assert_eq!(index.coordinate_of(QuestionId::new(99)), None);
    }

    #[test]
    fn matrices_match_tree_shape() {
        let course = course();
        let index = ProgressIndex::build(&course);
        let matrix = index.completion_matrix();
        assert_eq!(matrix.shape(), TreeShape::of(&course));
        assert_eq!(matrix.shape().chapters(), &[vec![2, 1], vec![1]]);
        assert_eq!(matrix.count_true(), 0);
        assert_eq!(index.flag_matrix(), matrix);
    }

    #[test]
    fn set_and_count() {
        let index = ProgressIndex::build(&course());
        let mut matrix = index.completion_matrix();
        assert!(matrix.set(Coordinate::new(0, 0, 1), true));
        assert!(matrix.set(Coordinate::new(1, 0, 0), true));
        assert!(!matrix.set(Coordinate::new(1, 1, 0), true));
        assert_eq!(matrix.count_true(), 2);
        assert_eq!(matrix.chapter_count_true(0), 1);
        assert_eq!(matrix.chapter_count_true(5), 0);
        assert!(!matrix.get(Coordinate::new(9, 9, 9)));
    }

    #[test]
    fn stale_index_is_detected() {
        let index = ProgressIndex::build(&course());
        let smaller = Course::new(
            "c",
            vec![Chapter::new("c0", vec![Subtopic::new("s0", vec![question(10)])])],
        );
        assert!(index.is_current_for(&course()));
        assert!(!index.is_current_for(&smaller));
    }

    #[test]
    fn shape_totals() {
        let shape = TreeShape::of(&course());
        assert_eq!(shape.total(), 4);
        assert_eq!(shape.chapter_total(0), 3);
        assert_eq!(shape.chapter_total(7), 0);
    }
}
