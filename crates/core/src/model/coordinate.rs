use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of one question inside a course tree.
///
/// The derived ordering is lexicographic over (chapter, subtopic, question),
/// which is the document order of the tree.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Coordinate {
    pub chapter: usize,
    pub subtopic: usize,
    pub question: usize,
}

impl Coordinate {
    /// The first slot of any non-empty normalized tree.
    pub const ORIGIN: Self = Self::new(0, 0, 0);

    #[must_use]
    pub const fn new(chapter: usize, subtopic: usize, question: usize) -> Self {
        Self {
            chapter,
            subtopic,
            question,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.chapter, self.subtopic, self.question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_document_order() {
        let mut coords = vec![
            Coordinate::new(1, 0, 0),
            Coordinate::new(0, 1, 0),
            Coordinate::new(0, 0, 3),
            Coordinate::ORIGIN,
        ];
        coords.sort();
        assert_eq!(
            coords,
            vec![
                Coordinate::ORIGIN,
                Coordinate::new(0, 0, 3),
                Coordinate::new(0, 1, 0),
                Coordinate::new(1, 0, 0),
            ]
        );
    }

    #[test]
    fn display_is_a_triple() {
        assert_eq!(Coordinate::new(2, 0, 5).to_string(), "(2, 0, 5)");
    }
}
