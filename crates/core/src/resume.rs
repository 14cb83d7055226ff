//! Where a returning learner lands when a session (re)loads.

use std::borrow::Cow;
use std::collections::HashSet;

use tracing::{debug, warn};

use crate::index::ProgressIndex;
use crate::model::{Coordinate, Course, QuestionId, RemoteProgress};

/// Why a particular coordinate was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeReason {
    /// First unanswered question after the last viewed one.
    AfterLastViewed,
    /// Nothing unanswered after the last viewed question; it is shown again.
    LastViewedFullyAttempted,
    /// No usable last-viewed pointer; first unanswered question in the tree.
    FirstUnanswered,
    /// No usable last-viewed pointer and every question is answered.
    AllAnswered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePoint {
    pub coordinate: Coordinate,
    pub reason: ResumeReason,
}

/// Resolves the resume coordinate from a tree and a remote progress record.
pub struct ResumptionResolver<'a> {
    course: &'a Course,
    index: Cow<'a, ProgressIndex>,
}

impl<'a> ResumptionResolver<'a> {
    /// Pair a tree with its index. An index built for a different tree shape is
    /// discarded and rebuilt rather than trusted.
    #[must_use]
    pub fn new(course: &'a Course, index: &'a ProgressIndex) -> Self {
        let index = if index.is_current_for(course) {
            Cow::Borrowed(index)
        } else {
            warn!("progress index does not match tree shape; rebuilding");
            Cow::Owned(ProgressIndex::build(course))
        };
        Self { course, index }
    }

    /// Compute the resume point, or `None` for an empty tree.
    ///
    /// With a last-viewed question C: the first unanswered question strictly after
    /// C, else C itself. Without one (or when it is not in the tree): the first
    /// unanswered question, else the origin. Flagged-but-unanswered questions count
    /// as unanswered.
    #[must_use]
    pub fn resolve(&self, remote: &RemoteProgress) -> Option<ResumePoint> {
        let first = self.course.first_coordinate()?;
        let answered = remote.answered_ids();

        let last_viewed = remote.last_viewed_question.and_then(|id| {
            let found = self.index.coordinate_of(id);
            if found.is_none() {
                debug!(question_id = %id, "last viewed question is not in the tree");
            }
            found
        });

        let point = match last_viewed {
            Some(last) => {
                let after = self.course.next_coordinate(last);
                match self.first_unanswered_from(after, &answered) {
                    Some(coordinate) => ResumePoint {
                        coordinate,
                        reason: ResumeReason::AfterLastViewed,
                    },
                    None => ResumePoint {
                        coordinate: last,
                        reason: ResumeReason::LastViewedFullyAttempted,
                    },
                }
            }
            None => match self.first_unanswered_from(Some(first), &answered) {
                Some(coordinate) => ResumePoint {
                    coordinate,
                    reason: ResumeReason::FirstUnanswered,
                },
                None => ResumePoint {
                    coordinate: Coordinate::ORIGIN,
                    reason: ResumeReason::AllAnswered,
                },
            },
        };

        if self.course.contains(point.coordinate) {
            return Some(point);
        }
        debug!(coordinate = %point.coordinate, "resume coordinate out of range; clamping");
        let coordinate = if self.course.contains(Coordinate::ORIGIN) {
            Coordinate::ORIGIN
        } else {
            first
        };
        Some(ResumePoint { coordinate, ..point })
    }

    fn first_unanswered_from(
        &self,
        start: Option<Coordinate>,
        answered: &HashSet<QuestionId>,
    ) -> Option<Coordinate> {
        std::iter::successors(start, |at| self.course.next_coordinate(*at)).find(|at| {
            self.course
                .question(*at)
                .is_some_and(|q| !answered.contains(&q.id()))
        })
    }
}
