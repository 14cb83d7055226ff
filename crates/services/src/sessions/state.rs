/// Session lifecycle.
///
/// `Loading → Active → Submitting → Completed`, with `Active → Abandoned` on quit.
/// A failed submit returns from `Submitting` to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    Active,
    Submitting,
    Completed,
    Abandoned,
}

impl SessionPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Abandoned)
    }
}

/// Per-question presentation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionState {
    Unseen,
    Presented,
    Answered,
}

/// Question state plus the orthogonal flag bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionStatus {
    pub state: QuestionState,
    pub is_flagged: bool,
    pub is_completed: bool,
}
