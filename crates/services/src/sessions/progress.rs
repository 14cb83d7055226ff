use prep_core::CompletionStats;
use prep_core::model::Coordinate;

use super::state::SessionPhase;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProgress {
    pub phase: SessionPhase,
    pub current: Option<Coordinate>,
    /// 1-based position of the current question in document order.
    pub position: Option<usize>,
    pub stats: CompletionStats,
}
