#![forbid(unsafe_code)]

pub mod aggregate;
pub mod index;
pub mod model;
pub mod normalize;
pub mod resume;
pub mod time;

pub use aggregate::{AnalyticsReport, AnswerBreakdown, ChapterBreakdown, CompletionStats};
pub use index::{BoolMatrix, ProgressIndex, TreeShape};
pub use normalize::{NormalizeReport, Normalized, RawPayload, normalize, normalize_course};
pub use resume::{ResumePoint, ResumeReason, ResumptionResolver};
pub use time::Clock;
