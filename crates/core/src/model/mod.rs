mod coordinate;
mod course;
mod ids;
mod progress;
mod question;

pub use coordinate::Coordinate;
pub use course::{Chapter, Course, Subtopic};
pub use ids::{CourseId, ParseIdError, QuestionId};
pub use progress::{ProgressRecord, RemoteProgress, RemoteQuestionProgress};
pub use question::{Question, QuestionError};
