mod group;
mod ids;
mod lesson;
mod outcome;
mod student;

pub use ids::{GroupId, ParseIdError, StudentId, TeacherId};

pub use group::Group;
pub use lesson::{Lesson, LessonNumber, LessonNumberError, LessonStatus, ParseStatusError};
pub use outcome::{LessonOutcome, OutcomeSet};
pub use student::{EnrollmentStatus, GradeLevel, ParseGradeError, Student};
