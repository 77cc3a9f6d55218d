#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod model;
pub mod progress;
pub mod requirements;
pub mod time;

pub use catalog::{CatalogError, LessonCatalog, SkillSection};
pub use error::Error;
pub use progress::{ProgressCalculator, ProgressError, ProgressReport, SectionProgress};
pub use requirements::{GradeConfig, GradeRequirements};
pub use time::Clock;
