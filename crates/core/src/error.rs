use thiserror::Error;

use crate::catalog::CatalogError;
use crate::model::{LessonNumberError, ParseGradeError, ParseStatusError};
use crate::progress::ProgressError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    LessonNumber(#[from] LessonNumberError),
    #[error(transparent)]
    Status(#[from] ParseStatusError),
    #[error(transparent)]
    Grade(#[from] ParseGradeError),
}
