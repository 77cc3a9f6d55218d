use storage::repository::Storage;

use crate::entry_service::EntryService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::report_service::ReportService;

/// The three services wired over one storage backend.
pub struct AppServices {
    pub storage: Storage,
    pub entry: EntryService,
    pub progress: ProgressService,
    pub reports: ReportService,
}

impl AppServices {
    /// Wire services over an existing storage backend.
    #[must_use]
    pub fn over(storage: Storage) -> Self {
        Self {
            entry: EntryService::new(storage.clone()),
            progress: ProgressService::new(storage.clone()),
            reports: ReportService::new(storage.clone()),
            storage,
        }
    }

    /// Wire services over an in-memory backend, for tests and prototyping.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::over(Storage::in_memory())
    }

    /// Connect to `SQLite`, run migrations, and wire services over it.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Sqlite` if the database cannot be opened or
    /// migrated.
    pub async fn connect(db_url: &str) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::over(storage))
    }
}
