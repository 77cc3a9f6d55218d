#![forbid(unsafe_code)]

pub mod app_services;
pub mod entry_service;
pub mod error;
pub mod progress_service;
pub mod report_service;

pub use ufli_core::Clock;

pub use app_services::AppServices;
pub use entry_service::EntryService;
pub use error::{
    AppServicesError, EntryServiceError, ProgressServiceError, ReportServiceError,
};
pub use progress_service::{ProgressService, RecalculateSummary};
pub use report_service::{
    CohortStats, GradeSummary, GroupSummary, ReportService, SchoolSummary,
};
