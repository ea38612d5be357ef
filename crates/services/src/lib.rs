#![forbid(unsafe_code)]

pub mod achievement_service;
pub mod app_services;
pub mod data_service;
pub mod error;
pub mod profile_service;
pub mod progress_service;
pub mod stats_service;
pub mod study_session_service;

pub use quest_core::Clock;

pub use achievement_service::AchievementService;
pub use app_services::QuestServices;
pub use data_service::{DataManagementService, ImportMode, ImportReport, StorageUsage};
pub use error::{
    AppServicesError, DataError, ProfileServiceError, ProgressServiceError, SessionError,
};
pub use profile_service::ProfileService;
pub use progress_service::{ProgressService, SubmissionResult};
pub use stats_service::StatsService;
pub use study_session_service::{StudySessionService, TodayProgress};
