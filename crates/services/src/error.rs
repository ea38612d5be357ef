//! Shared error types for the services crate.

use thiserror::Error;

use quest_core::model::{
    LessonId, ProfileError, ProgressError, SessionId, StateError, StudySessionError,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressService`, `StatsService` and `AchievementService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("lesson {0} has not been started")]
    NotStarted(LessonId),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StudySessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("study session {0} is already in progress")]
    AlreadyActive(SessionId),
    #[error("no study session is in progress")]
    NoActiveSession,
    #[error(transparent)]
    Session(#[from] StudySessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProfileService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileServiceError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DataManagementService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DataError {
    #[error("invalid import payload: {0}")]
    InvalidPayload(#[source] StateError),
    #[error("could not serialize state: {0}")]
    Export(#[source] StateError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
