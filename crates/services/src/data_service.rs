//! Export, import, backup and reset of the whole learner state.

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use quest_core::model::{QuestState, UnlockedAchievement};
use storage::{BackupInfo, StateStore};

use crate::Clock;
use crate::achievement_service::unlock_new_achievements;
use crate::error::DataError;

/// How an imported document combines with the stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportMode {
    /// Discard the stored state and use the imported one.
    #[default]
    Replace,
    /// Fold the imported state into the stored one.
    Merge,
}

/// Summary of the state after an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub mode: ImportMode,
    pub lessons: usize,
    pub achievements: usize,
    pub sessions: usize,
    pub newly_unlocked: Vec<UnlockedAchievement>,
}

impl ImportReport {
    fn new(mode: ImportMode, state: &QuestState, newly_unlocked: Vec<UnlockedAchievement>) -> Self {
        Self {
            mode,
            lessons: state.progress.len(),
            achievements: state.achievements.len(),
            sessions: state.sessions.len(),
            newly_unlocked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub bytes: u64,
    pub backups: usize,
}

#[derive(Clone)]
pub struct DataManagementService {
    clock: Clock,
    store: StateStore,
}

impl DataManagementService {
    #[must_use]
    pub fn new(clock: Clock, store: StateStore) -> Self {
        Self { clock, store }
    }

    /// Pretty-printed JSON of the stored state, stamped with `exported_at`.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Storage` if loading fails or `DataError::Export`
    /// if the state cannot be serialized.
    pub async fn export_json(&self) -> Result<String, DataError> {
        let mut state = self.store.load_state().await?;
        state.exported_at = Some(self.clock.now());
        let json = state.to_json_pretty().map_err(DataError::Export)?;
        info!(lessons = state.progress.len(), bytes = json.len(), "state exported");
        Ok(json)
    }

    /// Export to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Io` if the file cannot be written, otherwise as
    /// [`Self::export_json`].
    pub async fn export_to_file(&self, path: &Path) -> Result<(), DataError> {
        let json = self.export_json().await?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate `payload` and apply it according to `mode`.
    ///
    /// Nothing is written unless the payload parses and validates.
    ///
    /// # Errors
    ///
    /// Returns `DataError::InvalidPayload` for malformed JSON, an unsupported
    /// version or invalid records. Returns `DataError::Storage` if repository
    /// access fails.
    pub async fn import_json(
        &self,
        payload: &str,
        mode: ImportMode,
    ) -> Result<ImportReport, DataError> {
        let mut incoming = QuestState::from_json(payload).map_err(|e| {
            warn!(error = %e, "import rejected");
            DataError::InvalidPayload(e)
        })?;
        incoming.exported_at = None;

        let (state, newly_unlocked) = match mode {
            ImportMode::Replace => (incoming, Vec::new()),
            ImportMode::Merge => {
                let mut state = self.store.load_state().await?;
                state.merge(incoming);
                let unlocked = unlock_new_achievements(&mut state, self.clock.now());
                (state, unlocked)
            }
        };

        self.store.save_state(&state).await?;
        let report = ImportReport::new(mode, &state, newly_unlocked);
        info!(
            ?mode,
            lessons = report.lessons,
            achievements = report.achievements,
            sessions = report.sessions,
            "state imported"
        );
        Ok(report)
    }

    /// Read `path` and import it.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Io` if the file cannot be read, otherwise as
    /// [`Self::import_json`].
    pub async fn import_from_file(
        &self,
        path: &Path,
        mode: ImportMode,
    ) -> Result<ImportReport, DataError> {
        let payload = tokio::fs::read_to_string(path).await?;
        self.import_json(&payload, mode).await
    }

    /// Snapshot the stored state as a backup and return its key.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Storage` if repository access fails.
    pub async fn create_backup(&self) -> Result<String, DataError> {
        let state = self.store.load_state().await?;
        let key = self.store.write_backup(&state, self.clock.now()).await?;
        info!(%key, "backup created");
        Ok(key)
    }

    /// # Errors
    ///
    /// Returns `DataError::Storage` if repository access fails.
    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>, DataError> {
        Ok(self.store.list_backups().await?)
    }

    /// Replace the stored state with backup `key`.
    ///
    /// The stored document is copied to a safety backup first, even when it
    /// no longer parses; the key of that backup is returned.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Storage` if the key is invalid, missing or holds
    /// an invalid document, or if repository access fails.
    pub async fn restore_backup(&self, key: &str) -> Result<String, DataError> {
        let restored = self.store.read_backup(key).await?;
        let safety = self.store.backup_current(self.clock.now()).await?;
        self.store.save_state(&restored).await?;
        info!(%key, lessons = restored.progress.len(), "backup restored");
        Ok(safety)
    }

    /// # Errors
    ///
    /// Returns `DataError::Storage` if the key is invalid or missing.
    pub async fn delete_backup(&self, key: &str) -> Result<(), DataError> {
        self.store.delete_backup(key).await?;
        info!(%key, "backup deleted");
        Ok(())
    }

    /// Copy the stored document to a backup, then clear it. Returns the backup key.
    ///
    /// Works on a corrupt document too, so the learner can always start over.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Storage` if repository access fails. The state is
    /// not cleared when the backup cannot be written.
    pub async fn reset_all(&self) -> Result<String, DataError> {
        let key = self.store.backup_current(self.clock.now()).await?;
        self.store.clear_state().await?;
        warn!(backup = %key, "all progress reset");
        Ok(key)
    }

    /// # Errors
    ///
    /// Returns `DataError::Storage` if repository access fails.
    pub async fn storage_usage(&self) -> Result<StorageUsage, DataError> {
        Ok(StorageUsage {
            bytes: self.store.usage_bytes().await?,
            backups: self.store.list_backups().await?.len(),
        })
    }
}
