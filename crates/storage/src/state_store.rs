use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use quest_core::model::QuestState;
use tracing::debug;

use crate::repository::{KeyValueStore, StorageError};

/// Common prefix of every key this application writes.
pub const KEY_NAMESPACE: &str = "pointer-quest:";

/// Key holding the current state document.
pub const STATE_KEY: &str = "pointer-quest:state";

/// Prefix of backup keys; the suffix is the RFC 3339 creation time.
pub const BACKUP_PREFIX: &str = "pointer-quest:backup:";

/// Listing entry for a stored backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub key: String,
    pub created_at: Option<DateTime<Utc>>,
    pub bytes: u64,
}

/// Typed access to the state document and its backups.
#[derive(Clone)]
pub struct StateStore {
    kv: Arc<dyn KeyValueStore>,
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

impl StateStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Load the current state; a missing document yields an empty state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored document is invalid.
    pub async fn load_state(&self) -> Result<QuestState, StorageError> {
        match self.kv.get(STATE_KEY).await? {
            Some(raw) => QuestState::from_json(&raw).map_err(ser),
            None => Ok(QuestState::new()),
        }
    }

    /// Replace the stored state document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the write fails.
    pub async fn save_state(&self, state: &QuestState) -> Result<(), StorageError> {
        let raw = state.to_json().map_err(ser)?;
        self.kv.set(STATE_KEY, &raw).await?;
        debug!(bytes = raw.len(), records = state.progress.len(), "state saved");
        Ok(())
    }

    /// Remove the state document. Backups are kept.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub async fn clear_state(&self) -> Result<(), StorageError> {
        self.kv.remove(STATE_KEY).await?;
        Ok(())
    }

    /// Store `state` as a new backup and return its key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the write fails.
    pub async fn write_backup(
        &self,
        state: &QuestState,
        at: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let raw = state.to_json().map_err(ser)?;
        self.write_backup_raw(&raw, at).await
    }

    /// Copy the stored state document into a new backup without parsing it.
    ///
    /// A missing document is backed up as an empty state. Returns the key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read or written.
    pub async fn backup_current(&self, at: DateTime<Utc>) -> Result<String, StorageError> {
        let raw = match self.kv.get(STATE_KEY).await? {
            Some(raw) => raw,
            None => QuestState::new().to_json().map_err(ser)?,
        };
        self.write_backup_raw(&raw, at).await
    }

    async fn write_backup_raw(&self, raw: &str, at: DateTime<Utc>) -> Result<String, StorageError> {
        let base = format!(
            "{BACKUP_PREFIX}{}",
            at.to_rfc3339_opts(SecondsFormat::Millis, true)
        );

        let mut key = base.clone();
        let mut suffix = 1_u32;
        while self.kv.get(&key).await?.is_some() {
            key = format!("{base}#{suffix}");
            suffix += 1;
        }

        self.kv.set(&key, raw).await?;
        debug!(%key, bytes = raw.len(), "backup written");
        Ok(key)
    }

    /// Backups, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>, StorageError> {
        let mut backups: Vec<BackupInfo> = self
            .kv
            .entries_with_prefix(BACKUP_PREFIX)
            .await?
            .into_iter()
            .map(|entry| BackupInfo {
                created_at: backup_timestamp(&entry.key),
                key: entry.key,
                bytes: entry.bytes,
            })
            .collect();
        backups.sort_by(|a, b| {
            (b.created_at, collision_suffix(&b.key))
                .cmp(&(a.created_at, collision_suffix(&a.key)))
                .then_with(|| b.key.cmp(&a.key))
        });
        Ok(backups)
    }

    /// Read and validate a backup.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidKey` for keys outside the backup namespace,
    /// `StorageError::NotFound` if absent, or `StorageError::Serialization` if
    /// the stored document is invalid.
    pub async fn read_backup(&self, key: &str) -> Result<QuestState, StorageError> {
        ensure_backup_key(key)?;
        let raw = self.kv.get(key).await?.ok_or(StorageError::NotFound)?;
        QuestState::from_json(&raw).map_err(ser)
    }

    /// # Errors
    ///
    /// Returns `StorageError::InvalidKey` for keys outside the backup namespace
    /// or `StorageError::NotFound` if absent.
    pub async fn delete_backup(&self, key: &str) -> Result<(), StorageError> {
        ensure_backup_key(key)?;
        if self.kv.remove(key).await? {
            debug!(%key, "backup deleted");
            Ok(())
        } else {
            Err(StorageError::NotFound)
        }
    }

    /// Bytes used by every key in the application namespace.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn usage_bytes(&self) -> Result<u64, StorageError> {
        let entries = self.kv.entries_with_prefix(KEY_NAMESPACE).await?;
        Ok(entries.iter().map(|e| e.bytes).sum())
    }
}

fn ensure_backup_key(key: &str) -> Result<(), StorageError> {
    if key.starts_with(BACKUP_PREFIX) && key.len() > BACKUP_PREFIX.len() {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// The `#n` suffix added to keys written in the same millisecond, or 0.
fn collision_suffix(key: &str) -> u32 {
    key.rsplit_once('#')
        .and_then(|(_, n)| n.parse().ok())
        .unwrap_or(0)
}

fn backup_timestamp(key: &str) -> Option<DateTime<Utc>> {
    let stamp = key.strip_prefix(BACKUP_PREFIX)?;
    let stamp = stamp.split('#').next()?;
    DateTime::parse_from_rfc3339(stamp)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryStore;
    use quest_core::model::{LessonId, LessonSubmission, ProgressRecord};
    use quest_core::time::fixed_now;

    fn store() -> (InMemoryStore, StateStore) {
        let kv = InMemoryStore::new();
        let store = StateStore::new(Arc::new(kv.clone()));
        (kv, store)
    }

    fn sample_state() -> QuestState {
        let mut state = QuestState::new();
        let lesson = LessonId::new(12).unwrap();
        state.progress.insert(
            lesson,
            ProgressRecord::start(lesson, LessonSubmission::new(true, 88, 40).unwrap(), fixed_now()),
        );
        state
    }

    #[tokio::test]
    async fn missing_state_loads_as_empty() {
        let (_, store) = store();
        let state = store.load_state().await.unwrap();
        assert_eq!(state, QuestState::new());
    }

    #[tokio::test]
    async fn state_round_trips() {
        let (_, store) = store();
        let state = sample_state();
        store.save_state(&state).await.unwrap();
        assert_eq!(store.load_state().await.unwrap(), state);
    }

    #[tokio::test]
    async fn corrupt_state_surfaces_serialization_error() {
        let (kv, store) = store();
        kv.set(STATE_KEY, "{not json").await.unwrap();
        let err = store.load_state().await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn backups_are_listed_newest_first_and_restorable() {
        let (_, store) = store();
        let state = sample_state();
        let older = store.write_backup(&QuestState::new(), fixed_now()).await.unwrap();
        let newer = store
            .write_backup(&state, fixed_now() + chrono::Duration::minutes(5))
            .await
            .unwrap();

        let listed = store.list_backups().await.unwrap();
        let keys: Vec<_> = listed.iter().map(|b| b.key.clone()).collect();
        assert_eq!(keys, vec![newer.clone(), older]);
        assert_eq!(listed[0].created_at, Some(fixed_now() + chrono::Duration::minutes(5)));

        assert_eq!(store.read_backup(&newer).await.unwrap(), state);
    }

    #[tokio::test]
    async fn same_instant_backups_get_distinct_keys() {
        let (_, store) = store();
        let a = store.write_backup(&QuestState::new(), fixed_now()).await.unwrap();
        let b = store.write_backup(&QuestState::new(), fixed_now()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.list_backups().await.unwrap().len(), 2);
        assert_eq!(backup_timestamp(&b), Some(fixed_now()));
    }

    #[tokio::test]
    async fn many_same_instant_backups_list_newest_first() {
        let (_, store) = store();
        let mut written = Vec::new();
        for _ in 0..12 {
            written.push(store.write_backup(&QuestState::new(), fixed_now()).await.unwrap());
        }
        let later = store
            .write_backup(&QuestState::new(), fixed_now() + chrono::Duration::seconds(1))
            .await
            .unwrap();

        let listed: Vec<_> = store
            .list_backups()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.key)
            .collect();
        written.reverse();
        let mut expected = vec![later];
        expected.extend(written);
        assert_eq!(listed, expected);
    }

    #[tokio::test]
    async fn backup_current_copies_corrupt_state_verbatim() {
        let (kv, store) = store();
        kv.set(STATE_KEY, "{corrupt").await.unwrap();

        let key = store.backup_current(fixed_now()).await.unwrap();
        assert_eq!(kv.get(&key).await.unwrap().as_deref(), Some("{corrupt"));

        store.clear_state().await.unwrap();
        let empty = store.backup_current(fixed_now()).await.unwrap();
        assert_eq!(store.read_backup(&empty).await.unwrap(), QuestState::new());
    }

    #[tokio::test]
    async fn backup_keys_are_namespaced() {
        let (_, store) = store();
        let err = store.read_backup(STATE_KEY).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));

        let missing = format!("{BACKUP_PREFIX}2020-01-01T00:00:00.000Z");
        assert!(matches!(
            store.delete_backup(&missing).await.unwrap_err(),
            StorageError::NotFound
        ));
    }

    #[tokio::test]
    async fn usage_counts_state_and_backups() {
        let (kv, store) = store();
        kv.set("unrelated", "xxxxxxxx").await.unwrap();
        let state = sample_state();
        store.save_state(&state).await.unwrap();
        store.write_backup(&state, fixed_now()).await.unwrap();

        let doc_len = state.to_json().unwrap().len() as u64;
        assert_eq!(store.usage_bytes().await.unwrap(), doc_len * 2);
    }
}
