use std::fs;
use std::path::PathBuf;

use engine_logging::{engine_debug, engine_info, engine_warn};
use migrator_core::{MessageId, ProgressSnapshot};
use migrator_engine::{AtomicFileWriter, PersistError};
use serde::{Deserialize, Serialize};

const PROGRESS_FILENAME: &str = ".migrator_progress.ron";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedProgress {
    #[serde(rename = "finishedIDs", default)]
    finished_ids: Vec<MessageId>,
    #[serde(rename = "includeService", default)]
    include_service: bool,
}

impl From<PersistedProgress> for ProgressSnapshot {
    fn from(progress: PersistedProgress) -> Self {
        Self {
            finished_ids: progress.finished_ids,
            include_service: progress.include_service,
        }
    }
}

/// Resumable migration progress kept next to the other state files.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    writer: AtomicFileWriter,
}

impl ProgressStore {
    pub fn new(state_dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(state_dir),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.writer.dir().join(PROGRESS_FILENAME)
    }

    /// Reads the record for display. An unreadable file counts as no progress.
    pub fn load(&self) -> ProgressSnapshot {
        match self.try_load() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                engine_warn!("Ignoring progress record {:?}: {}", self.path(), err);
                ProgressSnapshot::default()
            }
        }
    }

    /// Reads the record; only a missing file counts as no progress.
    pub fn try_load(&self) -> Result<ProgressSnapshot, PersistError> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ProgressSnapshot::default());
            }
            Err(err) => return Err(PersistError::Io(err)),
        };
        let progress: PersistedProgress = ron::from_str(&content)
            .map_err(|err| PersistError::Serialize(format!("{}: {err}", path.display())))?;
        Ok(progress.into())
    }

    pub fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), PersistError> {
        let state = PersistedProgress {
            finished_ids: snapshot.finished_ids.clone(),
            include_service: snapshot.include_service,
        };
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(&state, pretty)
            .map_err(|err| PersistError::Serialize(err.to_string()))?;
        let path = self.writer.write(PROGRESS_FILENAME, &content)?;
        engine_debug!(
            "Saved progress to {:?} ({} finished)",
            path,
            snapshot.finished_ids.len()
        );
        Ok(())
    }

    /// Adds `id` to the finished set and writes the record back.
    pub fn record_finished(&self, id: MessageId) -> Result<ProgressSnapshot, PersistError> {
        let mut snapshot = self.try_load()?;
        if !snapshot.finished_ids.contains(&id) {
            snapshot.finished_ids.push(id);
        }
        self.save(&snapshot)?;
        Ok(snapshot)
    }

    /// Clears the finished set; settings are kept.
    pub fn reset_finished(&self) -> Result<(), PersistError> {
        let snapshot = ProgressSnapshot {
            finished_ids: Vec::new(),
            ..self.try_load()?
        };
        self.save(&snapshot)?;
        engine_info!("Progress reset in {:?}", self.writer.dir());
        Ok(())
    }

    pub fn set_include_service(&self, include_service: bool) -> Result<(), PersistError> {
        let snapshot = ProgressSnapshot {
            include_service,
            ..self.try_load()?
        };
        self.save(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_as_empty_progress() {
        let temp = TempDir::new().unwrap();
        let store = ProgressStore::new(temp.path().to_path_buf());

        assert_eq!(store.load(), ProgressSnapshot::default());
    }

    #[test]
    fn record_finished_appends_without_duplicates() {
        let temp = TempDir::new().unwrap();
        let store = ProgressStore::new(temp.path().join("state"));

        store.record_finished(1).unwrap();
        store.record_finished(3).unwrap();
        let snapshot = store.record_finished(1).unwrap();

        assert_eq!(snapshot.finished_ids, vec![1, 3]);
        assert_eq!(store.load().finished_ids, vec![1, 3]);
    }

    #[test]
    fn file_uses_camel_case_field_names() {
        let temp = TempDir::new().unwrap();
        let store = ProgressStore::new(temp.path().to_path_buf());
        store
            .save(&ProgressSnapshot {
                finished_ids: vec![7],
                include_service: true,
            })
            .unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("finishedIDs"));
        assert!(text.contains("includeService: true"));
    }

    #[test]
    fn reset_keeps_include_service() {
        let temp = TempDir::new().unwrap();
        let store = ProgressStore::new(temp.path().to_path_buf());
        store.set_include_service(true).unwrap();
        store.record_finished(4).unwrap();

        store.reset_finished().unwrap();

        assert_eq!(
            store.load(),
            ProgressSnapshot {
                finished_ids: Vec::new(),
                include_service: true,
            }
        );
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let temp = TempDir::new().unwrap();
        let store = ProgressStore::new(temp.path().to_path_buf());
        fs::write(store.path(), "not ron at all {").unwrap();

        assert_eq!(store.load(), ProgressSnapshot::default());
    }

    #[test]
    fn mutations_refuse_to_overwrite_an_unreadable_record() {
        let temp = TempDir::new().unwrap();
        let store = ProgressStore::new(temp.path().to_path_buf());
        let corrupt = "(finishedIDs: [1, 2, 3], includeService: true,,)";
        fs::write(store.path(), corrupt).unwrap();

        assert!(matches!(store.record_finished(9), Err(PersistError::Serialize(_))));
        assert!(store.reset_finished().is_err());
        assert!(store.set_include_service(false).is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), corrupt);
    }

    #[test]
    fn hand_written_record_with_missing_fields_loads() {
        let temp = TempDir::new().unwrap();
        let store = ProgressStore::new(temp.path().to_path_buf());
        fs::write(store.path(), "(finishedIDs: [2, 5])").unwrap();

        let snapshot = store.load();
        assert_eq!(snapshot.finished_ids, vec![2, 5]);
        assert!(!snapshot.include_service);
    }
}
