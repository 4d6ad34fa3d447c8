use crate::core::Storage;
use crate::domain::model::{DocumentRecord, OutputSet};
use crate::utils::error::{Result, SyncError};

/// The durable JSON artifact holding every known document record.
pub struct OutputStore<S: Storage> {
    storage: S,
    file_name: String,
}

impl<S: Storage> OutputStore<S> {
    pub fn new(storage: S, file_name: impl Into<String>) -> Self {
        Self {
            storage,
            file_name: file_name.into(),
        }
    }

    pub fn location(&self) -> String {
        self.storage.describe(&self.file_name)
    }

    /// Loads the artifact. A missing artifact is an empty set; an unreadable one is fatal.
    pub async fn load(&self) -> Result<OutputSet> {
        let bytes = match self.storage.read_file(&self.file_name).await {
            Ok(bytes) => bytes,
            Err(SyncError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No existing output at {}, starting fresh", self.location());
                return Ok(OutputSet::new());
            }
            Err(e) => {
                return Err(SyncError::CorruptOutputStore {
                    path: self.location(),
                    message: e.to_string(),
                })
            }
        };

        let records: Vec<DocumentRecord> =
            serde_json::from_slice(&bytes).map_err(|e| SyncError::CorruptOutputStore {
                path: self.location(),
                message: e.to_string(),
            })?;

        let (set, duplicates) = OutputSet::from_records(records);
        if duplicates > 0 {
            tracing::warn!(
                "⚠️ {} duplicate record(s) in {}; keeping the first of each",
                duplicates,
                self.location()
            );
        }
        tracing::info!("Loaded {} existing records from {}", set.len(), self.location());
        Ok(set)
    }

    /// Writes the full set as a consistent snapshot.
    pub async fn persist(&self, set: &OutputSet) -> Result<()> {
        let json = serde_json::to_vec_pretty(set.records())?;
        self.storage
            .write_file(&self.file_name, &json)
            .await
            .map_err(|e| match e {
                SyncError::IoError(source) => SyncError::PersistFailed {
                    path: self.location(),
                    source,
                },
                other => other,
            })?;
        tracing::debug!("Updated {} with {} records", self.location(), set.len());
        Ok(())
    }
}
