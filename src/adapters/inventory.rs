use crate::core::InventorySource;
use crate::domain::model::VehicleId;
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryFormat {
    /// Array of documents, as exported from the vehicle collection.
    Json,
    /// Header row naming the identifier column.
    Csv,
}

impl InventoryFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Ok(InventoryFormat::Json),
            Some("csv") => Ok(InventoryFormat::Csv),
            _ => Err(SyncError::InvalidConfigValueError {
                field: "inventory".to_string(),
                value: path.display().to_string(),
                reason: "Unsupported inventory file; expected .json or .csv".to_string(),
            }),
        }
    }
}

/// Vehicle inventory read from an export of the store of record.
pub struct FileInventory {
    path: PathBuf,
    format: InventoryFormat,
    field: String,
    file: Option<tokio::fs::File>,
}

impl FileInventory {
    /// Opens the export; the handle is held until [`InventorySource::release`].
    pub async fn open(path: impl Into<PathBuf>, field: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let format = InventoryFormat::from_path(&path)?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| SyncError::InventoryUnavailable {
                message: format!("{}: {}", path.display(), e),
            })?;
        tracing::debug!("Opened inventory {} ({:?})", path.display(), format);

        Ok(Self {
            path,
            format,
            field: field.into(),
            file: Some(file),
        })
    }

    fn unavailable(&self, message: impl std::fmt::Display) -> SyncError {
        SyncError::InventoryUnavailable {
            message: format!("{}: {}", self.path.display(), message),
        }
    }

    fn ids_from_json(&self, content: &str) -> Result<Vec<VehicleId>> {
        let documents: Vec<serde_json::Value> =
            serde_json::from_str(content).map_err(|e| self.unavailable(e))?;

        let mut ids = Vec::with_capacity(documents.len());
        for (position, document) in documents.iter().enumerate() {
            match document.get(&self.field).and_then(|v| v.as_str()) {
                Some(id) if !id.trim().is_empty() => ids.push(VehicleId::from(id)),
                _ => tracing::warn!(
                    "Inventory document #{} has no '{}'; skipping",
                    position + 1,
                    self.field
                ),
            }
        }
        Ok(ids)
    }

    fn ids_from_csv(&self, content: &str) -> Result<Vec<VehicleId>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(content.as_bytes());

        let headers = reader.headers().map_err(|e| self.unavailable(e))?.clone();
        let column = headers
            .iter()
            .position(|h| h == self.field)
            .ok_or_else(|| self.unavailable(format!("no '{}' column", self.field)))?;

        let mut ids = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| self.unavailable(e))?;
            match record.get(column) {
                Some(id) if !id.trim().is_empty() => ids.push(VehicleId::from(id)),
                _ => tracing::warn!("Inventory row {} has no '{}'; skipping", row + 2, self.field),
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl InventorySource for FileInventory {
    async fn list_vehicle_identifiers(&mut self) -> Result<Vec<VehicleId>> {
        let mut content = String::new();
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| SyncError::InventoryUnavailable {
                message: format!("{}: already released", self.path.display()),
            })?;
        file.read_to_string(&mut content)
            .await
            .map_err(|e| self.unavailable(e))?;

        match self.format {
            InventoryFormat::Json => self.ids_from_json(&content),
            InventoryFormat::Csv => self.ids_from_csv(&content),
        }
    }

    async fn release(&mut self) {
        if self.file.take().is_some() {
            tracing::debug!("Released inventory {}", self.path.display());
        }
    }
}
