use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Inventory unavailable: {message}")]
    InventoryUnavailable { message: String },

    #[error("Output store '{path}' is corrupt: {message}")]
    CorruptOutputStore { path: String, message: String },

    #[error("Malformed payload for {vehicle}: {message}")]
    MalformedPayload { vehicle: String, message: String },

    #[error("Failed to persist output store '{path}': {source}")]
    PersistFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Inventory,
    Storage,
    Network,
    Data,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SyncError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::InventoryUnavailable { .. } => ErrorCategory::Inventory,
            SyncError::CorruptOutputStore { .. }
            | SyncError::PersistFailed { .. }
            | SyncError::IoError(_) => ErrorCategory::Storage,
            SyncError::ApiError(_) => ErrorCategory::Network,
            SyncError::MalformedPayload { .. }
            | SyncError::CsvError(_)
            | SyncError::SerializationError(_) => ErrorCategory::Data,
            SyncError::ConfigError { .. }
            | SyncError::ConfigValidationError { .. }
            | SyncError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // per-vehicle failures; the run carries on
            SyncError::MalformedPayload { .. } => ErrorSeverity::Low,
            SyncError::ApiError(_) => ErrorSeverity::Medium,
            SyncError::InventoryUnavailable { .. }
            | SyncError::CsvError(_)
            | SyncError::SerializationError(_)
            | SyncError::ConfigError { .. }
            | SyncError::ConfigValidationError { .. }
            | SyncError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            SyncError::CorruptOutputStore { .. }
            | SyncError::PersistFailed { .. }
            | SyncError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// Exit code the CLI reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SyncError::InventoryUnavailable { .. } => {
                "Check that the inventory export exists and contains vehicle documents"
            }
            SyncError::CorruptOutputStore { .. } => {
                "Repair or move aside the output file; it was left untouched"
            }
            SyncError::PersistFailed { .. } | SyncError::IoError(_) => {
                "Check free disk space and write permissions on the output directory"
            }
            SyncError::MalformedPayload { .. } => {
                "The vehicle will be retried on the next run"
            }
            SyncError::ApiError(_) => "Check network connectivity and the verification endpoint",
            SyncError::CsvError(_) | SyncError::SerializationError(_) => {
                "Check the input file format"
            }
            SyncError::ConfigError { .. }
            | SyncError::ConfigValidationError { .. }
            | SyncError::InvalidConfigValueError { .. } => {
                "Review the command line flags or the TOML configuration file"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SyncError::InventoryUnavailable { message } => {
                format!("Could not read the vehicle inventory ({})", message)
            }
            SyncError::CorruptOutputStore { path, .. } => {
                format!("Existing output '{}' could not be read; refusing to overwrite it", path)
            }
            SyncError::PersistFailed { path, .. } => {
                format!("Could not save progress to '{}'", path)
            }
            SyncError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
