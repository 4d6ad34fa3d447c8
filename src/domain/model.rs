use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Registration number of a vehicle; the key for all per-vehicle data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VehicleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The five regulatory expiry dates for one vehicle plus the time they were parsed.
///
/// Expiry fields hold the service's date text as-is; an empty string means the
/// service did not report that document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub vehicle_number: VehicleId,
    #[serde(default)]
    pub insurance_expiry: String,
    #[serde(default)]
    pub permit_expiry: String,
    #[serde(default)]
    pub puc_expiry: String,
    #[serde(default)]
    pub fitness_expiry: String,
    #[serde(default)]
    pub tax_expiry: String,
    #[serde(default)]
    pub last_updated: String,
    /// Keys written by other tools (e.g. `dlExpiry`) survive a re-persist.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DocumentRecord {
    pub fn new(vehicle_number: VehicleId, last_updated: String) -> Self {
        Self {
            vehicle_number,
            insurance_expiry: String::new(),
            permit_expiry: String::new(),
            puc_expiry: String::new(),
            fitness_expiry: String::new(),
            tax_expiry: String::new(),
            last_updated,
            extra: serde_json::Map::new(),
        }
    }

    /// Expiry fields in a fixed order, paired with their document kind.
    pub fn expiries(&self) -> [(DocumentKind, &str); 5] {
        [
            (DocumentKind::Insurance, self.insurance_expiry.as_str()),
            (DocumentKind::Permit, self.permit_expiry.as_str()),
            (DocumentKind::Puc, self.puc_expiry.as_str()),
            (DocumentKind::Fitness, self.fitness_expiry.as_str()),
            (DocumentKind::Tax, self.tax_expiry.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Insurance,
    Permit,
    Puc,
    Fitness,
    Tax,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 5] = [
        DocumentKind::Insurance,
        DocumentKind::Permit,
        DocumentKind::Puc,
        DocumentKind::Fitness,
        DocumentKind::Tax,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Insurance => "insurance",
            DocumentKind::Permit => "permit",
            DocumentKind::Puc => "puc",
            DocumentKind::Fitness => "fitness",
            DocumentKind::Tax => "tax",
        }
    }
}

/// Ordered record set with a key index built once at load.
#[derive(Debug, Clone, Default)]
pub struct OutputSet {
    records: Vec<DocumentRecord>,
    index: HashSet<VehicleId>,
}

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the set from loaded records, keeping the first record of any repeated key.
    /// Returns the set together with the number of duplicates dropped.
    pub fn from_records(records: Vec<DocumentRecord>) -> (Self, usize) {
        let mut set = Self::new();
        let mut duplicates = 0;
        for record in records {
            if !set.push(record) {
                duplicates += 1;
            }
        }
        (set, duplicates)
    }

    pub fn contains(&self, id: &VehicleId) -> bool {
        self.index.contains(id)
    }

    /// Appends `record` unless its key is already present.
    pub fn push(&mut self, record: DocumentRecord) -> bool {
        if !self.index.insert(record.vehicle_number.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn records(&self) -> &[DocumentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-invocation tally. Skipped identifiers are not counted here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunCounters {
    pub fn record_success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub counters: RunCounters,
    pub skipped: usize,
    pub inventory_size: usize,
    pub records_total: usize,
    /// Identifiers that would have been fetched; only filled by a dry run.
    pub pending: Vec<VehicleId>,
    pub dry_run: bool,
}

/// Classified result of one verification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Payload(String),
    NoData { reason: String },
    TransportFailure { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Init,
    Loading,
    Enumerating,
    Skipping,
    Fetching,
    Parsing,
    Merging,
    Summarizing,
    Done,
    Aborted,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
