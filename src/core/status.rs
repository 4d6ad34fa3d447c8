use crate::domain::model::{DocumentKind, DocumentRecord, VehicleId};
use crate::utils::error::Result;
use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Documents expiring within this many days are flagged.
pub const EXPIRY_WARNING_DAYS: i64 = 10;

const DATE_FORMATS: [&str; 5] = ["%d-%b-%Y", "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d-%B-%Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DocumentStatus {
    Valid,
    Expiring,
    Expired,
    Missing,
    Unparseable,
}

impl DocumentStatus {
    pub fn needs_attention(&self) -> bool {
        !matches!(self, DocumentStatus::Valid)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentStatus::Valid => "valid",
            DocumentStatus::Expiring => "expiring",
            DocumentStatus::Expired => "expired",
            DocumentStatus::Missing => "missing",
            DocumentStatus::Unparseable => "unparseable",
        };
        f.write_str(label)
    }
}

/// Parses the date formats the verification service and older exports are known to use.
pub fn parse_expiry_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

pub fn classify(expiry: &str, today: NaiveDate) -> DocumentStatus {
    if expiry.trim().is_empty() {
        return DocumentStatus::Missing;
    }
    let Some(date) = parse_expiry_date(expiry) else {
        return DocumentStatus::Unparseable;
    };

    let days_left = (date - today).num_days();
    if days_left < 0 {
        DocumentStatus::Expired
    } else if days_left <= EXPIRY_WARNING_DAYS {
        DocumentStatus::Expiring
    } else {
        DocumentStatus::Valid
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleStatus {
    pub vehicle: VehicleId,
    pub documents: Vec<(DocumentKind, DocumentStatus)>,
    pub last_updated: String,
}

impl VehicleStatus {
    pub fn from_record(record: &DocumentRecord, today: NaiveDate) -> Self {
        Self {
            vehicle: record.vehicle_number.clone(),
            documents: record
                .expiries()
                .iter()
                .map(|(kind, expiry)| (*kind, classify(expiry, today)))
                .collect(),
            last_updated: record.last_updated.clone(),
        }
    }

    pub fn status_of(&self, kind: DocumentKind) -> Option<DocumentStatus> {
        self.documents
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, status)| *status)
    }

    pub fn needs_attention(&self) -> bool {
        self.documents.iter().any(|(_, status)| status.needs_attention())
    }
}

/// Status counts per document kind across the fleet.
#[derive(Debug, Clone, Default)]
pub struct FleetSummary {
    pub vehicles: usize,
    pub counts: BTreeMap<DocumentKind, BTreeMap<DocumentStatus, usize>>,
}

impl FleetSummary {
    pub fn from_statuses(statuses: &[VehicleStatus]) -> Self {
        let mut summary = Self {
            vehicles: statuses.len(),
            ..Self::default()
        };
        for status in statuses {
            for (kind, doc_status) in &status.documents {
                *summary
                    .counts
                    .entry(*kind)
                    .or_default()
                    .entry(*doc_status)
                    .or_default() += 1;
            }
        }
        summary
    }

    pub fn count(&self, kind: DocumentKind, status: DocumentStatus) -> usize {
        self.counts
            .get(&kind)
            .and_then(|by_status| by_status.get(&status))
            .copied()
            .unwrap_or(0)
    }
}

/// Writes one row per vehicle: identifier, the status of each document, last update.
pub fn write_status_csv<W: std::io::Write>(statuses: &[VehicleStatus], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["vehicleNumber".to_string()];
    header.extend(DocumentKind::ALL.iter().map(|kind| kind.label().to_string()));
    header.push("lastUpdated".to_string());
    csv_writer.write_record(&header)?;

    for status in statuses {
        let mut row = vec![status.vehicle.to_string()];
        for kind in DocumentKind::ALL {
            row.push(
                status
                    .status_of(kind)
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
            );
        }
        row.push(status.last_updated.clone());
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}
