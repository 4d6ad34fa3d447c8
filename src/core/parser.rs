use crate::domain::model::{DocumentRecord, VehicleId};
use crate::utils::error::{Result, SyncError};
use chrono::{DateTime, SecondsFormat, Utc};

pub const INSURANCE_TAG: &str = "rc_insurance_upto";
pub const PERMIT_TAG: &str = "rc_np_upto";
pub const PUC_TAG: &str = "rc_pucc_upto";
pub const FITNESS_TAG: &str = "rc_fit_upto";
pub const TAX_TAG: &str = "rc_tax_upto";

/// Parses the XML vehicle-details payload, stamping `lastUpdated` with the current time.
pub fn parse(payload: &str, vehicle: &VehicleId) -> Result<DocumentRecord> {
    parse_at(payload, vehicle, Utc::now())
}

/// Same as [`parse`] with an explicit timestamp.
///
/// Only an unparseable document is an error; absent tags yield empty fields.
pub fn parse_at(payload: &str, vehicle: &VehicleId, now: DateTime<Utc>) -> Result<DocumentRecord> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(payload, options).map_err(|e| {
        SyncError::MalformedPayload {
            vehicle: vehicle.to_string(),
            message: e.to_string(),
        }
    })?;

    // leading text of the element; comments and processing instructions are ignored
    let tag_text = |tag: &str| -> String {
        doc.descendants()
            .find(|node| node.has_tag_name(tag))
            .map(|node| {
                node.children()
                    .take_while(|child| !child.is_element())
                    .filter_map(|child| if child.is_text() { child.text() } else { None })
                    .collect::<String>()
                    .trim()
                    .to_string()
            })
            .unwrap_or_default()
    };

    let mut record = DocumentRecord::new(
        vehicle.clone(),
        now.to_rfc3339_opts(SecondsFormat::Millis, true),
    );
    record.insurance_expiry = tag_text(INSURANCE_TAG);
    record.permit_expiry = tag_text(PERMIT_TAG);
    record.puc_expiry = tag_text(PUC_TAG);
    record.fitness_expiry = tag_text(FITNESS_TAG);
    record.tax_expiry = tag_text(TAX_TAG);

    tracing::debug!(
        vehicle = %vehicle,
        insurance = %record.insurance_expiry,
        permit = %record.permit_expiry,
        puc = %record.puc_expiry,
        fitness = %record.fitness_expiry,
        tax = %record.tax_expiry,
        "Parsed vehicle details"
    );

    Ok(record)
}
