pub mod output_store;
pub mod parser;
pub mod status;
pub mod sync;

pub use crate::domain::model::{DocumentRecord, FetchOutcome, OutputSet, SyncReport, VehicleId};
pub use crate::domain::ports::{ConfigProvider, InventorySource, Storage, VerificationClient};
pub use crate::utils::error::Result;
