use crate::domain::model::{FetchOutcome, VehicleId};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    /// Reads the file at `path`; a missing file surfaces as `io::ErrorKind::NotFound`.
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    /// Replaces the file at `path` so that readers observe either the old or the new bytes.
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Human-readable location of `path`, used in logs and errors.
    fn describe(&self, path: &str) -> String {
        path.to_string()
    }
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn request_field(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn request_headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }
    fn inventory_path(&self) -> &str;
    fn inventory_field(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_file(&self) -> &str;
    fn max_vehicles(&self) -> Option<usize>;
    fn dry_run(&self) -> bool {
        false
    }
}

/// Read-only enumeration of the fleet. Acquired once per run and released at its end.
#[async_trait]
pub trait InventorySource: Send {
    async fn list_vehicle_identifiers(&mut self) -> Result<Vec<VehicleId>>;

    async fn release(&mut self) {}
}

pub trait VerificationClient: Send + Sync {
    fn fetch_document_payload(
        &self,
        vehicle: &VehicleId,
    ) -> impl std::future::Future<Output = FetchOutcome> + Send;
}
