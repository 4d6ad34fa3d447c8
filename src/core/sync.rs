use crate::core::output_store::OutputStore;
use crate::core::parser;
use crate::core::{InventorySource, Storage, VerificationClient};
use crate::domain::model::{FetchOutcome, OutputSet, RunCounters, SyncPhase, SyncReport, VehicleId};
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Upper bound on fetch attempts in one run. Skipped vehicles don't count.
    pub max_vehicles: Option<usize>,
    pub dry_run: bool,
}

/// State owned by a single run, threaded through every step.
struct RunContext {
    set: OutputSet,
    counters: RunCounters,
    skipped: usize,
    pending: Vec<VehicleId>,
    pending_index: HashSet<VehicleId>,
    phase: SyncPhase,
}

impl RunContext {
    fn new() -> Self {
        Self {
            set: OutputSet::new(),
            counters: RunCounters::default(),
            skipped: 0,
            pending: Vec::new(),
            pending_index: HashSet::new(),
            phase: SyncPhase::Init,
        }
    }

    fn enter(&mut self, phase: SyncPhase) {
        tracing::debug!(from = %self.phase, to = %phase, "Sync phase transition");
        self.phase = phase;
    }
}

/// Drives one incremental sync: load the artifact, walk the inventory in order,
/// fetch and parse each vehicle not yet present, and persist after every success.
pub struct SyncOrchestrator<V: VerificationClient, S: Storage> {
    client: V,
    store: OutputStore<S>,
    options: SyncOptions,
    monitor: RunMonitor,
}

impl<V: VerificationClient, S: Storage> SyncOrchestrator<V, S> {
    pub fn new(client: V, store: OutputStore<S>) -> Self {
        Self {
            client,
            store,
            options: SyncOptions::default(),
            monitor: RunMonitor::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_monitor(mut self, monitor: RunMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    /// Runs the sync. The inventory is released on every exit path, including fatal errors.
    pub async fn run(&self, inventory: &mut dyn InventorySource) -> Result<SyncReport> {
        let mut ctx = RunContext::new();
        let result = self.run_with_context(&mut ctx, inventory).await;
        inventory.release().await;

        match result {
            Ok(report) => {
                ctx.enter(SyncPhase::Done);
                self.monitor.log_final_stats();
                Ok(report)
            }
            Err(e) => {
                ctx.enter(SyncPhase::Aborted);
                tracing::error!("❌ Sync aborted: {}", e);
                Err(e)
            }
        }
    }

    async fn run_with_context(
        &self,
        ctx: &mut RunContext,
        inventory: &mut dyn InventorySource,
    ) -> Result<SyncReport> {
        ctx.enter(SyncPhase::Loading);
        ctx.set = self.store.load().await?;
        self.monitor.log_phase("Loading");

        ctx.enter(SyncPhase::Enumerating);
        let vehicles = inventory.list_vehicle_identifiers().await?;
        let total = vehicles.len();
        if total == 0 {
            tracing::warn!("No vehicles found in the inventory");
        } else {
            tracing::info!("Found {} vehicles in the inventory", total);
        }

        for (position, vehicle) in vehicles.iter().enumerate() {
            // a dry run treats an identifier it already listed as synced
            if ctx.set.contains(vehicle) || ctx.pending_index.contains(vehicle) {
                ctx.enter(SyncPhase::Skipping);
                ctx.skipped += 1;
                tracing::info!(
                    "Skipping vehicle {}/{}: {} - already synced",
                    position + 1,
                    total,
                    vehicle
                );
                continue;
            }

            if let Some(limit) = self.options.max_vehicles {
                let attempted = ctx.counters.processed + ctx.pending.len();
                if attempted >= limit {
                    tracing::info!(
                        "Reached the limit of {} vehicles; the rest are left for the next run",
                        limit
                    );
                    break;
                }
            }

            if self.options.dry_run {
                tracing::info!("Would fetch vehicle {}/{}: {}", position + 1, total, vehicle);
                ctx.pending_index.insert(vehicle.clone());
                ctx.pending.push(vehicle.clone());
                continue;
            }

            tracing::info!("Processing vehicle {}/{}: {}", position + 1, total, vehicle);
            self.sync_vehicle(ctx, vehicle).await?;
            tracing::info!(
                "Progress: {}/{} | Success: {}, Errors: {}",
                position + 1,
                total,
                ctx.counters.succeeded,
                ctx.counters.failed
            );
        }
        self.monitor.log_phase("Syncing");

        ctx.enter(SyncPhase::Summarizing);
        let report = SyncReport {
            counters: ctx.counters,
            skipped: ctx.skipped,
            inventory_size: total,
            records_total: ctx.set.len(),
            pending: std::mem::take(&mut ctx.pending),
            dry_run: self.options.dry_run,
        };
        tracing::info!(
            processed = report.counters.processed,
            succeeded = report.counters.succeeded,
            failed = report.counters.failed,
            skipped = report.skipped,
            records = report.records_total,
            "Sync finished"
        );
        Ok(report)
    }

    /// Handles one vehicle. Only a persist failure escapes as an error.
    async fn sync_vehicle(&self, ctx: &mut RunContext, vehicle: &VehicleId) -> Result<()> {
        ctx.enter(SyncPhase::Fetching);
        let payload = match self.client.fetch_document_payload(vehicle).await {
            FetchOutcome::Payload(payload) => payload,
            FetchOutcome::NoData { reason } => {
                tracing::warn!("No document data for {}: {}", vehicle, reason);
                ctx.counters.record_failure();
                return Ok(());
            }
            FetchOutcome::TransportFailure { reason } => {
                tracing::warn!("Error fetching documents for {}: {}", vehicle, reason);
                ctx.counters.record_failure();
                return Ok(());
            }
        };

        ctx.enter(SyncPhase::Parsing);
        let record = match parser::parse(&payload, vehicle) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("{}", e);
                ctx.counters.record_failure();
                return Ok(());
            }
        };

        ctx.enter(SyncPhase::Merging);
        // membership was checked before fetching and nothing else writes the set
        let inserted = ctx.set.push(record);
        debug_assert!(inserted, "{} appended twice", vehicle);
        ctx.counters.record_success();
        self.store.persist(&ctx.set).await.inspect_err(|_| {
            tracing::error!(
                "Could not persist {} after syncing {}; stopping",
                self.store.location(),
                vehicle
            );
        })?;
        tracing::info!("✅ Saved documents for {} ({} records)", vehicle, ctx.set.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::output_store::tests::MockStorage;
    use crate::domain::model::DocumentRecord;
    use crate::utils::error::SyncError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    const FILE: &str = "vehicle_documents.json";

    fn payload(tags: &[(&str, &str)]) -> String {
        let body: String = tags
            .iter()
            .map(|(tag, value)| format!("<{tag}>{value}</{tag}>"))
            .collect();
        format!("<VehicleDetails>{}</VehicleDetails>", body)
    }

    fn full_payload() -> String {
        payload(&[
            ("rc_insurance_upto", "12-Aug-2026"),
            ("rc_np_upto", "30-Nov-2026"),
            ("rc_pucc_upto", "01-Feb-2026"),
            ("rc_fit_upto", "15-May-2027"),
            ("rc_tax_upto", "31-Mar-2027"),
        ])
    }

    #[derive(Clone, Default)]
    struct ScriptedClient {
        responses: HashMap<String, FetchOutcome>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedClient {
        fn respond(mut self, id: &str, outcome: FetchOutcome) -> Self {
            self.responses.insert(id.to_string(), outcome);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl VerificationClient for ScriptedClient {
        async fn fetch_document_payload(&self, vehicle: &VehicleId) -> FetchOutcome {
            self.calls.lock().unwrap().push(vehicle.to_string());
            self.responses
                .get(vehicle.as_str())
                .cloned()
                .unwrap_or(FetchOutcome::NoData {
                    reason: "no scripted response".to_string(),
                })
        }
    }

    #[derive(Default)]
    struct VecInventory {
        ids: Vec<&'static str>,
        unavailable: bool,
        released: Arc<AtomicBool>,
    }

    impl VecInventory {
        fn of(ids: &[&'static str]) -> Self {
            Self {
                ids: ids.to_vec(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl InventorySource for VecInventory {
        async fn list_vehicle_identifiers(&mut self) -> Result<Vec<VehicleId>> {
            if self.unavailable {
                return Err(SyncError::InventoryUnavailable {
                    message: "connection refused".to_string(),
                });
            }
            Ok(self.ids.iter().map(|id| VehicleId::from(*id)).collect())
        }

        async fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn orchestrator(
        client: ScriptedClient,
        storage: MockStorage,
    ) -> SyncOrchestrator<ScriptedClient, MockStorage> {
        SyncOrchestrator::new(client, OutputStore::new(storage, FILE))
    }

    async fn stored_records(storage: &MockStorage) -> Vec<DocumentRecord> {
        let bytes = storage.get_file(FILE).await.expect("artifact written");
        serde_json::from_slice(&bytes).unwrap()
    }

    fn without_timestamps(records: Vec<DocumentRecord>) -> Vec<DocumentRecord> {
        records
            .into_iter()
            .map(|mut r| {
                r.last_updated.clear();
                r
            })
            .collect()
    }

    #[tokio::test]
    async fn test_one_success_one_no_data() {
        let client = ScriptedClient::default()
            .respond("KA01AB1234", FetchOutcome::Payload(full_payload()))
            .respond(
                "KA01AB5678",
                FetchOutcome::NoData {
                    reason: "code 404".to_string(),
                },
            );
        let storage = MockStorage::new();
        let mut inventory = VecInventory::of(&["KA01AB1234", "KA01AB5678"]);

        let report = orchestrator(client, storage.clone())
            .run(&mut inventory)
            .await
            .unwrap();

        assert_eq!(
            report.counters,
            RunCounters {
                processed: 2,
                succeeded: 1,
                failed: 1
            }
        );
        let records = stored_records(&storage).await;
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.vehicle_number.as_str(), "KA01AB1234");
        assert_eq!(record.insurance_expiry, "12-Aug-2026");
        assert_eq!(record.permit_expiry, "30-Nov-2026");
        assert_eq!(record.puc_expiry, "01-Feb-2026");
        assert_eq!(record.fitness_expiry, "15-May-2027");
        assert_eq!(record.tax_expiry, "31-Mar-2027");
        assert!(!record.last_updated.is_empty());
        assert!(inventory.released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_second_run_skips_everything() {
        let client = ScriptedClient::default()
            .respond("A", FetchOutcome::Payload(full_payload()))
            .respond("B", FetchOutcome::Payload(full_payload()));
        let storage = MockStorage::new();

        orchestrator(client.clone(), storage.clone())
            .run(&mut VecInventory::of(&["A", "B"]))
            .await
            .unwrap();
        let after_first = storage.get_file(FILE).await.unwrap();

        let report = orchestrator(client.clone(), storage.clone())
            .run(&mut VecInventory::of(&["A", "B"]))
            .await
            .unwrap();

        assert_eq!(report.counters, RunCounters::default());
        assert_eq!(report.skipped, 2);
        assert_eq!(client.calls(), vec!["A", "B"]);
        assert_eq!(storage.get_file(FILE).await.unwrap(), after_first);
    }

    #[tokio::test]
    async fn test_interrupted_run_resumes_to_same_result() {
        let client = ScriptedClient::default()
            .respond("A", FetchOutcome::Payload(full_payload()))
            .respond("B", FetchOutcome::Payload(payload(&[("rc_tax_upto", "LTT")])))
            .respond("C", FetchOutcome::Payload(full_payload()));
        let ids = ["A", "B", "C"];

        let uninterrupted = MockStorage::new();
        orchestrator(client.clone(), uninterrupted.clone())
            .run(&mut VecInventory::of(&ids))
            .await
            .unwrap();

        // the limit stands in for a process killed after the first persist
        let resumed = MockStorage::new();
        orchestrator(client.clone(), resumed.clone())
            .with_options(SyncOptions {
                max_vehicles: Some(1),
                dry_run: false,
            })
            .run(&mut VecInventory::of(&ids))
            .await
            .unwrap();
        assert_eq!(stored_records(&resumed).await.len(), 1);

        let report = orchestrator(client, resumed.clone())
            .run(&mut VecInventory::of(&ids))
            .await
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.counters.succeeded, 2);

        assert_eq!(
            without_timestamps(stored_records(&resumed).await),
            without_timestamps(stored_records(&uninterrupted).await)
        );
    }

    #[tokio::test]
    async fn test_missing_tag_is_still_a_success() {
        let client = ScriptedClient::default().respond(
            "KA01AB1234",
            FetchOutcome::Payload(payload(&[
                ("rc_insurance_upto", "12-Aug-2026"),
                ("rc_np_upto", "30-Nov-2026"),
                ("rc_fit_upto", "15-May-2027"),
                ("rc_tax_upto", "31-Mar-2027"),
            ])),
        );
        let storage = MockStorage::new();

        let report = orchestrator(client, storage.clone())
            .run(&mut VecInventory::of(&["KA01AB1234"]))
            .await
            .unwrap();

        assert_eq!(report.counters.succeeded, 1);
        let records = stored_records(&storage).await;
        assert_eq!(records[0].puc_expiry, "");
        assert_eq!(records[0].tax_expiry, "31-Mar-2027");
    }

    #[tokio::test]
    async fn test_per_item_failures_do_not_stop_the_run() {
        let client = ScriptedClient::default()
            .respond(
                "A",
                FetchOutcome::TransportFailure {
                    reason: "HTTP 502".to_string(),
                },
            )
            .respond("B", FetchOutcome::Payload("<VehicleDetails>".to_string()))
            .respond("C", FetchOutcome::Payload(full_payload()));
        let storage = MockStorage::new();

        let report = orchestrator(client.clone(), storage.clone())
            .run(&mut VecInventory::of(&["A", "B", "C"]))
            .await
            .unwrap();

        assert_eq!(
            report.counters,
            RunCounters {
                processed: 3,
                succeeded: 1,
                failed: 2
            }
        );
        assert_eq!(client.calls(), vec!["A", "B", "C"]);
        let records = stored_records(&storage).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].vehicle_number.as_str(), "C");
    }

    #[tokio::test]
    async fn test_inventory_failure_leaves_artifact_untouched() {
        let storage = MockStorage::new();
        let existing = br#"[{"vehicleNumber":"OLD1","taxExpiry":"LTT"}]"#;
        storage.put(FILE, existing).await;
        let mut inventory = VecInventory {
            unavailable: true,
            ..VecInventory::default()
        };
        let client = ScriptedClient::default();

        let err = orchestrator(client.clone(), storage.clone())
            .run(&mut inventory)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::InventoryUnavailable { .. }));
        assert_eq!(storage.get_file(FILE).await.unwrap(), existing.to_vec());
        assert!(client.calls().is_empty());
        assert!(inventory.released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_corrupt_artifact_aborts_before_fetching() {
        let storage = MockStorage::new();
        storage.put(FILE, b"not json").await;
        let client = ScriptedClient::default().respond("A", FetchOutcome::Payload(full_payload()));
        let mut inventory = VecInventory::of(&["A"]);

        let err = orchestrator(client.clone(), storage.clone())
            .run(&mut inventory)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::CorruptOutputStore { .. }));
        assert!(client.calls().is_empty());
        assert_eq!(storage.get_file(FILE).await.unwrap(), b"not json");
        assert!(inventory.released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_persist_failure_is_fatal() {
        let storage = MockStorage::failing();
        let client = ScriptedClient::default()
            .respond("A", FetchOutcome::Payload(full_payload()))
            .respond("B", FetchOutcome::Payload(full_payload()));

        let err = orchestrator(client.clone(), storage)
            .run(&mut VecInventory::of(&["A", "B"]))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::PersistFailed { .. }));
        assert_eq!(client.calls(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_duplicate_inventory_entries_produce_one_record() {
        let client = ScriptedClient::default().respond("A", FetchOutcome::Payload(full_payload()));
        let storage = MockStorage::new();

        let report = orchestrator(client.clone(), storage.clone())
            .run(&mut VecInventory::of(&["A", "A"]))
            .await
            .unwrap();

        assert_eq!(report.counters.succeeded, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(client.calls(), vec!["A"]);
        assert_eq!(stored_records(&storage).await.len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_fetches_and_writes_nothing() {
        let client = ScriptedClient::default().respond("B", FetchOutcome::Payload(full_payload()));
        let storage = MockStorage::new();
        storage
            .put(FILE, br#"[{"vehicleNumber":"A"}]"#)
            .await;

        let report = orchestrator(client.clone(), storage.clone())
            .with_options(SyncOptions {
                max_vehicles: None,
                dry_run: true,
            })
            .run(&mut VecInventory::of(&["A", "B", "C"]))
            .await
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.pending, vec![VehicleId::from("B"), VehicleId::from("C")]);
        assert_eq!(report.counters, RunCounters::default());
        assert!(client.calls().is_empty());
        assert_eq!(
            storage.get_file(FILE).await.unwrap(),
            br#"[{"vehicleNumber":"A"}]"#.to_vec()
        );
    }

    #[tokio::test]
    async fn test_dry_run_lists_repeated_identifier_once() {
        let client = ScriptedClient::default();
        let report = orchestrator(client.clone(), MockStorage::new())
            .with_options(SyncOptions {
                max_vehicles: None,
                dry_run: true,
            })
            .run(&mut VecInventory::of(&["A", "B", "A"]))
            .await
            .unwrap();

        assert_eq!(report.pending, vec![VehicleId::from("A"), VehicleId::from("B")]);
        assert_eq!(report.skipped, 1);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_inventory_completes_without_writing() {
        let storage = MockStorage::new();
        let report = orchestrator(ScriptedClient::default(), storage.clone())
            .run(&mut VecInventory::of(&[]))
            .await
            .unwrap();

        assert_eq!(report.inventory_size, 0);
        assert!(storage.get_file(FILE).await.is_none());
    }
}
