//! Bundle transaction service
//!
//! Drives a bundle through the document-status state machine:
//!
//! 1. **Lock**: every id referenced by a read, update or delete moves its
//!    readable version `AVAILABLE -> LOCKED` in one write set. Stale leases are
//!    taken over; valid leases held by another transaction are a conflict.
//! 2. **Stage**: creates and updates write `PENDING` versions, deletes move to
//!    `PENDING_DELETE`, reads fetch the locked versions.
//! 3. **Rollback** on any staging failure: staged versions still `PENDING` are
//!    deleted and the remaining locks released. A rejected write set wrote
//!    nothing, so only the locks are released.
//! 4. **Finalize**: new versions become `AVAILABLE`, superseded and deleted
//!    versions `DELETED`, read versions `AVAILABLE` again.
//!
//! Releases and finalize steps only move versions out of the status this
//! bundle put them in. A version that already reached `DELETED` stays there.

use super::merge::populate_bundle_entry_responses_with_read_results;
use super::rollback::generate_rollback_requests;
use super::staging::{generate_staging_requests, StagingPlan};
use crate::adapters::storage::DocumentStore;
use crate::config::{BundleConfig, RetryConfig};
use crate::core::requests::{RequestBuilder, WriteRequest};
use crate::core::{clock, codec, versions};
use crate::domain::{
    BatchRequest, BundleEntryResponse, BundleErrorKind, BundleResponse, DocumentStatus, LockEntry,
    Operation, Result, TenantId, VellumError,
};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Limits applied to every bundle
#[derive(Debug, Clone)]
pub struct BundleSettings {
    /// Upper bound on entries, the store's write-set bound
    pub max_entries: usize,
    /// Retry policy for lock acquisition contention
    pub lock_retry: RetryConfig,
}

impl Default for BundleSettings {
    fn default() -> Self {
        BundleSettings::from(&BundleConfig::default())
    }
}

impl From<&BundleConfig> for BundleSettings {
    fn from(config: &BundleConfig) -> Self {
        Self {
            max_entries: config.max_entries,
            lock_retry: config.lock_retry.clone(),
        }
    }
}

/// Locks acquired ahead of staging
struct LockSet {
    locks: Vec<LockEntry>,
    id_to_version_id: HashMap<String, u64>,
}

enum LockOutcome {
    Acquired(LockSet),
    Conflict(String),
}

/// Staging error, and whether the staging write set was applied before it
struct StageFailure {
    error: VellumError,
    writes_applied: bool,
}

/// Executes bundles atomically over a [`DocumentStore`]
pub struct BundleService {
    store: Arc<dyn DocumentStore>,
    builder: RequestBuilder,
    settings: BundleSettings,
}

impl BundleService {
    pub fn new(store: Arc<dyn DocumentStore>, builder: RequestBuilder, settings: BundleSettings) -> Self {
        Self {
            store,
            builder,
            settings,
        }
    }

    pub fn builder(&self) -> &RequestBuilder {
        &self.builder
    }

    pub fn settings(&self) -> &BundleSettings {
        &self.settings
    }

    /// Runs `requests` as one transaction for `tenant`
    ///
    /// Contention and staging failures are reported in the returned
    /// [`BundleResponse`]; nothing is left staged or locked in those cases.
    ///
    /// # Errors
    ///
    /// * `TooManyEntries` / `Validation` / `InvalidResource` for a malformed
    ///   bundle, before anything is written
    /// * `ResourceNotFound` when a referenced id has no readable version
    /// * storage errors other than precondition failures during locking
    pub async fn transaction(
        &self,
        requests: &[BatchRequest],
        tenant: Option<&TenantId>,
    ) -> Result<BundleResponse> {
        let requests = self.validate(requests)?;
        let tenant_label = tenant.map_or("default", TenantId::as_str);

        tracing::debug!(
            tenant = %tenant_label,
            entries = requests.len(),
            "Starting bundle transaction"
        );

        let lock_set = match self.lock_resources(&requests, tenant).await? {
            LockOutcome::Acquired(lock_set) => lock_set,
            LockOutcome::Conflict(message) => {
                let response = BundleResponse::failed(BundleErrorKind::Conflict, message);
                crate::log_bundle_outcome!(response, tenant_label);
                return Ok(response);
            }
        };

        let plan = match generate_staging_requests(
            &self.builder,
            &requests,
            &lock_set.id_to_version_id,
            tenant,
        ) {
            Ok(plan) => plan,
            Err(e) => {
                // Nothing was staged yet, only the locks need releasing
                self.release_locks(&lock_set.locks, tenant).await;
                return Err(e);
            }
        };

        let entries = match self.stage(&plan).await {
            Ok(entries) => entries,
            Err(StageFailure {
                error,
                writes_applied,
            }) => {
                tracing::error!(
                    tenant = %tenant_label,
                    error = %error,
                    writes_applied,
                    "Bundle staging failed"
                );
                self.rollback(&plan, &lock_set.locks, tenant, writes_applied)
                    .await;
                let kind = if error.is_precondition_failed() {
                    BundleErrorKind::Conflict
                } else {
                    BundleErrorKind::System
                };
                let response =
                    BundleResponse::failed(kind, format!("Failed to stage bundle: {error}"));
                crate::log_bundle_outcome!(response, tenant_label);
                return Ok(response);
            }
        };

        self.finalize(&plan.new_locks, &lock_set.locks, tenant).await;

        let response = BundleResponse::committed(entries);
        crate::log_bundle_outcome!(response, tenant_label);
        Ok(response)
    }

    /// Checks the bundle shape and returns it with server-assigned meta removed
    fn validate(&self, requests: &[BatchRequest]) -> Result<Vec<BatchRequest>> {
        if requests.len() > self.settings.max_entries {
            return Err(VellumError::TooManyEntries {
                max: self.settings.max_entries,
                actual: requests.len(),
            });
        }

        let mut targets = HashSet::new();
        let mut validated = Vec::with_capacity(requests.len());
        for request in requests {
            let mut request = request.clone();

            match request.operation {
                Operation::Create | Operation::Update => {
                    let resource = request.resource.as_mut().ok_or_else(|| {
                        VellumError::InvalidResource(format!(
                            "{} of {} has no resource",
                            request.operation, request.resource_type
                        ))
                    })?;
                    codec::strip_server_meta(resource);
                    codec::check_resource_type(resource, &request.resource_type)?;
                }
                Operation::Read | Operation::Delete | Operation::Unsupported => {}
            }

            if matches!(
                request.operation,
                Operation::Read | Operation::Update | Operation::Delete
            ) {
                let id = request.target_id().ok_or_else(|| {
                    VellumError::Validation(format!(
                        "{} of {} has no id",
                        request.operation, request.resource_type
                    ))
                })?;
                if !targets.insert(id.to_string()) {
                    return Err(VellumError::Validation(format!(
                        "Bundle references {}/{} more than once",
                        request.resource_type, id
                    )));
                }
            }

            validated.push(request);
        }

        Ok(validated)
    }

    /// Moves the readable version of every referenced id to `LOCKED`
    async fn lock_resources(
        &self,
        requests: &[BatchRequest],
        tenant: Option<&TenantId>,
    ) -> Result<LockOutcome> {
        let now = clock::now_millis();
        let mut locks = Vec::new();
        let mut id_to_version_id = HashMap::new();

        for request in requests {
            if !matches!(
                request.operation,
                Operation::Read | Operation::Update | Operation::Delete
            ) {
                continue;
            }
            let Some(id) = request.target_id() else {
                continue;
            };

            let current = versions::current_version(
                self.store.as_ref(),
                &self.builder,
                &request.resource_type,
                id,
                tenant,
            )
            .await?
            .ok_or_else(|| VellumError::ResourceNotFound {
                resource_type: request.resource_type.clone(),
                id: id.to_string(),
            })?;

            if matches!(
                current.document_status,
                DocumentStatus::Locked | DocumentStatus::PendingDelete
            ) && current.holds_valid_lease(now)
            {
                tracing::info!(
                    id = %id,
                    vid = current.vid,
                    resource_type = %request.resource_type,
                    "Resource is locked by another transaction"
                );
                return Ok(LockOutcome::Conflict(format!(
                    "Failed to lock {}/{}: resource is locked by another transaction",
                    request.resource_type, id
                )));
            }

            locks.push(LockEntry {
                id: id.to_string(),
                vid: current.vid,
                resource_type: request.resource_type.clone(),
                operation: request.operation,
                is_original_update_item: (request.operation == Operation::Update).then_some(true),
            });
            id_to_version_id.insert(id.to_string(), current.vid);
        }

        if locks.is_empty() {
            return Ok(LockOutcome::Acquired(LockSet {
                locks,
                id_to_version_id,
            }));
        }

        if self.acquire_locks(&locks, tenant).await? {
            Ok(LockOutcome::Acquired(LockSet {
                locks,
                id_to_version_id,
            }))
        } else {
            Ok(LockOutcome::Conflict(
                "Failed to lock resources: a referenced resource changed concurrently"
                    .to_string(),
            ))
        }
    }

    /// Issues the locking write set with exponential backoff on contention.
    /// Returns false when contention outlasts the retry budget.
    async fn acquire_locks(&self, locks: &[LockEntry], tenant: Option<&TenantId>) -> Result<bool> {
        let retry = &self.settings.lock_retry;
        let mut attempt = 0;

        loop {
            // Rebuilt per attempt so the stale-lease cutoff is current
            let transitions: Vec<WriteRequest> = locks
                .iter()
                .map(|lock| {
                    self.builder
                        .build_status_transition(
                            Some(DocumentStatus::Available),
                            DocumentStatus::Locked,
                            &lock.id,
                            lock.vid,
                            &lock.resource_type,
                            tenant,
                        )
                        .into()
                })
                .collect();

            match self.store.transact_write(&transitions).await {
                Ok(()) => return Ok(true),
                Err(e) if e.is_precondition_failed() => {
                    attempt += 1;
                    if attempt > retry.max_retries {
                        tracing::info!(error = %e, attempts = attempt, "Lock acquisition failed");
                        return Ok(false);
                    }

                    let delay_ms = (retry.initial_delay_ms as f64
                        * retry.backoff_multiplier.powf((attempt - 1) as f64))
                        as u64;
                    let delay_ms = delay_ms.min(retry.max_delay_ms);

                    tracing::warn!(
                        attempt = attempt,
                        max_retries = retry.max_retries,
                        delay_ms = delay_ms,
                        error = %e,
                        "Retrying lock acquisition after contention"
                    );

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Executes the write set, then the reads, and merges read results
    async fn stage(
        &self,
        plan: &StagingPlan,
    ) -> std::result::Result<Vec<BundleEntryResponse>, StageFailure> {
        let writes = plan.write_requests();
        if !writes.is_empty() {
            self.store
                .transact_write(&writes)
                .await
                .map_err(|error| StageFailure {
                    error,
                    writes_applied: false,
                })?;
        }

        let applied = |error: VellumError| StageFailure {
            error,
            writes_applied: !writes.is_empty(),
        };

        let read_results = if plan.read_requests.is_empty() {
            Vec::new()
        } else {
            self.store
                .batch_get(&plan.read_requests)
                .await
                .map_err(applied)?
        };

        let mut entries = plan.new_staging_responses.clone();
        populate_bundle_entry_responses_with_read_results(&mut entries, &read_results)
            .map_err(applied)?;
        Ok(entries)
    }

    /// Deletes staged versions when the write set landed, then releases the
    /// locks still held on pre-existing versions
    async fn rollback(
        &self,
        plan: &StagingPlan,
        locks: &[LockEntry],
        tenant: Option<&TenantId>,
        writes_applied: bool,
    ) {
        let rollback = generate_rollback_requests(&self.builder, &plan.new_staging_responses, tenant);

        if writes_applied {
            let deletes: Vec<WriteRequest> = rollback
                .transaction_requests
                .iter()
                .cloned()
                .map(WriteRequest::from)
                .collect();
            self.apply_concurrently(&deletes, "rollback").await;
        }

        let mut ledger: Vec<LockEntry> = locks
            .iter()
            .chain(plan.new_locks.iter())
            .cloned()
            .collect();
        ledger.retain(|lock| {
            !rollback
                .items_to_remove_from_lock
                .iter()
                .any(|removed| removed.id == lock.id && removed.vid == lock.vid)
        });

        self.release_locks(&ledger, tenant).await;
        tracing::info!(
            removed = rollback.items_to_remove_from_lock.len(),
            released = ledger.len(),
            "Bundle rolled back"
        );
    }

    /// Returns versions still `LOCKED` or `PENDING_DELETE` to `AVAILABLE`
    async fn release_locks(&self, locks: &[LockEntry], tenant: Option<&TenantId>) {
        let releases: Vec<WriteRequest> = locks
            .iter()
            .map(|lock| {
                self.builder
                    .build_guarded_transition(
                        &[DocumentStatus::Locked, DocumentStatus::PendingDelete],
                        DocumentStatus::Available,
                        &lock.id,
                        lock.vid,
                        &lock.resource_type,
                        tenant,
                    )
                    .into()
            })
            .collect();
        self.apply_concurrently(&releases, "release").await;
    }

    /// Commits staged versions and retires the versions they supersede
    async fn finalize(
        &self,
        new_versions: &[LockEntry],
        locks: &[LockEntry],
        tenant: Option<&TenantId>,
    ) {
        let commits = new_versions.iter().map(|lock| {
            self.builder.build_guarded_transition(
                &[DocumentStatus::Pending],
                DocumentStatus::Available,
                &lock.id,
                lock.vid,
                &lock.resource_type,
                tenant,
            )
        });

        let retirements = locks.iter().map(|lock| {
            let (held, new_status) = match lock.operation {
                Operation::Update => (DocumentStatus::Locked, DocumentStatus::Deleted),
                Operation::Delete => (DocumentStatus::PendingDelete, DocumentStatus::Deleted),
                _ => (DocumentStatus::Locked, DocumentStatus::Available),
            };
            self.builder.build_guarded_transition(
                &[held],
                new_status,
                &lock.id,
                lock.vid,
                &lock.resource_type,
                tenant,
            )
        });

        let updates: Vec<WriteRequest> = commits.chain(retirements).map(WriteRequest::from).collect();
        self.apply_concurrently(&updates, "finalize").await;
    }

    /// Applies independent writes concurrently, logging failures.
    /// A failed write leaves a lease that the stale-lock rule later reclaims.
    async fn apply_concurrently(&self, writes: &[WriteRequest], step: &'static str) {
        let results = join_all(writes.iter().map(|write| async move {
            match write {
                WriteRequest::Put(put) => self.store.put_item(put).await,
                WriteRequest::Update(update) => self.store.update_item(update).await,
                WriteRequest::Delete(delete) => self.store.delete_item(delete).await,
            }
        }))
        .await;

        for (write, result) in writes.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(
                    step = step,
                    item = %write.key(),
                    table = %write.table(),
                    error = %e,
                    "Write failed"
                );
            }
        }
    }
}
