//! Change projector
//!
//! Mirrors a batch of change records into the search index. Index writes run
//! in three phases, each fully settled before the next starts: upserts of
//! `AVAILABLE` versions, then upserts of `DELETED` versions, then deletes.
//! Individual failures are logged and dropped so the feed keeps advancing.

use super::projection::{plan_action, resolve_tenant, ProjectionAction, ProjectionPhase};
use crate::adapters::search::SearchIndex;
use crate::domain::{ChangeRecord, Result};
use crate::log_projection_phase;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Counts of what one batch did to the index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectionReport {
    pub upserted_available: usize,
    pub upserted_deleted: usize,
    pub deleted: usize,
    /// Records deliberately not projected, or malformed
    pub skipped: usize,
    /// Index operations that failed and were dropped
    pub failed: usize,
}

impl ProjectionReport {
    /// Index operations that succeeded
    pub fn applied(&self) -> usize {
        self.upserted_available + self.upserted_deleted + self.deleted
    }

    fn record_success(&mut self, phase: ProjectionPhase, count: usize) {
        match phase {
            ProjectionPhase::UpsertAvailable => self.upserted_available += count,
            ProjectionPhase::UpsertDeleted => self.upserted_deleted += count,
            ProjectionPhase::Delete => self.deleted += count,
        }
    }
}

pub struct Projector {
    index: Arc<dyn SearchIndex>,
    base_table: String,
    multi_tenancy: bool,
}

impl Projector {
    /// Creates a projector for records emitted by `base_table` and its tenant tables
    pub fn new(index: Arc<dyn SearchIndex>, base_table: impl Into<String>) -> Self {
        Self {
            index,
            base_table: base_table.into(),
            multi_tenancy: false,
        }
    }

    /// Resolves tenants from the records' source identifiers
    pub fn with_multi_tenancy(mut self, enabled: bool) -> Self {
        self.multi_tenancy = enabled;
        self
    }

    /// Plans every record, skipping (and logging) the ones that yield no action
    pub fn plan(&self, records: &[ChangeRecord]) -> (Vec<ProjectionAction>, usize) {
        let mut actions = Vec::with_capacity(records.len());
        let mut skipped = 0;

        for record in records {
            let tenant = if self.multi_tenancy {
                resolve_tenant(&record.source_identifier, &self.base_table)
            } else {
                None
            };

            match plan_action(record, tenant.as_ref()) {
                Ok(Some(action)) => actions.push(action),
                Ok(None) => skipped += 1,
                Err(e) => {
                    tracing::warn!(error = %e, event_type = ?record.event_type, "Skipping change record");
                    skipped += 1;
                }
            }
        }

        (actions, skipped)
    }

    /// Projects one batch of change records
    ///
    /// Never fails: index errors are counted in [`ProjectionReport::failed`].
    pub async fn project_batch(&self, records: &[ChangeRecord]) -> ProjectionReport {
        let (actions, skipped) = self.plan(records);
        let mut report = ProjectionReport {
            skipped,
            ..ProjectionReport::default()
        };

        if actions.is_empty() {
            tracing::debug!(records = records.len(), skipped, "Nothing to project");
            return report;
        }

        self.ensure_indexes(&actions).await;

        for phase in ProjectionPhase::ORDERED {
            let batch: Vec<&ProjectionAction> =
                actions.iter().filter(|a| a.phase == phase).collect();
            if batch.is_empty() {
                continue;
            }

            let results = join_all(batch.iter().map(|action| self.apply(action))).await;

            let mut succeeded = 0;
            let mut failed = 0;
            for (action, result) in batch.iter().zip(results) {
                match result {
                    Ok(()) => succeeded += 1,
                    Err(e) => {
                        failed += 1;
                        tracing::warn!(
                            phase = %phase,
                            index = %action.index,
                            id = %action.composite_id,
                            error = %e,
                            "Projection failed"
                        );
                    }
                }
            }

            log_projection_phase!(phase.as_str(), succeeded, failed);
            report.record_success(phase, succeeded);
            report.failed += failed;
        }

        tracing::info!(
            records = records.len(),
            upserted_available = report.upserted_available,
            upserted_deleted = report.upserted_deleted,
            deleted = report.deleted,
            skipped = report.skipped,
            failed = report.failed,
            "Projected change batch"
        );

        report
    }

    async fn ensure_indexes(&self, actions: &[ProjectionAction]) {
        let indexes: BTreeSet<&str> = actions.iter().map(|a| a.index.as_str()).collect();
        let results = join_all(indexes.iter().map(|index| self.index.ensure_index(index))).await;

        for (index, result) in indexes.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(index = %index, error = %e, "Failed to ensure search index");
            }
        }
    }

    async fn apply(&self, action: &ProjectionAction) -> Result<()> {
        match &action.document {
            Some(document) => {
                self.index
                    .upsert_document(&action.index, &action.composite_id, document)
                    .await
            }
            None => {
                self.index
                    .delete_document(&action.index, &action.composite_id)
                    .await
            }
        }
    }
}
