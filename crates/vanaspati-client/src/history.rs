//! Diagnosis history cache.
//!
//! A local, newest-first mirror of the user's server-side history. After a
//! successful mutation the cache is patched in place instead of re-fetched;
//! a failed call leaves it untouched. The garden registry takes the opposite
//! approach (see [`crate::garden`]).

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Instant;

use chrono::Utc;
use reqwest::Method;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use vanaspati_core::defaults::{HISTORY_PAGE_LIMIT, PAGE_OFFSET};
use vanaspati_core::logging::component;
use vanaspati_core::{
    ClientEvent, DiagnosisRecord, HistoryPage, NewDiagnosis, RecordId, Result,
    SaveDiagnosisResponse,
};

use crate::gateway::ApiClient;

#[derive(Debug, Default)]
struct Entries {
    records: Vec<DiagnosisRecord>,
    /// `total` reported by the last page fetch.
    server_total: u64,
}

/// Outcome of [`HistoryCache::add_batch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSaveReport {
    /// Ids of saved entries, in input order.
    pub saved: Vec<RecordId>,
    pub failed: Vec<BatchFailure>,
    /// Entries never attempted because the session ended mid-batch.
    pub skipped: usize,
}

impl BatchSaveReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped == 0
    }
}

/// One entry of a batch the server did not accept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    /// Position in the submitted batch.
    pub index: usize,
    pub image_name: String,
    pub error: String,
}

/// Cached view of `/history/diagnosis`.
///
/// Cloning shares the cache. Reads never wait on the network; mutations are
/// serialized so a slow `add` cannot interleave with a `load`. A 401 from
/// any endpoint empties the cache.
#[derive(Debug, Clone)]
pub struct HistoryCache {
    api: ApiClient,
    entries: Arc<RwLock<Entries>>,
    mutation: Arc<Mutex<()>>,
}

impl HistoryCache {
    pub fn new(api: ApiClient) -> Self {
        let entries = Arc::new(RwLock::new(Entries::default()));

        let weak: Weak<RwLock<Entries>> = Arc::downgrade(&entries);
        api.on_unauthorized(move || {
            if let Some(entries) = weak.upgrade() {
                *entries.write().unwrap_or_else(|p| p.into_inner()) = Entries::default();
                debug!(component = component::HISTORY, "History dropped after 401");
            }
        });

        Self {
            api,
            entries,
            mutation: Arc::new(Mutex::new(())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Snapshot of the cached records, newest first.
    pub fn records(&self) -> Vec<DiagnosisRecord> {
        self.read().records.clone()
    }

    /// Number of cached records.
    pub fn total(&self) -> u64 {
        self.read().records.len() as u64
    }

    /// Total reported by the server at the last load. May exceed
    /// [`total`](Self::total) when only one page was fetched.
    pub fn server_total(&self) -> u64 {
        self.read().server_total
    }

    pub fn get(&self, id: &RecordId) -> Option<DiagnosisRecord> {
        self.read().records.iter().find(|r| &r.id == id).cloned()
    }

    /// Load the first page with default paging.
    pub async fn load(&self) -> Result<()> {
        self.load_page(HISTORY_PAGE_LIMIT, PAGE_OFFSET).await
    }

    /// Replace the cache with one page from the server.
    ///
    /// Without a stored token this is a no-op that leaves the cache empty.
    pub async fn load_page(&self, limit: u32, offset: u32) -> Result<()> {
        let _guard = self.mutation.lock().await;

        if !self.api.has_token() {
            debug!(
                component = component::HISTORY,
                op = "load",
                "No token, skipping history load"
            );
            *self.write() = Entries::default();
            return Ok(());
        }

        let started = Instant::now();
        let page: HistoryPage = self
            .api
            .execute_json(Method::GET, "/history/diagnosis", |req| {
                req.query(&[("limit", limit), ("offset", offset)])
            })
            .await?;

        let mut records = page.history;
        records.sort_by(|a, b| b.diagnosed_at.cmp(&a.diagnosed_at));
        let count = records.len();

        *self.write() = Entries {
            records,
            server_total: page.total,
        };

        info!(
            component = component::HISTORY,
            op = "load",
            result_count = count,
            server_total = page.total,
            duration_ms = started.elapsed().as_millis() as u64,
            "History loaded"
        );
        self.api.events().emit(ClientEvent::HistoryLoaded {
            count,
            total: page.total,
        });
        Ok(())
    }

    /// Save a diagnosis and prepend its local mirror. Returns the new id.
    pub async fn add(&self, entry: NewDiagnosis) -> Result<RecordId> {
        let _guard = self.mutation.lock().await;
        self.add_locked(entry).await
    }

    async fn add_locked(&self, entry: NewDiagnosis) -> Result<RecordId> {
        let saved: SaveDiagnosisResponse = self
            .api
            .execute_json(Method::POST, "/history/diagnosis", |req| req.json(&entry))
            .await?;

        let id = saved.diagnosis_id;
        let record = entry.into_record(id.clone(), Utc::now());
        let total = {
            let mut entries = self.write();
            entries.records.insert(0, record);
            entries.server_total += 1;
            entries.records.len() as u64
        };

        debug!(
            component = component::HISTORY,
            op = "add",
            diagnosis_id = %id,
            total,
            "Diagnosis saved"
        );
        self.api.events().emit(ClientEvent::HistoryAdded {
            diagnosis_id: id.clone(),
            total,
        });
        Ok(id)
    }

    /// Save several diagnoses one after another.
    ///
    /// A failed entry is recorded and the batch continues; entries already
    /// saved stay saved. A 401 ends the session, so the rest are skipped.
    pub async fn add_batch(&self, entries: Vec<NewDiagnosis>) -> BatchSaveReport {
        let _guard = self.mutation.lock().await;
        let mut report = BatchSaveReport::default();
        let count = entries.len();

        for (index, entry) in entries.into_iter().enumerate() {
            let image_name = entry.image_name.clone();
            match self.add_locked(entry).await {
                Ok(id) => report.saved.push(id),
                Err(e) => {
                    warn!(
                        component = component::HISTORY,
                        op = "add_batch",
                        index,
                        image_name = %image_name,
                        error = %e,
                        "Batch entry not saved"
                    );
                    let unauthorized = e.is_unauthorized();
                    report.failed.push(BatchFailure {
                        index,
                        image_name,
                        error: e.to_string(),
                    });
                    if unauthorized {
                        report.skipped = count - index - 1;
                        break;
                    }
                }
            }
        }

        info!(
            component = component::HISTORY,
            op = "add_batch",
            saved = report.saved.len(),
            failed = report.failed.len(),
            skipped = report.skipped,
            "Batch save finished"
        );
        report
    }

    /// Delete one record on the server, then drop it locally.
    ///
    /// Deleting an id the cache does not hold still calls the server and
    /// leaves the cache unchanged.
    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        let _guard = self.mutation.lock().await;

        let path = format!("/history/diagnosis/{}", id);
        self.api.execute_value(Method::DELETE, &path, |req| req).await?;

        let (removed, total) = {
            let mut entries = self.write();
            let before = entries.records.len();
            entries.records.retain(|r| &r.id != id);
            let removed = entries.records.len() < before;
            if removed {
                entries.server_total = entries.server_total.saturating_sub(1);
            }
            (removed, entries.records.len() as u64)
        };

        debug!(
            component = component::HISTORY,
            op = "delete",
            diagnosis_id = %id,
            removed,
            total,
            "Diagnosis deleted"
        );
        self.api.events().emit(ClientEvent::HistoryDeleted {
            diagnosis_id: id.clone(),
            total,
        });
        Ok(())
    }

    /// Delete every record on the server, then empty the cache.
    pub async fn clear_all(&self) -> Result<()> {
        let _guard = self.mutation.lock().await;

        self.api
            .execute_value(Method::DELETE, "/history/diagnosis", |req| req)
            .await?;

        *self.write() = Entries::default();

        info!(
            component = component::HISTORY,
            op = "clear_all",
            "History cleared"
        );
        self.api.events().emit(ClientEvent::HistoryCleared);
        Ok(())
    }

    /// Drop local state without a server call (used after logout).
    pub fn reset(&self) {
        *self.write() = Entries::default();
    }
}
