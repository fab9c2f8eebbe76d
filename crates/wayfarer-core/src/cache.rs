use crate::activity::ActivityLog;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::fetch::ContentSource;
use crate::kinds::ContentKind;
use crate::reduce::RawRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// One successful fetch. Immutable; replaced wholesale on the next success.
#[derive(Debug)]
pub struct Snapshot {
    pub records: Arc<Vec<RawRecord>>,
    pub refreshed_at: Instant,
    pub refreshed_at_utc: DateTime<Utc>,
}

/// Point-in-time view of a cache, for diagnostics and the orchestrator's
/// data-availability hints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub kind: ContentKind,
    /// True when the cache holds at least one record.
    pub available: bool,
    pub records: usize,
    /// `None` until the first successful fetch.
    pub refreshed_at: Option<DateTime<Utc>>,
    pub fresh: bool,
}

impl CacheStatus {
    pub fn label(&self) -> &'static str {
        if self.available {
            "active"
        } else {
            "unavailable"
        }
    }
}

/// Time-invalidated cache of the raw records for one content kind.
///
/// Readers clone the current snapshot `Arc` under a short read lock, so the
/// `{records, timestamp}` pair is always observed consistently. Refreshes are
/// coalesced: a single async mutex serialises them, and a caller that waited
/// on it re-checks freshness before fetching, so concurrent `get()` calls in
/// one stale window trigger one fetch when that fetch succeeds. A failed fetch
/// keeps the previous snapshot.
pub struct CacheStore {
    kind: ContentKind,
    validity: Duration,
    source: Arc<dyn ContentSource>,
    log: Arc<ActivityLog>,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    refresh_lock: Mutex<()>,
}

impl CacheStore {
    pub fn new(
        kind: ContentKind,
        source: Arc<dyn ContentSource>,
        validity: Duration,
        log: Arc<ActivityLog>,
    ) -> Self {
        Self {
            kind,
            validity,
            source,
            log,
            snapshot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Current records, refreshing first if the cache is empty or stale.
    ///
    /// Returns an empty list only when no fetch has ever succeeded (or the
    /// last successful fetch returned no records).
    pub async fn get(&self) -> Arc<Vec<RawRecord>> {
        if let Some(snapshot) = self.fresh_snapshot() {
            return snapshot.records.clone();
        }

        {
            let _guard = self.refresh_lock.lock().await;
            // Another caller may have refreshed while we waited.
            if let Some(snapshot) = self.fresh_snapshot() {
                return snapshot.records.clone();
            }
            let _ = self.refresh_locked().await;
        }

        self.current()
            .map(|s| s.records.clone())
            .unwrap_or_default()
    }

    /// Fetch unconditionally. Returns the new record count; on error the
    /// previous snapshot is kept and the error is returned after logging.
    pub async fn refresh(&self) -> Result<usize> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    pub fn status(&self) -> CacheStatus {
        match self.current() {
            Some(snapshot) => CacheStatus {
                kind: self.kind,
                available: !snapshot.records.is_empty(),
                records: snapshot.records.len(),
                refreshed_at: Some(snapshot.refreshed_at_utc),
                fresh: self.is_fresh(&snapshot),
            },
            None => CacheStatus {
                kind: self.kind,
                available: false,
                records: 0,
                refreshed_at: None,
                fresh: false,
            },
        }
    }

    async fn refresh_locked(&self) -> Result<usize> {
        match self.source.fetch(self.kind).await {
            Ok(records) => {
                let count = records.len();
                let snapshot = Arc::new(Snapshot {
                    records: Arc::new(records),
                    refreshed_at: Instant::now(),
                    refreshed_at_utc: Utc::now(),
                });
                *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
                self.log.system(format!(
                    "Refreshed {} data. Total {}: {}",
                    self.kind, self.kind, count
                ));
                Ok(count)
            }
            Err(e) => {
                self.log.error(format!(
                    "Failed to refresh {} data, keeping previous snapshot: {}",
                    self.kind, e
                ));
                Err(e)
            }
        }
    }

    fn current(&self) -> Option<Arc<Snapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn fresh_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current().filter(|s| self.is_fresh(s))
    }

    fn is_fresh(&self, snapshot: &Snapshot) -> bool {
        snapshot.refreshed_at.elapsed() < self.validity
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("kind", &self.kind)
            .field("validity", &self.validity)
            .finish()
    }
}

/// The pair of stores shared by the query engine and the background refresher.
#[derive(Debug, Clone)]
pub struct Caches {
    pub events: Arc<CacheStore>,
    pub pages: Arc<CacheStore>,
}

impl Caches {
    pub fn new(source: Arc<dyn ContentSource>, config: &CacheConfig, log: Arc<ActivityLog>) -> Self {
        Self {
            events: Arc::new(CacheStore::new(
                ContentKind::Events,
                source.clone(),
                config.validity(ContentKind::Events),
                log.clone(),
            )),
            pages: Arc::new(CacheStore::new(
                ContentKind::Pages,
                source,
                config.validity(ContentKind::Pages),
                log,
            )),
        }
    }

    pub fn store(&self, kind: ContentKind) -> &Arc<CacheStore> {
        match kind {
            ContentKind::Events => &self.events,
            ContentKind::Pages => &self.pages,
        }
    }

    /// Refresh events, then pages. Failures are logged by each store.
    pub async fn refresh_all(&self) {
        for kind in ContentKind::ALL {
            let _ = self.store(kind).refresh().await;
        }
    }

    pub fn status(&self) -> Vec<CacheStatus> {
        ContentKind::ALL
            .iter()
            .map(|kind| self.store(*kind).status())
            .collect()
    }
}
