//! Time-invalidated index of front-matter tags.
//!
//! The note store can be edited outside this process, so there is no
//! reliable invalidation signal. The index is rebuilt wholesale from a full
//! scan once it is older than the staleness window.

use super::PropertyManager;
use crate::client::VaultBackend;
use crate::models::{TagIndex, TagSnapshot};
use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::Instrument;

/// Age after which the index is rebuilt on read.
pub const DEFAULT_STALENESS: Duration = Duration::from_secs(5);

/// Concurrent note fetches during a scan.
const SCAN_CONCURRENCY: usize = 8;

#[derive(Debug, Default)]
struct CacheState {
    index: TagIndex,
    last_refresh: Option<Instant>,
    last_update: Option<DateTime<Utc>>,
}

/// Tag name to file set, rebuilt when stale.
pub struct TagCache {
    backend: Arc<dyn VaultBackend>,
    staleness: Duration,
    state: Mutex<CacheState>,
}

impl TagCache {
    /// Creates an empty, uninitialized cache.
    #[must_use]
    pub fn new(backend: Arc<dyn VaultBackend>) -> Self {
        Self::with_staleness(backend, DEFAULT_STALENESS)
    }

    /// Creates a cache with a custom staleness window.
    #[must_use]
    pub fn with_staleness(backend: Arc<dyn VaultBackend>, staleness: Duration) -> Self {
        Self {
            backend,
            staleness,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Whether a scan has completed.
    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.last_refresh.is_some()
    }

    /// Rebuilds the index from a full vault scan.
    ///
    /// # Errors
    ///
    /// Returns an error if the file listing fails. Failures on single notes
    /// are logged and skipped.
    pub async fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.rebuild(&mut state).await
    }

    /// Returns the current snapshot, rebuilding first if uninitialized or
    /// stale.
    ///
    /// # Errors
    ///
    /// Returns an error if a needed rebuild cannot list the vault.
    pub async fn get_content(&self, path_prefix: Option<&str>) -> Result<TagSnapshot> {
        let mut state = self.state.lock().await;

        let fresh = state
            .last_refresh
            .is_some_and(|at| at.elapsed() <= self.staleness);
        if !fresh {
            self.rebuild(&mut state).await?;
        }

        let last_update = state
            .last_update
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        Ok(TagSnapshot::from_index(&state.index, last_update, path_prefix))
    }

    async fn rebuild(&self, state: &mut CacheState) -> Result<()> {
        let span = tracing::info_span!("tags.refresh", files = tracing::field::Empty);
        let started = Instant::now();

        let index = self.scan().instrument(span.clone()).await;
        let status = if index.is_ok() { "success" } else { "error" };
        metrics::counter!("tag_cache_refresh_total", "status" => status).increment(1);
        let index = index?;

        span.in_scope(|| {
            tracing::debug!(
                tags = index.len(),
                elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
                "Rebuilt tag index"
            );
        });

        state.index = index;
        state.last_refresh = Some(Instant::now());
        state.last_update = Some(Utc::now());
        Ok(())
    }

    async fn scan(&self) -> Result<TagIndex> {
        let query = json!({"glob": ["*.md", {"var": "path"}]});
        let files: Vec<String> = self
            .backend
            .search_json(&query)
            .await?
            .into_iter()
            .map(|hit| hit.filename)
            .filter(|name| name.ends_with(".md"))
            .collect();
        tracing::Span::current().record("files", files.len());

        let permits = Arc::new(Semaphore::new(SCAN_CONCURRENCY));
        let mut tasks = JoinSet::new();
        for file in files {
            let backend = Arc::clone(&self.backend);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let result = backend.get_file_contents(&file).await;
                (file, result)
            });
        }

        let mut index = TagIndex::new();
        while let Some(joined) = tasks.join_next().await {
            let (file, content) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "Tag scan task failed");
                    continue;
                },
            };
            let content = match content {
                Ok(text) => text,
                Err(Error::NoContent) => continue,
                Err(e) => {
                    tracing::warn!(file = %file, error = %e, "Skipping note during tag scan");
                    continue;
                },
            };
            for tag in PropertyManager::parse_properties(&content).tags() {
                if tag.is_empty() {
                    continue;
                }
                index.entry(tag).or_default().insert(file.clone());
            }
        }

        Ok(index)
    }
}
