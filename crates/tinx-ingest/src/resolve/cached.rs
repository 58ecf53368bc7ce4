//! Retrying, memoizing resolver wrapper

use super::{ProteinResolver, RetryPolicy};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tinx_common::types::ProteinId;
use tinx_common::{Result, TinxError};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Primary(String),
    Xref(String, String),
}

/// Wraps a backend resolver with bounded retry and a per-run cache.
///
/// Only successful lookups are cached. Resolution results do not change
/// during a run, so a cached answer is never stale.
pub struct CachedResolver<R> {
    inner: R,
    policy: RetryPolicy,
    cache: Mutex<HashMap<CacheKey, Vec<ProteinId>>>,
    backend_calls: AtomicU64,
}

impl<R: ProteinResolver> CachedResolver<R> {
    pub fn new(inner: R, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            cache: Mutex::new(HashMap::new()),
            backend_calls: AtomicU64::new(0),
        }
    }

    /// Calls made to the wrapped resolver, retries included
    pub fn backend_calls(&self) -> u64 {
        self.backend_calls.load(Ordering::Relaxed)
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    fn cached(&self, key: &CacheKey) -> Option<Vec<ProteinId>> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    fn store(&self, key: CacheKey, ids: &[ProteinId]) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, ids.to_vec());
        }
    }

    async fn with_retry<F, Fut>(&self, key: CacheKey, call: F) -> Result<Vec<ProteinId>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<ProteinId>>>,
    {
        if let Some(ids) = self.cached(&key) {
            return Ok(ids);
        }

        let ids = self.retry(&key, call).await?;
        self.store(key, &ids);
        Ok(ids)
    }

    async fn retry<T, F, Fut>(&self, what: &(dyn Debug + Sync), call: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;
        for attempt in 1..=self.policy.max_attempts {
            self.backend_calls.fetch_add(1, Ordering::Relaxed);

            match call().await {
                Ok(found) => return Ok(found),
                Err(e) => {
                    warn!(
                        "Lookup attempt {}/{} for {:?} failed: {}",
                        attempt, self.policy.max_attempts, what, e
                    );
                    last_error = Some(e);

                    if attempt < self.policy.max_attempts {
                        let delay = self.policy.backoff(attempt);
                        debug!("Retrying lookup in {:?}", delay);
                        tokio::time::sleep(delay).await;
                    }
                },
            }
        }

        Err(last_error.unwrap_or_else(|| {
            TinxError::lookup(format!("{:?}: no attempts were made", what))
        }))
    }
}

#[async_trait]
impl<R: ProteinResolver> ProteinResolver for CachedResolver<R> {
    async fn resolve_by_primary_key(&self, source_id: &str) -> Result<Vec<ProteinId>> {
        self.with_retry(CacheKey::Primary(source_id.to_string()), move || {
            self.inner.resolve_by_primary_key(source_id)
        })
        .await
    }

    async fn resolve_by_secondary_xref(&self, xtype: &str, value: &str) -> Result<Vec<ProteinId>> {
        self.with_retry(CacheKey::Xref(xtype.to_string(), value.to_string()), move || {
            self.inner.resolve_by_secondary_xref(xtype, value)
        })
        .await
    }

    /// Retried but not cached; each protein is labelled once per run
    async fn uniprot_accession(&self, protein_id: ProteinId) -> Result<Option<String>> {
        self.retry(&protein_id, move || self.inner.uniprot_accession(protein_id))
            .await
    }
}
