//! Protein identifier resolution
//!
//! Mention files key proteins by STRING/Ensembl protein ids. The warehouse
//! keys them by integer protein id. A [`ProteinResolver`] bridges the two:
//! first by the protein table's primary STRING id, then by a secondary
//! cross-reference namespace.

pub mod cached;
#[cfg(feature = "database")]
pub mod mysql;
pub mod xref_table;

pub use cached::CachedResolver;
#[cfg(feature = "database")]
pub use mysql::MySqlResolver;
pub use xref_table::XrefTableResolver;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tinx_common::types::ProteinId;
use tinx_common::{Result, TinxError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Read-only lookup of warehouse protein ids
#[async_trait]
pub trait ProteinResolver: Send + Sync {
    /// Proteins whose STRING id equals `source_id`
    async fn resolve_by_primary_key(&self, source_id: &str) -> Result<Vec<ProteinId>>;

    /// Proteins carrying an `xtype` cross-reference with the given value
    async fn resolve_by_secondary_xref(&self, xtype: &str, value: &str) -> Result<Vec<ProteinId>>;

    /// UniProt accession of a warehouse protein, if the backend carries one
    async fn uniprot_accession(&self, _protein_id: ProteinId) -> Result<Option<String>> {
        Ok(None)
    }
}

#[async_trait]
impl<T: ProteinResolver + ?Sized> ProteinResolver for std::sync::Arc<T> {
    async fn resolve_by_primary_key(&self, source_id: &str) -> Result<Vec<ProteinId>> {
        (**self).resolve_by_primary_key(source_id).await
    }

    async fn resolve_by_secondary_xref(&self, xtype: &str, value: &str) -> Result<Vec<ProteinId>> {
        (**self).resolve_by_secondary_xref(xtype, value).await
    }

    async fn uniprot_accession(&self, protein_id: ProteinId) -> Result<Option<String>> {
        (**self).uniprot_accession(protein_id).await
    }
}

/// Resolve one mention-file source id, falling back to the secondary
/// cross-reference when the primary key finds nothing.
///
/// Returned ids are sorted and deduplicated.
pub async fn resolve_source_id(
    resolver: &dyn ProteinResolver,
    secondary_xref_type: &str,
    source_id: &str,
) -> Result<Vec<ProteinId>> {
    let mut ids = resolver.resolve_by_primary_key(source_id).await?;

    if ids.is_empty() {
        ids = resolver
            .resolve_by_secondary_xref(secondary_xref_type, source_id)
            .await?;
    }

    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// UniProt accessions of the proteins in one run, used to label output rows
#[derive(Debug, Default, Clone)]
pub struct UniprotAccessions {
    accessions: HashMap<ProteinId, String>,
}

impl UniprotAccessions {
    /// Look up every protein once. A failed lookup leaves that protein
    /// unlabelled and does not abort.
    pub async fn fetch(
        resolver: &dyn ProteinResolver,
        proteins: impl IntoIterator<Item = ProteinId>,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let mut accessions = HashMap::new();
        let mut failures = 0usize;

        for protein_id in proteins {
            if cancel.is_cancelled() {
                return Err(TinxError::Cancelled);
            }
            match resolver.uniprot_accession(protein_id).await {
                Ok(Some(accession)) => {
                    accessions.insert(protein_id, accession);
                },
                Ok(None) => {},
                Err(e) => {
                    failures += 1;
                    warn!(protein_id, "UniProt lookup failed: {}", e);
                },
            }
        }

        debug!(labelled = accessions.len(), failures, "Fetched UniProt accessions");
        Ok(Self { accessions })
    }

    pub fn get(&self, protein_id: ProteinId) -> Option<&str> {
        self.accessions.get(&protein_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.accessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessions.is_empty()
    }
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before the attempt following `attempt` (1-based):
    /// base, 2 * base, 4 * base, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn test_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_accessions_skip_unknown_proteins() {
        let resolver =
            XrefTableResolver::from_reader("stringid\tENSP001\t5\nUniProt\tP04637\t5\n".as_bytes())
                .unwrap();

        let accessions = UniprotAccessions::fetch(&resolver, [5, 6], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(accessions.len(), 1);
        assert_eq!(accessions.get(5), Some("P04637"));
        assert_eq!(accessions.get(6), None);
    }

    #[tokio::test]
    async fn test_accessions_stop_on_cancel() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = UniprotAccessions::fetch(&XrefTableResolver::default(), [5], &cancel).await;
        assert!(matches!(result, Err(TinxError::Cancelled)));
    }

    #[tokio::test]
    async fn test_fallback_to_secondary_xref() {
        let resolver = XrefTableResolver::from_reader(
            "stringid\tENSP001\t5\nEnsembl\tENSP002\t7\nEnsembl\tENSP002\t7\nEnsembl\tENSP001\t9\n"
                .as_bytes(),
        )
        .unwrap();

        assert_eq!(resolve_source_id(&resolver, "Ensembl", "ENSP001").await.unwrap(), vec![5]);
        assert_eq!(resolve_source_id(&resolver, "Ensembl", "ENSP002").await.unwrap(), vec![7]);
        assert!(resolve_source_id(&resolver, "Ensembl", "ENSP003")
            .await
            .unwrap()
            .is_empty());
    }
}
