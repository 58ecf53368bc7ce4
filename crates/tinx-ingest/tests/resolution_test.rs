//! Protein resolution through the pipeline: retry, caching and failure isolation

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tinx_common::types::ProteinId;
use tinx_common::{Result, TinxError};
use tinx_ingest::config::TinxConfig;
use tinx_ingest::output::MemorySink;
use tinx_ingest::pipeline::{PipelineStats, TinxPipeline};
use tinx_ingest::resolve::ProteinResolver;
use tokio_util::sync::CancellationToken;

/// Resolves `ENSP00N` to N. Fails the first `transient_failures` calls, and
/// every call for ids listed in `broken`.
struct ScriptedResolver {
    transient_failures: u32,
    broken: Vec<&'static str>,
    primary_calls: AtomicU32,
    xref_calls: AtomicU32,
}

impl ScriptedResolver {
    fn new(transient_failures: u32, broken: Vec<&'static str>) -> Self {
        Self {
            transient_failures,
            broken,
            primary_calls: AtomicU32::new(0),
            xref_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ProteinResolver for ScriptedResolver {
    async fn resolve_by_primary_key(&self, source_id: &str) -> Result<Vec<ProteinId>> {
        let call = self.primary_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.transient_failures || self.broken.iter().any(|id| *id == source_id) {
            return Err(TinxError::lookup("backend unavailable"));
        }

        Ok(source_id
            .strip_prefix("ENSP")
            .and_then(|n| n.parse::<ProteinId>().ok())
            .into_iter()
            .collect())
    }

    async fn resolve_by_secondary_xref(&self, _xtype: &str, _value: &str) -> Result<Vec<ProteinId>> {
        self.xref_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

async fn run(resolver: Arc<ScriptedResolver>, proteins: &str) -> PipelineStats {
    let dir = TempDir::new().unwrap();
    let protein_file = dir.path().join("proteins.tsv");
    let disease_file = dir.path().join("diseases.tsv");
    let ontology_file = dir.path().join("doid.obo");
    std::fs::write(&protein_file, proteins).unwrap();
    std::fs::write(&disease_file, "DOID:1\t10 11 12\n").unwrap();
    std::fs::write(&ontology_file, "[Term]\nid: DOID:1\nname: disease\n").unwrap();

    let config = TinxConfig::builder()
        .protein_file(protein_file)
        .disease_file(disease_file)
        .ontology_file(ontology_file)
        .output_dir(dir.path().join("out"))
        .max_retries(3)
        .retry_base_delay_ms(1)
        .build();

    let pipeline = TinxPipeline::new(config, resolver).unwrap();
    let mut sink = MemorySink::new();
    pipeline
        .run_with_sink(&mut sink, &CancellationToken::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let resolver = Arc::new(ScriptedResolver::new(2, Vec::new()));
    let stats = run(Arc::clone(&resolver), "ENSP001\t10\n").await;

    assert_eq!(stats.protein_mentions.resolved_lines, 1);
    assert_eq!(stats.protein_mentions.lookup_failures, 0);
    assert!(stats.protein_mentions.unresolved.is_empty());
    assert_eq!(resolver.primary_calls.load(Ordering::SeqCst), 3);
    assert_eq!(stats.output.importance, 1);
}

#[tokio::test]
async fn test_persistent_failure_only_drops_that_line() {
    let resolver = Arc::new(ScriptedResolver::new(0, vec!["ENSP002"]));
    let stats = run(Arc::clone(&resolver), "ENSP001\t10\nENSP002\t11\nENSP003\t12\n").await;

    let proteins = &stats.protein_mentions;
    assert_eq!(proteins.resolved_lines, 2);
    assert_eq!(proteins.lookup_failures, 1);
    assert_eq!(proteins.unresolved, BTreeSet::from(["ENSP002".to_string()]));
    assert_eq!(stats.output.protein_novelty, 2);
}

#[tokio::test]
async fn test_repeated_ids_hit_the_backend_once() {
    let resolver = Arc::new(ScriptedResolver::new(0, Vec::new()));
    let stats = run(
        Arc::clone(&resolver),
        "ENSP001\t10\nENSP001\t11\nENSP001\t12\nENSP999x\t10\nENSP999x\t11\n",
    )
    .await;

    assert_eq!(stats.protein_mentions.resolved_lines, 3);
    assert_eq!(resolver.primary_calls.load(Ordering::SeqCst), 2);
    // only the unresolvable id falls through to the secondary xref
    assert_eq!(resolver.xref_calls.load(Ordering::SeqCst), 1);
}
