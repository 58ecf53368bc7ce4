// TIN-X pipeline orchestration
//
// 1. Load the Disease Ontology term table
// 2. Parse protein and disease mentions (concurrently, disjoint state)
// 3. Protein and disease novelty
// 4. Importance and PubMed article ranks, parallel over proteins
// 5. Publish the staged loader files and write the dataset manifest
//
// All accumulated state lives in a RunState built fresh per run.

use crate::config::TinxConfig;
use crate::mentions::{
    DiseaseMentionParser, DiseaseMentions, ParseStats, ProteinMentionParser, ProteinMentions,
};
use crate::ontology::DiseaseOntology;
use crate::output::{DelimitedSink, OutputCounts, RecordSink};
use crate::provenance::{fingerprint_inputs, DatasetManifest};
use crate::resolve::{CachedResolver, ProteinResolver, RetryPolicy, UniprotAccessions};
use crate::scoring::{build_thread_pool, disease_novelty, protein_novelty, PairScore, PairScorer};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tinx_common::types::{ArticleRankRecord, ImportanceRecord};
use tinx_common::{Result, TinxError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Scored batches buffered between the scoring threads and the writer
const SCORED_BATCH_BACKLOG: usize = 4;

/// Counters from one pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub ontology_terms: usize,
    pub protein_mentions: ParseStats,
    pub disease_mentions: ParseStats,
    /// Proteins labelled with a UniProt accession
    pub uniprot_labelled: usize,
    /// Co-mentioned protein-disease pairs
    pub pairs: usize,
    pub output: OutputCounts,
}

/// Mention indexes for one run
struct RunState {
    ontology: DiseaseOntology,
    proteins: ProteinMentions,
    diseases: DiseaseMentions,
    accessions: UniprotAccessions,
    stats: PipelineStats,
}

pub struct TinxPipeline {
    config: TinxConfig,
    resolver: Arc<dyn ProteinResolver>,
}

impl TinxPipeline {
    pub fn new(config: TinxConfig, resolver: Arc<dyn ProteinResolver>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, resolver })
    }

    pub fn config(&self) -> &TinxConfig {
        &self.config
    }

    /// Full run into the configured output directory, followed by the
    /// dataset manifest.
    ///
    /// Tables are staged and only published once scoring succeeded, so a
    /// failed or cancelled run leaves the previous outputs and manifest as
    /// they were.
    pub async fn run(&self, cancel: CancellationToken) -> Result<PipelineStats> {
        info!(output_dir = %self.config.output_dir.display(), "Starting TIN-X pipeline");

        let mut sink = DelimitedSink::create(&self.config.output_dir, self.config.delimiter)?;
        let staged = match self.run_with_sink(&mut sink, &cancel).await {
            Ok(stats) => self.manifest(&stats).map(|manifest| (stats, manifest)),
            Err(e) => Err(e),
        };
        let (stats, manifest) = match staged {
            Ok(staged) => staged,
            Err(e) => {
                sink.discard();
                return Err(e);
            },
        };

        // the old manifest must not outlive the tables it describes
        let manifest_path = self.config.manifest_path();
        if manifest_path.exists() {
            std::fs::remove_file(&manifest_path)?;
        }
        sink.commit()?;
        manifest.write_json(&manifest_path)?;

        info!("TIN-X pipeline completed: {:?}", stats.output);
        Ok(stats)
    }

    fn manifest(&self, stats: &PipelineStats) -> Result<DatasetManifest> {
        let mut inputs: Vec<&Path> = vec![
            self.config.protein_file.as_path(),
            self.config.disease_file.as_path(),
            self.config.ontology_file.as_path(),
        ];
        if let Some(xref_table) = &self.config.xref_table {
            inputs.push(xref_table.as_path());
        }

        Ok(DatasetManifest::new(&self.config.dataset_name, fingerprint_inputs(inputs)?, stats.output))
    }

    /// Parse and score, sending every record to `sink`
    pub async fn run_with_sink(
        &self,
        sink: &mut dyn RecordSink,
        cancel: &CancellationToken,
    ) -> Result<PipelineStats> {
        let state = self.parse_inputs(cancel).await?;
        self.score(state, sink, cancel).await
    }

    async fn parse_inputs(&self, cancel: &CancellationToken) -> Result<RunState> {
        info!("Step 1/3: Loading Disease Ontology...");
        let ontology = DiseaseOntology::from_file(&self.config.ontology_file).await?;

        info!("Step 2/3: Parsing mention files...");
        let resolver = CachedResolver::new(
            Arc::clone(&self.resolver),
            RetryPolicy::new(self.config.max_retries, self.config.retry_base_delay()),
        );

        let protein_parser = ProteinMentionParser::new(&resolver)
            .with_prefix(&self.config.protein_prefix)
            .with_secondary_xref_type(&self.config.secondary_xref_type)
            .with_progress_interval(self.config.progress_interval);
        let disease_parser = DiseaseMentionParser::new(&ontology)
            .with_prefix(&self.config.disease_prefix)
            .with_progress_interval(self.config.progress_interval);

        let (proteins, diseases) = tokio::join!(
            protein_parser.parse_file(&self.config.protein_file, cancel),
            disease_parser.parse_file(&self.config.disease_file, cancel),
        );
        let (proteins, protein_stats) = proteins?;
        let (diseases, disease_stats) = diseases?;

        if proteins.is_empty() && diseases.is_empty() {
            return Err(TinxError::NoUsableInput(format!(
                "no resolved proteins in {} and no known diseases in {}",
                self.config.protein_file.display(),
                self.config.disease_file.display()
            )));
        }
        if proteins.is_empty() {
            warn!("No protein mentions resolved; only disease novelty will be produced");
        }
        if diseases.is_empty() {
            warn!("No disease mentions resolved; only protein novelty will be produced");
        }

        let accessions =
            UniprotAccessions::fetch(&resolver, proteins.iter().map(|(&id, _)| id), cancel).await?;

        info!(
            cached_lookups = resolver.cached_entries(),
            uniprot_labelled = accessions.len(),
            backend_calls = resolver.backend_calls(),
            "Protein resolution finished"
        );

        let stats = PipelineStats {
            ontology_terms: ontology.len(),
            protein_mentions: protein_stats,
            disease_mentions: disease_stats,
            uniprot_labelled: accessions.len(),
            ..PipelineStats::default()
        };

        Ok(RunState {
            ontology,
            proteins,
            diseases,
            accessions,
            stats,
        })
    }

    /// Pair scoring runs on the blocking pool; finished batches come back
    /// over a bounded channel and are written to `sink` on this task.
    async fn score(
        &self,
        state: RunState,
        sink: &mut dyn RecordSink,
        cancel: &CancellationToken,
    ) -> Result<PipelineStats> {
        let RunState {
            ontology,
            proteins,
            diseases,
            accessions,
            mut stats,
        } = state;

        info!("Step 3/3: Computing TIN-X scores...");
        let mut novelty = protein_novelty(&proteins);
        for record in &mut novelty {
            record.uniprot = accessions.get(record.protein_id).map(str::to_string);
        }
        sink.write_protein_novelty(&novelty)?;
        sink.write_disease_novelty(&disease_novelty(&diseases, &ontology))?;

        if cancel.is_cancelled() {
            return Err(TinxError::Cancelled);
        }

        let pool = build_thread_pool(self.config.worker_threads)?;
        let progress = self.progress_bar(proteins.entity_count() as u64);
        let worker_cancel = cancel.child_token();
        let (tx, mut rx) = mpsc::channel::<(Vec<PairScore>, usize)>(SCORED_BATCH_BACKLOG);

        let scoring = {
            let cancel = worker_cancel.clone();
            tokio::task::spawn_blocking(move || {
                let mut scorer = PairScorer::new(&proteins, &diseases);
                if let Some(pool) = pool {
                    scorer = scorer.with_thread_pool(pool);
                }
                scorer.for_each_chunk(&cancel, |batch, scored_proteins| {
                    tx.blocking_send((batch, scored_proteins))
                        .map_err(|_| TinxError::Cancelled)
                })
            })
        };

        let mut written = Ok(());
        while let Some((batch, scored_proteins)) = rx.recv().await {
            written = write_pairs(sink, &batch, &accessions);
            if written.is_err() {
                worker_cancel.cancel();
                break;
            }
            progress.inc(scored_proteins as u64);
        }
        drop(rx);
        progress.finish_and_clear();

        let pairs = match scoring.await {
            Ok(pairs) => pairs,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(TinxError::Cancelled),
        };
        written?;

        stats.pairs = pairs?;
        stats.output = sink.finish()?;
        Ok(stats)
    }

    fn progress_bar(&self, proteins: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(proteins);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("Scoring protein-disease pairs");
        pb
    }
}

fn write_pairs(
    sink: &mut dyn RecordSink,
    batch: &[PairScore],
    accessions: &UniprotAccessions,
) -> Result<()> {
    let importance: Vec<ImportanceRecord> = batch
        .iter()
        .map(|pair| pair.importance_record(accessions.get(pair.protein_id)))
        .collect();
    let ranks: Vec<ArticleRankRecord> = batch
        .iter()
        .flat_map(|pair| pair.article_ranks(accessions.get(pair.protein_id)))
        .collect();

    sink.write_importance(&importance)?;
    sink.write_article_ranks(&ranks)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::output::MemorySink;
    use crate::resolve::XrefTableResolver;
    use tempfile::TempDir;
    use tinx_common::types::{DiseaseNoveltyRecord, ProteinNoveltyRecord};

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn pipeline(dir: &TempDir, proteins: &str, diseases: &str) -> TinxPipeline {
        let config = TinxConfig::builder()
            .protein_file(write(dir, "proteins.tsv", proteins))
            .disease_file(write(dir, "diseases.tsv", diseases))
            .ontology_file(write(dir, "doid.obo", "[Term]\nid: DOID:99\nname: test disease\n"))
            .output_dir(dir.path().join("out"))
            .build();
        let resolver = XrefTableResolver::from_reader("stringid\tENSP001\t5\n".as_bytes()).unwrap();
        TinxPipeline::new(config, Arc::new(resolver)).unwrap()
    }

    #[tokio::test]
    async fn test_no_usable_input() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, "ENSP404\t1\n", "DOID:404\t1\n");

        let mut sink = MemorySink::new();
        let err = pipeline
            .run_with_sink(&mut sink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TinxError::NoUsableInput(_)));
    }

    #[tokio::test]
    async fn test_disease_only_run() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, "", "DOID:99\t1 2\n");

        let mut sink = MemorySink::new();
        let stats = pipeline
            .run_with_sink(&mut sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stats.output.disease_novelty, 1);
        assert_eq!(stats.output.protein_novelty, 0);
        assert_eq!(stats.pairs, 0);
    }

    /// Accepts novelty rows, fails on the first importance batch
    struct FullDisk;

    impl RecordSink for FullDisk {
        fn write_protein_novelty(&mut self, _: &[ProteinNoveltyRecord]) -> Result<()> {
            Ok(())
        }

        fn write_disease_novelty(&mut self, _: &[DiseaseNoveltyRecord]) -> Result<()> {
            Ok(())
        }

        fn write_importance(&mut self, _: &[ImportanceRecord]) -> Result<()> {
            Err(std::io::Error::other("no space left on device").into())
        }

        fn write_article_ranks(&mut self, _: &[ArticleRankRecord]) -> Result<()> {
            Ok(())
        }

        fn finish(&mut self) -> Result<OutputCounts> {
            Ok(OutputCounts::default())
        }
    }

    #[tokio::test]
    async fn test_sink_error_stops_scoring() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, "ENSP001\t1 2\n", "DOID:99\t2 3\n");

        let err = pipeline
            .run_with_sink(&mut FullDisk, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TinxError::Io(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scoring_on_multi_thread_runtime() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, "ENSP001\t1 2\n", "DOID:99\t2 3\n");

        let mut sink = MemorySink::new();
        let stats = pipeline
            .run_with_sink(&mut sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stats.pairs, 1);
        assert_eq!(sink.importance.len(), 1);
        assert_eq!(sink.article_ranks.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TinxConfig::builder().delimiter(b'\n').build();
        let resolver = XrefTableResolver::default();
        assert!(TinxPipeline::new(config, Arc::new(resolver)).is_err());
    }
}
