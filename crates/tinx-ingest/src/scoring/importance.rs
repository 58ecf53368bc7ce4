// Protein-disease importance and PubMed article ranking
//
// For a pair (p, d) sharing papers P = papers(p) ∩ papers(d):
//
//   importance(p, d) = sum(1 / (pc[x] * dc[x]) for x in P)
//
// where pc / dc are the per-paper protein / disease mention counts. The same
// products pc[x] * dc[x] order the shared papers: ascending product, then
// descending PMID. Rank is the 0-based position in that order.
//
// Pairs are enumerated through an inverted paper -> diseases index, so only
// co-mentioned pairs are ever visited. Shared papers are always walked in
// ascending PMID order, which keeps the floating-point sums independent of
// input line order.

use crate::mentions::{DiseaseMentions, ProteinMentions};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tinx_common::types::{ArticleRankRecord, DiseaseId, ImportanceRecord, Pmid, ProteinId};
use tinx_common::{Result, TinxError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A shared paper with its combined mention-count product
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedPaper {
    pub pmid: Pmid,
    pub score: f64,
}

/// Sort papers into rank order: score ascending, PMID descending on ties
pub fn rank_papers(papers: &mut [RankedPaper]) {
    papers.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| b.pmid.cmp(&a.pmid)));
}

/// Importance and ranked supporting papers for one co-mentioned pair
#[derive(Debug, Clone, PartialEq)]
pub struct PairScore {
    pub protein_id: ProteinId,
    pub doid: DiseaseId,
    pub importance: f64,
    /// Already in rank order
    pub ranked: Vec<RankedPaper>,
}

impl PairScore {
    pub fn importance_record(&self, uniprot: Option<&str>) -> ImportanceRecord {
        ImportanceRecord {
            doid: self.doid.clone(),
            protein_id: self.protein_id,
            uniprot: uniprot.map(str::to_string),
            score: self.importance,
        }
    }

    pub fn article_ranks(&self, uniprot: Option<&str>) -> Vec<ArticleRankRecord> {
        self.ranked
            .iter()
            .enumerate()
            .map(|(rank, paper)| ArticleRankRecord {
                doid: self.doid.clone(),
                protein_id: self.protein_id,
                uniprot: uniprot.map(str::to_string),
                pmid: paper.pmid,
                rank: rank as u64,
            })
            .collect()
    }
}

/// Scores every co-mentioned protein-disease pair
pub struct PairScorer<'a> {
    proteins: &'a ProteinMentions,
    diseases: &'a DiseaseMentions,
    /// paper -> diseases mentioning it, in DOID order
    papers_to_diseases: HashMap<Pmid, Vec<&'a DiseaseId>>,
    chunk_size: usize,
    thread_pool: Option<ThreadPool>,
}

impl<'a> PairScorer<'a> {
    pub fn new(proteins: &'a ProteinMentions, diseases: &'a DiseaseMentions) -> Self {
        let mut papers_to_diseases: HashMap<Pmid, Vec<&'a DiseaseId>> = HashMap::new();
        for (doid, papers) in diseases.iter() {
            for &pmid in papers {
                papers_to_diseases.entry(pmid).or_default().push(doid);
            }
        }

        debug!(
            papers = papers_to_diseases.len(),
            diseases = diseases.entity_count(),
            "Built paper -> disease index"
        );

        Self {
            proteins,
            diseases,
            papers_to_diseases,
            chunk_size: crate::DEFAULT_PAIR_CHUNK_SIZE,
            thread_pool: None,
        }
    }

    /// Proteins scored per batch handed to the caller
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Run on a dedicated pool instead of the global rayon pool
    pub fn with_thread_pool(mut self, pool: ThreadPool) -> Self {
        self.thread_pool = Some(pool);
        self
    }

    fn product(&self, pmid: Pmid) -> Option<f64> {
        let pc = self.proteins.paper_count(pmid)?;
        let dc = self.diseases.paper_count(pmid)?;
        let product = pc * dc;
        (product > 0.0 && product.is_finite()).then_some(product)
    }

    fn build(&self, protein_id: ProteinId, doid: &DiseaseId, shared: &[Pmid]) -> Option<PairScore> {
        let mut importance = 0.0;
        let mut ranked = Vec::with_capacity(shared.len());

        for &pmid in shared {
            if let Some(score) = self.product(pmid) {
                importance += 1.0 / score;
                ranked.push(RankedPaper { pmid, score });
            }
        }

        if ranked.is_empty() {
            return None;
        }

        rank_papers(&mut ranked);
        Some(PairScore {
            protein_id,
            doid: doid.clone(),
            importance,
            ranked,
        })
    }

    /// Score one pair directly. `None` when the pair shares no paper.
    ///
    /// Walks the smaller of the two paper sets and looks each one up in the larger.
    pub fn score_pair(&self, protein_id: ProteinId, doid: &DiseaseId) -> Option<PairScore> {
        let protein_papers = self.proteins.papers(&protein_id)?;
        let disease_papers = self.diseases.papers(doid)?;

        let shared = intersect(protein_papers, disease_papers);
        self.build(protein_id, doid, &shared)
    }

    /// All pairs for one protein, in DOID order
    pub fn score_protein(&self, protein_id: ProteinId) -> Vec<PairScore> {
        let Some(papers) = self.proteins.papers(&protein_id) else {
            return Vec::new();
        };

        let mut shared: BTreeMap<&DiseaseId, Vec<Pmid>> = BTreeMap::new();
        for pmid in papers {
            if let Some(doids) = self.papers_to_diseases.get(pmid) {
                for &doid in doids {
                    shared.entry(doid).or_default().push(*pmid);
                }
            }
        }

        shared
            .into_iter()
            .filter_map(|(doid, pmids)| self.build(protein_id, doid, &pmids))
            .collect()
    }

    /// Score all proteins in batches, handing each batch to `emit` in
    /// protein id order together with the number of proteins it covers.
    ///
    /// Proteins within a batch are scored in parallel. Cancellation is
    /// checked before every protein.
    pub fn for_each_chunk<F>(&self, cancel: &CancellationToken, mut emit: F) -> Result<usize>
    where
        F: FnMut(Vec<PairScore>, usize) -> Result<()>,
    {
        let protein_ids: Vec<ProteinId> = self.proteins.iter().map(|(&id, _)| id).collect();
        let mut pairs = 0usize;

        for chunk in protein_ids.chunks(self.chunk_size) {
            let batch = self.score_chunk(chunk, cancel)?;
            pairs += batch.len();
            emit(batch, chunk.len())?;
        }

        info!("Scored {} protein-disease pairs over {} proteins", pairs, protein_ids.len());
        Ok(pairs)
    }

    fn score_chunk(&self, chunk: &[ProteinId], cancel: &CancellationToken) -> Result<Vec<PairScore>> {
        let run = || -> Result<Vec<PairScore>> {
            let scored: Vec<Vec<PairScore>> = chunk
                .par_iter()
                .map(|&protein_id| {
                    if cancel.is_cancelled() {
                        return Err(TinxError::Cancelled);
                    }
                    Ok(self.score_protein(protein_id))
                })
                .collect::<Result<_>>()?;
            Ok(scored.into_iter().flatten().collect())
        };

        match &self.thread_pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    /// Every co-mentioned pair, protein id then DOID order
    pub fn score_all(&self, cancel: &CancellationToken) -> Result<Vec<PairScore>> {
        let mut all = Vec::new();
        self.for_each_chunk(cancel, |batch, _| {
            all.extend(batch);
            Ok(())
        })?;
        Ok(all)
    }
}

/// Shared papers in ascending PMID order
fn intersect(a: &BTreeSet<Pmid>, b: &BTreeSet<Pmid>) -> Vec<Pmid> {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().copied().filter(|pmid| large.contains(pmid)).collect()
}

/// Build a dedicated rayon pool, or `None` to use the global one
pub fn build_thread_pool(worker_threads: usize) -> Result<Option<ThreadPool>> {
    if worker_threads == 0 {
        return Ok(None);
    }

    rayon::ThreadPoolBuilder::new()
        .num_threads(worker_threads)
        .thread_name(|i| format!("tinx-score-{}", i))
        .build()
        .map(Some)
        .map_err(|e| TinxError::config(format!("Failed to build scoring thread pool: {}", e)))
}
