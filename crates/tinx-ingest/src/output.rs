//! TIN-X loader files
//!
//! Four delimited tables, each with a header line even when empty:
//!
//! | File                 | Columns                                     |
//! |----------------------|---------------------------------------------|
//! | `ProteinNovelty.tsv` | Protein ID, UniProt, Novelty                |
//! | `DiseaseNovelty.tsv` | DOID, Name, Summary, Novelty                |
//! | `Importance.tsv`     | DOID, Protein ID, UniProt, Score            |
//! | `PMIDRanking.tsv`    | DOID, Protein ID, UniProt, PubMed ID, Rank  |
//!
//! The UniProt column is empty when the resolver has no accession.

use crate::config::{DISEASE_NOVELTY_FILE, IMPORTANCE_FILE, PMID_RANKING_FILE, PROTEIN_NOVELTY_FILE};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tinx_common::types::{
    ArticleRankRecord, DiseaseNoveltyRecord, ImportanceRecord, ProteinNoveltyRecord,
};
use tinx_common::Result;
use tracing::{debug, info, warn};

pub const PROTEIN_NOVELTY_HEADER: [&str; 3] = ["Protein ID", "UniProt", "Novelty"];
pub const DISEASE_NOVELTY_HEADER: [&str; 4] = ["DOID", "Name", "Summary", "Novelty"];
pub const IMPORTANCE_HEADER: [&str; 4] = ["DOID", "Protein ID", "UniProt", "Score"];
pub const PMID_RANKING_HEADER: [&str; 5] = ["DOID", "Protein ID", "UniProt", "PubMed ID", "Rank"];

/// Rows written per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputCounts {
    pub protein_novelty: u64,
    pub disease_novelty: u64,
    pub importance: u64,
    pub article_ranks: u64,
}

/// Destination for computed TIN-X records.
///
/// Each method may be called any number of times; records are appended in
/// call order.
pub trait RecordSink: Send {
    fn write_protein_novelty(&mut self, records: &[ProteinNoveltyRecord]) -> Result<()>;

    fn write_disease_novelty(&mut self, records: &[DiseaseNoveltyRecord]) -> Result<()>;

    fn write_importance(&mut self, records: &[ImportanceRecord]) -> Result<()>;

    fn write_article_ranks(&mut self, records: &[ArticleRankRecord]) -> Result<()>;

    /// Flush everything and report row counts
    fn finish(&mut self) -> Result<OutputCounts>;
}

/// Staging directory inside the output directory. Tables are written here and
/// only moved over the published files by [`DelimitedSink::commit`].
pub const STAGING_DIR: &str = ".staging";

const TABLES: [&str; 4] = [PROTEIN_NOVELTY_FILE, DISEASE_NOVELTY_FILE, IMPORTANCE_FILE, PMID_RANKING_FILE];

/// Writes the four loader files into one directory.
///
/// Rows go to `<dir>/.staging` first. Until [`commit`](Self::commit) runs,
/// the tables already in `dir` are left alone.
pub struct DelimitedSink {
    dir: PathBuf,
    staging: PathBuf,
    protein_novelty: csv::Writer<File>,
    disease_novelty: csv::Writer<File>,
    importance: csv::Writer<File>,
    article_ranks: csv::Writer<File>,
    counts: OutputCounts,
}

impl DelimitedSink {
    /// Create `dir` if needed and open fresh staged tables. A staging
    /// directory left behind by an interrupted run is cleared.
    pub fn create(dir: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let staging = dir.join(STAGING_DIR);
        if staging.exists() {
            warn!(staging = %staging.display(), "Removing leftover staging directory");
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(&staging)?;

        let sink = Self {
            protein_novelty: open_table(&staging, PROTEIN_NOVELTY_FILE, delimiter, &PROTEIN_NOVELTY_HEADER)?,
            disease_novelty: open_table(&staging, DISEASE_NOVELTY_FILE, delimiter, &DISEASE_NOVELTY_HEADER)?,
            importance: open_table(&staging, IMPORTANCE_FILE, delimiter, &IMPORTANCE_HEADER)?,
            article_ranks: open_table(&staging, PMID_RANKING_FILE, delimiter, &PMID_RANKING_HEADER)?,
            dir,
            staging,
            counts: OutputCounts::default(),
        };

        debug!(staging = %sink.staging.display(), "Opened staged TIN-X output files");
        Ok(sink)
    }

    /// Close every writer, returning the output and staging directories
    fn close(self) -> (PathBuf, PathBuf) {
        let Self {
            dir,
            staging,
            protein_novelty,
            disease_novelty,
            importance,
            article_ranks,
            ..
        } = self;
        drop((protein_novelty, disease_novelty, importance, article_ranks));
        (dir, staging)
    }

    /// Move the staged tables over the published ones. Call after
    /// [`RecordSink::finish`].
    pub fn commit(self) -> Result<()> {
        let (dir, staging) = self.close();

        for table in TABLES {
            std::fs::rename(staging.join(table), dir.join(table))?;
        }
        std::fs::remove_dir(&staging)?;

        info!(dir = %dir.display(), "Published TIN-X output files");
        Ok(())
    }

    /// Drop the staged tables, leaving the published ones as they were
    pub fn discard(self) {
        let (_, staging) = self.close();

        if let Err(e) = std::fs::remove_dir_all(&staging) {
            warn!(staging = %staging.display(), "Failed to remove staged output: {}", e);
        }
    }
}

fn write_all<T: Serialize>(writer: &mut csv::Writer<File>, records: &[T]) -> Result<u64> {
    for record in records {
        writer.serialize(record)?;
    }
    Ok(records.len() as u64)
}

impl RecordSink for DelimitedSink {
    fn write_protein_novelty(&mut self, records: &[ProteinNoveltyRecord]) -> Result<()> {
        self.counts.protein_novelty += write_all(&mut self.protein_novelty, records)?;
        Ok(())
    }

    fn write_disease_novelty(&mut self, records: &[DiseaseNoveltyRecord]) -> Result<()> {
        self.counts.disease_novelty += write_all(&mut self.disease_novelty, records)?;
        Ok(())
    }

    fn write_importance(&mut self, records: &[ImportanceRecord]) -> Result<()> {
        self.counts.importance += write_all(&mut self.importance, records)?;
        Ok(())
    }

    fn write_article_ranks(&mut self, records: &[ArticleRankRecord]) -> Result<()> {
        self.counts.article_ranks += write_all(&mut self.article_ranks, records)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<OutputCounts> {
        self.protein_novelty.flush()?;
        self.disease_novelty.flush()?;
        self.importance.flush()?;
        self.article_ranks.flush()?;

        info!(
            staging = %self.staging.display(),
            protein_novelty = self.counts.protein_novelty,
            disease_novelty = self.counts.disease_novelty,
            importance = self.counts.importance,
            article_ranks = self.counts.article_ranks,
            "Wrote staged TIN-X output files"
        );
        Ok(self.counts)
    }
}

/// Keeps every record in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub protein_novelty: Vec<ProteinNoveltyRecord>,
    pub disease_novelty: Vec<DiseaseNoveltyRecord>,
    pub importance: Vec<ImportanceRecord>,
    pub article_ranks: Vec<ArticleRankRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> OutputCounts {
        OutputCounts {
            protein_novelty: self.protein_novelty.len() as u64,
            disease_novelty: self.disease_novelty.len() as u64,
            importance: self.importance.len() as u64,
            article_ranks: self.article_ranks.len() as u64,
        }
    }
}

impl RecordSink for MemorySink {
    fn write_protein_novelty(&mut self, records: &[ProteinNoveltyRecord]) -> Result<()> {
        self.protein_novelty.extend_from_slice(records);
        Ok(())
    }

    fn write_disease_novelty(&mut self, records: &[DiseaseNoveltyRecord]) -> Result<()> {
        self.disease_novelty.extend_from_slice(records);
        Ok(())
    }

    fn write_importance(&mut self, records: &[ImportanceRecord]) -> Result<()> {
        self.importance.extend_from_slice(records);
        Ok(())
    }

    fn write_article_ranks(&mut self, records: &[ArticleRankRecord]) -> Result<()> {
        self.article_ranks.extend_from_slice(records);
        Ok(())
    }

    fn finish(&mut self) -> Result<OutputCounts> {
        Ok(self.counts())
    }
}
