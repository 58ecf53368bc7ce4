//! Common types used across TIN-X

use serde::{Deserialize, Serialize, Serializer};

/// Warehouse protein identifier (`protein.id`)
pub type ProteinId = i64;

/// Disease Ontology identifier, e.g. `DOID:9351`
pub type DiseaseId = String;

/// PubMed identifier, treated as an opaque integer
pub type Pmid = u64;

/// Fractional digits written for every score
pub const SCORE_PRECISION: usize = 8;

/// Render a score with the fixed output precision
pub fn format_score(score: f64) -> String {
    format!("{:.*}", SCORE_PRECISION, score)
}

fn serialize_score<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_score(*score))
}

/// Checksum algorithm type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Sha256,
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Size and digest of an input file at the time it was read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    pub path: String,
    pub algorithm: ChecksumAlgorithm,
    pub checksum: String,
    pub size: u64,
}

// ============================================================================
// Output Records
// ============================================================================

/// Novelty score for one protein (`tinx_novelty`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProteinNoveltyRecord {
    #[serde(rename = "Protein ID")]
    pub protein_id: ProteinId,

    /// Accession for checking rows by hand; empty when unknown
    #[serde(rename = "UniProt")]
    pub uniprot: Option<String>,

    #[serde(rename = "Novelty", serialize_with = "serialize_score")]
    pub score: f64,
}

/// Novelty score for one disease, enriched with its ontology name and
/// definition (`tinx_disease`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseNoveltyRecord {
    #[serde(rename = "DOID")]
    pub doid: DiseaseId,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Summary")]
    pub summary: Option<String>,

    #[serde(rename = "Novelty", serialize_with = "serialize_score")]
    pub score: f64,
}

/// Co-mention importance of a protein for a disease (`tinx_importance`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceRecord {
    #[serde(rename = "DOID")]
    pub doid: DiseaseId,

    #[serde(rename = "Protein ID")]
    pub protein_id: ProteinId,

    /// Accession for checking rows by hand; empty when unknown
    #[serde(rename = "UniProt")]
    pub uniprot: Option<String>,

    #[serde(rename = "Score", serialize_with = "serialize_score")]
    pub score: f64,
}

/// Priority of one supporting paper for a protein-disease pair
/// (`tinx_articlerank`). Rank 0 is the most specific paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRankRecord {
    #[serde(rename = "DOID")]
    pub doid: DiseaseId,

    #[serde(rename = "Protein ID")]
    pub protein_id: ProteinId,

    /// Accession for checking rows by hand; empty when unknown
    #[serde(rename = "UniProt")]
    pub uniprot: Option<String>,

    #[serde(rename = "PubMed ID")]
    pub pmid: Pmid,

    #[serde(rename = "Rank")]
    pub rank: u64,
}
