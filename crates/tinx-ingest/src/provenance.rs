//! Dataset and provenance registration
//!
//! Every successful run leaves a `dataset.json` next to the loader files
//! describing where the scores came from and how each table was computed.

use crate::output::OutputCounts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tinx_common::checksum::fingerprint_file;
use tinx_common::types::FileFingerprint;
use tinx_common::Result;
use tracing::{info, warn};

pub const DATASET_SOURCE: &str = "IDG-KMC generated data from JensenLab text mining of PubMed.";

pub const DATASET_COMMENTS: &str = "TIN-X scores and article ranks are computed from the \
    JensenLab files human_textmining_mentions.tsv and disease_textmining_mentions.tsv \
    (http://download.jensenlab.org/).";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    pub table_name: String,
    pub comment: String,
}

impl ProvenanceEntry {
    fn new(table_name: &str, comment: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            comment: comment.to_string(),
        }
    }
}

/// One provenance entry per TIN-X warehouse table
pub fn tinx_provenance() -> Vec<ProvenanceEntry> {
    vec![
        ProvenanceEntry::new(
            "tinx_novelty",
            "Protein novelty from JensenLab PubMed text mining (human_textmining_mentions.tsv). \
             Each paper gives every protein it mentions a fractional target score of one over \
             the number of proteins it mentions. A protein's novelty is one over the sum of its \
             fractional target scores.",
        ),
        ProvenanceEntry::new(
            "tinx_disease",
            "Disease novelty from JensenLab PubMed text mining (disease_textmining_mentions.tsv). \
             Each paper gives every disease it mentions a fractional disease score of one over \
             the number of diseases it mentions. A disease's novelty is one over the sum of its \
             fractional disease scores.",
        ),
        ProvenanceEntry::new(
            "tinx_importance",
            "Each paper gives a fractional disease-target score of one over the product of the \
             number of proteins and the number of diseases it mentions. The importance of a \
             disease-target pair is the sum of these scores over the papers mentioning both.",
        ),
        ProvenanceEntry::new(
            "tinx_articlerank",
            "PMIDs supporting a disease-target pair are ranked by the product of the number of \
             proteins and the number of diseases each paper mentions. Lower products rank first. \
             Ties rank larger (newer) PMIDs first.",
        ),
    ]
}

/// Contents of `dataset.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub name: String,
    pub source: String,
    pub app: String,
    pub app_version: String,
    pub comments: String,
    pub created_at: DateTime<Utc>,
    /// Input files that existed at run time
    pub inputs: Vec<FileFingerprint>,
    pub rows: OutputCounts,
    pub provenance: Vec<ProvenanceEntry>,
}

impl DatasetManifest {
    pub fn new(name: impl Into<String>, inputs: Vec<FileFingerprint>, rows: OutputCounts) -> Self {
        Self {
            name: name.into(),
            source: DATASET_SOURCE.to_string(),
            app: env!("CARGO_PKG_NAME").to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            comments: DATASET_COMMENTS.to_string(),
            created_at: Utc::now(),
            inputs,
            rows,
            provenance: tinx_provenance(),
        }
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Wrote dataset manifest");
        Ok(())
    }

    pub fn read_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Fingerprint the input files that exist. Absent files are logged and left out.
pub fn fingerprint_inputs<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Result<Vec<FileFingerprint>> {
    let mut fingerprints = Vec::new();
    for path in paths {
        if !path.exists() {
            warn!(path = %path.display(), "Input file absent, not fingerprinted");
            continue;
        }
        fingerprints.push(fingerprint_file(path)?);
    }
    Ok(fingerprints)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_round_trips_through_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("mentions.tsv");
        std::fs::write(&input, "ENSP001\t10 11\n").unwrap();

        let inputs = fingerprint_inputs([input.as_path(), dir.path().join("absent.tsv").as_path()])
            .unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].size, 14);

        let rows = OutputCounts {
            protein_novelty: 1,
            ..OutputCounts::default()
        };
        let manifest = DatasetManifest::new("TIN-X Data", inputs, rows);
        let path = dir.path().join("dataset.json");
        manifest.write_json(&path).unwrap();

        let loaded = DatasetManifest::read_json(&path).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.provenance.len(), 4);
        assert_eq!(loaded.app, "tinx-ingest");
    }

    #[test]
    fn test_provenance_tables() {
        let tables: Vec<String> = tinx_provenance().into_iter().map(|p| p.table_name).collect();
        assert_eq!(
            tables,
            vec!["tinx_novelty", "tinx_disease", "tinx_importance", "tinx_articlerank"]
        );
    }
}
