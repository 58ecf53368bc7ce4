// TIN-X run configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tinx_common::{Result, TinxError};

use crate::DEFAULT_PROGRESS_INTERVAL;

pub const PROTEIN_NOVELTY_FILE: &str = "ProteinNovelty.tsv";
pub const DISEASE_NOVELTY_FILE: &str = "DiseaseNovelty.tsv";
pub const IMPORTANCE_FILE: &str = "Importance.tsv";
pub const PMID_RANKING_FILE: &str = "PMIDRanking.tsv";
pub const DATASET_MANIFEST_FILE: &str = "dataset.json";

/// Configuration for one TIN-X scoring run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TinxConfig {
    /// JensenLab protein mentions (`human_textmining_mentions.tsv`)
    pub protein_file: PathBuf,

    /// JensenLab disease mentions (`disease_textmining_mentions.tsv`)
    pub disease_file: PathBuf,

    /// Disease Ontology OBO file (`doid.obo`)
    pub ontology_file: PathBuf,

    /// Protein cross-reference table for the file-backed resolver
    pub xref_table: Option<PathBuf>,

    /// Directory receiving the four score files and the dataset manifest
    pub output_dir: PathBuf,

    /// Field delimiter of the output files
    pub delimiter: u8,

    /// Source identifier prefix of protein lines that get processed
    pub protein_prefix: String,

    /// Ontology identifier prefix of disease lines that get processed
    pub disease_prefix: String,

    /// Cross-reference type used when the primary key lookup finds nothing
    pub secondary_xref_type: String,

    /// Attempts per resolver call before the line counts as unresolved
    pub max_retries: u32,

    /// First retry delay; doubles on each further attempt
    pub retry_base_delay_ms: u64,

    /// Scoring threads (0 = one per core)
    pub worker_threads: usize,

    /// Lines between progress log messages
    pub progress_interval: u64,

    /// Draw a progress bar while scoring pairs
    pub show_progress: bool,

    /// Dataset name recorded in the manifest
    pub dataset_name: String,
}

impl Default for TinxConfig {
    fn default() -> Self {
        TinxConfig {
            protein_file: PathBuf::from("./data/JensenLab/human_textmining_mentions.tsv"),
            disease_file: PathBuf::from("./data/JensenLab/disease_textmining_mentions.tsv"),
            ontology_file: PathBuf::from("./data/DiseaseOntology/doid.obo"),
            xref_table: None,
            output_dir: PathBuf::from("./data/TIN-X"),
            delimiter: b'\t',
            protein_prefix: "ENSP".to_string(),
            disease_prefix: "DOID:".to_string(),
            secondary_xref_type: "Ensembl".to_string(),
            max_retries: 3,
            retry_base_delay_ms: 500,
            worker_threads: 0,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            show_progress: false,
            dataset_name: "TIN-X Data".to_string(),
        }
    }
}

impl TinxConfig {
    /// Create new config with builder pattern
    pub fn builder() -> TinxConfigBuilder {
        TinxConfigBuilder::default()
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(DATASET_MANIFEST_FILE)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if is_blank(&self.protein_file) {
            return Err(TinxError::config("Protein mentions file cannot be empty"));
        }

        if is_blank(&self.disease_file) {
            return Err(TinxError::config("Disease mentions file cannot be empty"));
        }

        if is_blank(&self.ontology_file) {
            return Err(TinxError::config("Disease Ontology file cannot be empty"));
        }

        if is_blank(&self.output_dir) {
            return Err(TinxError::config("Output directory cannot be empty"));
        }

        if self.protein_prefix.is_empty() || self.disease_prefix.is_empty() {
            return Err(TinxError::config("Mention line prefixes cannot be empty"));
        }

        if self.secondary_xref_type.is_empty() {
            return Err(TinxError::config("Secondary xref type cannot be empty"));
        }

        if self.max_retries == 0 {
            return Err(TinxError::config("Max retries must be at least 1"));
        }

        if self.progress_interval == 0 {
            return Err(TinxError::config("Progress interval must be greater than 0"));
        }

        if !self.delimiter.is_ascii() || self.delimiter == b'\n' || self.delimiter == b'"' {
            return Err(TinxError::config(format!(
                "Unusable output delimiter: {:?}",
                self.delimiter as char
            )));
        }

        Ok(())
    }
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

/// Parse a delimiter name or single character ("tab", "comma", ",", "\t")
pub fn parse_delimiter(value: &str) -> Result<u8> {
    match value {
        "tab" | "tsv" | "\\t" | "\t" => Ok(b'\t'),
        "comma" | "csv" => Ok(b','),
        other if other.len() == 1 && other.is_ascii() => Ok(other.as_bytes()[0]),
        other => Err(TinxError::config(format!("Invalid delimiter: {}", other))),
    }
}

/// Builder for TinxConfig
#[derive(Debug, Default)]
pub struct TinxConfigBuilder {
    protein_file: Option<PathBuf>,
    disease_file: Option<PathBuf>,
    ontology_file: Option<PathBuf>,
    xref_table: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    delimiter: Option<u8>,
    protein_prefix: Option<String>,
    disease_prefix: Option<String>,
    secondary_xref_type: Option<String>,
    max_retries: Option<u32>,
    retry_base_delay_ms: Option<u64>,
    worker_threads: Option<usize>,
    progress_interval: Option<u64>,
    show_progress: Option<bool>,
    dataset_name: Option<String>,
}

impl TinxConfigBuilder {
    pub fn protein_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.protein_file = Some(path.into());
        self
    }

    pub fn disease_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.disease_file = Some(path.into());
        self
    }

    pub fn ontology_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ontology_file = Some(path.into());
        self
    }

    pub fn xref_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.xref_table = Some(path.into());
        self
    }

    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn protein_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.protein_prefix = Some(prefix.into());
        self
    }

    pub fn disease_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.disease_prefix = Some(prefix.into());
        self
    }

    pub fn secondary_xref_type(mut self, xtype: impl Into<String>) -> Self {
        self.secondary_xref_type = Some(xtype.into());
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn retry_base_delay_ms(mut self, millis: u64) -> Self {
        self.retry_base_delay_ms = Some(millis);
        self
    }

    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    pub fn progress_interval(mut self, lines: u64) -> Self {
        self.progress_interval = Some(lines);
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = Some(show);
        self
    }

    pub fn dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = Some(name.into());
        self
    }

    pub fn build(self) -> TinxConfig {
        let default = TinxConfig::default();

        TinxConfig {
            protein_file: self.protein_file.unwrap_or(default.protein_file),
            disease_file: self.disease_file.unwrap_or(default.disease_file),
            ontology_file: self.ontology_file.unwrap_or(default.ontology_file),
            xref_table: self.xref_table.or(default.xref_table),
            output_dir: self.output_dir.unwrap_or(default.output_dir),
            delimiter: self.delimiter.unwrap_or(default.delimiter),
            protein_prefix: self.protein_prefix.unwrap_or(default.protein_prefix),
            disease_prefix: self.disease_prefix.unwrap_or(default.disease_prefix),
            secondary_xref_type: self
                .secondary_xref_type
                .unwrap_or(default.secondary_xref_type),
            max_retries: self.max_retries.unwrap_or(default.max_retries),
            retry_base_delay_ms: self
                .retry_base_delay_ms
                .unwrap_or(default.retry_base_delay_ms),
            worker_threads: self.worker_threads.unwrap_or(default.worker_threads),
            progress_interval: self.progress_interval.unwrap_or(default.progress_interval),
            show_progress: self.show_progress.unwrap_or(default.show_progress),
            dataset_name: self.dataset_name.unwrap_or(default.dataset_name),
        }
    }
}

// ============================================================================
// Environment Variable Support
// ============================================================================

impl TinxConfig {
    /// Load configuration from `TINX_*` environment variables
    pub fn from_env() -> Self {
        let default = TinxConfig::default();

        TinxConfig {
            protein_file: env_path("TINX_PROTEIN_FILE").unwrap_or(default.protein_file),
            disease_file: env_path("TINX_DISEASE_FILE").unwrap_or(default.disease_file),
            ontology_file: env_path("TINX_ONTOLOGY_FILE").unwrap_or(default.ontology_file),
            xref_table: env_path("TINX_XREF_TABLE"),
            output_dir: env_path("TINX_OUTDIR").unwrap_or(default.output_dir),
            delimiter: std::env::var("TINX_DELIMITER")
                .ok()
                .and_then(|s| parse_delimiter(&s).ok())
                .unwrap_or(default.delimiter),
            protein_prefix: std::env::var("TINX_PROTEIN_PREFIX")
                .unwrap_or(default.protein_prefix),
            disease_prefix: std::env::var("TINX_DISEASE_PREFIX")
                .unwrap_or(default.disease_prefix),
            secondary_xref_type: std::env::var("TINX_SECONDARY_XREF_TYPE")
                .unwrap_or(default.secondary_xref_type),
            max_retries: env_parse("TINX_MAX_RETRIES").unwrap_or(default.max_retries),
            retry_base_delay_ms: env_parse("TINX_RETRY_BASE_DELAY_MS")
                .unwrap_or(default.retry_base_delay_ms),
            worker_threads: env_parse("TINX_WORKER_THREADS").unwrap_or(default.worker_threads),
            progress_interval: env_parse("TINX_PROGRESS_INTERVAL")
                .unwrap_or(default.progress_interval),
            show_progress: env_parse("TINX_SHOW_PROGRESS").unwrap_or(default.show_progress),
            dataset_name: std::env::var("TINX_DATASET_NAME").unwrap_or(default.dataset_name),
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key).map(PathBuf::from)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TinxConfig::default();
        assert_eq!(config.protein_prefix, "ENSP");
        assert_eq!(config.disease_prefix, "DOID:");
        assert_eq!(config.secondary_xref_type, "Ensembl");
        assert_eq!(config.delimiter, b'\t');
        assert_eq!(config.max_retries, 3);
        assert!(config.xref_table.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = TinxConfig::builder()
            .output_dir("/tmp/tinx")
            .delimiter(b',')
            .max_retries(5)
            .worker_threads(4)
            .build();

        assert_eq!(config.output_dir, PathBuf::from("/tmp/tinx"));
        assert_eq!(config.delimiter, b',');
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.manifest_path(), PathBuf::from("/tmp/tinx/dataset.json"));
    }

    #[test]
    fn test_validate() {
        let config = TinxConfig::default();

        let mut invalid = config.clone();
        invalid.max_retries = 0;
        assert!(matches!(invalid.validate(), Err(TinxError::Config(_))));

        let mut invalid = config.clone();
        invalid.protein_prefix = String::new();
        assert!(invalid.validate().is_err());

        let mut invalid = config;
        invalid.delimiter = b'"';
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter("comma").unwrap(), b',');
        assert_eq!(parse_delimiter("|").unwrap(), b'|');
        assert!(parse_delimiter("::").is_err());
    }

    #[test]
    fn test_retry_base_delay() {
        let config = TinxConfig::builder().retry_base_delay_ms(250).build();
        assert_eq!(config.retry_base_delay(), Duration::from_millis(250));
    }
}
