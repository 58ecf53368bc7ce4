//! File-backed protein resolver
//!
//! A three-column delimited dump of the warehouse id mappings:
//!
//! ```text
//! stringid    ENSP00000000233    1523
//! Ensembl     ENSP00000000412    88
//! ```
//!
//! Rows with xtype `stringid` are the protein table's primary STRING id.
//! Every other xtype is a cross-reference namespace. `UniProt` rows also
//! supply the accession used to label output rows.

use super::ProteinResolver;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tinx_common::types::ProteinId;
use tinx_common::{Result, TinxError};
use tracing::{debug, info};

/// xtype marking the primary STRING id column
pub const PRIMARY_XTYPE: &str = "stringid";

/// xtype marking the UniProt accession column
pub const UNIPROT_XTYPE: &str = "UniProt";

#[derive(Debug, Default, Clone)]
pub struct XrefTableResolver {
    primary: HashMap<String, Vec<ProteinId>>,
    xrefs: HashMap<(String, String), Vec<ProteinId>>,
    accessions: HashMap<ProteinId, String>,
}

impl XrefTableResolver {
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let resolver = Self::from_reader(bytes.as_slice())?;
        info!(
            path = %path.display(),
            primary = resolver.primary.len(),
            xrefs = resolver.xrefs.len(),
            "Loaded protein xref table"
        );
        Ok(resolver)
    }

    /// Parse a tab-delimited table. Blank lines and `#` comments are ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .comment(Some(b'#'))
            .flexible(true)
            .from_reader(reader);

        let mut resolver = Self::default();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            if record.len() == 1 && record[0].trim().is_empty() {
                continue;
            }
            if record.len() != 3 {
                return Err(TinxError::parse(format!(
                    "xref table row {}: expected 3 fields, got {}",
                    index + 1,
                    record.len()
                )));
            }

            let protein_id: ProteinId = record[2].trim().parse().map_err(|e| {
                TinxError::parse(format!("xref table row {}: bad protein id: {}", index + 1, e))
            })?;
            resolver.insert(record[0].trim(), record[1].trim(), protein_id);
        }

        debug!(
            primary = resolver.primary.len(),
            xrefs = resolver.xrefs.len(),
            "Parsed xref table"
        );
        Ok(resolver)
    }

    /// Add one mapping; duplicates are ignored. The first accession seen
    /// for a protein wins.
    pub fn insert(&mut self, xtype: &str, value: &str, protein_id: ProteinId) {
        if xtype == UNIPROT_XTYPE {
            self.accessions
                .entry(protein_id)
                .or_insert_with(|| value.to_string());
        }

        let ids = if xtype == PRIMARY_XTYPE {
            self.primary.entry(value.to_string()).or_default()
        } else {
            self.xrefs
                .entry((xtype.to_string(), value.to_string()))
                .or_default()
        };

        if !ids.contains(&protein_id) {
            ids.push(protein_id);
        }
    }
}

#[async_trait]
impl ProteinResolver for XrefTableResolver {
    async fn resolve_by_primary_key(&self, source_id: &str) -> Result<Vec<ProteinId>> {
        Ok(self.primary.get(source_id).cloned().unwrap_or_default())
    }

    async fn resolve_by_secondary_xref(&self, xtype: &str, value: &str) -> Result<Vec<ProteinId>> {
        Ok(self
            .xrefs
            .get(&(xtype.to_string(), value.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn uniprot_accession(&self, protein_id: ProteinId) -> Result<Option<String>> {
        Ok(self.accessions.get(&protein_id).cloned())
    }
}
