//! Disease Ontology term table
//!
//! Disease mention lines are only accepted for DOIDs present in this table,
//! and disease novelty rows carry the term's name and definition.

pub mod parser;

pub use parser::OboParser;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tinx_common::Result;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyTerm {
    pub id: String,
    pub name: String,
    pub definition: Option<String>,
    pub is_obsolete: bool,
}

/// DOID -> term
#[derive(Debug, Clone, Default)]
pub struct DiseaseOntology {
    terms: HashMap<String, OntologyTerm>,
}

impl DiseaseOntology {
    pub fn from_terms(terms: impl IntoIterator<Item = OntologyTerm>) -> Self {
        Self {
            terms: terms.into_iter().map(|term| (term.id.clone(), term)).collect(),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(Self::from_terms(OboParser::parse(content)?))
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let ontology = Self::parse(&content)?;
        info!(path = %path.display(), terms = ontology.len(), "Loaded Disease Ontology");
        Ok(ontology)
    }

    /// Term for a DOID. Obsolete terms are returned like any other.
    pub fn lookup(&self, term_id: &str) -> Option<&OntologyTerm> {
        self.terms.get(term_id)
    }

    pub fn contains(&self, term_id: &str) -> bool {
        self.terms.contains_key(term_id)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_includes_obsolete_terms() {
        let ontology = DiseaseOntology::parse(
            "[Term]\nid: DOID:99\nname: test disease\n\n[Term]\nid: DOID:7\nname: old\nis_obsolete: true\n",
        )
        .unwrap();

        assert_eq!(ontology.len(), 2);
        assert_eq!(ontology.lookup("DOID:99").unwrap().name, "test disease");
        assert!(ontology.lookup("DOID:7").unwrap().is_obsolete);
        assert!(ontology.lookup("DOID:1").is_none());
    }
}
