// Disease Ontology OBO parser

use super::OntologyTerm;
use tinx_common::{Result, TinxError};
use tracing::{debug, info, warn};

pub struct OboParser;

impl OboParser {
    /// Parse the `[Term]` stanzas of an OBO document.
    ///
    /// Other stanza types (`[Typedef]`, `[Instance]`) and the header are skipped.
    /// A term without an id or name is logged and dropped.
    pub fn parse(content: &str) -> Result<Vec<OntologyTerm>> {
        let lines: Vec<&str> = content.lines().collect();
        let mut terms = Vec::new();
        let mut skipped = 0usize;
        let mut i = 0;

        debug!(lines = lines.len(), "Starting OBO parsing");

        while i < lines.len() {
            if lines[i].trim() == "[Term]" {
                match Self::parse_term_stanza(&lines, &mut i) {
                    Ok(term) => terms.push(term),
                    Err(e) => {
                        skipped += 1;
                        warn!("Failed to parse term stanza: {}", e);
                    },
                }
            } else {
                i += 1;
            }
        }

        info!("Parsed {} ontology terms ({} stanzas skipped)", terms.len(), skipped);
        Ok(terms)
    }

    fn parse_term_stanza(lines: &[&str], i: &mut usize) -> Result<OntologyTerm> {
        let start_line = *i + 1;
        *i += 1;

        let mut id: Option<String> = None;
        let mut name: Option<String> = None;
        let mut definition: Option<String> = None;
        let mut is_obsolete = false;

        while *i < lines.len() {
            let line = lines[*i].trim();

            if line.is_empty() || line.starts_with('[') {
                break;
            }

            if let Some((key, value)) = line.split_once(':') {
                let value = value.trim();
                match key.trim() {
                    "id" => id = Some(value.to_string()),
                    "name" => name = Some(value.to_string()),
                    "def" => definition = Some(Self::extract_quoted_text(value)),
                    "is_obsolete" => is_obsolete = value == "true",
                    _ => {},
                }
            }

            *i += 1;
        }

        let id = id.ok_or_else(|| {
            TinxError::parse(format!("[Term] at line {}: missing id", start_line))
        })?;
        let name = name.ok_or_else(|| {
            TinxError::parse(format!("[Term] {} at line {}: missing name", id, start_line))
        })?;

        Ok(OntologyTerm {
            id,
            name,
            definition,
            is_obsolete,
        })
    }

    /// `"text" [xrefs]` -> `text`
    fn extract_quoted_text(text: &str) -> String {
        if let Some(start) = text.find('"') {
            if let Some(end) = text[start + 1..].find('"') {
                return text[start + 1..start + 1 + end].to_string();
            }
        }
        text.to_string()
    }
}
