// Disease mention parser (human_textmining_disease_mentions.tsv)

use super::{finish_pass, open_mentions, DiseaseMentions, MentionLines, ParseStats};
use crate::ontology::DiseaseOntology;
use std::path::Path;
use tinx_common::Result;
use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Disease lines are keyed by DOID directly. There is no fallback lookup: a
/// DOID missing from the ontology leaves its whole line unresolved.
pub struct DiseaseMentionParser<'a> {
    ontology: &'a DiseaseOntology,
    prefix: String,
    progress_interval: u64,
}

impl<'a> DiseaseMentionParser<'a> {
    pub fn new(ontology: &'a DiseaseOntology) -> Self {
        Self {
            ontology,
            prefix: "DOID:".to_string(),
            progress_interval: crate::DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_progress_interval(mut self, lines: u64) -> Self {
        self.progress_interval = lines;
        self
    }

    pub async fn parse_file(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<(DiseaseMentions, ParseStats)> {
        let mut index = DiseaseMentions::new();
        let stats = match open_mentions(path).await? {
            Some(reader) => {
                info!(path = %path.display(), "Parsing disease mentions");
                self.parse_reader(reader, &mut index, cancel).await?
            },
            None => ParseStats::default(),
        };
        Ok((index, stats))
    }

    pub async fn parse_reader<R>(
        &self,
        reader: R,
        index: &mut DiseaseMentions,
        cancel: &CancellationToken,
    ) -> Result<ParseStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut stats = ParseStats::default();
        let mut lines = MentionLines::new(reader, &self.prefix, self.progress_interval, "disease");

        while let Some(mention) = lines.next_mention(&mut stats, cancel).await? {
            if self.ontology.contains(&mention.source_id) {
                stats.resolved_lines += 1;
                index.record(mention.source_id, &mention.pmids);
            } else {
                stats.unresolved.insert(mention.source_id);
            }
        }

        finish_pass("disease", index, &mut stats);
        Ok(stats)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn ontology() -> DiseaseOntology {
        DiseaseOntology::parse(
            "[Term]\nid: DOID:99\nname: test disease\n\n[Term]\nid: DOID:4\nname: disease\n",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_known_terms_only() {
        let ontology = ontology();
        let mut index = DiseaseMentions::new();
        let stats = DiseaseMentionParser::new(&ontology)
            .parse_reader(
                "DOID:99\t11 12\nDOID:12345\t11\nENSP001\t11\nDOID:4\t12\n".as_bytes(),
                &mut index,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(index.papers(&"DOID:99".to_string()), Some(&BTreeSet::from([11, 12])));
        assert_eq!(index.paper_count(11), Some(1.0));
        assert_eq!(index.paper_count(12), Some(2.0));

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.unresolved, BTreeSet::from(["DOID:12345".to_string()]));
        assert_eq!(stats.summary(), (2, 2));
    }
}
