// Protein mention parser (human_textmining_mentions.tsv)

use super::{finish_pass, open_mentions, MentionLines, ParseStats, ProteinMentions};
use crate::resolve::{resolve_source_id, ProteinResolver};
use std::path::Path;
use tinx_common::Result;
use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct ProteinMentionParser<'a> {
    resolver: &'a dyn ProteinResolver,
    prefix: String,
    secondary_xref_type: String,
    progress_interval: u64,
}

impl<'a> ProteinMentionParser<'a> {
    pub fn new(resolver: &'a dyn ProteinResolver) -> Self {
        Self {
            resolver,
            prefix: "ENSP".to_string(),
            secondary_xref_type: "Ensembl".to_string(),
            progress_interval: crate::DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_secondary_xref_type(mut self, xtype: impl Into<String>) -> Self {
        self.secondary_xref_type = xtype.into();
        self
    }

    pub fn with_progress_interval(mut self, lines: u64) -> Self {
        self.progress_interval = lines;
        self
    }

    /// Parse a mentions file into a fresh index. A missing file gives an
    /// empty index.
    pub async fn parse_file(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<(ProteinMentions, ParseStats)> {
        let mut index = ProteinMentions::new();
        let stats = match open_mentions(path).await? {
            Some(reader) => {
                info!(path = %path.display(), "Parsing protein mentions");
                self.parse_reader(reader, &mut index, cancel).await?
            },
            None => ParseStats::default(),
        };
        Ok((index, stats))
    }

    /// Accumulate every qualifying line of `reader` into `index`.
    ///
    /// Each line's source id is resolved through the primary STRING id and
    /// then the secondary xref. Every resolved protein is recorded with every
    /// paper on the line. Ids that resolve to nothing are collected in
    /// [`ParseStats::unresolved`]; lookup errors mark the line unresolved.
    pub async fn parse_reader<R>(
        &self,
        reader: R,
        index: &mut ProteinMentions,
        cancel: &CancellationToken,
    ) -> Result<ParseStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut stats = ParseStats::default();
        let mut lines = MentionLines::new(reader, &self.prefix, self.progress_interval, "protein");

        while let Some(mention) = lines.next_mention(&mut stats, cancel).await? {
            let resolved =
                resolve_source_id(self.resolver, &self.secondary_xref_type, &mention.source_id)
                    .await;

            match resolved {
                Ok(protein_ids) if protein_ids.is_empty() => {
                    stats.unresolved.insert(mention.source_id);
                },
                Ok(protein_ids) => {
                    stats.resolved_lines += 1;
                    for protein_id in protein_ids {
                        index.record(protein_id, &mention.pmids);
                    }
                },
                Err(e) => {
                    warn!(source_id = %mention.source_id, "Lookup failed, treating as unresolved: {}", e);
                    stats.lookup_failures += 1;
                    stats.unresolved.insert(mention.source_id);
                },
            }
        }

        finish_pass("protein", index, &mut stats);
        Ok(stats)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::resolve::XrefTableResolver;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use tinx_common::types::ProteinId;
    use tinx_common::TinxError;

    fn resolver() -> XrefTableResolver {
        XrefTableResolver::from_reader(
            "stringid\tENSP001\t5\nEnsembl\tENSP002\t6\nEnsembl\tENSP003\t7\nEnsembl\tENSP003\t8\n"
                .as_bytes(),
        )
        .unwrap()
    }

    async fn parse(input: &str, resolver: &dyn ProteinResolver) -> (ProteinMentions, ParseStats) {
        let mut index = ProteinMentions::new();
        let stats = ProteinMentionParser::new(resolver)
            .parse_reader(input.as_bytes(), &mut index, &CancellationToken::new())
            .await
            .unwrap();
        (index, stats)
    }

    #[tokio::test]
    async fn test_resolves_primary_and_secondary() {
        let resolver = resolver();
        let (index, stats) = parse(
            "#string_protein_id\tpmids\nENSP001\t10 11\nENSP002\t11\nENSP999\t12\n",
            &resolver,
        )
        .await;

        assert_eq!(index.papers(&5), Some(&BTreeSet::from([10, 11])));
        assert_eq!(index.papers(&6), Some(&BTreeSet::from([11])));
        assert_eq!(index.paper_count(11), Some(2.0));
        assert_eq!(index.paper_count(12), None);

        assert_eq!(stats.lines, 4);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.resolved_lines, 2);
        assert_eq!(stats.unresolved, BTreeSet::from(["ENSP999".to_string()]));
        assert_eq!(stats.summary(), (2, 2));
    }

    #[tokio::test]
    async fn test_one_source_id_many_proteins() {
        let resolver = resolver();
        let (index, _) = parse("ENSP003\t20\n", &resolver).await;

        assert_eq!(index.papers(&7), Some(&BTreeSet::from([20])));
        assert_eq!(index.papers(&8), Some(&BTreeSet::from([20])));
        assert_eq!(index.paper_count(20), Some(2.0));
    }

    #[tokio::test]
    async fn test_repeated_line_counts_again() {
        let resolver = resolver();
        let (index, _) = parse("ENSP001\t10\nENSP001\t10\n", &resolver).await;

        assert_eq!(index.papers(&5), Some(&BTreeSet::from([10])));
        assert_eq!(index.paper_count(10), Some(2.0));
    }

    #[tokio::test]
    async fn test_malformed_lines_are_counted() {
        let resolver = resolver();
        let (index, stats) = parse("ENSP001\nENSP001\t10 abc\nENSP001\t10\n", &resolver).await;

        assert_eq!(stats.malformed, 2);
        assert_eq!(index.paper_count(10), Some(1.0));
    }

    struct BrokenResolver;

    #[async_trait]
    impl ProteinResolver for BrokenResolver {
        async fn resolve_by_primary_key(&self, _: &str) -> Result<Vec<ProteinId>> {
            Err(TinxError::lookup("connection refused"))
        }

        async fn resolve_by_secondary_xref(&self, _: &str, _: &str) -> Result<Vec<ProteinId>> {
            Err(TinxError::lookup("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_lookup_errors_do_not_abort() {
        let (index, stats) = parse("ENSP001\t10\nENSP002\t11\n", &BrokenResolver).await;

        assert!(index.is_empty());
        assert_eq!(stats.lookup_failures, 2);
        assert_eq!(stats.unresolved.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_line() {
        let resolver = resolver();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut index = ProteinMentions::new();
        let result = ProteinMentionParser::new(&resolver)
            .parse_reader("ENSP001\t10\n".as_bytes(), &mut index, &cancel)
            .await;

        assert!(matches!(result, Err(TinxError::Cancelled)));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let resolver = resolver();
        let dir = tempfile::tempdir().unwrap();
        let (index, stats) = ProteinMentionParser::new(&resolver)
            .parse_file(&dir.path().join("absent.tsv"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(index.is_empty());
        assert_eq!(stats, ParseStats::default());
    }
}
