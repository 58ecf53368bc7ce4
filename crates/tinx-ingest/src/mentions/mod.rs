// JensenLab text-mining mention files
//
// Both mention files share one shape, one mention group per line:
//
//   <source_id>\t<pmid> <pmid> ...
//
// Protein lines are keyed by STRING/Ensembl protein ids (ENSP...) that must be
// resolved to warehouse protein ids. Disease lines are keyed directly by
// Disease Ontology ids (DOID:...).
//
// Parsing builds a MentionIndex per entity kind: the set of papers mentioning
// each entity plus, per paper, how many entities of that kind it mentions.

pub mod disease;
pub mod protein;

pub use disease::DiseaseMentionParser;
pub use protein::ProteinMentionParser;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tinx_common::types::{DiseaseId, Pmid, ProteinId};
use tinx_common::{Result, TinxError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Protein id -> papers, plus per-paper protein counts
pub type ProteinMentions = MentionIndex<ProteinId>;

/// DOID -> papers, plus per-paper disease counts
pub type DiseaseMentions = MentionIndex<DiseaseId>;

/// Mention sets and paper mention counts for one kind of entity.
///
/// Both halves are only ever updated together through [`MentionIndex::record`],
/// so every paper present in a mention set has a positive count.
#[derive(Debug, Clone)]
pub struct MentionIndex<K: Ord> {
    mentions: BTreeMap<K, BTreeSet<Pmid>>,
    paper_counts: HashMap<Pmid, f64>,
}

impl<K: Ord> Default for MentionIndex<K> {
    fn default() -> Self {
        Self {
            mentions: BTreeMap::new(),
            paper_counts: HashMap::new(),
        }
    }
}

impl<K: Ord> MentionIndex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `entity` is mentioned by every paper in `pmids` on one line.
    ///
    /// The entity's paper set is unioned (idempotent). Each paper's count is
    /// bumped by exactly 1.0 on every call, including repeats of a pair that
    /// an earlier line already recorded.
    pub fn record(&mut self, entity: K, pmids: &BTreeSet<Pmid>) {
        self.mentions
            .entry(entity)
            .or_default()
            .extend(pmids.iter().copied());

        for &pmid in pmids {
            *self.paper_counts.entry(pmid).or_insert(0.0) += 1.0;
        }
    }

    /// Papers mentioning `entity`
    pub fn papers(&self, entity: &K) -> Option<&BTreeSet<Pmid>> {
        self.mentions.get(entity)
    }

    /// Number of entities of this kind mentioned in `pmid`
    pub fn paper_count(&self, pmid: Pmid) -> Option<f64> {
        self.paper_counts.get(&pmid).copied()
    }

    /// Entities in ascending id order with their papers
    pub fn iter(&self) -> impl Iterator<Item = (&K, &BTreeSet<Pmid>)> {
        self.mentions.iter()
    }

    /// Distinct entities with at least one recorded line
    pub fn entity_count(&self) -> usize {
        self.mentions.len()
    }

    /// Distinct papers with a mention count
    pub fn paper_total(&self) -> usize {
        self.paper_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }
}

/// One qualifying mention line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionLine {
    pub source_id: String,
    pub pmids: BTreeSet<Pmid>,
}

/// Classification of a raw input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Mention(MentionLine),
    /// Header, comment, blank line, or another identifier namespace
    NonMatching,
    Malformed(String),
}

impl MentionLine {
    /// Classify a line against the expected source id prefix
    pub fn parse(line: &str, prefix: &str) -> LineKind {
        if !line.starts_with(prefix) {
            return LineKind::NonMatching;
        }

        let fields: Vec<&str> = line.trim_end().split('\t').collect();
        if fields.len() != 2 {
            return LineKind::Malformed(format!("expected 2 fields, got {}", fields.len()));
        }

        let source_id = fields[0].trim();
        let mut pmids = BTreeSet::new();
        for token in fields[1].split_whitespace() {
            match token.parse::<Pmid>() {
                Ok(pmid) => {
                    pmids.insert(pmid);
                },
                Err(_) => return LineKind::Malformed(format!("non-numeric PMID '{}'", token)),
            }
        }

        if pmids.is_empty() {
            return LineKind::Malformed("no PMIDs".to_string());
        }

        LineKind::Mention(MentionLine {
            source_id: source_id.to_string(),
            pmids,
        })
    }
}

/// Counters and diagnostics from one parse pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Lines read, including skipped ones
    pub lines: u64,

    /// Lines outside the expected namespace
    pub skipped: u64,

    /// Qualifying lines that could not be parsed
    pub malformed: u64,

    /// Qualifying lines whose id resolved to at least one entity
    pub resolved_lines: u64,

    /// Source ids that resolved to nothing
    pub unresolved: BTreeSet<String>,

    /// Lines dropped because the resolution backend kept failing
    pub lookup_failures: u64,

    /// Distinct entities in the index after the pass
    pub entities: usize,

    /// Distinct papers in the index after the pass
    pub papers: usize,
}

impl ParseStats {
    /// (distinct entities, distinct papers)
    pub fn summary(&self) -> (usize, usize) {
        (self.entities, self.papers)
    }
}

/// Open a mentions file. A missing file yields `None` after a warning.
pub(crate) async fn open_mentions(
    path: &Path,
) -> Result<Option<BufReader<tokio::fs::File>>> {
    match tokio::fs::File::open(path).await {
        Ok(file) => Ok(Some(BufReader::new(file))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "Mentions file not found, nothing to parse");
            Ok(None)
        },
        Err(e) => Err(e.into()),
    }
}

/// Next raw line without its terminator. Invalid UTF-8 is reported as
/// `Some(Err(()))` so the caller can count it as malformed.
pub(crate) async fn next_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> Result<Option<std::result::Result<String, ()>>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }

    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }

    Ok(Some(String::from_utf8(buf.clone()).map_err(|_| ())))
}

/// Qualifying mention lines from a reader. Skipped and malformed lines are
/// counted into the caller's [`ParseStats`] and never surface.
pub(crate) struct MentionLines<'a, R> {
    reader: R,
    buf: Vec<u8>,
    prefix: &'a str,
    progress_interval: u64,
    label: &'static str,
}

impl<'a, R: AsyncBufRead + Unpin> MentionLines<'a, R> {
    pub(crate) fn new(reader: R, prefix: &'a str, progress_interval: u64, label: &'static str) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            prefix,
            progress_interval,
            label,
        }
    }

    pub(crate) async fn next_mention(
        &mut self,
        stats: &mut ParseStats,
        cancel: &CancellationToken,
    ) -> Result<Option<MentionLine>> {
        loop {
            if cancel.is_cancelled() {
                info!(lines = stats.lines, "{} mention parsing cancelled", self.label);
                return Err(TinxError::Cancelled);
            }

            let Some(line) = next_line(&mut self.reader, &mut self.buf).await? else {
                return Ok(None);
            };
            stats.lines += 1;

            if self.progress_interval > 0 && stats.lines % self.progress_interval == 0 {
                info!("Processed {} lines of {} mentions", stats.lines, self.label);
            }

            let kind = match line {
                Ok(text) => MentionLine::parse(&text, self.prefix),
                Err(()) if self.buf.starts_with(self.prefix.as_bytes()) => {
                    LineKind::Malformed("invalid UTF-8".to_string())
                },
                Err(()) => LineKind::NonMatching,
            };

            match kind {
                LineKind::Mention(mention) => return Ok(Some(mention)),
                LineKind::NonMatching => stats.skipped += 1,
                LineKind::Malformed(reason) => {
                    stats.malformed += 1;
                    debug!(line = stats.lines, "Skipping malformed {} line: {}", self.label, reason);
                },
            }
        }
    }
}

/// Fill in index totals and report the pass
pub(crate) fn finish_pass<K: Ord>(label: &str, index: &MentionIndex<K>, stats: &mut ParseStats) {
    stats.entities = index.entity_count();
    stats.papers = index.paper_total();

    for source_id in &stats.unresolved {
        warn!(source_id = %source_id, "No {} found", label);
    }

    info!(
        lines = stats.lines,
        skipped = stats.skipped,
        malformed = stats.malformed,
        unresolved = stats.unresolved.len(),
        lookup_failures = stats.lookup_failures,
        "{} mentions: {} entities in {} papers",
        label,
        stats.entities,
        stats.papers
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn pmids(ids: &[Pmid]) -> BTreeSet<Pmid> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_parse_mention_line() {
        let kind = MentionLine::parse("ENSP00000300161\t10 11 10\n", "ENSP");
        assert_eq!(
            kind,
            LineKind::Mention(MentionLine {
                source_id: "ENSP00000300161".to_string(),
                pmids: pmids(&[10, 11]),
            })
        );
    }

    #[test]
    fn test_parse_non_matching_lines() {
        assert_eq!(MentionLine::parse("# comment", "ENSP"), LineKind::NonMatching);
        assert_eq!(MentionLine::parse("", "ENSP"), LineKind::NonMatching);
        assert_eq!(MentionLine::parse("DOID:4\t1 2", "ENSP"), LineKind::NonMatching);
    }

    #[test]
    fn test_parse_malformed_lines() {
        assert!(matches!(MentionLine::parse("ENSP1", "ENSP"), LineKind::Malformed(_)));
        assert!(matches!(MentionLine::parse("ENSP1\t1 x2", "ENSP"), LineKind::Malformed(_)));
        assert!(matches!(MentionLine::parse("ENSP1\t", "ENSP"), LineKind::Malformed(_)));
        assert!(matches!(MentionLine::parse("ENSP1\t1\textra", "ENSP"), LineKind::Malformed(_)));
    }

    #[test]
    fn test_record_unions_sets_and_counts_every_call() {
        let mut index: MentionIndex<ProteinId> = MentionIndex::new();
        index.record(5, &pmids(&[10, 11]));
        index.record(5, &pmids(&[10, 11]));

        assert_eq!(index.papers(&5), Some(&pmids(&[10, 11])));
        assert_eq!(index.paper_count(10), Some(2.0));
        assert_eq!(index.paper_count(11), Some(2.0));
        assert_eq!(index.entity_count(), 1);
        assert_eq!(index.paper_total(), 2);
    }

    #[test]
    fn test_record_counts_distinct_entities_per_paper() {
        let mut index: MentionIndex<DiseaseId> = MentionIndex::new();
        index.record("DOID:1".to_string(), &pmids(&[7]));
        index.record("DOID:2".to_string(), &pmids(&[7, 8]));

        assert_eq!(index.paper_count(7), Some(2.0));
        assert_eq!(index.paper_count(8), Some(1.0));
        assert_eq!(index.paper_count(9), None);
    }

    #[tokio::test]
    async fn test_next_line_strips_terminators_and_flags_bad_utf8() {
        let data: &[u8] = b"a\r\nb\n\xff\xfe\nlast";
        let mut reader = data;
        let mut buf = Vec::new();

        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap(), Some(Ok("a".to_string())));
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap(), Some(Ok("b".to_string())));
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap(), Some(Err(())));
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap(), Some(Ok("last".to_string())));
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap(), None);
    }
}
