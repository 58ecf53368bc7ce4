// Fractional-allocation novelty
//
// Each paper splits one unit of evidence evenly among the entities of a kind
// it mentions. An entity's novelty is the reciprocal of the evidence it has
// collected: novelty(e) = 1 / sum(1 / count[p] for p in papers(e)).

use crate::mentions::{DiseaseMentions, MentionIndex, ProteinMentions};
use crate::ontology::DiseaseOntology;
use std::collections::BTreeSet;
use tinx_common::types::{DiseaseNoveltyRecord, Pmid, ProteinNoveltyRecord};
use tracing::{info, warn};

/// Novelty over `papers`, or `None` when no positive evidence exists
pub fn novelty_of<K: Ord>(index: &MentionIndex<K>, papers: &BTreeSet<Pmid>) -> Option<f64> {
    let evidence: f64 = papers
        .iter()
        .filter_map(|&pmid| index.paper_count(pmid))
        .filter(|&count| count > 0.0)
        .map(|count| 1.0 / count)
        .sum();

    if evidence > 0.0 && evidence.is_finite() {
        let novelty = 1.0 / evidence;
        novelty.is_finite().then_some(novelty)
    } else {
        None
    }
}

/// One novelty record per protein, in protein id order
pub fn protein_novelty(mentions: &ProteinMentions) -> Vec<ProteinNoveltyRecord> {
    let mut records = Vec::with_capacity(mentions.entity_count());

    for (&protein_id, papers) in mentions.iter() {
        match novelty_of(mentions, papers) {
            Some(score) => records.push(ProteinNoveltyRecord {
                protein_id,
                uniprot: None,
                score,
            }),
            None => warn!(protein_id, "Skipping protein novelty: no usable evidence"),
        }
    }

    info!("Computed novelty for {} proteins", records.len());
    records
}

/// One novelty record per disease, in DOID order, carrying the term name and
/// definition
pub fn disease_novelty(
    mentions: &DiseaseMentions,
    ontology: &DiseaseOntology,
) -> Vec<DiseaseNoveltyRecord> {
    let mut records = Vec::with_capacity(mentions.entity_count());

    for (doid, papers) in mentions.iter() {
        let Some(score) = novelty_of(mentions, papers) else {
            warn!(doid = %doid, "Skipping disease novelty: no usable evidence");
            continue;
        };

        let (name, summary) = match ontology.lookup(doid) {
            Some(term) => (term.name.clone(), term.definition.clone()),
            None => (String::new(), None),
        };

        records.push(DiseaseNoveltyRecord {
            doid: doid.clone(),
            name,
            summary,
            score,
        });
    }

    info!("Computed novelty for {} diseases", records.len());
    records
}
