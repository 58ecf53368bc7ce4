//! TIN-X scores
//!
//! Pure computations over the parsed mention indexes. Nothing here performs
//! I/O or mutates the indexes.

pub mod importance;
pub mod novelty;

pub use importance::{build_thread_pool, rank_papers, PairScore, PairScorer, RankedPaper};
pub use novelty::{disease_novelty, novelty_of, protein_novelty};
