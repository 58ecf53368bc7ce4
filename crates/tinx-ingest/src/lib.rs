//! TIN-X Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Target Importance and Novelty Explorer (TIN-X) scoring from JensenLab
//! text-mining mention files.
//!
//! # Pipeline
//!
//! - **mentions**: parse protein and disease mention TSVs into per-entity
//!   paper sets and per-paper mention counts
//! - **ontology**: Disease Ontology OBO term table used to validate DOIDs
//! - **resolve**: map STRING/Ensembl protein ids onto warehouse protein ids
//! - **scoring**: protein and disease novelty, protein-disease importance
//!   and per-pair PubMed article ranks
//! - **output** / **provenance**: delimited loader files and the dataset
//!   manifest
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tinx_ingest::{config::TinxConfig, pipeline::TinxPipeline, resolve::XrefTableResolver};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TinxConfig::from_env();
//!     let resolver = XrefTableResolver::from_file("./data/protein_xrefs.tsv").await?;
//!     let pipeline = TinxPipeline::new(config, Arc::new(resolver))?;
//!     let stats = pipeline.run(CancellationToken::new()).await?;
//!     println!("{} importance scores", stats.output.importance);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod mentions;
pub mod ontology;
pub mod output;
pub mod pipeline;
pub mod provenance;
pub mod resolve;
pub mod scoring;

/// Lines between progress log messages while reading mention files
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Proteins scored per parallel batch before results are flushed to the sink
pub const DEFAULT_PAIR_CHUNK_SIZE: usize = 512;
