//! TIN-X Ingest - novelty, importance and article-rank scoring tool

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tinx_common::checksum::verify_fingerprint;
use tinx_common::logging::{init_logging, LogConfig, LogLevel};
use tinx_ingest::config::{parse_delimiter, TinxConfig};
use tinx_ingest::pipeline::TinxPipeline;
use tinx_ingest::provenance::DatasetManifest;
use tinx_ingest::resolve::{ProteinResolver, XrefTableResolver};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tinx-ingest")]
#[command(author, version, about = "TIN-X scoring from JensenLab text-mining mentions")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute TIN-X scores and write the loader files
    Run(RunArgs),

    /// Check the input checksums recorded in a dataset manifest
    Verify {
        /// Path to dataset.json
        #[arg(short, long, default_value = "./data/TIN-X/dataset.json")]
        manifest: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// JensenLab protein mentions (human_textmining_mentions.tsv)
    #[arg(long, env = "TINX_PROTEIN_FILE")]
    protein_file: Option<PathBuf>,

    /// JensenLab disease mentions (disease_textmining_mentions.tsv)
    #[arg(long, env = "TINX_DISEASE_FILE")]
    disease_file: Option<PathBuf>,

    /// Disease Ontology OBO file
    #[arg(long, env = "TINX_ONTOLOGY_FILE")]
    ontology_file: Option<PathBuf>,

    /// Protein xref table (xtype, value, protein_id)
    #[arg(long, env = "TINX_XREF_TABLE")]
    xref_table: Option<PathBuf>,

    /// TCRD MySQL URL, used instead of an xref table
    #[cfg(feature = "database")]
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Output directory
    #[arg(short, long, env = "TINX_OUTDIR")]
    outdir: Option<PathBuf>,

    /// Output delimiter: tab, comma, or a single character
    #[arg(short, long, env = "TINX_DELIMITER")]
    delimiter: Option<String>,

    /// Scoring threads (0 = one per core)
    #[arg(long, env = "TINX_WORKER_THREADS")]
    workers: Option<usize>,

    /// Lookup attempts per protein id
    #[arg(long, env = "TINX_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Show a progress bar while scoring
    #[arg(long)]
    progress: bool,
}

impl RunArgs {
    fn into_config(self, mut config: TinxConfig) -> Result<TinxConfig> {
        if let Some(path) = self.protein_file {
            config.protein_file = path;
        }
        if let Some(path) = self.disease_file {
            config.disease_file = path;
        }
        if let Some(path) = self.ontology_file {
            config.ontology_file = path;
        }
        if let Some(path) = self.xref_table {
            config.xref_table = Some(path);
        }
        if let Some(dir) = self.outdir {
            config.output_dir = dir;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = parse_delimiter(&delimiter)?;
        }
        if let Some(workers) = self.workers {
            config.worker_threads = workers;
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if self.progress {
            config.show_progress = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("tinx-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Verify { manifest } => verify(&manifest),
    }
}

async fn run(args: RunArgs) -> Result<()> {
    #[cfg(feature = "database")]
    let database_url = args.database_url.clone();

    let config = args.into_config(TinxConfig::from_env())?;
    config.validate().context("Invalid TIN-X configuration")?;

    #[cfg(feature = "database")]
    let resolver: Arc<dyn ProteinResolver> = match database_url {
        Some(url) => Arc::new(
            tinx_ingest::resolve::MySqlResolver::connect(&url, 5)
                .await
                .context("Failed to connect to TCRD database")?,
        ),
        None => load_xref_table(&config).await?,
    };

    #[cfg(not(feature = "database"))]
    let resolver = load_xref_table(&config).await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    let pipeline = TinxPipeline::new(config, resolver)?;
    let stats = pipeline.run(cancel).await.context("TIN-X run failed")?;

    info!(
        proteins = stats.protein_mentions.entities,
        diseases = stats.disease_mentions.entities,
        uniprot_labelled = stats.uniprot_labelled,
        unresolved_proteins = stats.protein_mentions.unresolved.len(),
        unresolved_diseases = stats.disease_mentions.unresolved.len(),
        importance = stats.output.importance,
        article_ranks = stats.output.article_ranks,
        "TIN-X scoring complete"
    );
    Ok(())
}

async fn load_xref_table(config: &TinxConfig) -> Result<Arc<dyn ProteinResolver>> {
    let Some(path) = &config.xref_table else {
        bail!("No protein resolver configured: pass --xref-table or set TINX_XREF_TABLE");
    };

    let resolver = XrefTableResolver::from_file(path)
        .await
        .with_context(|| format!("Failed to load xref table {}", path.display()))?;
    Ok(Arc::new(resolver))
}

fn verify(manifest_path: &Path) -> Result<()> {
    let manifest = DatasetManifest::read_json(manifest_path)
        .with_context(|| format!("Failed to read manifest {}", manifest_path.display()))?;

    let mut failures = 0usize;
    for input in &manifest.inputs {
        match verify_fingerprint(input) {
            Ok(()) => info!(path = %input.path, "Checksum OK"),
            Err(e) => {
                warn!(path = %input.path, "Checksum verification failed: {}", e);
                failures += 1;
            },
        }
    }

    if failures > 0 {
        bail!("{} of {} inputs changed since {}", failures, manifest.inputs.len(), manifest.created_at);
    }

    info!("All {} inputs match {}", manifest.inputs.len(), manifest.name);
    Ok(())
}
