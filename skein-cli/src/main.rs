//! skein - co-mention network extraction CLI
//!
//! Reads a JSONL corpus of tokenized, annotated documents, resolves
//! organization aliases, and writes an NPMI-weighted relatedness network as
//! XML on standard output.
//!
//! # Usage
//!
//! ```bash
//! # Build the network, caching the corpus index for later runs
//! skein --corpus corpus.jsonl comentions.xml aliases.xml > network.xml
//!
//! # Reuse the cache (the corpus is not re-read)
//! skein --corpus corpus.jsonl comentions.xml aliases.xml
//!
//! # Recompute even though the cache exists
//! skein --force-refresh --corpus corpus.jsonl comentions.xml aliases.xml
//!
//! # No cache paths: index and aliases stream to stdout alongside the graph
//! skein --corpus corpus.jsonl
//! ```

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use skein::{generate_network, read_corpus_jsonl, CachePaths};

/// Extract a weighted organization relatedness network from a text corpus.
#[derive(Debug, Parser)]
#[command(name = "skein", version, about)]
struct Cli {
    /// JSONL corpus: one tokenized, annotated document per line.
    #[arg(long, value_name = "FILE")]
    corpus: Option<PathBuf>,

    /// Recompute the corpus index even if both cache files exist.
    #[arg(long)]
    force_refresh: bool,

    /// Co-mentions cache file (omit to stream the index to stdout).
    #[arg(value_name = "CO_MENTIONS")]
    comentions: Option<PathBuf>,

    /// Aliases cache file (omit to stream the registry to stdout).
    #[arg(value_name = "ALIASES")]
    aliases: Option<PathBuf>,
}

fn run(cli: Cli) -> skein::Result<()> {
    let caches = CachePaths {
        comentions: cli.comentions.as_deref(),
        aliases: cli.aliases.as_deref(),
    };

    // The corpus is only read when the cache cannot be reused; an absent
    // --corpus with a warm cache is a valid invocation.
    let documents = match &cli.corpus {
        Some(path) => read_corpus_jsonl(path)?,
        None => Vec::new(),
    };

    let network = generate_network(&documents, caches, cli.force_refresh)?;

    let stdout = io::stdout();
    skein::codec::save_network(stdout.lock(), &network)?;
    println!();
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
