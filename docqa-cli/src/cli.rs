//! Command-line arguments and command dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use docqa_rag::{SourceLocation, VectorStore};
use tracing::info;

use crate::settings::Settings;
use crate::{backend, render, repl};

/// Ask questions about your documents.
#[derive(Debug, Parser)]
#[command(name = "docqa", version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Collection name (overrides COLLECTION_NAME)
    #[arg(long, global = true)]
    pub collection: Option<String>,

    /// Maximum chunk size in characters (overrides CHUNK_SIZE)
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks (overrides CHUNK_OVERLAP)
    #[arg(long, global = true)]
    pub chunk_overlap: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load, chunk, embed, and store documents
    Ingest {
        #[command(flatten)]
        sources: SourceArgs,
    },
    /// Answer one question
    Ask {
        /// The question
        question: String,

        /// Number of chunks to retrieve (overrides RETRIEVAL_K)
        #[arg(short, long)]
        k: Option<usize>,

        /// Print only the answer
        #[arg(long)]
        no_sources: bool,
    },
    /// Interactive question answering
    Chat {
        /// Number of chunks to retrieve (overrides RETRIEVAL_K)
        #[arg(short, long)]
        k: Option<usize>,

        /// Sources to ingest before the first question
        #[command(flatten)]
        sources: SourceArgs,
    },
    /// Delete the collection and everything in it
    Drop,
}

/// Where to ingest documents from. Every flag may be repeated.
#[derive(Debug, Default, Args)]
pub struct SourceArgs {
    /// Directory scanned recursively for .txt and .md files
    #[arg(long = "text-dir", value_name = "DIR")]
    pub text_dirs: Vec<PathBuf>,

    /// Directory scanned recursively for .pdf files
    #[arg(long = "pdf-dir", value_name = "DIR")]
    pub pdf_dirs: Vec<PathBuf>,

    /// Web page to fetch
    #[arg(long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// Single file (.txt, .md, or .pdf)
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,
}

impl SourceArgs {
    /// The requested sources, text directories first.
    pub fn locations(&self) -> Vec<SourceLocation> {
        self.text_dirs
            .iter()
            .map(SourceLocation::text_dir)
            .chain(self.pdf_dirs.iter().map(SourceLocation::pdf_dir))
            .chain(self.urls.iter().map(|url| SourceLocation::Url(url.clone())))
            .chain(self.files.iter().map(|path| SourceLocation::File(path.clone())))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.text_dirs.is_empty()
            && self.pdf_dirs.is_empty()
            && self.urls.is_empty()
            && self.files.is_empty()
    }
}

impl Cli {
    /// Apply command-line overrides to environment settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(collection) = &self.collection {
            settings.collection.clone_from(collection);
        }
        if let Some(size) = self.chunk_size {
            settings.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            settings.chunk_overlap = overlap;
        }
        match &self.command {
            Command::Ask { k: Some(k), .. } | Command::Chat { k: Some(k), .. } => {
                settings.top_k = *k;
            }
            _ => {}
        }
    }
}

/// Run the parsed command.
pub async fn run(cli: Cli, mut settings: Settings) -> anyhow::Result<()> {
    cli.apply(&mut settings);
    let collection = settings.collection.clone();

    match cli.command {
        Command::Ingest { sources } => {
            if sources.is_empty() {
                bail!("nothing to ingest: pass --text-dir, --pdf-dir, --url, or --file");
            }
            let pipeline =
                backend::pipeline(&settings, false).context("failed to configure pipeline")?;
            let report = pipeline.ingest_sources(&collection, &sources.locations()).await?;
            print!("{}", render::report(&report));
            if report.all_failed() {
                bail!("every source failed to ingest");
            }
        }
        Command::Ask { question, no_sources, .. } => {
            let pipeline =
                backend::pipeline(&settings, true).context("failed to configure pipeline")?;
            let answer = pipeline.ask(&collection, &question, settings.top_k).await?;
            print!("{}", render::answer(&answer, !no_sources));
        }
        Command::Chat { sources, .. } => {
            let pipeline =
                backend::pipeline(&settings, true).context("failed to configure pipeline")?;
            let pipeline = Arc::new(pipeline);
            repl::run(pipeline, &collection, settings.top_k, &sources.locations()).await?;
        }
        Command::Drop => {
            let store: Arc<dyn VectorStore> =
                backend::vector_store(&settings).context("failed to configure vector store")?;
            store.delete_collection(&collection).await?;
            info!(collection = %collection, "dropped collection");
            println!("Deleted collection '{collection}'.");
        }
    }
    Ok(())
}
