//! bulkstream — streams generated documents into a bulk endpoint.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use bulkstream_core::BulkstreamConfig;

mod cmd;

#[derive(Parser)]
#[command(
    name = "bulkstream",
    version,
    about = "Stream bulk actions into a search cluster in size-bounded chunks"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drop the index, stream generated documents, then verify the count
    Run(RunArgs),
    /// Count documents in the index
    Count(TargetArgs),
    /// Delete the index if it exists
    Drop(TargetArgs),
    /// Print the effective configuration, writing the default file if missing
    Config(RunArgs),
}

#[derive(Args)]
struct TargetArgs {
    /// Bulk API base URL
    #[arg(long)]
    url: Option<String>,
    /// Index name
    #[arg(long)]
    index: Option<String>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Mapping type written into action lines
    #[arg(long = "type")]
    doc_type: Option<String>,
    /// Number of random fields per document
    #[arg(long)]
    fields: Option<usize>,
    /// Number of documents to stream
    #[arg(short = 'n', long = "docs")]
    docs: Option<u32>,
    /// Bytes to stream per chunk before committing
    #[arg(long = "max-size")]
    max_size: Option<usize>,
    /// File to mirror bulk request bodies into
    #[arg(long)]
    out: Option<PathBuf>,
}

impl TargetArgs {
    fn apply(self, config: &mut BulkstreamConfig) {
        if let Some(url) = self.url {
            config.target.url = url;
        }
        if let Some(index) = self.index {
            config.target.index = index;
        }
    }
}

impl RunArgs {
    fn apply(self, config: &mut BulkstreamConfig) {
        self.target.apply(config);
        if let Some(doc_type) = self.doc_type {
            config.target.doc_type = doc_type;
        }
        if let Some(fields) = self.fields {
            config.generator.fields = fields;
        }
        if let Some(docs) = self.docs {
            config.generator.docs = docs;
        }
        if let Some(max_size) = self.max_size {
            config.writer.max_chunk_size = max_size;
        }
        if let Some(out) = self.out {
            config.writer.debug_out = Some(out);
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = BulkstreamConfig::load().context("failed to load config")?;

    match cli.command {
        Command::Run(args) => {
            args.apply(&mut config);
            config.validate()?;
            cmd::run::cmd_run(&config).await
        }
        Command::Count(args) => {
            args.apply(&mut config);
            cmd::index::cmd_count(&config).await
        }
        Command::Drop(args) => {
            args.apply(&mut config);
            cmd::index::cmd_drop(&config).await
        }
        Command::Config(args) => {
            args.apply(&mut config);
            cmd::config::cmd_config(&config)
        }
    }
}
