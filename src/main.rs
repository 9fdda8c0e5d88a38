//! doc-qa: ask a question about a document and stream the answer

use anyhow::Context;
use clap::Parser;
use doc_qa::context::{ChunkPolicy, QuestionPlacement};
use doc_qa::logging::init_tracing;
use doc_qa::metrics::METRICS;
use doc_qa::{ApiCredential, Config, ConsoleSink, Document, QaError, QaPipeline};
use std::path::PathBuf;
use tracing::warn;

/// Ask a question about a document and stream the model's answer
#[derive(Parser, Debug)]
#[command(name = "doc-qa", version, about, long_about = None)]
struct Cli {
    /// Document to ask about (.txt, .md or .docx)
    file: PathBuf,

    /// Question about the document
    #[arg(short, long)]
    question: String,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Truncate oversized input instead of splitting it
    #[arg(long)]
    truncate: bool,

    /// Repeat the question in every chunk
    #[arg(long)]
    every_chunk: bool,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    print_metrics: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress chunk headers
    #[arg(long)]
    quiet: bool,
}

/// Label errors caused by the submitted file or question
fn input_error(err: QaError) -> anyhow::Error {
    if err.is_input_error() {
        anyhow::anyhow!("invalid input: {}", err)
    } else {
        err.into()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.truncate {
        config.planner.policy = ChunkPolicy::Truncate;
    }
    if cli.every_chunk {
        config.planner.question_placement = QuestionPlacement::EveryChunk;
    }

    init_tracing(&config.logging, cli.verbose)?;

    // no key, no work
    let credential = ApiCredential::from_env(&config.completion.api_key_env)?;

    let bytes = tokio::fs::read(&cli.file)
        .await
        .with_context(|| format!("failed to read {}", cli.file.display()))?;
    let filename = cli
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let document = Document::from_upload(filename, bytes).map_err(input_error)?;

    let pipeline = QaPipeline::new(&config, credential)?;

    let cancel = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });

    let mut sink = ConsoleSink::new().quiet(cli.quiet);
    let report = pipeline
        .answer(&document, &cli.question, &mut sink)
        .await
        .map_err(input_error)?;

    if cli.print_metrics {
        eprintln!("{}", METRICS.render());
    }

    if report.all_failed() {
        anyhow::bail!("no chunk produced an answer ({} failed)", report.failed());
    }

    Ok(())
}
