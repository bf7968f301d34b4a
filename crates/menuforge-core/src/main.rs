//! Menuforge CLI: run the pipeline over a proposal document

use anyhow::Context as _;
use clap::{value_parser, Arg, Command};
use menuforge_core::{
    ArtifactStore, CancelToken, FsArtifactStore, Orchestrator, RunConfig, RunStatus,
};
use menuforge_model::{ContentType, SourceDocument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Command::new("menuforge")
        .version(menuforge_core::VERSION)
        .about("Build a reviewed, interactive menu artifact from a strategy proposal")
        .arg(
            Arg::new("document")
                .required(true)
                .help("Path to the proposal document"),
        )
        .arg(
            Arg::new("content-type")
                .long("content-type")
                .default_value("text/markdown")
                .help("MIME type of the document"),
        )
        .arg(
            Arg::new("corpus")
                .long("corpus")
                .help("Grounding corpus identifier (defaults to a corpus derived from the document)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("TOML run configuration file"),
        )
        .arg(
            Arg::new("max-iterations")
                .long("max-iterations")
                .value_parser(value_parser!(u32))
                .help("Revision budget (required unless --config is given)"),
        )
        .arg(
            Arg::new("analysis-timeout-ms")
                .long("analysis-timeout-ms")
                .value_parser(value_parser!(u64))
                .help("Per-call analysis timeout (required unless --config is given)"),
        )
        .arg(
            Arg::new("review-timeout-ms")
                .long("review-timeout-ms")
                .value_parser(value_parser!(u64))
                .help("Per-call build/review timeout (required unless --config is given)"),
        )
        .arg(
            Arg::new("retry-limit")
                .long("retry-limit")
                .value_parser(value_parser!(u32))
                .help("Immediate retries per external call (required unless --config is given)"),
        )
        .arg(
            Arg::new("out-dir")
                .long("out-dir")
                .default_value("out")
                .help("Directory the final artifact is persisted into"),
        )
        .get_matches();

    // The iteration budget and timeouts are operator decisions; there are no
    // baked-in defaults.
    let config = match cli.get_one::<String>("config") {
        Some(path) => RunConfig::load(path)?,
        None => {
            let max_iterations = *cli
                .get_one::<u32>("max-iterations")
                .context("--max-iterations is required without --config")?;
            let analysis_timeout_ms = *cli
                .get_one::<u64>("analysis-timeout-ms")
                .context("--analysis-timeout-ms is required without --config")?;
            let review_timeout_ms = *cli
                .get_one::<u64>("review-timeout-ms")
                .context("--review-timeout-ms is required without --config")?;
            let retry_limit = *cli
                .get_one::<u32>("retry-limit")
                .context("--retry-limit is required without --config")?;
            RunConfig::new(
                max_iterations,
                analysis_timeout_ms,
                review_timeout_ms,
                retry_limit,
            )
        }
    };

    let document_path = cli.get_one::<String>("document").expect("required arg");
    let bytes = tokio::fs::read(document_path)
        .await
        .with_context(|| format!("cannot read document {document_path}"))?;
    let mime = cli.get_one::<String>("content-type").expect("defaulted");
    let content_type =
        ContentType::from_mime(mime).with_context(|| format!("unsupported content type {mime}"))?;
    let document = SourceDocument::new(bytes, content_type);

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    if let Some(corpus) = cli.get_one::<String>("corpus") {
        // External retrieval services resolve this; the built-in corpus is
        // always derived from the document itself.
        tracing::info!(corpus = %corpus, "grounding corpus requested");
    }

    let orchestrator = Orchestrator::new(config);
    match orchestrator.run(&document, &cancel).await {
        Ok(report) => {
            if let Some(artifact) = &report.artifact {
                let store =
                    FsArtifactStore::new(cli.get_one::<String>("out-dir").expect("defaulted"));
                let path = store.persist(artifact).await?;
                eprintln!("artifact written to {}", path.display());
            }
            println!("{}", serde_json::to_string_pretty(&report.summary)?);
            if report.summary.final_status == RunStatus::Exhausted {
                eprintln!(
                    "warning: iteration budget spent; {} defects unresolved",
                    report.summary.unresolved_defects.len()
                );
            }
            Ok(())
        }
        Err(error) => {
            if let Some(phase) = error.failed_phase() {
                eprintln!("run failed during {phase:?}: {error}");
            }
            Err(error.into())
        }
    }
}
