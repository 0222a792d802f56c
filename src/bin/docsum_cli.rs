use std::{fs, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use docsum::{
    config::{ChunkingUnit, Config},
    extraction, logging,
    processing::SummaryService,
};

#[derive(Parser)]
#[command(
    name = "docsum-cli",
    about = "Summarize a pdf, docx, pptx, txt, or md file with the configured provider"
)]
struct Cli {
    /// Document to summarize.
    path: PathBuf,
    /// Model selector (defaults to SUMMARIZATION_DEFAULT_MODEL).
    #[arg(long)]
    model: Option<String>,
    /// Chunking unit: words, characters, or tokens.
    #[arg(long)]
    unit: Option<String>,
    /// Chunk size in the chosen unit.
    #[arg(long)]
    chunk_size: Option<usize>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    logging::init_stderr_tracing();

    let mut config = Config::from_env().context("Failed to load config from environment")?;
    apply_overrides(&mut config, &cli)?;

    let file_name = cli
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .context("Input path has no file name")?
        .to_string();
    let bytes =
        fs::read(&cli.path).with_context(|| format!("Failed to read {}", cli.path.display()))?;
    let text = extraction::extract_text(&file_name, &bytes)
        .with_context(|| format!("Failed to extract text from {file_name}"))?;

    let service =
        SummaryService::from_config(&config).context("Failed to build summarization service")?;
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let outcome = runtime
        .block_on(service.summarize(&text, cli.model.as_deref()))
        .context("Summarization failed")?;

    println!("{}", outcome.summary);
    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    let unit = match &cli.unit {
        Some(raw) => match raw.parse::<ChunkingUnit>() {
            Ok(unit) => Some(unit),
            Err(()) => {
                bail!("unknown chunking unit '{raw}' (expected words, characters, or tokens)")
            }
        },
        None => None,
    };
    config
        .override_chunking(unit, cli.chunk_size)
        .context("Invalid configuration after applying flags")?;
    Ok(())
}
