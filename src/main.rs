mod config;
mod fetch;
mod normalize;
mod output;
mod parser;
mod pipeline;
mod project;
mod row;
mod tables;
mod urls;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::RunOptions;
use fetch::Fetcher;
use output::{JsonArrayWriter, NdjsonWriter};

#[derive(Parser)]
#[command(
    name = "dabimas_factor",
    about = "Build dabimasFactor.json from dabimas.jp stallion and broodmare pages"
)]
struct Cli {
    /// Output JSON path
    #[arg(long, default_value = config::DEFAULT_OUTPUT)]
    output: PathBuf,
    /// Also write sparse ALL-sheet rows as NDJSON
    #[arg(long)]
    all_output: Option<PathBuf>,
    /// Read detail URLs from a file (one per line, absolute or /kouryaku/...)
    #[arg(long)]
    urls_file: Option<PathBuf>,
    /// Only process the first N URLs (0 = all)
    #[arg(short = 'n', long, default_value_t = 0)]
    limit: usize,
    /// Concurrent fetches
    #[arg(long, default_value_t = config::DEFAULT_WORKERS)]
    workers: usize,
    /// Seconds to wait after each page
    #[arg(long, default_value_t = config::DEFAULT_DELAY_SECS)]
    delay: f64,
    /// HTTP timeout in seconds
    #[arg(long, default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    timeout: f64,
    /// HTTP attempts per page
    #[arg(long, default_value_t = config::DEFAULT_RETRIES)]
    retries: u32,
    /// Log progress every N written entries (0 = off)
    #[arg(long, default_value_t = config::DEFAULT_PROGRESS)]
    progress: usize,
    /// Exit with status 1 if any page failed to fetch
    #[arg(long)]
    fail_on_error: bool,
    /// Stallion icon URL to exclude below max rarity (repeatable)
    #[arg(long = "skip-icon", value_name = "URL")]
    skip_icons: Vec<String>,
}

impl From<Cli> for RunOptions {
    fn from(cli: Cli) -> Self {
        let defaults = RunOptions::default();
        RunOptions {
            output: cli.output,
            all_output: cli.all_output,
            urls_file: cli.urls_file,
            limit: cli.limit,
            workers: cli.workers.max(1),
            delay: config::secs(cli.delay, defaults.delay),
            timeout: config::secs(cli.timeout, defaults.timeout),
            retries: cli.retries,
            progress: cli.progress,
            fail_on_error: cli.fail_on_error,
            skip_icons: cli.skip_icons.into_iter().collect(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_logging();

    let t0 = Instant::now();
    let opts = RunOptions::from(Cli::parse());
    let fetcher = Arc::new(Fetcher::new(opts.timeout, opts.retries)?);

    let mut urls = match &opts.urls_file {
        Some(path) => urls::load_urls_file(path)?,
        None => urls::collect_subject_urls(fetcher.as_ref()).await?,
    };
    if opts.limit > 0 {
        urls.truncate(opts.limit);
    }

    println!("target urls: {}", urls.len());
    println!("output: {}", opts.output.display());
    println!("workers: {}", opts.workers());
    if let Some(path) = &opts.urls_file {
        println!("urls-file: {}", path.display());
    }
    if let Some(path) = &opts.all_output {
        println!("all-output: {}", path.display());
    }

    let mut out = JsonArrayWriter::start(output::create_file(&opts.output)?)?;
    let mut all_out = match &opts.all_output {
        Some(path) => Some(NdjsonWriter::new(output::create_file(path)?)),
        None => None,
    };

    let stats = pipeline::run(fetcher, &urls, &opts, &mut out, all_out.as_mut()).await?;

    out.finish()?;
    if let Some(w) = all_out {
        w.finish()?;
    }

    info!(
        written = stats.written,
        skipped = stats.skipped,
        errors = stats.errors,
        "Build finished"
    );
    println!(
        "done: written={}, skipped={}, errors={}",
        stats.written, stats.skipped, stats.errors
    );

    println!("elapsed: {}", format_elapsed(t0.elapsed()));

    Ok(ExitCode::from(opts.exit_code(stats.errors)))
}

/// `RUST_LOG` wins; otherwise info, with the HTTP stack held to warnings.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn,html5ever=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Wall-clock time of a build, e.g. `0.4s`, `2m05s`, `1h02m05s`.
fn format_elapsed(d: Duration) -> String {
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, total / 60 % 60, total % 60);
    match (h, m) {
        (0, 0) => format!("{:.1}s", d.as_secs_f64()),
        (0, _) => format!("{}m{:02}s", m, s),
        _ => format!("{}h{:02}m{:02}s", h, m, s),
    }
}
