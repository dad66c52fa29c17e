//! Binary entry point for the subtitle translator and gap finder.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use srtpool_core::config::{
    default_workers, FailurePolicy, MergeMode, TranslateConfig, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_DELAY,
};
use srtpool_core::gaps::{detect_block_gaps, GapConfig, DEFAULT_GAP_THRESHOLD_SECS};
use srtpool_core::language::SIMPLIFIED_CHINESE;
use srtpool_core::srt;
use srtpool_core::translate::google::{GoogleTranslator, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use srtpool_core::translate::pool::TracingReporter;
use srtpool_core::translate::process_file;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command line options for the binary.
#[derive(Parser)]
struct Cli {
    /// Enable verbose debug and trace logs.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate every block of an SRT file.
    Translate(TranslateArgs),
    /// Report silences between consecutive blocks.
    Gaps(GapArgs),
}

#[derive(Args)]
struct TranslateArgs {
    /// Source language tag or alias.
    #[arg(long, default_value = "en")]
    from: String,

    /// Destination language tag or alias (zh, cn, chinese, simplified, traditional).
    #[arg(long, default_value = SIMPLIFIED_CHINESE)]
    to: String,

    /// Attempts per line before the failure policy applies.
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    retries: u32,

    /// Seconds to wait between attempts.
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY.as_secs())]
    retry_delay: u64,

    /// Number of concurrent workers. Defaults to the available CPUs.
    #[arg(long)]
    workers: Option<usize>,

    /// Drop blocks whose retries run out instead of keeping the original text.
    #[arg(long)]
    abort_on_failure: bool,

    /// Translate each block as one joined string instead of line by line.
    #[arg(long)]
    joined: bool,

    /// Translation endpoint base URL.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    endpoint: String,

    /// Where to write the result. Defaults to `<stem>_<lang>.srt` next to the input.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Path to the SRT file we want to translate.
    input: PathBuf,
}

#[derive(Args)]
struct GapArgs {
    /// Minimum silence in seconds worth reporting.
    #[arg(long, default_value_t = DEFAULT_GAP_THRESHOLD_SECS)]
    threshold: f64,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Path to the SRT file we want to scan.
    input: PathBuf,
}

impl TranslateArgs {
    /// Map flags onto the library configuration.
    fn config(&self) -> TranslateConfig {
        TranslateConfig {
            source_lang: self.from.clone(),
            dest_lang: self.to.clone(),
            max_retries: self.retries,
            retry_delay: Duration::from_secs(self.retry_delay),
            workers: self.workers.unwrap_or_else(default_workers),
            on_failure: if self.abort_on_failure {
                FailurePolicy::Abort
            } else {
                FailurePolicy::Fallback
            },
            mode: if self.joined {
                MergeMode::Joined
            } else {
                MergeMode::PerLine
            },
        }
    }
}

/// Translate a file and log the run summary.
async fn run_translate(args: TranslateArgs) -> Result<()> {
    let config = args.config();
    config.validate()?;
    let translator = GoogleTranslator::with_base_url(&args.endpoint, DEFAULT_TIMEOUT)?;
    let (out, summary) = process_file(
        &args.input,
        args.output.as_deref(),
        translator,
        &config,
        &TracingReporter,
    )
    .await?;
    info!(
        "processed {} blocks into {} ({} degraded, {} failed, {} duplicates skipped)",
        summary.total_blocks,
        out.display(),
        summary.degraded.len(),
        summary.failures.len(),
        summary.duplicates.len()
    );
    Ok(())
}

/// Scan a file for silences and print what was found.
fn run_gaps(args: GapArgs) -> Result<()> {
    let config = GapConfig {
        threshold_seconds: args.threshold,
    };
    config.validate()?;
    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let blocks = srt::parse(&content);
    let scan = detect_block_gaps(&blocks, &config);
    for (pair, err) in &scan.errors {
        warn!("skipping pair {}: {}", pair, err);
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&scan.gaps)?);
    } else {
        for gap in &scan.gaps {
            println!(
                "{} -> {} ({:.3}s)",
                gap.previous_end, gap.next_start, gap.duration_seconds
            );
        }
    }
    info!(
        "scanned {} blocks: {} gaps, {} unparsable pairs",
        blocks.len(),
        scan.gaps.len(),
        scan.errors.len()
    );
    Ok(())
}

/// Application entry point which parses CLI args and performs actions.
/// This function should initialize logging and delegate to the core library.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = if cli.debug {
        EnvFilter::default()
            .add_directive("srtpool=trace".parse()?)
            .add_directive("srtpool_core=trace".parse()?)
            .add_directive("info".parse()?)
    } else {
        EnvFilter::default()
            .add_directive("srtpool=info".parse()?)
            .add_directive("srtpool_core=info".parse()?)
            .add_directive("warn".parse()?)
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    match cli.command {
        Command::Translate(args) => run_translate(args).await,
        Command::Gaps(args) => run_gaps(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_flags_onto_config() {
        let cli = Cli::parse_from([
            "srtpool",
            "translate",
            "--to",
            "traditional",
            "--workers",
            "3",
            "--abort-on-failure",
            "in.srt",
        ]);
        let Command::Translate(args) = cli.command else {
            panic!("expected translate");
        };
        let config = args.config();
        assert_eq!(config.workers, 3);
        assert_eq!(config.dest_lang, "traditional");
        assert_eq!(config.on_failure, FailurePolicy::Abort);
        assert_eq!(config.mode, MergeMode::PerLine);
        assert_eq!(config.resolved().dest_lang, "zh-TW");
    }

    #[test]
    fn retry_flags_default_to_library_values() {
        let cli = Cli::parse_from(["srtpool", "translate", "in.srt"]);
        let Command::Translate(args) = cli.command else {
            panic!("expected translate");
        };
        let config = args.config();
        assert_eq!(config.retry_delay, DEFAULT_RETRY_DELAY);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.on_failure, FailurePolicy::Fallback);
    }

    #[test]
    fn gap_threshold_defaults_to_ten_seconds() {
        let cli = Cli::parse_from(["srtpool", "gaps", "in.srt"]);
        let Command::Gaps(args) = cli.command else {
            panic!("expected gaps");
        };
        assert_eq!(args.threshold, 10.0);
        assert!(!args.json);
    }
}
