//! Translation orchestration utilities.
//! This module wires subtitle parsing, the worker pool and output writing.

use crate::config::{FailurePolicy, MergeMode, TranslateConfig};
use crate::error::{ConfigError, JobFailure, ProviderError};
use crate::srt::{self, TimedBlock};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

pub mod google;
pub mod pool;

use pool::{run_pool, ProgressReporter};

/// Translates a piece of text between two languages.
/// Implementations are remote, slow and allowed to fail; callers retry.
#[async_trait]
pub trait Translator: Send + Sync + Clone {
    /// Translate `text` from `source` to `dest`.
    async fn translate(&self, text: &str, source: &str, dest: &str)
        -> Result<String, ProviderError>;
}

/// A block returned by a worker, with how many lines fell back to the original.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockOutcome {
    pub block: TimedBlock,
    pub fallback_lines: usize,
}

/// Call the translator until it succeeds or `max_retries` attempts are used.
/// The worker sleeps `retry_delay` between attempts, never after the last one.
async fn translate_with_retry<T: Translator>(
    translator: &T,
    text: &str,
    config: &TranslateConfig,
) -> Result<String, ProviderError> {
    let attempts = config.max_retries.max(1);
    let mut attempt = 1;
    loop {
        match translator
            .translate(text, &config.source_lang, &config.dest_lang)
            .await
        {
            Ok(translated) => return Ok(translated),
            Err(err) if attempt < attempts => {
                debug!("attempt {attempt}/{attempts} failed: {err}");
                tokio::time::sleep(config.retry_delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Translate one block, keeping its index and time range.
/// Blank lines are copied without a provider call. When retries run out the
/// failure policy decides between keeping the original text and failing the job.
pub async fn translate_block<T: Translator>(
    translator: &T,
    block: TimedBlock,
    config: &TranslateConfig,
) -> Result<BlockOutcome, JobFailure> {
    trace!("translate_block index={} lines={}", block.index, block.lines.len());
    match config.mode {
        MergeMode::PerLine => translate_lines(translator, block, config).await,
        MergeMode::Joined => translate_joined(translator, block, config).await,
    }
}

async fn translate_lines<T: Translator>(
    translator: &T,
    block: TimedBlock,
    config: &TranslateConfig,
) -> Result<BlockOutcome, JobFailure> {
    let mut lines = Vec::with_capacity(block.lines.len());
    let mut fallback_lines = 0;
    for line in &block.lines {
        let text = line.trim();
        if text.is_empty() {
            lines.push(line.clone());
            continue;
        }
        match translate_with_retry(translator, text, config).await {
            Ok(translated) => lines.push(format!("{translated}\n")),
            Err(source) => {
                let line = exhausted(&block, line, source, config)?;
                fallback_lines += 1;
                lines.push(line);
            }
        }
    }
    Ok(BlockOutcome {
        block: block.with_lines(lines),
        fallback_lines,
    })
}

async fn translate_joined<T: Translator>(
    translator: &T,
    block: TimedBlock,
    config: &TranslateConfig,
) -> Result<BlockOutcome, JobFailure> {
    let parts: Vec<&str> = block
        .lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    if parts.is_empty() {
        return Ok(BlockOutcome {
            block,
            fallback_lines: 0,
        });
    }
    let joined = parts.join(" ");
    match translate_with_retry(translator, &joined, config).await {
        Ok(translated) => Ok(BlockOutcome {
            block: block.with_lines(vec![format!("{translated}\n")]),
            fallback_lines: 0,
        }),
        Err(source) => {
            exhausted(&block, &joined, source, config)?;
            Ok(BlockOutcome {
                fallback_lines: parts.len(),
                block,
            })
        }
    }
}

/// Apply the failure policy to text whose retries are used up.
/// Returns the original line to keep, or the job failure to report.
fn exhausted(
    block: &TimedBlock,
    original: &str,
    source: ProviderError,
    config: &TranslateConfig,
) -> Result<String, JobFailure> {
    match config.on_failure {
        FailurePolicy::Fallback => {
            warn!(
                "block {} keeps untranslated text after {} attempts: {}",
                block.index, config.max_retries, source
            );
            Ok(original.to_string())
        }
        FailurePolicy::Abort => Err(JobFailure {
            index: block.index,
            attempts: config.max_retries.max(1),
            source,
        }),
    }
}

/// Accounting for one finished run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub total_blocks: usize,
    pub translated: usize,
    /// Blocks written with at least one untranslated line.
    pub degraded: Vec<u64>,
    /// Blocks missing from the output.
    pub failures: Vec<JobFailure>,
    /// Repeated indices that were not scheduled.
    pub duplicates: Vec<u64>,
}

impl RunSummary {
    /// Indices of the blocks that could not be translated.
    pub fn failed_indices(&self) -> Vec<u64> {
        self.failures.iter().map(|f| f.index).collect()
    }
}

/// Translate SRT text in memory and return the reassembled output.
/// Job failures are contained in the summary; only bad configuration errors out.
pub async fn translate_document<T>(
    content: &str,
    translator: T,
    config: &TranslateConfig,
    reporter: &dyn ProgressReporter,
) -> Result<(String, RunSummary), ConfigError>
where
    T: Translator + 'static,
{
    config.validate()?;
    let config = config.clone().resolved();
    let blocks = srt::parse(content);
    let total_blocks = blocks.len();
    info!("found {total_blocks} subtitle blocks");
    let outcome = run_pool(blocks, translator, &config, reporter).await;
    let summary = RunSummary {
        total_blocks,
        translated: outcome.completed.len(),
        degraded: outcome.degraded,
        failures: outcome.failures,
        duplicates: outcome.duplicates,
    };
    let output = srt::reassemble(outcome.completed.into_values());
    Ok((output, summary))
}

/// Build the default output path `<stem>_<dest>.srt` next to the input.
pub fn default_output_path(input: &Path, dest_lang: &str) -> PathBuf {
    input.with_file_name(format!(
        "{}_{}.srt",
        input.file_stem().unwrap_or_default().to_string_lossy(),
        dest_lang.replace('-', "_").to_lowercase()
    ))
}

/// Read an SRT file, translate it and write the result.
/// Unreadable input or unwritable output abort the run; failed blocks do not.
pub async fn process_file<T>(
    input: &Path,
    output: Option<&Path>,
    translator: T,
    config: &TranslateConfig,
    reporter: &dyn ProgressReporter,
) -> Result<(PathBuf, RunSummary)>
where
    T: Translator + 'static,
{
    trace!("process_file input={}", input.display());
    info!("reading subtitles from {}", input.display());
    let content = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let (text, summary) = translate_document(&content, translator, config, reporter).await?;
    let out_path = match output {
        Some(path) => path.to_path_buf(),
        None => default_output_path(input, &crate::language::resolve_language(&config.dest_lang)),
    };
    info!("writing output to {}", out_path.display());
    fs::write(&out_path, text)
        .with_context(|| format!("failed to write {}", out_path.display()))?;
    info!(
        "translation done: {} blocks, {} written, {} degraded, {} failed",
        summary.total_blocks,
        summary.translated,
        summary.degraded.len(),
        summary.failures.len()
    );
    if !summary.failures.is_empty() {
        warn!("blocks not translated: {:?}", summary.failed_indices());
    }
    Ok((out_path, summary))
}
