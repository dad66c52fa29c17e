//! Bounded worker pool for block translation.
//! Jobs finish in any order; the scheduler alone owns the result map and
//! reports progress through an injected `ProgressReporter`.

use super::{translate_block, BlockOutcome, Translator};
use crate::config::TranslateConfig;
use crate::error::{JobFailure, ProviderError};
use crate::srt::TimedBlock;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

/// Progress is reported every this many completed jobs, and once at the end.
pub const PROGRESS_INTERVAL: usize = 100;

/// Receives scheduler events. Called from the scheduler loop, never from workers.
pub trait ProgressReporter: Send + Sync {
    /// The pool is about to dispatch `total` jobs over `workers` workers.
    fn started(&self, total: usize, workers: usize);

    /// `done` of `total` jobs have returned.
    fn progress(&self, done: usize, total: usize);

    /// A job gave up after exhausting its retries.
    fn job_failed(&self, failure: &JobFailure);

    /// An index seen earlier in the input was not scheduled again.
    fn duplicate_skipped(&self, index: u64);

    /// Every job has returned or been given up on.
    fn finished(&self, outcome: &PoolOutcome);
}

/// Reporter that renders scheduler events as `tracing` logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn started(&self, total: usize, workers: usize) {
        info!("translating {total} blocks with {workers} workers");
    }

    fn progress(&self, done: usize, total: usize) {
        info!("completed {done}/{total} blocks");
    }

    fn job_failed(&self, failure: &JobFailure) {
        warn!("{failure}");
    }

    fn duplicate_skipped(&self, index: u64) {
        warn!("duplicate block index {index} skipped");
    }

    fn finished(&self, outcome: &PoolOutcome) {
        info!(
            "pool finished: {} completed, {} degraded, {} failed",
            outcome.completed.len(),
            outcome.degraded.len(),
            outcome.failures.len()
        );
    }
}

/// Everything the pool produced, keyed by block index.
#[derive(Debug, Default)]
pub struct PoolOutcome {
    pub completed: BTreeMap<u64, TimedBlock>,
    pub degraded: Vec<u64>,
    pub failures: Vec<JobFailure>,
    pub duplicates: Vec<u64>,
}

type JobResult = (u64, Result<BlockOutcome, JobFailure>);

/// Spawn a worker for one block onto the pool's join set.
fn spawn_job<T: Translator + 'static>(
    jobs: &mut JoinSet<JobResult>,
    block: TimedBlock,
    translator: T,
    config: Arc<TranslateConfig>,
) {
    jobs.spawn(async move {
        let index = block.index;
        let begin = Instant::now();
        let res = translate_block(&translator, block, &config).await;
        debug!("block {index} done in {} ms", begin.elapsed().as_millis());
        (index, res)
    });
}

/// Translate every block with at most `config.workers` jobs in flight.
/// A job is only spawned once an earlier one has returned. A failed job never
/// stops its siblings; duplicate indices are skipped and a worker that
/// vanishes without a result is recorded as a failure.
pub async fn run_pool<T>(
    blocks: Vec<TimedBlock>,
    translator: T,
    config: &TranslateConfig,
    reporter: &dyn ProgressReporter,
) -> PoolOutcome
where
    T: Translator + 'static,
{
    let workers = config.workers.max(1);
    trace!("run_pool blocks={} workers={}", blocks.len(), workers);
    let mut outcome = PoolOutcome::default();
    let mut pending: HashSet<u64> = HashSet::with_capacity(blocks.len());
    let shared = Arc::new(config.clone());

    let mut queue = Vec::with_capacity(blocks.len());
    for block in blocks {
        if !pending.insert(block.index) {
            reporter.duplicate_skipped(block.index);
            outcome.duplicates.push(block.index);
            continue;
        }
        queue.push(block);
    }
    let total = queue.len();
    reporter.started(total, workers.min(total.max(1)));

    let mut queue = queue.into_iter();
    let mut jobs = JoinSet::new();
    for block in queue.by_ref().take(workers) {
        spawn_job(&mut jobs, block, translator.clone(), shared.clone());
    }

    let mut done = 0;
    while let Some(joined) = jobs.join_next().await {
        done += 1;
        if let Some(block) = queue.next() {
            spawn_job(&mut jobs, block, translator.clone(), shared.clone());
        }
        match joined {
            Ok((index, Ok(BlockOutcome {
                block,
                fallback_lines,
            }))) => {
                pending.remove(&index);
                if fallback_lines > 0 {
                    outcome.degraded.push(index);
                }
                outcome.completed.insert(index, block);
            }
            Ok((index, Err(failure))) => {
                pending.remove(&index);
                reporter.job_failed(&failure);
                outcome.failures.push(failure);
            }
            // The index stays pending and is reported as lost below.
            Err(err) => warn!("worker task ended abnormally: {err}"),
        }
        if done % PROGRESS_INTERVAL == 0 || done == total {
            reporter.progress(done, total);
        }
    }

    let mut lost: Vec<u64> = pending.into_iter().collect();
    lost.sort_unstable();
    for index in lost {
        let failure = JobFailure {
            index,
            attempts: 0,
            source: ProviderError::Unavailable("worker exited without a result".into()),
        };
        reporter.job_failed(&failure);
        outcome.failures.push(failure);
    }
    outcome.degraded.sort_unstable();
    outcome.failures.sort_by_key(|f| f.index);
    reporter.finished(&outcome);
    outcome
}
