//! Scatter phase: stream the reference bytes and build the co-filter map.
//!
//! Reads bytes `[0, ns)` of the master file, pushes them through the
//! pipeline, and clears one presence bit per co-filter for every reference
//! shingle. The finished map (plus the shuffle seed) is persisted for
//! gather.

use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use memmap2::Mmap;

use crate::errors::{MasterFileError, RunError};
use crate::map::{CoFilterMap, PREFETCH_SHINGLES};
use crate::params::{Params, DV};
use crate::pipeline::{self, BatchConsumer, BatchPlan, DemoHook, PipelineConfig, PipelineStats};
use crate::shuffle::ByteShuffle;

/// Inputs of a scatter run.
pub struct ScatterConfig {
    pub master_path: PathBuf,
    pub map_path: PathBuf,
    /// Reference stream length `ns` in bytes.
    pub reference_len: u64,
    /// Shuffle seed; `None` seeds from the wall clock as the reference
    /// implementation does.
    pub seed: Option<u64>,
    pub demo: bool,
    pub pin_cores: Option<[usize; 3]>,
    pub params: Params,
}

/// Result summary of a scatter run.
#[derive(Debug)]
pub struct ScatterReport {
    /// Reference shingles marked in the map: `ns - (L - 1)`.
    pub shingles: u64,
    pub batches: u64,
    /// Seed persisted in the map header.
    pub seed: u64,
    pub stats: PipelineStats,
    pub elapsed: Duration,
}

/// Marks every delivered shingle in the map.
struct ScatterConsumer<'a> {
    map: &'a mut CoFilterMap,
}

impl BatchConsumer for ScatterConsumer<'_> {
    fn consume(&mut self, com: &[u64], div: &[u8]) {
        for (j, &c) in com.iter().enumerate() {
            if let Some(&ahead) = com.get(j + PREFETCH_SHINGLES) {
                self.map.prefetch(ahead);
            }
            self.map.mark(c, &div[j * DV..j * DV + DV]);
        }
    }
}

fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(1)
}

/// Runs scatter: builds the map from the reference stream and stores it.
pub fn run_scatter(config: &ScatterConfig) -> Result<ScatterReport, RunError> {
    let params = &config.params;
    let plan = BatchPlan::new(config.reference_len, params)?;

    let file = File::open(&config.master_path).map_err(MasterFileError::Open)?;
    let len = file.metadata().map_err(MasterFileError::Open)?.len();
    if len < config.reference_len {
        return Err(MasterFileError::TooSmall {
            len,
            need: config.reference_len,
        }
        .into());
    }
    // SAFETY: read-only mapping; the master file is treated as immutable for
    // the duration of the run.
    let mmap = unsafe { Mmap::map(&file) }.map_err(MasterFileError::Mmap)?;
    let input = &mmap[..config.reference_len as usize];

    let seed = config.seed.unwrap_or_else(seed_from_clock);
    let shuffle = ByteShuffle::from_seed(seed)?;
    let mut map = CoFilterMap::allocate(params, seed)?;
    let demo = if config.demo {
        DemoHook::Reference {
            batch: plan.full_batches() / 2,
        }
    } else {
        DemoHook::Off
    };

    let start = Instant::now();
    let stats = pipeline::run(
        &PipelineConfig {
            params,
            plan: &plan,
            shuffle: &shuffle,
            demo,
            pin_cores: config.pin_cores,
        },
        input,
        &mut ScatterConsumer { map: &mut map },
    );
    let elapsed = start.elapsed();

    map.store(&config.map_path)?;

    Ok(ScatterReport {
        shingles: config.reference_len - params.lc() as u64,
        batches: plan.batch_count(),
        seed,
        stats,
        elapsed,
    })
}
