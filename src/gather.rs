//! Gather phase: stream the test bytes through the stored map and report the
//! surviving runs.
//!
//! Reads bytes `[ns, ns + NS)` of the master file. The `L - 1` bytes before
//! `ns` belong to both streams, so reference shingles end exactly at
//! `ns - 1` and test shingles begin exactly at `ns` with no boundary loss.
//! Every test shingle is checked against all eight co-filters; the run
//! detector turns the verdict stream into `residue` and `max_count`.

use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use memmap2::Mmap;

use crate::detect::RunDetector;
use crate::errors::{MasterFileError, RunError};
use crate::map::{MapFile, PREFETCH_SHINGLES};
use crate::params::{Params, DV};
use crate::pipeline::{self, BatchConsumer, BatchPlan, DemoHook, PipelineConfig, PipelineStats};
use crate::shuffle::ByteShuffle;

/// Inputs of a gather run.
pub struct GatherConfig {
    pub master_path: PathBuf,
    pub map_path: PathBuf,
    /// Reference stream length `ns`: where the test stream starts.
    pub reference_len: u64,
    /// Test stream length `NS` in bytes.
    pub test_len: u64,
    pub demo: bool,
    pub pin_cores: Option<[usize; 3]>,
    pub params: Params,
}

/// Result summary of a gather run.
#[derive(Debug)]
pub struct GatherReport {
    /// Test shingles checked: `N = NS - L + 1`.
    pub shingles: u64,
    /// Shingles belonging to surviving runs spanning at least `LP` bytes.
    pub residue: u64,
    /// Longest run of consecutive surviving shingles.
    pub max_count: u64,
    /// Seed recovered from the map header.
    pub seed: u64,
    pub batches: u64,
    pub stats: PipelineStats,
    pub elapsed: Duration,
}

impl GatherReport {
    /// The core quality metric: `residue / N`.
    pub fn filtration_ratio(&self) -> f64 {
        self.residue as f64 / self.shingles as f64
    }
}

/// Checks every delivered shingle and feeds the run detector.
struct GatherConsumer<'a> {
    map: &'a MapFile,
    detector: RunDetector,
}

impl BatchConsumer for GatherConsumer<'_> {
    fn consume(&mut self, com: &[u64], div: &[u8]) {
        for (j, &c) in com.iter().enumerate() {
            if let Some(&ahead) = com.get(j + PREFETCH_SHINGLES) {
                self.map.prefetch(ahead);
            }
            let w = self.map.check(c, &div[j * DV..j * DV + DV]);
            self.detector.record(w == 0);
        }
    }
}

/// Runs gather: filters the test stream against a stored map.
pub fn run_gather(config: &GatherConfig) -> Result<GatherReport, RunError> {
    let params = &config.params;
    let plan = BatchPlan::new(config.test_len, params)?;

    let file = File::open(&config.master_path).map_err(MasterFileError::Open)?;
    let len = file.metadata().map_err(MasterFileError::Open)?.len();
    let need = config.reference_len + config.test_len;
    if len < need {
        return Err(MasterFileError::TooSmall { len, need }.into());
    }
    // SAFETY: read-only mapping; the master file is treated as immutable for
    // the duration of the run.
    let mmap = unsafe { Mmap::map(&file) }.map_err(MasterFileError::Mmap)?;
    let start_at = config.reference_len as usize;
    let input = &mmap[start_at..start_at + config.test_len as usize];

    let map = MapFile::load(&config.map_path, params)?;
    // Same seed, same permutation: the map only matches shingles shuffled
    // the way scatter shuffled them.
    let shuffle = ByteShuffle::from_seed(map.seed())?;
    let demo = if config.demo {
        DemoHook::Test {
            batch: plan.full_batches() / 3,
        }
    } else {
        DemoHook::Off
    };

    let mut consumer = GatherConsumer {
        map: &map,
        detector: RunDetector::new(params),
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
        &mut consumer,
    );
    let elapsed = start.elapsed();

    Ok(GatherReport {
        shingles: config.test_len - params.lc() as u64,
        residue: consumer.detector.residue(),
        max_count: consumer.detector.max_count(),
        seed: map.seed(),
        batches: plan.batch_count(),
        stats,
        elapsed,
    })
}
