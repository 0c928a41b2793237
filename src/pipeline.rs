//! Three-buffer batched pipeline: read, hash, consume.
//!
//! # Structure
//!
//! Three worker threads rotate through three containers (A, B, C) in a
//! software-pipelined schedule driven by the calling thread:
//!
//! ```text
//! stage            1    2    3    4    5   ...   bc   bc+1  bc+2
//! worker 1 reads   A    B    C    A    B   ...   X     -     -
//! worker 2 hashes  -    A    B    C    A   ...   Y     X     -
//! worker 3 eats    -    -    A    B    C   ...   Z     Y     X
//! ```
//!
//! Worker `w` (1-indexed) is live in stage `k` iff `w <= k <= bc + w - 1`,
//! and touches container `(batch - 1) % 3` for its current batch. A container
//! is revisited only three stages later, after all three workers are done
//! with it.
//!
//! # Barrier protocol
//!
//! All rendezvous goes through the scheduler: each worker has a go/done gate
//! (mutex + condvar). Per stage the scheduler starts every live worker, then
//! waits for each one's done. Workers never signal each other. The stage
//! barrier gives every effect of stage `k` a happens-before edge to every
//! effect of stage `k + 1`, so container hand-off needs no per-container
//! locking for correctness.
//!
//! Exclusivity is still enforced: containers sit behind a `Mutex` acquired
//! with `try_lock`, and a failed acquire means two workers were scheduled
//! onto one container. That protocol violation has no safe recovery (the
//! peer of every later rendezvous may never arrive), so the worker aborts
//! the process with its distinct exit code.
//!
//! # Buffers and carry
//!
//! Each container's byte buffer holds `LC = L - 1` carry bytes followed by up
//! to `BS` fresh bytes, so shingles straddling a batch boundary see
//! contiguous input. The reader retains the tail of the buffer it just
//! filled as the next batch's carry; batch 1 gets an artificial all-zero
//! carry, and the consumer skips those first `LC` hash slots.

use std::process;
use std::sync::{Condvar, Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_utils::CachePadded;

use crate::affinity;
use crate::errors::ConfigError;
use crate::hash;
use crate::params::{Params, DV};
use crate::shuffle::ByteShuffle;

/// Bytes overwritten by the demo-string hook.
pub const DEMO_LEN: usize = 20;

/// Batch layout of one phase's input stream.
///
/// The plan covers `stream_len` hash slots (one per fresh byte); the first
/// `LC` slots of batch 1 are artificial-carry slots, so the consumer sees
/// exactly `stream_len - LC` real shingles.
#[derive(Clone, Copy, Debug)]
pub struct BatchPlan {
    stream_len: u64,
    bs: usize,
    batch_count: u64,
    last_batch_size: usize,
}

impl BatchPlan {
    /// Lays out `stream_len` bytes into batches of `BS`, the last one
    /// possibly partial. The pipeline needs at least three batches.
    pub fn new(stream_len: u64, params: &Params) -> Result<Self, ConfigError> {
        let bs = params.bs();
        let mut batch_count = stream_len / bs as u64;
        let rem = (stream_len % bs as u64) as usize;
        let last_batch_size = if rem > 0 {
            batch_count += 1;
            rem
        } else {
            bs
        };
        if batch_count < 3 {
            return Err(ConfigError::BatchCountTooSmall {
                batches: batch_count,
            });
        }
        Ok(Self {
            stream_len,
            bs,
            batch_count,
            last_batch_size,
        })
    }

    #[inline]
    pub fn stream_len(&self) -> u64 {
        self.stream_len
    }

    #[inline]
    pub fn batch_count(&self) -> u64 {
        self.batch_count
    }

    /// Size of batch `batch_id` (1-indexed).
    #[inline]
    pub fn batch_size(&self, batch_id: u64) -> usize {
        if batch_id == self.batch_count {
            self.last_batch_size
        } else {
            self.bs
        }
    }

    /// Number of completely full batches; anchors the demo-string batch ids.
    #[inline]
    pub fn full_batches(&self) -> u64 {
        self.stream_len / self.bs as u64
    }
}

/// Demo-string hook: overwrites a small, deterministic window of the shuffled
/// input with zeros so a known common substring exists in both streams.
///
/// A test aid, off in normal runs. The reference side zeroes the leading
/// [`DEMO_LEN`] bytes of one batch; the test side splits the window across a
/// batch boundary (trailing half, then leading half of the next batch).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemoHook {
    Off,
    Reference { batch: u64 },
    Test { batch: u64 },
}

impl DemoHook {
    fn apply(self, batch_id: u64, fresh: &mut [u8]) {
        match self {
            Self::Off => {}
            Self::Reference { batch } => {
                if batch_id == batch {
                    let n = DEMO_LEN.min(fresh.len());
                    fresh[..n].fill(0);
                }
            }
            Self::Test { batch } => {
                let half = DEMO_LEN / 2;
                if batch_id == batch {
                    let n = half.min(fresh.len());
                    let start = fresh.len() - n;
                    fresh[start..].fill(0);
                } else if batch_id == batch + 1 {
                    let n = half.min(fresh.len());
                    fresh[..n].fill(0);
                }
            }
        }
    }
}

/// One rotating buffer set: the byte buffer plus the hash arrays filled from
/// it.
struct Container {
    buf: Vec<u8>,
    com: Vec<u64>,
    div: Vec<u8>,
}

impl Container {
    fn new(params: &Params) -> Self {
        Self {
            buf: vec![0u8; params.bs() + params.lc()],
            com: vec![0u64; params.bs()],
            div: vec![0u8; params.bs() * DV],
        }
    }
}

/// Sink for the hashed shingles of each batch.
///
/// `com` holds one common hash per shingle and `div` the matching `DV`
/// diversified hashes per shingle. Scatter marks the map; gather checks it
/// and feeds the run detector. The consumer runs on a worker thread, one
/// batch at a time, in stream order.
pub trait BatchConsumer: Send {
    fn consume(&mut self, com: &[u64], div: &[u8]);
}

/// Go/done rendezvous between the scheduler and one worker.
struct StageGate {
    state: Mutex<GateState>,
    cv: Condvar,
}

#[derive(Default)]
struct GateState {
    go: bool,
    done: bool,
}

impl StageGate {
    fn new() -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            cv: Condvar::new(),
        }
    }

    /// Scheduler side: release the worker into its next batch.
    fn start(&self) {
        let mut st = self.state.lock().expect("gate mutex poisoned");
        st.go = true;
        self.cv.notify_all();
    }

    /// Scheduler side: wait for the worker's end-of-batch signal.
    fn wait_done(&self) {
        let mut st = self.state.lock().expect("gate mutex poisoned");
        while !st.done {
            st = self.cv.wait(st).expect("gate mutex poisoned");
        }
        st.done = false;
    }

    /// Worker side: block until the scheduler releases this stage.
    fn wait_start(&self) {
        let mut st = self.state.lock().expect("gate mutex poisoned");
        while !st.go {
            st = self.cv.wait(st).expect("gate mutex poisoned");
        }
        st.go = false;
    }

    /// Worker side: signal end of batch.
    fn finish(&self) {
        let mut st = self.state.lock().expect("gate mutex poisoned");
        st.done = true;
        self.cv.notify_all();
    }
}

/// Per-worker wall-clock split between waiting on the scheduler and working.
#[derive(Clone, Copy, Debug, Default)]
struct WorkerTiming {
    wait: Duration,
    busy: Duration,
}

/// Summary of one pipeline run.
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineStats {
    pub batches: u64,
    pub bytes: u64,
    pub read_wait: Duration,
    pub read_busy: Duration,
    pub hash_wait: Duration,
    pub hash_busy: Duration,
    pub consume_wait: Duration,
    pub consume_busy: Duration,
}

/// Shared inputs of a pipeline run.
pub struct PipelineConfig<'a> {
    pub params: &'a Params,
    pub plan: &'a BatchPlan,
    pub shuffle: &'a ByteShuffle,
    pub demo: DemoHook,
    /// Cores for the read/hash/consume workers; `None` leaves placement to
    /// the OS.
    pub pin_cores: Option<[usize; 3]>,
}

/// Container owning batch `batch_id` (1-indexed): A, B, C, A, ...
#[inline]
fn container_index(batch_id: u64) -> usize {
    ((batch_id - 1) % 3) as usize
}

/// Whether worker `w` (0-indexed) runs a batch in stage `stage`.
#[inline]
fn worker_live(w: u64, stage: u64, batch_count: u64) -> bool {
    stage > w && stage <= batch_count + w
}

/// Acquires a container, aborting on the busy-flag invariant violation.
fn acquire<'a>(container: &'a Mutex<Container>, worker: u8) -> MutexGuard<'a, Container> {
    match container.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::WouldBlock) => {
            eprintln!("worker{worker}: container busy, stage protocol violated");
            process::exit(19 + i32::from(worker));
        }
        Err(TryLockError::Poisoned(_)) => {
            eprintln!("worker{worker}: container poisoned, stage protocol violated");
            process::exit(19 + i32::from(worker));
        }
    }
}

fn pin_if_requested(pin: Option<usize>, worker: u8) {
    if let Some(core) = pin {
        if let Err(err) = affinity::pin_current_thread_to_core(core) {
            eprintln!("worker{worker}: pin to core {core} failed: {err}");
        }
    }
}

/// Worker 1: fills containers with carry + shuffled fresh input.
fn read_worker(
    config: &PipelineConfig<'_>,
    input: &[u8],
    containers: &[Mutex<Container>; 3],
    gate: &StageGate,
) -> WorkerTiming {
    pin_if_requested(config.pin_cores.map(|c| c[0]), 1);
    let lc = config.params.lc();
    let plan = config.plan;
    let mut timing = WorkerTiming::default();
    // Artificial all-zero carry for batch 1; the consumer skips its shingles.
    let mut carry = vec![0u8; lc];
    let mut offset = 0usize;

    for batch_id in 1..=plan.batch_count() {
        let idle = Instant::now();
        gate.wait_start();
        let started = Instant::now();
        timing.wait += started - idle;

        let batch_size = plan.batch_size(batch_id);
        let mut ctr = acquire(&containers[container_index(batch_id)], 1);
        ctr.buf[..lc].copy_from_slice(&carry);
        let fresh = &mut ctr.buf[lc..lc + batch_size];
        fresh.copy_from_slice(&input[offset..offset + batch_size]);
        offset += batch_size;
        // Carry bytes were already shuffled in their original batch.
        config.shuffle.apply_in_place(fresh);
        config.demo.apply(batch_id, fresh);
        carry.copy_from_slice(&ctr.buf[batch_size..batch_size + lc]);
        drop(ctr);

        timing.busy += started.elapsed();
        gate.finish();
    }
    timing
}

/// Worker 2: hashes every shingle slot of the container.
fn hash_worker(
    config: &PipelineConfig<'_>,
    containers: &[Mutex<Container>; 3],
    gate: &StageGate,
) -> WorkerTiming {
    pin_if_requested(config.pin_cores.map(|c| c[1]), 2);
    let plan = config.plan;
    let mut timing = WorkerTiming::default();

    for batch_id in 1..=plan.batch_count() {
        let idle = Instant::now();
        gate.wait_start();
        let started = Instant::now();
        timing.wait += started - idle;

        let n = plan.batch_size(batch_id);
        let mut ctr = acquire(&containers[container_index(batch_id)], 2);
        let Container { buf, com, div } = &mut *ctr;
        hash::hash_batch(buf, n, com, div, config.params);
        drop(ctr);

        timing.busy += started.elapsed();
        gate.finish();
    }
    timing
}

/// Worker 3: feeds the hashed shingles to the phase's consumer.
fn consume_worker<C: BatchConsumer>(
    config: &PipelineConfig<'_>,
    consumer: &mut C,
    containers: &[Mutex<Container>; 3],
    gate: &StageGate,
) -> WorkerTiming {
    pin_if_requested(config.pin_cores.map(|c| c[2]), 3);
    let plan = config.plan;
    let mut timing = WorkerTiming::default();
    // Batch 1 starts after the artificial-carry slots.
    let mut skip = config.params.lc();

    for batch_id in 1..=plan.batch_count() {
        let idle = Instant::now();
        gate.wait_start();
        let started = Instant::now();
        timing.wait += started - idle;

        let n = plan.batch_size(batch_id);
        let ctr = acquire(&containers[container_index(batch_id)], 3);
        consumer.consume(&ctr.com[skip..n], &ctr.div[skip * DV..n * DV]);
        skip = 0;
        drop(ctr);

        timing.busy += started.elapsed();
        gate.finish();
    }
    timing
}

/// Runs the full pipeline over `input`, feeding `consumer` with every real
/// shingle's hashes in stream order.
///
/// `input` must match the plan's stream length; the drivers validate file
/// sizes before building the plan, so this is an internal contract.
pub fn run<C: BatchConsumer>(
    config: &PipelineConfig<'_>,
    input: &[u8],
    consumer: &mut C,
) -> PipelineStats {
    let plan = config.plan;
    assert_eq!(
        input.len() as u64,
        plan.stream_len(),
        "input length must match the batch plan"
    );

    let containers: [Mutex<Container>; 3] = [
        Mutex::new(Container::new(config.params)),
        Mutex::new(Container::new(config.params)),
        Mutex::new(Container::new(config.params)),
    ];
    let gates: [CachePadded<StageGate>; 3] = [
        CachePadded::new(StageGate::new()),
        CachePadded::new(StageGate::new()),
        CachePadded::new(StageGate::new()),
    ];
    let batch_count = plan.batch_count();

    let (read_timing, hash_timing, consume_timing) = thread::scope(|scope| {
        let reader = scope.spawn(|| read_worker(config, input, &containers, &gates[0]));
        let hasher = scope.spawn(|| hash_worker(config, &containers, &gates[1]));
        let eater = scope.spawn(|| consume_worker(config, consumer, &containers, &gates[2]));

        // Stage loop: start every live worker, then collect their dones. The
        // prologue (stages 1, 2) and epilogue (bc+1, bc+2) fall out of the
        // liveness predicate.
        for stage in 1..=batch_count + 2 {
            for w in 0..3 {
                if worker_live(w, stage, batch_count) {
                    gates[w as usize].start();
                }
            }
            for w in 0..3 {
                if worker_live(w, stage, batch_count) {
                    gates[w as usize].wait_done();
                }
            }
        }

        (
            reader.join().expect("read worker panicked"),
            hasher.join().expect("hash worker panicked"),
            eater.join().expect("consume worker panicked"),
        )
    });

    PipelineStats {
        batches: batch_count,
        bytes: plan.stream_len(),
        read_wait: read_timing.wait,
        read_busy: read_timing.busy,
        hash_wait: hash_timing.wait,
        hash_busy: hash_timing.busy,
        consume_wait: consume_timing.wait,
        consume_busy: consume_timing.busy,
    }
}
