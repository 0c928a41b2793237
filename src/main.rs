use std::path::PathBuf;
use std::process;

use crossrep_rs::params::{self, Params};
use crossrep_rs::{master, run_gather, run_scatter, GatherConfig, ScatterConfig};

const DEFAULT_REFERENCE_LEN: u64 = 1_000_000_000;
const DEFAULT_TEST_LEN: u64 = 100_000_000;

fn usage() -> ! {
    eprintln!("usage: crossrep-rs <command> [options]");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  master   --out <path> [--len <bytes>] [--seed <u64>]");
    eprintln!("  scatter  --master <path> [--map-dir <dir>] [--ns <bytes>]");
    eprintln!("           [--seed <u64>] [--demo] [--pin <c1,c2,c3>] [--batch-size <bytes>]");
    eprintln!("  gather   --master <path> [--map-dir <dir>] [--ns <bytes>] [--test-len <bytes>]");
    eprintln!("           [--demo] [--pin <c1,c2,c3>] [--batch-size <bytes>]");
    process::exit(2);
}

fn parse_u64(flag: &str, value: Option<String>) -> u64 {
    match value.as_deref().map(str::parse) {
        Some(Ok(v)) => v,
        _ => {
            eprintln!("{flag} expects an unsigned integer");
            usage();
        }
    }
}

fn parse_pin(value: Option<String>) -> [usize; 3] {
    let parsed: Option<Vec<usize>> = value
        .as_deref()
        .map(|v| v.split(',').map(|c| c.parse().ok()).collect())
        .unwrap_or(None);
    match parsed.as_deref() {
        Some([a, b, c]) => [*a, *b, *c],
        _ => {
            eprintln!("--pin expects three comma-separated core indices");
            usage();
        }
    }
}

#[derive(Default)]
struct CommonArgs {
    master: Option<PathBuf>,
    map_dir: Option<PathBuf>,
    ns: Option<u64>,
    test_len: Option<u64>,
    seed: Option<u64>,
    demo: bool,
    pin: Option<[usize; 3]>,
    batch_size: Option<usize>,
    out: Option<PathBuf>,
    len: Option<u64>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> CommonArgs {
    let mut parsed = CommonArgs::default();
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--master" => parsed.master = args.next().map(PathBuf::from),
            "--map-dir" => parsed.map_dir = args.next().map(PathBuf::from),
            "--out" => parsed.out = args.next().map(PathBuf::from),
            "--ns" => parsed.ns = Some(parse_u64("--ns", args.next())),
            "--test-len" => parsed.test_len = Some(parse_u64("--test-len", args.next())),
            "--len" => parsed.len = Some(parse_u64("--len", args.next())),
            "--seed" => parsed.seed = Some(parse_u64("--seed", args.next())),
            "--batch-size" => {
                parsed.batch_size = Some(parse_u64("--batch-size", args.next()) as usize)
            }
            "--demo" => parsed.demo = true,
            "--pin" => parsed.pin = Some(parse_pin(args.next())),
            "--help" | "-h" => usage(),
            other => {
                eprintln!("unknown flag: {other}");
                usage();
            }
        }
    }
    parsed
}

fn build_params(args: &CommonArgs) -> Params {
    let bs = args.batch_size.unwrap_or(params::BATCH_SIZE);
    match Params::custom(params::L, params::LP, params::M_COM, params::M_DIV, bs) {
        Ok(p) => p,
        Err(err) => {
            eprintln!("crossrep-rs: {err}");
            process::exit(18);
        }
    }
}

fn main() {
    let mut args = std::env::args();
    let _exe = args.next();
    let Some(command) = args.next() else { usage() };

    match command.as_str() {
        "master" => {
            let parsed = parse_args(args);
            let Some(out) = parsed.out else {
                eprintln!("master requires --out");
                usage();
            };
            let len = parsed
                .len
                .unwrap_or(DEFAULT_REFERENCE_LEN + DEFAULT_TEST_LEN);
            let seed = parsed.seed.unwrap_or(0x1234_5678);
            eprintln!("master out={} len={} seed={:#x}", out.display(), len, seed);
            if let Err(err) = master::write_master(&out, len, seed) {
                eprintln!("crossrep-rs: can't write master file: {err}");
                process::exit(1);
            }
        }
        "scatter" => {
            let parsed = parse_args(args);
            let Some(master_path) = parsed.master.clone() else {
                eprintln!("scatter requires --master");
                usage();
            };
            let params = build_params(&parsed);
            let map_dir = parsed.map_dir.clone().unwrap_or_else(|| PathBuf::from("."));
            let map_path = map_dir.join(params.map_file_name());
            let ns = parsed.ns.unwrap_or(DEFAULT_REFERENCE_LEN);

            eprintln!(
                "scatter master={} map={} ns={} L={} BS={} M_COM={} M_DIV={}",
                master_path.display(),
                map_path.display(),
                ns,
                params.l(),
                params.bs(),
                params.m_com(),
                params.m_div()
            );

            let config = ScatterConfig {
                master_path,
                map_path,
                reference_len: ns,
                seed: parsed.seed,
                demo: parsed.demo,
                pin_cores: parsed.pin,
                params,
            };
            match run_scatter(&config) {
                Ok(report) => {
                    println!(
                        "scatter shingles={} batches={} seed={:#x} elapsed_ms={}",
                        report.shingles,
                        report.batches,
                        report.seed,
                        report.elapsed.as_millis()
                    );
                    print_worker_times(&report.stats);
                }
                Err(err) => {
                    eprintln!("crossrep-rs: {err}");
                    process::exit(err.exit_code());
                }
            }
        }
        "gather" => {
            let parsed = parse_args(args);
            let Some(master_path) = parsed.master.clone() else {
                eprintln!("gather requires --master");
                usage();
            };
            let params = build_params(&parsed);
            let map_dir = parsed.map_dir.clone().unwrap_or_else(|| PathBuf::from("."));
            let map_path = map_dir.join(params.map_file_name());
            let ns = parsed.ns.unwrap_or(DEFAULT_REFERENCE_LEN);
            let test_len = parsed.test_len.unwrap_or(DEFAULT_TEST_LEN);

            eprintln!(
                "gather master={} map={} ns={} NS={} L={} LP={} BS={} M_COM={} M_DIV={}",
                master_path.display(),
                map_path.display(),
                ns,
                test_len,
                params.l(),
                params.lp(),
                params.bs(),
                params.m_com(),
                params.m_div()
            );

            let l = params.l() as u64;
            let config = GatherConfig {
                master_path,
                map_path,
                reference_len: ns,
                test_len,
                demo: parsed.demo,
                pin_cores: parsed.pin,
                params,
            };
            match run_gather(&config) {
                Ok(report) => {
                    println!(
                        "gather shingles={} residue={} max_count={} longest_upper_bound={} \
                         filtration_ratio={:.9} elapsed_ms={}",
                        report.shingles,
                        report.residue,
                        report.max_count,
                        report.max_count + l - 1,
                        report.filtration_ratio(),
                        report.elapsed.as_millis()
                    );
                    print_worker_times(&report.stats);
                }
                Err(err) => {
                    eprintln!("crossrep-rs: {err}");
                    process::exit(err.exit_code());
                }
            }
        }
        _ => usage(),
    }
}

fn print_worker_times(stats: &crossrep_rs::pipeline::PipelineStats) {
    eprintln!(
        "workers read_wait_ms={} read_busy_ms={} hash_wait_ms={} hash_busy_ms={} \
         consume_wait_ms={} consume_busy_ms={}",
        stats.read_wait.as_millis(),
        stats.read_busy.as_millis(),
        stats.hash_wait.as_millis(),
        stats.hash_busy.as_millis(),
        stats.consume_wait.as_millis(),
        stats.consume_busy.as_millis()
    );
}
