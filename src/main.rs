// SPDX-License-Identifier: Apache-2.0

//! Benchmark harness: reads `.truth` specifications, synthesizes an
//! initial XAG per benchmark, runs the optimizer to a fixed point, and
//! verifies the result by exhaustive simulation (plus the external `abc`
//! oracle when requested).
//!
//! Benchmarks are handed out to worker threads through an atomic counter;
//! each worker owns its network and engine state, and only the result
//! table is shared (behind a lock, never held across a core call).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use clap::Parser;

use xag8r::aiger::{AigerIo, NetworkIo};
use xag8r::optimize::{optimize, OptimizeOptions};
use xag8r::oracle::abc_cec;
use xag8r::sim::{simulate, simulate_outputs, PatternSet};
use xag8r::stats::get_summary_stats;
use xag8r::truth::read_truth;
use xag8r::truth2gate::truth2gate;

/// Resynthesizes `.truth` benchmarks into small XAG networks.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing `<name>.truth` benchmark files.
    #[arg(long, default_value = "benchmarks")]
    dir: String,

    /// Directory to write optimized networks to (ASCII AIGER); omitted
    /// means results are not persisted.
    #[arg(long)]
    out_dir: Option<String>,

    /// Also confirm each result with the external `abc` equivalence
    /// oracle.
    #[arg(long, default_value_t = false)]
    #[arg(action = clap::ArgAction::Set)]
    oracle: bool,

    /// Seed for the optimizer's pattern RNG.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Run only the benchmark with this stem (e.g. "ex03"); absent, all
    /// benchmarks run on all available hardware threads.
    benchmark: Option<String>,
}

struct ResultRow {
    name: String,
    initial_gates: usize,
    gates: usize,
    depth: usize,
}

fn run_one(path: &PathBuf, args: &Args) -> Result<ResultRow> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("?")
        .to_string();
    let spec = read_truth(path).map_err(|e| anyhow!(e))?;

    let initial = truth2gate(&spec, &name);
    let initial_stats = get_summary_stats(&initial);
    println!(
        "[i] processing {} ({} vars, {} outputs, {} initial gates)",
        name,
        spec.num_vars,
        spec.outputs.len(),
        initial_stats.live_gates
    );

    let opts = OptimizeOptions {
        seed: args.seed,
        ..OptimizeOptions::default()
    };
    let optimized = optimize(&initial, &opts).map_err(|e| anyhow!(e))?;

    // Exhaustive functional check against the specification tables.
    let pats = PatternSet::exhaustive(spec.num_vars);
    let outs = simulate_outputs(&optimized, &simulate(&optimized, &pats));
    for (k, (got, want)) in outs.iter().zip(spec.outputs.iter()).enumerate() {
        if got != want {
            return Err(anyhow!("{}: output {} differs from specification", name, k));
        }
    }

    if args.oracle && !abc_cec(&initial, &optimized).map_err(|e| anyhow!(e))? {
        return Err(anyhow!("{}: abc oracle did not certify equivalence", name));
    }

    if let Some(out_dir) = &args.out_dir {
        let out_path = PathBuf::from(out_dir).join(format!("{}.aag", name));
        AigerIo
            .write(&optimized, &out_path)
            .map_err(|e| anyhow!(e))?;
    }

    let stats = get_summary_stats(&optimized);
    Ok(ResultRow {
        name,
        initial_gates: initial_stats.live_gates,
        gates: stats.live_gates,
        depth: stats.deepest_path,
    })
}

fn main() {
    let _ = env_logger::builder().try_init();
    let args = Args::parse();

    let mut benchmarks: Vec<PathBuf> = match std::fs::read_dir(&args.dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|x| x == "truth").unwrap_or(false))
            .collect(),
        Err(e) => {
            eprintln!("[w] cannot read benchmark directory {}: {}", args.dir, e);
            std::process::exit(1);
        }
    };
    benchmarks.sort();
    if let Some(only) = &args.benchmark {
        benchmarks.retain(|p| p.file_stem().and_then(|s| s.to_str()) == Some(only.as_str()));
    }
    if benchmarks.is_empty() {
        eprintln!("[w] no benchmarks matched in {}", args.dir);
        std::process::exit(1);
    }
    if let Some(out_dir) = &args.out_dir {
        if let Err(e) = std::fs::create_dir_all(out_dir) {
            eprintln!("[w] cannot create output directory {}: {}", out_dir, e);
            std::process::exit(1);
        }
    }

    let threads = if args.benchmark.is_some() {
        1
    } else {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(benchmarks.len())
    };
    println!("[i] running {} benchmarks on {} threads", benchmarks.len(), threads);

    let next_index = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);
    let results: Mutex<Vec<ResultRow>> = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| loop {
                let idx = next_index.fetch_add(1, Ordering::SeqCst);
                if idx >= benchmarks.len() {
                    break;
                }
                match run_one(&benchmarks[idx], &args) {
                    Ok(row) => {
                        println!(
                            "[i] {}: {} -> {} gates, depth {}",
                            row.name, row.initial_gates, row.gates, row.depth
                        );
                        results.lock().unwrap().push(row);
                    }
                    Err(e) => {
                        eprintln!("[w] {}", e);
                        failed.store(true, Ordering::SeqCst);
                    }
                }
            });
        }
    });

    let mut rows = results.into_inner().unwrap();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    println!("[i] benchmark         gates  depth");
    for row in &rows {
        println!("[i] {:<16} {:>6} {:>6}", row.name, row.gates, row.depth);
    }
    let total: usize = rows.iter().map(|r| r.gates).sum();
    println!("[i] total gates: {}", total);

    if failed.load(Ordering::SeqCst) {
        std::process::exit(1);
    }
}
