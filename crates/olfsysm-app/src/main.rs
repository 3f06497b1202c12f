//! Olfsysm Application
//!
//! Command-line front end for the olfactory pathway model. Loads an ORN
//! response table, applies parameter overrides, runs the three simulation
//! phases and writes a JSON summary.
//!
//! # Usage
//!
//! ```bash
//! # Run with published defaults
//! olfsysm run --data hc_data.csv
//!
//! # Reproducible run with overrides and a run log
//! olfsysm run --data hc_data.csv --seed 42 --set kc.N=1000 --set kc.thr_mode=homeostatic \
//!     --log run.log --output summary.json
//!
//! # Show the default parameter tree, or one parameter
//! olfsysm params
//! olfsysm params --key kc.sp_target
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use nalgebra::DMatrix;
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use olfsysm_core::{load_hc_data, ModelParams, ParamKey, RunVars};
use olfsysm_native::{Simulator, TuningReport};

/// Olfsysm Application
#[derive(Parser, Debug)]
#[command(name = "olfsysm")]
#[command(author, version, about = "Olfactory pathway model: ORN -> LN -> PN -> KC", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Simulate every odor and report KC responses
    Run {
        /// ORN response table (two header lines, odor rows, spontaneous row)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// JSON parameter file; missing fields keep their defaults
        #[arg(short, long)]
        params: Option<PathBuf>,

        /// Parameter override, e.g. kc.N=1000 (repeatable)
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,

        /// Random seed for connectivity and noise
        #[arg(long)]
        seed: Option<u64>,

        /// Worker threads (0 = one per core)
        #[arg(short, long, default_value = "0")]
        threads: usize,

        /// Append the run log to this file
        #[arg(long)]
        log: Option<PathBuf>,

        /// Write the JSON summary here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include full response and spike-count matrices in the summary
        #[arg(long)]
        full: bool,

        /// Skip connectivity and sparseness regeneration (all-zero connectivity)
        #[arg(long)]
        no_regen: bool,
    },

    /// Print default parameters as JSON, or one parameter by key
    Params {
        /// Dotted parameter key, e.g. kc.sp_target
        #[arg(short, long)]
        key: Option<String>,

        /// List every key with its value kind
        #[arg(long)]
        list: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("olfsysm v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run { data, params, overrides, seed, threads, log, output, full, no_regen } => {
            let params = build_params(params.as_deref(), data.as_deref(), &overrides)?;
            let options = RunOptions { seed, threads, log, full, regen: !no_regen };
            let summary = run_model(&params, &options)?;
            write_json(&summary, output.as_deref())?;
        }
        Commands::Params { key, list } => show_params(key.as_deref(), list)?,
    }

    Ok(())
}

// ============================================================================
// Configuration
// ============================================================================

/// Defaults, then the parameter file, then the data table, then overrides.
fn build_params(
    params_path: Option<&Path>,
    data_path: Option<&Path>,
    overrides: &[String],
) -> anyhow::Result<ModelParams> {
    let mut params = match params_path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing parameters from {}", path.display()))?
        }
        None => ModelParams::default(),
    };

    if let Some(path) = data_path {
        load_hc_data(&mut params, path).with_context(|| format!("loading {}", path.display()))?;
    }

    for assignment in overrides {
        apply_override(&mut params, assignment)?;
    }
    Ok(params)
}

/// Apply one `key=value` override through the named-field table.
fn apply_override(params: &mut ModelParams, assignment: &str) -> anyhow::Result<()> {
    let Some((key, value)) = assignment.split_once('=') else {
        bail!("override '{}' is not of the form key=value", assignment);
    };
    let key: ParamKey = key.trim().parse()?;
    let value = key.parse_value(value)?;
    params.set(key, value).with_context(|| format!("applying override '{}'", assignment))?;
    info!("override {} = {}", key, params.get(key));
    Ok(())
}

fn show_params(key: Option<&str>, list: bool) -> anyhow::Result<()> {
    let params = ModelParams::default();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if list {
        for &key in ParamKey::ALL {
            let access = if key.is_read_only() { " (read-only)" } else { "" };
            writeln!(out, "{:<28} {}{}", key.name(), key.kind().name(), access)?;
        }
    } else if let Some(name) = key {
        writeln!(out, "{}", params.get_named(name)?)?;
    } else {
        serde_json::to_writer_pretty(&mut out, &params)?;
        writeln!(out)?;
    }
    Ok(())
}

// ============================================================================
// Run
// ============================================================================

struct RunOptions {
    seed: Option<u64>,
    threads: usize,
    log: Option<PathBuf>,
    full: bool,
    regen: bool,
}

/// Per-odor result row.
#[derive(Serialize, Debug)]
struct OdorSummary {
    index: usize,
    name: Option<String>,
    responding_kcs: usize,
    total_spikes: f64,
    mean_pn_rate: f64,
}

/// JSON summary of a run.
#[derive(Serialize, Debug)]
struct RunSummary {
    n_gloms: usize,
    n_odors: usize,
    n_kcs: usize,
    seed: Option<u64>,
    tuning: Option<TuningReport>,
    response_sparsity: f64,
    mean_threshold: f64,
    w_aplkc: f64,
    odors: Vec<OdorSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    responses: Option<Vec<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spike_counts: Option<Vec<Vec<f64>>>,
}

fn run_model(params: &ModelParams, options: &RunOptions) -> anyhow::Result<RunSummary> {
    if params.n_odors() == 0 || params.n_gloms() == 0 {
        bail!("no ORN data loaded; pass --data or a parameter file with orn.data");
    }
    info!(
        "Simulating {} odors x {} glomeruli with {} KCs",
        params.n_odors(),
        params.n_gloms(),
        params.kc.n
    );

    let mut rv = RunVars::new(params);
    if let Some(path) = &options.log {
        rv.log.redirect(path).with_context(|| format!("opening run log {}", path.display()))?;
    }

    let mut sim = Simulator::new(options.threads, options.seed)?;
    let tuning = sim.run_all(params, &mut rv, options.regen)?;
    rv.log.disable();

    Ok(summarize(params, &rv, tuning, options))
}

fn summarize(
    params: &ModelParams,
    rv: &RunVars,
    tuning: Option<TuningReport>,
    options: &RunOptions,
) -> RunSummary {
    let names = &params.orn.data.odor_names;
    let odors = (0..rv.n_odors())
        .map(|odor| OdorSummary {
            index: odor,
            name: names.get(odor).cloned(),
            responding_kcs: rv.kc.responses.column(odor).iter().filter(|&&r| r > 0.0).count(),
            total_spikes: rv.kc.spike_counts.column(odor).sum(),
            mean_pn_rate: mean_rate(&params.time.trim_pretime(&rv.pn.sims[odor])),
        })
        .collect();

    let columns = |m: &DMatrix<f64>| -> Vec<Vec<f64>> {
        m.column_iter().map(|c| c.iter().copied().collect()).collect()
    };

    RunSummary {
        n_gloms: params.n_gloms(),
        n_odors: rv.n_odors(),
        n_kcs: rv.n_kcs(),
        seed: options.seed,
        tuning,
        response_sparsity: rv.response_sparsity(),
        mean_threshold: if rv.kc.thr.is_empty() { 0.0 } else { rv.kc.thr.mean() },
        w_aplkc: rv.kc.w_aplkc.get(0).copied().unwrap_or(0.0),
        odors,
        responses: options.full.then(|| columns(&rv.kc.responses)),
        spike_counts: options.full.then(|| columns(&rv.kc.spike_counts)),
    }
}

/// Mean over every cell and step, 0 for an empty series.
fn mean_rate(series: &DMatrix<f64>) -> f64 {
    if series.is_empty() {
        0.0
    } else {
        series.mean()
    }
}

fn write_json(summary: &RunSummary, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, summary)?;
            writer.flush()?;
            info!("Summary written to {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, summary)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_override() {
        let mut params = ModelParams::default();
        apply_override(&mut params, "kc.N=123").unwrap();
        apply_override(&mut params, "kc.thr_mode = homeostatic").unwrap();
        apply_override(&mut params, "kc.tune_from=0,2").unwrap();
        assert_eq!(params.kc.n, 123);
        assert_eq!(params.kc.thr_mode, olfsysm_core::ThresholdMode::Homeostatic);
        assert_eq!(params.kc.tune_from, vec![0, 2]);
    }

    #[test]
    fn test_bad_overrides() {
        let mut params = ModelParams::default();
        assert!(apply_override(&mut params, "kc.N").is_err());
        assert!(apply_override(&mut params, "kc.bogus=1").is_err());
        assert!(apply_override(&mut params, "kc.N=lots").is_err());
    }

    #[test]
    fn test_params_file_then_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"kc": {"N": 40, "sp_target": 0.05}}"#).unwrap();

        let params = build_params(Some(&path), None, &["kc.N=50".to_string()]).unwrap();
        assert_eq!(params.kc.n, 50);
        assert_eq!(params.kc.sp_target, 0.05);
    }

    #[test]
    fn test_summary_skips_settling_period() {
        let mut params = ModelParams::default();
        params
            .set_orn_data(nalgebra::DVector::zeros(2), DMatrix::zeros(2, 1))
            .unwrap();
        params.kc.n = 3;
        let mut rv = RunVars::new(&params);
        let start = params.time.start_step();
        rv.pn.sims[0].columns_mut(0, start).fill(100.0);
        rv.pn.sims[0].columns_mut(start, params.time.steps_all() - start).fill(4.0);

        let options = RunOptions { seed: None, threads: 1, log: None, full: true, regen: false };
        let summary = summarize(&params, &rv, None, &options);
        assert_eq!(summary.odors[0].mean_pn_rate, 4.0);
        assert_eq!(summary.responses.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_run_requires_data() {
        let options = RunOptions { seed: Some(1), threads: 1, log: None, full: false, regen: true };
        assert!(run_model(&ModelParams::default(), &options).is_err());
    }
}
