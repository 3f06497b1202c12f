//! Sparseness Tuner
//!
//! Calibrates KC thresholds and the APL <-> KC weight pair so that the
//! fraction of (KC, odor) pairs with at least one spike approaches
//! `kc.sp_target`.
//!
//! # Procedure
//!
//! ```text
//! 1. spont_in = wPNKC · mean PN rate of the first tuning odor over the
//!    spontaneous window
//! 2. thresholds (unless fixed):
//!      peak pass with APL off and thresholds at +inf
//!      pks = peak - 2·spont_in
//!      global:      one percentile cut over all (KC, odor) pks
//!      homeostatic: the same cut per KC over that KC's pks
//!      thr = cut + 2·spont_in
//! 3. APL loop (if enabled), iteration i = 1, 2, ...:
//!      sp = realized sparsity over the tuning odors
//!      stop if |sp - target| <= sp_acc·target or i == max_iters
//!      delta = (sp - target)/target · sp_lr_coeff/√i
//!      wAPLKC += delta, wKCAPL += delta/N (clamped at 0 when delta < 0)
//! ```
//!
//! Each pass over the tuning odors is a parallel map followed by a sequential
//! reduction; weight updates happen between passes on the calling thread.

use nalgebra::DVector;
use olfsysm_core::{KcRun, ModelParams, RunVars, ThresholdMode};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;

use crate::error::{SimError, SimResult};
use crate::layers::kc::sim_kc;

/// Outcome of one sparseness fit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TuningReport {
    /// APL loop iterations used (0 when APL is disabled)
    pub iterations: usize,
    /// Sparsity measured on the last iteration
    pub sparsity: Option<f64>,
    /// Whether the last measured sparsity was within tolerance
    pub converged: bool,
}

/// Fit thresholds and APL weights in `rv` against the PN series already in
/// `rv.pn.sims`. Connectivity must already be built.
pub fn fit_sparseness(
    params: &ModelParams,
    rv: &mut RunVars,
    pool: &ThreadPool,
) -> SimResult<TuningReport> {
    let odors = tuning_odors(params, rv)?;
    pool.install(|| fit_in_pool(params, rv, &odors))
}

fn fit_in_pool(params: &ModelParams, rv: &mut RunVars, odors: &[usize]) -> SimResult<TuningReport> {
    let kc_params = &params.kc;

    let spont_in = spontaneous_input(params, rv, odors[0]);

    rv.kc.w_aplkc.fill(0.0);
    rv.kc.w_kcapl.fill(0.0);

    match PercentileScope::from_mode(kc_params.thr_mode) {
        None => rv.kc.thr.fill(kc_params.fixed_thr),
        Some(scope) => {
            rv.kc.thr.fill(f64::INFINITY);
            let peaks: Vec<DVector<f64>> = odors
                .par_iter()
                .map(|&odor| sim_kc(params, &rv.kc, &rv.pn.sims[odor]).peak - &spont_in * 2.0)
                .collect();
            rv.kc.thr = choose_thresholds(&peaks, &spont_in, scope, kc_params.sp_target);
        }
    }
    tracing::debug!(
        target: "olfsysm::tuner",
        "thresholds chosen ({}), mean {:.4}",
        kc_params.thr_mode.name(),
        if rv.kc.thr.is_empty() { 0.0 } else { rv.kc.thr.mean() }
    );

    if !kc_params.enable_apl || rv.n_kcs() == 0 {
        rv.kc.tuning_iters = 0;
        rv.kc.tuning_sparsity = None;
        return Ok(TuningReport { iterations: 0, sparsity: None, converged: false });
    }

    let report = tune_apl(params, rv, odors);
    rv.kc.tuning_iters = report.iterations;
    rv.kc.tuning_sparsity = report.sparsity;
    Ok(report)
}

#[allow(clippy::cast_precision_loss)]
fn tune_apl(params: &ModelParams, rv: &mut RunVars, odors: &[usize]) -> TuningReport {
    let target = params.kc.sp_target;
    let tolerance = params.kc.sp_acc * target;
    let max_iters = params.kc.max_iters.max(1);
    let n_kc = rv.n_kcs() as f64;

    let seed = 2.0 * (-target.ln()).ceil();
    rv.kc.w_aplkc.fill(seed);
    rv.kc.w_kcapl.fill(seed / n_kc);

    let mut iteration = 1;
    loop {
        let sparsity = measure_sparsity(params, &rv.kc, &rv.pn.sims, odors);
        let converged = (sparsity - target).abs() <= tolerance;
        let done = converged || iteration >= max_iters;
        let delta = if done {
            0.0
        } else {
            (sparsity - target) / target * params.kc.sp_lr_coeff / (iteration as f64).sqrt()
        };

        rv.log.log(format!(
            "APL tuning iter {}: sparsity {:.4} (target {:.4}), wAPLKC {:.4}, step {:+.4}",
            iteration,
            sparsity,
            target,
            rv.kc.w_aplkc.get(0).copied().unwrap_or(0.0),
            delta
        ));

        if done {
            if converged {
                tracing::info!(target: "olfsysm::tuner", "sparsity {:.4} reached in {} iterations", sparsity, iteration);
            } else {
                tracing::warn!(
                    target: "olfsysm::tuner",
                    "sparsity {:.4} outside tolerance after {} iterations",
                    sparsity,
                    iteration
                );
            }
            return TuningReport { iterations: iteration, sparsity: Some(sparsity), converged };
        }

        rv.kc.w_aplkc.add_scalar_mut(delta);
        rv.kc.w_kcapl.add_scalar_mut(delta / n_kc);
        if delta < 0.0 {
            rv.kc.w_aplkc.apply(|w| *w = w.max(0.0));
            rv.kc.w_kcapl.apply(|w| *w = w.max(0.0));
        }
        iteration += 1;
    }
}

/// Resolve and validate the tuning odor set.
fn tuning_odors(params: &ModelParams, rv: &RunVars) -> SimResult<Vec<usize>> {
    let n_odors = rv.n_odors().min(rv.pn.sims.len());
    let odors = params.tuning_odors();
    if odors.is_empty() || n_odors == 0 {
        return Err(SimError::EmptyTuningSet);
    }
    if let Some(&odor) = odors.iter().find(|&&o| o >= n_odors) {
        return Err(SimError::TuningOdorOutOfRange { odor, n_odors });
    }
    Ok(odors)
}

/// Spontaneous KC input: connectivity times the mean PN rate of `odor` over
/// the spontaneous window. Zero when the window is empty.
///
/// Callers pass the first tuning odor rather than odor 0, so a tuning subset
/// never reads PN series outside that subset.
fn spontaneous_input(params: &ModelParams, rv: &RunVars, odor: usize) -> DVector<f64> {
    let pn = &rv.pn.sims[odor];
    let window = params.time.spont_window();
    let end = window.end.min(pn.ncols());
    if window.start >= end {
        return DVector::zeros(rv.n_kcs());
    }
    let mean_rate = pn.columns(window.start, end - window.start).column_mean();
    &rv.kc.w_pnkc * mean_rate
}

/// Fraction of (KC, odor) pairs over `odors` with at least one spike.
#[allow(clippy::cast_precision_loss)]
pub fn measure_sparsity(
    params: &ModelParams,
    kc: &KcRun,
    pn_sims: &[nalgebra::DMatrix<f64>],
    odors: &[usize],
) -> f64 {
    let pairs = kc.thr.len() * odors.len();
    if pairs == 0 {
        return 0.0;
    }
    let responders: usize = odors
        .par_iter()
        .map(|&odor| sim_kc(params, kc, &pn_sims[odor]).responders())
        .sum();
    responders as f64 / pairs as f64
}

/// Index of the percentile cut in a descending list of `len` values.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn cut_index(sp_target: f64, len: usize) -> usize {
    ((sp_target * 2.0 * len as f64) as usize).min(len.saturating_sub(1))
}

/// Value at the percentile cut: roughly twice `sp_target` of `values` lie above it.
pub fn percentile_cut(values: &mut [f64], sp_target: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(|a, b| b.total_cmp(a));
    values[cut_index(sp_target, values.len())]
}

/// Which peaks a percentile cut is taken over.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PercentileScope {
    /// One cut over all (KC, odor) peaks
    Pooled,
    /// One cut per KC over that KC's own peaks
    PerKc,
}

impl PercentileScope {
    /// Scope for a threshold mode; `None` when thresholds are fixed.
    #[must_use]
    pub const fn from_mode(mode: ThresholdMode) -> Option<Self> {
        match mode {
            ThresholdMode::Fixed => None,
            ThresholdMode::Global => Some(Self::Pooled),
            ThresholdMode::Homeostatic => Some(Self::PerKc),
        }
    }
}

/// Thresholds from per-odor peak columns (already offset by spontaneous input).
pub fn choose_thresholds(
    peaks: &[DVector<f64>],
    spont_in: &DVector<f64>,
    scope: PercentileScope,
    sp_target: f64,
) -> DVector<f64> {
    let n_kc = spont_in.len();
    match scope {
        PercentileScope::PerKc => DVector::from_fn(n_kc, |k, _| {
            let mut own: Vec<f64> = peaks.iter().map(|col| col[k]).collect();
            percentile_cut(&mut own, sp_target) + 2.0 * spont_in[k]
        }),
        PercentileScope::Pooled => {
            let mut pooled: Vec<f64> = peaks.iter().flat_map(|col| col.iter().copied()).collect();
            let cut = percentile_cut(&mut pooled, sp_target);
            (spont_in * 2.0).add_scalar(cut)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
