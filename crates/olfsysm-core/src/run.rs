//! Run State
//!
//! Mutable matrices produced by one model run. Every shape is fixed at
//! construction from a single `ModelParams` snapshot:
//!
//! ```text
//! orn.sims[o]          G × T     per odor
//! ln.inh_a[o]/inh_b[o] 1 × T     per odor
//! pn.sims[o]           G × T     per odor
//! kc.w_pnkc            N × G
//! kc.w_aplkc           N × 1
//! kc.w_kcapl           1 × N
//! kc.thr               N × 1
//! kc.responses         N × O
//! kc.spike_counts      N × O
//! ```
//!
//! Pipeline stages overwrite contents in place; nothing is ever resized.

use nalgebra::{DMatrix, DVector, RowDVector};

use crate::log::Logger;
use crate::params::ModelParams;

/// ORN run state.
#[derive(Clone, Debug, PartialEq)]
pub struct OrnRun {
    /// Firing-rate time series, one G × T matrix per odor
    pub sims: Vec<DMatrix<f64>>,
}

/// LN run state.
#[derive(Clone, Debug, PartialEq)]
pub struct LnRun {
    /// Inhibitory trace A, one row per odor
    pub inh_a: Vec<RowDVector<f64>>,
    /// Inhibitory trace B, one row per odor
    pub inh_b: Vec<RowDVector<f64>>,
}

/// PN run state.
#[derive(Clone, Debug, PartialEq)]
pub struct PnRun {
    /// Firing-rate time series, one G × T matrix per odor
    pub sims: Vec<DMatrix<f64>>,
}

/// KC run state.
#[derive(Clone, Debug, PartialEq)]
pub struct KcRun {
    /// PN -> KC connectivity (claw counts)
    pub w_pnkc: DMatrix<f64>,
    /// APL -> KC inhibitory weights
    pub w_aplkc: DVector<f64>,
    /// KC -> APL excitatory weights
    pub w_kcapl: RowDVector<f64>,
    /// Firing thresholds
    pub thr: DVector<f64>,
    /// Binary responses (1.0 if the KC spiked at least once for the odor)
    pub responses: DMatrix<f64>,
    /// Spike counts
    pub spike_counts: DMatrix<f64>,
    /// Iterations used by the last APL tuning loop (0 if it did not run)
    pub tuning_iters: usize,
    /// Sparsity reached by the last APL tuning loop
    pub tuning_sparsity: Option<f64>,
}

/// Complete run state.
#[derive(Debug)]
pub struct RunVars {
    /// ORN layer
    pub orn: OrnRun,
    /// LN layer
    pub ln: LnRun,
    /// PN layer
    pub pn: PnRun,
    /// KC layer
    pub kc: KcRun,
    /// Per-run log sink
    pub log: Logger,
}

impl RunVars {
    /// Allocate zeroed run state sized from `params`.
    #[must_use]
    pub fn new(params: &ModelParams) -> Self {
        let t = params.time.steps_all();
        let g = params.n_gloms();
        let o = params.n_odors();
        let n = params.kc.n;

        Self {
            orn: OrnRun { sims: vec![DMatrix::zeros(g, t); o] },
            ln: LnRun {
                inh_a: vec![RowDVector::zeros(t); o],
                inh_b: vec![RowDVector::zeros(t); o],
            },
            pn: PnRun { sims: vec![DMatrix::zeros(g, t); o] },
            kc: KcRun {
                w_pnkc: DMatrix::zeros(n, g),
                w_aplkc: DVector::zeros(n),
                w_kcapl: RowDVector::zeros(n),
                thr: DVector::zeros(n),
                responses: DMatrix::zeros(n, o),
                spike_counts: DMatrix::zeros(n, o),
                tuning_iters: 0,
                tuning_sparsity: None,
            },
            log: Logger::new(),
        }
    }

    /// Number of odors this run state was sized for.
    #[inline]
    #[must_use]
    pub fn n_odors(&self) -> usize {
        self.kc.responses.ncols()
    }

    /// Number of KCs this run state was sized for.
    #[inline]
    #[must_use]
    pub fn n_kcs(&self) -> usize {
        self.kc.responses.nrows()
    }

    /// Fraction of (KC, odor) pairs that responded.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn response_sparsity(&self) -> f64 {
        let total = self.kc.responses.len();
        if total == 0 {
            return 0.0;
        }
        self.kc.responses.iter().filter(|&&r| r > 0.0).count() as f64 / total as f64
    }
}

// ============================================================================
// Tests
// ============================================================================
