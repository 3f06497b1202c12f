//! Model Parameters
//!
//! All configuration of a model run. `ModelParams` never holds data generated
//! during simulation; it is built once (defaults, optionally overwritten by
//! loaded input data) and read-only while the pipeline runs.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::data::hc_cxn_weights;
use crate::error::{CoreError, CoreResult};
use crate::time::TimeParams;

// ============================================================================
// ORN
// ============================================================================

/// ORN firing-rate data (the model input).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrnData {
    /// Spontaneous rates (G)
    pub spont: DVector<f64>,
    /// Odor-evoked rate changes (G × O)
    pub delta: DMatrix<f64>,
    /// Optional odor labels, one per `delta` column
    pub odor_names: Vec<String>,
}

impl Default for OrnData {
    fn default() -> Self {
        Self { spont: DVector::zeros(0), delta: DMatrix::zeros(0, 0), odor_names: Vec::new() }
    }
}

impl OrnData {
    /// Number of glomeruli (G).
    #[inline]
    #[must_use]
    pub fn n_gloms(&self) -> usize {
        self.spont.len()
    }

    /// Number of odors (O).
    #[inline]
    #[must_use]
    pub fn n_odors(&self) -> usize {
        self.delta.ncols()
    }

    /// Absolute odor-evoked rates: `delta` with `spont` added to every column.
    #[must_use]
    pub fn rates(&self) -> DMatrix<f64> {
        let mut rates = self.delta.clone();
        for mut col in rates.column_iter_mut() {
            col += &self.spont;
        }
        rates
    }
}

/// ORN layer parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrnParams {
    /// Membrane time constant
    pub taum: f64,
    /// Number of glomeruli in the physical system; scales LN input
    pub n_physical_gloms: usize,
    /// Input data
    pub data: OrnData,
}

impl Default for OrnParams {
    fn default() -> Self {
        Self { taum: 0.01, n_physical_gloms: 51, data: OrnData::default() }
    }
}

// ============================================================================
// LN / PN
// ============================================================================

/// LN layer parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LnParams {
    /// Potential time constant
    pub taum: f64,
    /// Inhibitory trace A time constant
    #[serde(rename = "tauGA")]
    pub tau_ga: f64,
    /// Inhibitory trace B time constant
    #[serde(rename = "tauGB")]
    pub tau_gb: f64,
    /// Response threshold
    pub thr: f64,
    /// Inhibition scale
    pub inhsc: f64,
    /// Inhibition offset
    pub inhadd: f64,
}

impl Default for LnParams {
    fn default() -> Self {
        Self { taum: 0.01, tau_ga: 0.1, tau_gb: 0.4, thr: 1.0, inhsc: 500.0, inhadd: 200.0 }
    }
}

/// Gaussian noise parameters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Mean
    pub mean: f64,
    /// Standard deviation
    pub sd: f64,
}

/// PN layer parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PnParams {
    /// Membrane time constant
    pub taum: f64,
    /// Offset added to the ORN deviation before the tanh transform
    pub offset: f64,
    /// tanh input scale
    pub tanhsc: f64,
    /// Inhibition scale
    pub inhsc: f64,
    /// Inhibition offset
    pub inhadd: f64,
    /// Per-cell, per-step noise
    pub noise: NoiseParams,
}

impl Default for PnParams {
    fn default() -> Self {
        Self {
            taum: 0.01,
            offset: 2.9410,
            tanhsc: 5.3395,
            inhsc: 368.6631,
            inhadd: 31.4088,
            noise: NoiseParams::default(),
        }
    }
}

// ============================================================================
// KC
// ============================================================================

/// How KC firing thresholds are chosen.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Every KC uses `fixed_thr`
    Fixed,
    /// One percentile cut over all pooled (KC, odor) peaks
    #[default]
    Global,
    /// Percentile cut per KC over that KC's own peaks
    Homeostatic,
}

impl ThresholdMode {
    /// Mode name as used by the named-field contract.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Global => "global",
            Self::Homeostatic => "homeostatic",
        }
    }

    /// Parse a mode name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fixed" => Some(Self::Fixed),
            "global" => Some(Self::Global),
            "homeostatic" => Some(Self::Homeostatic),
            _ => None,
        }
    }
}

/// KC layer and sparseness-tuning parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KcParams {
    /// Number of KCs
    #[serde(rename = "N")]
    pub n: usize,
    /// Claws (PN draws) per KC
    pub nclaws: usize,
    /// Draw glomeruli uniformly instead of from `cxn_distrib`
    pub uniform_pns: bool,
    /// Empirical connectivity draw weights (G)
    pub cxn_distrib: DVector<f64>,
    /// Simulate APL feedback
    pub enable_apl: bool,
    /// Threshold selection mode
    pub thr_mode: ThresholdMode,
    /// Threshold used when `thr_mode` is `Fixed`
    pub fixed_thr: f64,
    /// Target response sparsity
    pub sp_target: f64,
    /// Accepted relative deviation from `sp_target`
    pub sp_acc: f64,
    /// Scale of the `1/sqrt(iteration)` tuning step
    pub sp_lr_coeff: f64,
    /// Tuning iteration cap (>= 1)
    pub max_iters: usize,
    /// 0-based odor indices used for tuning; empty means all odors
    pub tune_from: Vec<usize>,
    /// Membrane time constant
    pub taum: f64,
    /// APL time constant
    pub apl_taum: f64,
    /// KC -> APL synaptic time constant
    pub tau_apl2kc: f64,
}

impl Default for KcParams {
    fn default() -> Self {
        Self {
            n: 2000,
            nclaws: 6,
            uniform_pns: false,
            cxn_distrib: hc_cxn_weights(),
            enable_apl: true,
            thr_mode: ThresholdMode::Global,
            fixed_thr: 0.0,
            sp_target: 0.1,
            sp_acc: 0.1,
            sp_lr_coeff: 10.0,
            max_iters: 10,
            tune_from: Vec::new(),
            taum: 0.01,
            apl_taum: 0.05,
            tau_apl2kc: 0.01,
        }
    }
}

// ============================================================================
// Model Parameters
// ============================================================================

/// Complete model configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Time grid
    pub time: TimeParams,
    /// ORN layer and input data
    pub orn: OrnParams,
    /// LN layer
    pub ln: LnParams,
    /// PN layer
    pub pn: PnParams,
    /// KC layer and tuning
    pub kc: KcParams,
}

impl ModelParams {
    /// Number of glomeruli (G), fixed by the input data.
    #[inline]
    #[must_use]
    pub fn n_gloms(&self) -> usize {
        self.orn.data.n_gloms()
    }

    /// Number of odors (O), fixed by the input data.
    #[inline]
    #[must_use]
    pub fn n_odors(&self) -> usize {
        self.orn.data.n_odors()
    }

    /// Odors used for sparseness tuning.
    #[must_use]
    pub fn tuning_odors(&self) -> Vec<usize> {
        if self.kc.tune_from.is_empty() {
            (0..self.n_odors()).collect()
        } else {
            self.kc.tune_from.clone()
        }
    }

    /// Install ORN input data, checking that `spont` and `delta` agree on G.
    pub fn set_orn_data(&mut self, spont: DVector<f64>, delta: DMatrix<f64>) -> CoreResult<()> {
        if delta.nrows() != spont.len() {
            return Err(CoreError::ShapeMismatch {
                what: "orn.data.delta",
                expected: (spont.len(), delta.ncols()),
                actual: delta.shape(),
            });
        }
        self.orn.data.spont = spont;
        self.orn.data.delta = delta;
        self.orn.data.odor_names.clear();
        Ok(())
    }

    /// Replace the spontaneous rates. While odor data is loaded the length
    /// must stay equal to G.
    pub fn set_spont(&mut self, spont: DVector<f64>) -> CoreResult<()> {
        let delta = &self.orn.data.delta;
        if delta.ncols() > 0 && spont.len() != delta.nrows() {
            return Err(CoreError::ShapeMismatch {
                what: "orn.data.spont",
                expected: (delta.nrows(), 1),
                actual: (spont.len(), 1),
            });
        }
        self.orn.data.spont = spont;
        Ok(())
    }

    /// Replace the odor-evoked deltas; rows must match `spont`. Odor names
    /// are kept only if the odor count is unchanged.
    pub fn set_delta(&mut self, delta: DMatrix<f64>) -> CoreResult<()> {
        let n_gloms = self.n_gloms();
        if delta.nrows() != n_gloms {
            return Err(CoreError::ShapeMismatch {
                what: "orn.data.delta",
                expected: (n_gloms, delta.ncols()),
                actual: delta.shape(),
            });
        }
        if delta.ncols() != self.n_odors() {
            self.orn.data.odor_names.clear();
        }
        self.orn.data.delta = delta;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = ModelParams::default();
        assert_eq!(p.kc.n, 2000);
        assert_eq!(p.kc.nclaws, 6);
        assert!(p.kc.enable_apl);
        assert_eq!(p.kc.thr_mode, ThresholdMode::Global);
        assert_eq!(p.kc.cxn_distrib.len(), 23);
        assert_eq!(p.n_gloms(), 0);
        assert_eq!(p.n_odors(), 0);
    }

    #[test]
    fn test_rates_add_spont() {
        let mut p = ModelParams::default();
        p.set_orn_data(
            DVector::from_vec(vec![1.0, 2.0]),
            DMatrix::from_row_slice(2, 3, &[10.0, 0.0, -1.0, 5.0, 5.0, 5.0]),
        )
        .unwrap();
        let rates = p.orn.data.rates();
        assert_eq!(rates[(0, 0)], 11.0);
        assert_eq!(rates[(0, 2)], 0.0);
        assert_eq!(rates[(1, 1)], 7.0);
    }

    #[test]
    fn test_set_orn_data_rejects_mismatch() {
        let mut p = ModelParams::default();
        let err = p
            .set_orn_data(DVector::zeros(3), DMatrix::zeros(2, 4))
            .unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_set_spont_keeps_glomerulus_count() {
        let mut p = ModelParams::default();
        p.set_spont(DVector::from_element(3, 1.0)).unwrap();
        p.set_orn_data(DVector::zeros(4), DMatrix::zeros(4, 2)).unwrap();

        p.set_spont(DVector::from_element(4, 2.0)).unwrap();
        assert_eq!(p.orn.data.spont[3], 2.0);

        let err = p.set_spont(DVector::zeros(5)).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { what: "orn.data.spont", .. }));
        assert_eq!(p.n_gloms(), 4);
    }

    #[test]
    fn test_set_delta_checks_rows() {
        let mut p = ModelParams::default();
        p.set_orn_data(DVector::zeros(4), DMatrix::zeros(4, 2)).unwrap();
        p.orn.data.odor_names = vec!["a".into(), "b".into()];

        p.set_delta(DMatrix::from_element(4, 2, 1.0)).unwrap();
        assert_eq!(p.orn.data.odor_names.len(), 2);

        p.set_delta(DMatrix::zeros(4, 3)).unwrap();
        assert_eq!(p.n_odors(), 3);
        assert!(p.orn.data.odor_names.is_empty());

        let err = p.set_delta(DMatrix::zeros(5, 2)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ShapeMismatch { what: "orn.data.delta", expected: (4, 2), actual: (5, 2) }
        ));
        assert_eq!(p.orn.data.delta.shape(), (4, 3));
    }

    #[test]
    fn test_tuning_odors() {
        let mut p = ModelParams::default();
        p.set_orn_data(DVector::zeros(2), DMatrix::zeros(2, 4)).unwrap();
        assert_eq!(p.tuning_odors(), vec![0, 1, 2, 3]);
        p.kc.tune_from = vec![1, 3];
        assert_eq!(p.tuning_odors(), vec![1, 3]);
    }

    #[test]
    fn test_threshold_mode_names() {
        for mode in [ThresholdMode::Fixed, ThresholdMode::Global, ThresholdMode::Homeostatic] {
            assert_eq!(ThresholdMode::from_name(mode.name()), Some(mode));
        }
        assert_eq!(ThresholdMode::from_name("median"), None);
    }

    #[test]
    fn test_serde_partial() {
        let p: ModelParams = serde_json::from_str(r#"{"kc": {"N": 50, "thr_mode": "homeostatic"}}"#).unwrap();
        assert_eq!(p.kc.n, 50);
        assert_eq!(p.kc.thr_mode, ThresholdMode::Homeostatic);
        assert_eq!(p.kc.nclaws, 6);
        assert_eq!(p.time.dt, 0.5e-3);
    }
}
