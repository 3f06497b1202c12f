//! PN Layer
//!
//! Projection-neuron rates, one per glomerulus. The drive is a saturating
//! tanh of the ORN deviation from spontaneous rate, scaled down by a 25/75
//! blend of the two LN traces, plus optional Gaussian noise per cell per
//! step. Rates are clipped at zero.

use nalgebra::{DMatrix, DVector, RowDVector};
use olfsysm_core::ModelParams;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{SimError, SimResult};

/// Saturation level of the tanh drive.
const TANH_RANGE: f64 = 200.0;

/// Noise distribution for the PN layer, or `None` when `pn.noise.sd` is zero.
pub fn pn_noise(params: &ModelParams) -> SimResult<Option<Normal<f64>>> {
    let noise = params.pn.noise;
    if !(noise.sd >= 0.0 && noise.sd.is_finite() && noise.mean.is_finite()) {
        return Err(SimError::InvalidNoise(format!("mean {}, sd {}", noise.mean, noise.sd)));
    }
    if noise.sd == 0.0 {
        return Ok(None);
    }
    Normal::new(noise.mean, noise.sd)
        .map(Some)
        .map_err(|e| SimError::InvalidNoise(format!("mean {}, sd {}: {}", noise.mean, noise.sd, e)))
}

/// Simulate PN rates for one odor into `pn_t` (G × T).
pub fn sim_pn<R: Rng + ?Sized>(
    params: &ModelParams,
    orn_t: &DMatrix<f64>,
    inh_a: &RowDVector<f64>,
    inh_b: &RowDVector<f64>,
    pn_t: &mut DMatrix<f64>,
    noise: Option<&Normal<f64>>,
    rng: &mut R,
) {
    let pn = &params.pn;
    let spont = &params.orn.data.spont;
    let n_gloms = spont.len();
    let n_steps = orn_t.ncols();

    let spont_drive = spont * (pn.inhsc / (spont.sum() + pn.inhadd));
    let gain = pn.tanhsc / TANH_RANGE;
    let mul = params.time.dt / pn.taum;

    *pn_t = spont * RowDVector::from_element(n_steps, 1.0);
    let mut inh_pn = 0.0;
    let mut d_pn = DVector::<f64>::zeros(n_gloms);

    for t in 1..n_steps {
        for g in 0..n_gloms {
            let orn_delta = orn_t[(g, t - 1)] - spont[g];
            d_pn[g] = -pn_t[(g, t - 1)]
                + spont_drive[g]
                + TANH_RANGE * ((orn_delta + pn.offset) * gain * inh_pn).tanh();
        }
        if let Some(noise) = noise {
            for d in d_pn.iter_mut() {
                *d += noise.sample(rng);
            }
        }

        inh_pn = pn.inhsc / (pn.inhadd + 0.25 * inh_a[t] + 0.75 * inh_b[t]);

        for g in 0..n_gloms {
            pn_t[(g, t)] = (pn_t[(g, t - 1)] + d_pn[g] * mul).max(0.0);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
