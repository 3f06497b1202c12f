//! LN Layer
//!
//! Local-neuron inhibition. A suppressive potential is driven by the cube of
//! the mean ORN rate (taken over the physical glomerulus count), rectified
//! against `ln.thr`, and fed into two inhibitory traces with time constants
//! `tauGA` and `tauGB`. Only the traces are kept.

use nalgebra::{DMatrix, RowDVector};
use olfsysm_core::ModelParams;

const POTENTIAL_BASELINE: f64 = 300.0;
const RESPONSE_BASELINE: f64 = 1.0;
const TRACE_BASELINE: f64 = 50.0;

/// Simulate LN inhibition for one odor from its ORN series (G × T).
#[allow(clippy::cast_precision_loss)]
pub fn sim_ln(
    params: &ModelParams,
    orn_t: &DMatrix<f64>,
    inh_a: &mut RowDVector<f64>,
    inh_b: &mut RowDVector<f64>,
) {
    let ln = &params.ln;
    let dt = params.time.dt;
    let n_steps = orn_t.ncols();

    *inh_a = RowDVector::from_element(n_steps, TRACE_BASELINE);
    *inh_b = RowDVector::from_element(n_steps, TRACE_BASELINE);

    // the modeled glomeruli are a subset of the physical ones; the rest fire at 0
    let n_physical = params.orn.n_physical_gloms.max(1) as f64;
    let drive_scale = if orn_t.nrows() == 0 {
        0.0
    } else {
        n_physical / orn_t.nrows() as f64 / 2.0
    };

    let mut potential = POTENTIAL_BASELINE;
    let mut response = RESPONSE_BASELINE;
    let mut inh_ln = 0.0;

    for t in 1..n_steps {
        let mean_rate = orn_t.column(t - 1).sum() / n_physical;

        let d_inh_a = -inh_a[t - 1] + response;
        let d_inh_b = -inh_b[t - 1] + response;
        let d_potential = -potential + mean_rate.powi(3) * drive_scale * inh_ln;

        inh_a[t] = inh_a[t - 1] + d_inh_a * dt / ln.tau_ga;
        inh_b[t] = inh_b[t - 1] + d_inh_b * dt / ln.tau_gb;
        inh_ln = ln.inhsc / (ln.inhadd + inh_a[t]);

        potential += d_potential * dt / ln.taum;
        response = if potential > ln.thr { potential - ln.thr } else { 0.0 };
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use nalgebra::DVector;

    use super::*;
    use crate::layers::orn::sim_orn;

    fn params(spont: f64, delta: f64) -> ModelParams {
        let mut p = ModelParams::default();
        p.set_orn_data(DVector::from_element(23, spont), DMatrix::from_element(23, 1, delta)).unwrap();
        p
    }

    fn run(p: &ModelParams) -> (RowDVector<f64>, RowDVector<f64>) {
        let mut orn = DMatrix::zeros(0, 0);
        sim_orn(p, 0, &mut orn);
        let (mut a, mut b) = (RowDVector::zeros(0), RowDVector::zeros(0));
        sim_ln(p, &orn, &mut a, &mut b);
        (a, b)
    }

    #[test]
    fn test_starts_at_baseline() {
        let (a, b) = run(&params(10.0, 0.0));
        assert_eq!(a.len(), 5500);
        assert_eq!(a[0], 50.0);
        assert_eq!(b[0], 50.0);
    }

    #[test]
    fn test_silent_input_decays_traces() {
        let p = params(0.0, 0.0);
        let (a, b) = run(&p);
        // with no ORN drive the potential decays below threshold and the
        // traces fall towards zero, B more slowly than A
        let end = a.len() - 1;
        assert!(a[end] < 1.0);
        assert!(b[end] < 50.0);
        assert!(b[1000] > a[1000]);
    }

    #[test]
    fn test_odor_raises_inhibition() {
        let p = params(10.0, 0.0);
        let (quiet_a, _) = run(&p);
        let (loud_a, loud_b) = run(&params(10.0, 150.0));

        let during = p.time.stim_end_step() - 1;
        assert!(loud_a[during] > quiet_a[during]);
        assert!(loud_a.iter().chain(loud_b.iter()).all(|v| v.is_finite()));
    }
}
