//! ORN Layer
//!
//! Receptor firing rates relax toward a smoothed target: spontaneous rate,
//! plus the odor-evoked delta while the stimulus is on.

use nalgebra::DMatrix;
use olfsysm_core::ModelParams;

/// Width (seconds) of the exponential smoothing window applied to the ORN
/// target. Empirical constant of the published model.
pub const ORN_SMOOTHING_WINDOW: f64 = 0.02;

/// Single-pole exponential smoothing along each row, in place.
///
/// A window wider than one sample maps to the coefficient `2/(wsize+1)`;
/// narrower windows are used as the coefficient directly.
pub fn smooth_exp(series: &mut DMatrix<f64>, wsize: f64) {
    let ext = if wsize > 1.0 { 2.0 / (wsize + 1.0) } else { wsize };
    for t in 1..series.ncols() {
        let blended = series.column(t) * ext + series.column(t - 1) * (1.0 - ext);
        series.set_column(t, &blended);
    }
}

/// Simulate ORN rates for one odor into `orn_t` (G × T).
pub fn sim_orn(params: &ModelParams, odor: usize, orn_t: &mut DMatrix<f64>) {
    let time = &params.time;
    let data = &params.orn.data;

    *orn_t = &data.spont * time.ones_row();

    let mut target = &*orn_t + data.delta.column(odor) * time.stim_row();
    smooth_exp(&mut target, ORN_SMOOTHING_WINDOW / time.dt);

    let mul = time.dt / params.orn.taum;
    for t in 1..orn_t.ncols() {
        let next = orn_t.column(t - 1) * (1.0 - mul) + target.column(t) * mul;
        orn_t.set_column(t, &next);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use nalgebra::DVector;

    use super::*;

    fn params() -> ModelParams {
        let mut p = ModelParams::default();
        p.set_orn_data(
            DVector::from_vec(vec![4.0, 10.0]),
            DMatrix::from_row_slice(2, 2, &[0.0, 100.0, 0.0, -6.0]),
        )
        .unwrap();
        p
    }

    #[test]
    fn test_smooth_exp() {
        let mut m = DMatrix::from_row_slice(1, 3, &[0.0, 4.0, 4.0]);
        smooth_exp(&mut m, 3.0);
        assert_eq!(m, DMatrix::from_row_slice(1, 3, &[0.0, 2.0, 3.0]));

        // coefficient 1 leaves the series untouched
        let mut m = DMatrix::from_row_slice(1, 3, &[1.0, 5.0, 2.0]);
        smooth_exp(&mut m, 1.0);
        assert_eq!(m, DMatrix::from_row_slice(1, 3, &[1.0, 5.0, 2.0]));
    }

    #[test]
    fn test_no_odor_stays_spontaneous() {
        let p = params();
        let mut orn = DMatrix::zeros(0, 0);
        sim_orn(&p, 0, &mut orn);

        assert_eq!(orn.shape(), (2, p.time.steps_all()));
        for t in [0, 1000, 4500, 5499] {
            assert!((orn[(0, t)] - 4.0).abs() < 1e-9);
            assert!((orn[(1, t)] - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_odor_response_tracks_stimulus() {
        let p = params();
        let mut orn = DMatrix::zeros(0, 0);
        sim_orn(&p, 1, &mut orn);

        let on = p.time.stim_start_step();
        let off = p.time.stim_end_step();

        // settled at spont before onset
        assert!((orn[(0, on - 1)] - 4.0).abs() < 1e-9);
        // reaches spont + delta by the end of the stimulus
        assert!((orn[(0, off - 1)] - 104.0).abs() < 1e-3);
        assert!((orn[(1, off - 1)] - 4.0).abs() < 1e-3);
        // decays back afterwards
        assert!((orn[(0, p.time.steps_all() - 1)] - 4.0).abs() < 1.0);
    }
}
