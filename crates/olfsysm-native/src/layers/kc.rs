//! KC Layer
//!
//! Kenyon-cell potentials driven by connectivity-weighted PN input minus a
//! shared APL inhibition term. A KC whose potential exceeds its threshold
//! spikes and resets to zero on that step.
//!
//! # APL feedback
//!
//! ```text
//!  spikes(t-1) ──wKCAPL──► Is ──τ_apl2kc──► inh ──τ_apl──► -wAPLKC·inh ──► every KC
//! ```
//!
//! Integration starts at `start_step`; only the current potential, spike
//! vector and the two APL scalars are kept, so memory is O(N) per odor.

use nalgebra::{DMatrix, DVector};
use olfsysm_core::{KcRun, ModelParams};

/// Scale applied to the summed KC spikes before they reach the APL synapse.
const APL_INPUT_SCALE: f64 = 1e4;

/// Per-KC summary of one odor presentation.
#[derive(Clone, Debug, PartialEq)]
pub struct KcResponse {
    /// Highest potential reached before any reset (never below 0)
    pub peak: DVector<f64>,
    /// Number of steps on which the KC spiked
    pub spike_counts: DVector<f64>,
}

impl KcResponse {
    /// 1.0 for KCs that spiked at least once, else 0.0.
    #[must_use]
    pub fn binary(&self) -> DVector<f64> {
        self.spike_counts.map(|c| if c > 0.0 { 1.0 } else { 0.0 })
    }

    /// Number of KCs that spiked at least once.
    #[must_use]
    pub fn responders(&self) -> usize {
        self.spike_counts.iter().filter(|&&c| c > 0.0).count()
    }
}

/// Simulate the KC population for one odor given its PN series (G × T),
/// using the connectivity, weights and thresholds in `kc`.
pub fn sim_kc(params: &ModelParams, kc: &KcRun, pn_t: &DMatrix<f64>) -> KcResponse {
    let time = &params.time;
    let n_kc = kc.thr.len();
    let n_steps = time.steps_all().min(pn_t.ncols());

    let v_mul = time.dt / params.kc.taum;
    let inh_mul = time.dt / params.kc.apl_taum;
    let syn_mul = time.dt / params.kc.tau_apl2kc;

    let mut v = DVector::<f64>::zeros(n_kc);
    let mut spikes = DVector::<f64>::zeros(n_kc);
    let mut drive = DVector::<f64>::zeros(n_kc);
    let mut inh = 0.0;
    let mut syn = 0.0;

    let mut peak = DVector::<f64>::zeros(n_kc);
    let mut spike_counts = DVector::<f64>::zeros(n_kc);

    for t in (time.start_step() + 1)..n_steps {
        let apl_input: f64 = kc.w_kcapl.iter().zip(spikes.iter()).map(|(w, s)| w * s).sum();
        let d_syn = -syn + apl_input * APL_INPUT_SCALE;
        let d_inh = -inh + syn;

        drive.gemv(1.0, &kc.w_pnkc, &pn_t.column(t), 0.0);

        for k in 0..n_kc {
            let d_v = -v[k] + drive[k] - kc.w_aplkc[k] * inh;
            let mut v_next = v[k] + d_v * v_mul;
            if v_next > peak[k] {
                peak[k] = v_next;
            }
            if v_next > kc.thr[k] {
                spikes[k] = 1.0;
                spike_counts[k] += 1.0;
                v_next = 0.0;
            } else {
                spikes[k] = 0.0;
            }
            v[k] = v_next;
        }

        inh += d_inh * inh_mul;
        syn += d_syn * syn_mul;
    }

    KcResponse { peak, spike_counts }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use nalgebra::RowDVector;
    use olfsysm_core::RunVars;

    use super::*;

    /// Two glomeruli, constant PN input of 10 on glom 0 and 0 on glom 1.
    fn setup(n_kc: usize) -> (ModelParams, RunVars, DMatrix<f64>) {
        let mut p = ModelParams::default();
        p.set_orn_data(DVector::zeros(2), DMatrix::zeros(2, 1)).unwrap();
        p.kc.n = n_kc;
        let mut rv = RunVars::new(&p);
        rv.kc.w_pnkc.column_mut(0).fill(1.0);
        let pn = DMatrix::from_fn(2, p.time.steps_all(), |g, _| if g == 0 { 10.0 } else { 0.0 });
        (p, rv, pn)
    }

    #[test]
    fn test_unreachable_threshold_gives_peaks() {
        let (p, mut rv, pn) = setup(3);
        rv.kc.thr.fill(f64::INFINITY);
        let out = sim_kc(&p, &rv.kc, &pn);

        assert_eq!(out.responders(), 0);
        for &pk in out.peak.iter() {
            assert!(pk > 9.99 && pk <= 10.0 + 1e-9);
        }
    }

    #[test]
    fn test_spike_resets_potential() {
        let (p, mut rv, pn) = setup(2);
        rv.kc.thr = DVector::from_vec(vec![5.0, 50.0]);
        let out = sim_kc(&p, &rv.kc, &pn);

        // KC 0 charges past 5, resets, and repeats; KC 1 never reaches 50
        assert!(out.spike_counts[0] > 10.0);
        assert_eq!(out.spike_counts[1], 0.0);
        assert_eq!(out.binary(), DVector::from_vec(vec![1.0, 0.0]));
        assert!(out.peak[0] < 6.0);
    }

    #[test]
    fn test_apl_feedback_suppresses() {
        let (p, mut rv, pn) = setup(10);
        rv.kc.thr.fill(5.0);
        let free = sim_kc(&p, &rv.kc, &pn);

        rv.kc.w_aplkc.fill(5.0);
        rv.kc.w_kcapl = RowDVector::from_element(10, 5.0 / 10.0);
        let inhibited = sim_kc(&p, &rv.kc, &pn);

        assert!(inhibited.spike_counts.sum() < free.spike_counts.sum());
    }

    #[test]
    fn test_nothing_before_start() {
        let (p, mut rv, mut pn) = setup(1);
        rv.kc.thr.fill(5.0);
        // strong input only in the settling period
        for t in 0..p.time.steps_all() {
            pn[(0, t)] = if t <= p.time.start_step() { 100.0 } else { 0.0 };
        }
        let out = sim_kc(&p, &rv.kc, &pn);
        assert_eq!(out.spike_counts[0], 0.0);
        assert_eq!(out.peak[0], 0.0);
    }
}
