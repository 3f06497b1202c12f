//! PN -> KC Connectivity
//!
//! Each KC receives `nclaws` claws. Every claw independently picks one
//! glomerulus (with replacement) and adds 1 to that cell of the N × G matrix,
//! so repeated picks accumulate and every row sums to `nclaws`.

use nalgebra::DMatrix;
use olfsysm_core::ModelParams;
use rand::distributions::{Distribution, Uniform, WeightedIndex};
use rand::Rng;

use crate::error::{SimError, SimResult};

/// Distribution a claw's glomerulus is drawn from.
#[derive(Clone, Debug)]
pub enum ClawDistribution {
    /// Every glomerulus equally likely
    Uniform(Uniform<usize>),
    /// Glomeruli weighted by `kc.cxn_distrib`
    Weighted(WeightedIndex<f64>),
}

impl ClawDistribution {
    /// Build the distribution selected by `kc.uniform_pns`.
    pub fn from_params(params: &ModelParams) -> SimResult<Self> {
        let n_gloms = params.n_gloms();
        if n_gloms == 0 {
            return Err(SimError::InvalidConnectivityWeights("no glomeruli loaded".into()));
        }

        if params.kc.uniform_pns {
            return Ok(Self::Uniform(Uniform::new(0, n_gloms)));
        }

        let weights = &params.kc.cxn_distrib;
        if weights.len() != n_gloms {
            return Err(SimError::InvalidConnectivityWeights(format!(
                "{} weights for {} glomeruli",
                weights.len(),
                n_gloms
            )));
        }
        WeightedIndex::new(weights.iter().copied())
            .map(Self::Weighted)
            .map_err(|e| SimError::InvalidConnectivityWeights(e.to_string()))
    }
}

impl Distribution<usize> for ClawDistribution {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match self {
            Self::Uniform(d) => d.sample(rng),
            Self::Weighted(d) => d.sample(rng),
        }
    }
}

/// Zero `w_pnkc` and redraw every row.
pub fn build_wpnkc<R: Rng + ?Sized>(
    params: &ModelParams,
    w_pnkc: &mut DMatrix<f64>,
    rng: &mut R,
) -> SimResult<()> {
    let claws = ClawDistribution::from_params(params)?;

    w_pnkc.fill(0.0);
    for kc in 0..w_pnkc.nrows() {
        for _ in 0..params.kc.nclaws {
            w_pnkc[(kc, claws.sample(rng))] += 1.0;
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use nalgebra::DVector;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn params(uniform: bool) -> ModelParams {
        let mut p = ModelParams::default();
        p.set_orn_data(DVector::zeros(23), DMatrix::zeros(23, 2)).unwrap();
        p.kc.n = 200;
        p.kc.uniform_pns = uniform;
        p
    }

    #[test]
    fn test_rows_sum_to_nclaws() {
        let mut rng = StdRng::seed_from_u64(7);
        for uniform in [false, true] {
            let p = params(uniform);
            let mut w = DMatrix::from_element(p.kc.n, 23, 5.0);
            for _ in 0..3 {
                build_wpnkc(&p, &mut w, &mut rng).unwrap();
                for row in w.row_iter() {
                    assert_eq!(row.sum(), 6.0);
                }
            }
        }
    }

    #[test]
    fn test_zero_weight_never_drawn() {
        let p = params(false);
        let mut w = DMatrix::zeros(p.kc.n, 23);
        build_wpnkc(&p, &mut w, &mut StdRng::seed_from_u64(1)).unwrap();

        // glomerulus 6 carries weight 0 in the empirical vector
        assert_eq!(p.kc.cxn_distrib[6], 0.0);
        assert_eq!(w.column(6).sum(), 0.0);
    }

    #[test]
    fn test_seeded_draws_repeat() {
        let p = params(false);
        let mut a = DMatrix::zeros(p.kc.n, 23);
        let mut b = DMatrix::zeros(p.kc.n, 23);
        build_wpnkc(&p, &mut a, &mut StdRng::seed_from_u64(42)).unwrap();
        build_wpnkc(&p, &mut b, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_weight_length_mismatch() {
        let mut p = params(false);
        p.kc.cxn_distrib = DVector::from_element(5, 1.0);
        let mut w = DMatrix::zeros(p.kc.n, 23);
        let err = build_wpnkc(&p, &mut w, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, SimError::InvalidConnectivityWeights(_)));

        // uniform mode ignores the weights
        p.kc.uniform_pns = true;
        assert!(build_wpnkc(&p, &mut w, &mut StdRng::seed_from_u64(0)).is_ok());
    }

    #[test]
    fn test_all_zero_weights() {
        let mut p = params(false);
        p.kc.cxn_distrib = DVector::zeros(23);
        let mut w = DMatrix::zeros(p.kc.n, 23);
        assert!(build_wpnkc(&p, &mut w, &mut StdRng::seed_from_u64(0)).is_err());
    }
}
