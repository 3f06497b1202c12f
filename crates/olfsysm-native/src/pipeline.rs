//! Pipeline Driver
//!
//! Runs the model in three odor-parallel phases on a fixed worker pool:
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌────────────────────────────────┐
//! │ 1. ORN + LN  │──►│ 2. PN        │──►│ 3. [connectivity + tuning]     │
//! │  per odor    │   │  per odor    │   │    KC per odor -> responses    │
//! └──────────────┘   └──────────────┘   └────────────────────────────────┘
//! ```
//!
//! Odors are independent within a phase. Random draws come from one owned
//! generator; before a parallel phase one child seed per odor is drawn from
//! it in odor order, so results do not depend on scheduling or thread count.

use std::time::Instant;

use olfsysm_core::{CoreError, ModelParams, RunVars};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::connectivity;
use crate::error::{SimError, SimResult};
use crate::layers::{pn_noise, sim_kc, sim_ln, sim_orn, sim_pn, KcResponse};
use crate::tuner::{self, TuningReport};

// ============================================================================
// Simulator
// ============================================================================

/// Owns the worker pool and the random generator for a series of runs.
pub struct Simulator {
    pool: ThreadPool,
    rng: StdRng,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator").field("threads", &self.threads()).finish_non_exhaustive()
    }
}

impl Simulator {
    /// Simulator with `threads` workers (0 = one per core) and an optional seed.
    pub fn new(threads: usize, seed: Option<u64>) -> SimResult<Self> {
        let mut builder = SimulatorBuilder::new().threads(threads);
        if let Some(seed) = seed {
            builder = builder.seed(seed);
        }
        builder.build()
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Draw a fresh PN -> KC connectivity matrix into `rv.kc.w_pnkc`.
    pub fn build_wpnkc(&mut self, params: &ModelParams, rv: &mut RunVars) -> SimResult<()> {
        check_shapes(params, rv)?;
        connectivity::build_wpnkc(params, &mut rv.kc.w_pnkc, &mut self.rng)?;
        rv.log.log(format!("built wPNKC: {} KCs x {} claws", rv.n_kcs(), params.kc.nclaws));
        Ok(())
    }

    /// Choose KC thresholds and tune APL weights against the current PN series.
    pub fn fit_sparseness(&mut self, params: &ModelParams, rv: &mut RunVars) -> SimResult<TuningReport> {
        check_shapes(params, rv)?;
        let started = Instant::now();
        let report = tuner::fit_sparseness(params, rv, &self.pool)?;
        tracing::info!(
            target: "olfsysm::pipeline",
            "sparseness fit: {} iterations, sparsity {:?} ({:.2?})",
            report.iterations,
            report.sparsity,
            started.elapsed()
        );
        Ok(report)
    }

    /// Phase 1: ORN rates and LN inhibition for every odor.
    pub fn run_orn_ln_sims(&mut self, params: &ModelParams, rv: &mut RunVars) -> SimResult<()> {
        check_shapes(params, rv)?;
        let started = Instant::now();

        let orn = &mut rv.orn.sims;
        let (inh_a, inh_b) = (&mut rv.ln.inh_a, &mut rv.ln.inh_b);
        self.pool.install(|| {
            orn.par_iter_mut()
                .zip(inh_a.par_iter_mut())
                .zip(inh_b.par_iter_mut())
                .enumerate()
                .for_each(|(odor, ((orn_t, a), b))| {
                    sim_orn(params, odor, orn_t);
                    sim_ln(params, orn_t, a, b);
                });
        });

        rv.log.log(format!("ORN/LN sims done for {} odors", rv.n_odors()));
        tracing::info!(target: "olfsysm::pipeline", "ORN/LN phase done ({:.2?})", started.elapsed());
        Ok(())
    }

    /// Phase 2: PN rates for every odor, from the phase 1 outputs.
    pub fn run_pn_sims(&mut self, params: &ModelParams, rv: &mut RunVars) -> SimResult<()> {
        check_shapes(params, rv)?;
        let noise = pn_noise(params)?;
        let seeds = self.child_seeds(rv.n_odors());
        let started = Instant::now();

        let (orn, ln) = (&rv.orn.sims, &rv.ln);
        let pn = &mut rv.pn.sims;
        self.pool.install(|| {
            pn.par_iter_mut().zip(seeds.par_iter()).enumerate().for_each(|(odor, (pn_t, &seed))| {
                let mut rng = StdRng::seed_from_u64(seed);
                sim_pn(
                    params,
                    &orn[odor],
                    &ln.inh_a[odor],
                    &ln.inh_b[odor],
                    pn_t,
                    noise.as_ref(),
                    &mut rng,
                );
            });
        });

        rv.log.log(format!("PN sims done for {} odors", rv.n_odors()));
        tracing::info!(target: "olfsysm::pipeline", "PN phase done ({:.2?})", started.elapsed());
        Ok(())
    }

    /// Phase 3: KC responses for every odor.
    ///
    /// With `regen`, connectivity is redrawn and the sparseness fit rerun
    /// first, and the fit's report is returned; otherwise the existing
    /// connectivity, thresholds and weights are reused.
    pub fn run_kc_sims(
        &mut self,
        params: &ModelParams,
        rv: &mut RunVars,
        regen: bool,
    ) -> SimResult<Option<TuningReport>> {
        check_shapes(params, rv)?;
        let report = if regen {
            self.build_wpnkc(params, rv)?;
            Some(self.fit_sparseness(params, rv)?)
        } else {
            None
        };

        let started = Instant::now();
        let (kc, pn) = (&rv.kc, &rv.pn.sims);
        let responses: Vec<KcResponse> = self.pool.install(|| {
            pn.par_iter().map(|pn_t| sim_kc(params, kc, pn_t)).collect()
        });

        for (odor, response) in responses.iter().enumerate() {
            rv.kc.responses.set_column(odor, &response.binary());
            rv.kc.spike_counts.set_column(odor, &response.spike_counts);
        }

        rv.log.log(format!(
            "KC sims done for {} odors, response sparsity {:.4}",
            rv.n_odors(),
            rv.response_sparsity()
        ));
        tracing::info!(target: "olfsysm::pipeline", "KC phase done ({:.2?})", started.elapsed());
        Ok(report)
    }

    /// All three phases in order.
    pub fn run_all(
        &mut self,
        params: &ModelParams,
        rv: &mut RunVars,
        regen: bool,
    ) -> SimResult<Option<TuningReport>> {
        self.run_orn_ln_sims(params, rv)?;
        self.run_pn_sims(params, rv)?;
        self.run_kc_sims(params, rv, regen)
    }

    fn child_seeds(&mut self, n: usize) -> Vec<u64> {
        (0..n).map(|_| self.rng.gen()).collect()
    }
}

/// Run state must have been sized from parameters with the same shapes.
fn check_shapes(params: &ModelParams, rv: &RunVars) -> SimResult<()> {
    let expected = (params.kc.n, params.n_odors());
    let actual = rv.kc.responses.shape();
    if expected != actual {
        return Err(CoreError::ShapeMismatch { what: "kc.responses", expected, actual }.into());
    }

    let delta = &params.orn.data.delta;
    if delta.nrows() != params.n_gloms() {
        let expected = (params.n_gloms(), delta.ncols());
        return Err(CoreError::ShapeMismatch { what: "orn.data.delta", expected, actual: delta.shape() }.into());
    }

    let expected = (params.n_gloms(), params.time.steps_all());
    let actual = rv.orn.sims.first().map_or(expected, |m| m.shape());
    if expected != actual {
        return Err(CoreError::ShapeMismatch { what: "orn.sims", expected, actual }.into());
    }
    Ok(())
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Simulator`].
#[derive(Clone, Debug, Default)]
pub struct SimulatorBuilder {
    threads: usize,
    seed: Option<u64>,
}

impl SimulatorBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set worker count (0 = one per core)
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Seed the random generator
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the simulator
    pub fn build(self) -> SimResult<Simulator> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|i| format!("olfsysm-{}", i))
            .build()
            .map_err(|e| SimError::ThreadPool(e.to_string()))?;
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        tracing::debug!(
            target: "olfsysm::pipeline",
            "simulator ready: {} threads, seed {:?}",
            pool.current_num_threads(),
            self.seed
        );
        Ok(Simulator { pool, rng })
    }
}

// ============================================================================
// Tests
// ============================================================================
