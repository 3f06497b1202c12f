//! Olfsysm Native - Parallel pathway simulation and sparseness tuning
//!
//! This crate provides the numeric engine for the olfactory pathway model:
//! - Explicit-Euler ORN, LN, PN and KC layer integrators
//! - Random PN -> KC connectivity generation
//! - KC threshold selection and APL feedback tuning
//! - A pipeline driver running odors in parallel on a rayon pool
//!
//! # Modules
//!
//! - [`layers`]: Per-odor layer simulators
//! - [`connectivity`]: Claw sampling and the wPNKC matrix
//! - [`tuner`]: Sparseness fitting
//! - [`pipeline`]: `Simulator`, the three-phase driver
//!
//! # Example
//!
//! ```rust,no_run
//! use olfsysm_core::{load_hc_data, ModelParams, RunVars};
//! use olfsysm_native::Simulator;
//!
//! let mut params = ModelParams::default();
//! load_hc_data(&mut params, "hc_data.csv")?;
//!
//! let mut run = RunVars::new(&params);
//! let mut sim = Simulator::new(0, Some(42))?;
//! sim.run_all(&params, &mut run, true)?;
//! println!("tuned in {} iterations", run.kc.tuning_iters);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod connectivity;
pub mod error;
pub mod layers;
pub mod pipeline;
pub mod tuner;

// Re-export key types
pub use connectivity::{build_wpnkc, ClawDistribution};
pub use error::{SimError, SimResult};
pub use layers::KcResponse;
pub use pipeline::{Simulator, SimulatorBuilder};
pub use tuner::{PercentileScope, TuningReport};
