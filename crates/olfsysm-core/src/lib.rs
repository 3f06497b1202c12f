//! Olfsysm Core - Model configuration and run state
//!
//! This crate provides the data model for the olfactory pathway simulator:
//! the parameter tree, the simulation time grid, the per-run state matrices,
//! the named-field access tables, the input-data loader, and the run logger.
//! It contains no numerics; the layer integrators and the sparseness tuner
//! live in `olfsysm-native`.
//!
//! # Modules
//!
//! - [`params`]: Model parameters (`ModelParams`) with published defaults
//! - [`time`]: Time grid and stimulus windows
//! - [`run`]: Per-run state (`RunVars`) sized from a parameter snapshot
//! - [`access`]: Dotted-key get/set over parameters and run state
//! - [`data`]: ORN response table loader
//! - [`log`]: Thread-safe, redirectable run logger
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```rust
//! use nalgebra::{DMatrix, DVector};
//! use olfsysm_core::{FieldValue, ModelParams, RunVars};
//!
//! let mut params = ModelParams::default();
//! params.set_orn_data(DVector::zeros(23), DMatrix::zeros(23, 4)).unwrap();
//! params.set_named("kc.N", FieldValue::UInt(100)).unwrap();
//!
//! let run = RunVars::new(&params);
//! assert_eq!(run.kc.w_pnkc.shape(), (100, 23));
//! assert_eq!(run.kc.responses.shape(), (100, 4));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod access;
pub mod data;
pub mod error;
pub mod log;
pub mod params;
pub mod run;
pub mod time;

// Re-export commonly used types at crate root
pub use access::{FieldKind, FieldValue, ParamKey, RunVarKey};
pub use data::{load_hc_data, load_hc_data_with_layout, parse_hc_data, HcData, HcDataLayout};
pub use error::{CoreError, CoreResult};
pub use log::Logger;
pub use params::{
    KcParams, LnParams, ModelParams, NoiseParams, OrnData, OrnParams, PnParams, ThresholdMode,
};
pub use run::{KcRun, LnRun, OrnRun, PnRun, RunVars};
pub use time::{StimWindow, TimeParams};
