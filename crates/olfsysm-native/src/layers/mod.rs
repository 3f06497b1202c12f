//! Layer Simulators
//!
//! Explicit-Euler integrators for the four populations of the pathway, one
//! odor per call. Each call starts from fixed baseline values and keeps no
//! state between calls; results are written into caller-owned buffers.
//!
//! ```text
//!  ORN ──► LN (inhA, inhB)
//!   │          │
//!   └────► PN ◄┘ ──► KC ◄──► APL
//! ```
//!
//! Every step after the first is `prev + dt/tau * derivative`.

pub mod kc;
pub mod ln;
pub mod orn;
pub mod pn;

pub use kc::{sim_kc, KcResponse};
pub use ln::sim_ln;
pub use orn::{sim_orn, smooth_exp};
pub use pn::{pn_noise, sim_pn};
