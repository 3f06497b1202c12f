//! Simulation Time Grid
//!
//! Derives step counts and stimulus windows from the time-window parameters.
//!
//! # Timeline
//!
//! ```text
//!  pre_start          start        stim.start     stim.end        end
//!      │   settling     │   KC window   │  stimulus    │              │
//!      ├────────────────┼───────────────┼══════════════┼──────────────┤
//!      0           start_step    stim_start_step  stim_end_step   steps_all
//! ```
//!
//! ORN, LN and PN layers are integrated over the whole grid so they can settle
//! before `start`; the KC layer only integrates from `start_step` onward.
//! Every step index is relative to `pre_start`.

use std::ops::Range;

use nalgebra::{DMatrix, RowDVector};
use serde::{Deserialize, Serialize};

/// Absorbs the binary representation error of `dt` before flooring a step count.
const STEP_EPSILON: f64 = 1e-9;

/// Number of whole `dt` steps between two instants (zero if `to <= from`).
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn steps_between(from: f64, to: f64, dt: f64) -> usize {
    if to <= from || dt <= 0.0 {
        return 0;
    }
    ((to - from) / dt + STEP_EPSILON).floor() as usize
}

/// Stimulus presentation window (seconds).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimWindow {
    /// Stimulus onset
    pub start: f64,
    /// Stimulus offset
    pub end: f64,
}

impl Default for StimWindow {
    fn default() -> Self {
        Self { start: 0.0, end: 0.5 }
    }
}

/// Time-window parameters (seconds).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeParams {
    /// Start of ORN/LN/PN integration (settling period begins here)
    pub pre_start: f64,
    /// Start of KC integration
    pub start: f64,
    /// End of the simulation
    pub end: f64,
    /// Stimulus window
    pub stim: StimWindow,
    /// Integration step
    pub dt: f64,
}

impl Default for TimeParams {
    fn default() -> Self {
        Self {
            pre_start: -2.0,
            start: -0.5,
            end: 0.75,
            stim: StimWindow::default(),
            dt: 0.5e-3,
        }
    }
}

impl TimeParams {
    /// Total number of steps from `pre_start` to `end`.
    #[inline]
    #[must_use]
    pub fn steps_all(&self) -> usize {
        steps_between(self.pre_start, self.end, self.dt)
    }

    /// Number of "real" steps from `start` to `end`.
    #[inline]
    #[must_use]
    pub fn steps(&self) -> usize {
        steps_between(self.start, self.end, self.dt)
    }

    /// Step index of `start`.
    #[inline]
    #[must_use]
    pub fn start_step(&self) -> usize {
        steps_between(self.pre_start, self.start, self.dt)
    }

    /// Step index of stimulus onset.
    #[inline]
    #[must_use]
    pub fn stim_start_step(&self) -> usize {
        steps_between(self.pre_start, self.stim.start, self.dt)
    }

    /// Step index of stimulus offset (exclusive).
    #[inline]
    #[must_use]
    pub fn stim_end_step(&self) -> usize {
        steps_between(self.pre_start, self.stim.end, self.dt)
    }

    /// Row of ones of length `steps_all()`.
    #[must_use]
    pub fn ones_row(&self) -> RowDVector<f64> {
        RowDVector::from_element(self.steps_all(), 1.0)
    }

    /// Stimulus indicator: 1.0 on `[stim_start_step, stim_end_step)`, 0.0 elsewhere.
    #[must_use]
    pub fn stim_row(&self) -> RowDVector<f64> {
        let n = self.steps_all();
        let on = self.stim_start_step().min(n)..self.stim_end_step().min(n);
        RowDVector::from_fn(n, |_, t| if on.contains(&t) { 1.0 } else { 0.0 })
    }

    /// Window used to sample spontaneous PN activity: from halfway between
    /// `start` and stimulus onset, up to stimulus onset.
    #[must_use]
    pub fn spont_window(&self) -> Range<usize> {
        let base = self.start_step();
        let from = base + steps_between(self.start, self.stim.start, 2.0 * self.dt);
        let to = base + steps_between(self.start, self.stim.start, self.dt);
        from.min(self.steps_all())..to.min(self.steps_all())
    }

    /// Copy of a time series with the settling (pre-`start`) columns removed.
    #[must_use]
    pub fn trim_pretime(&self, series: &DMatrix<f64>) -> DMatrix<f64> {
        let skip = self.start_step().min(series.ncols());
        series.columns(skip, series.ncols() - skip).into_owned()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_step_counts() {
        let time = TimeParams::default();
        assert_eq!(time.steps_all(), 5500);
        assert_eq!(time.start_step(), 3000);
        assert_eq!(time.steps(), 2500);
        assert_eq!(time.stim_start_step(), 4000);
        assert_eq!(time.stim_end_step(), 5000);
    }

    #[test]
    fn test_stim_row_half_open() {
        let time = TimeParams::default();
        let row = time.stim_row();
        assert_eq!(row.len(), time.steps_all());

        let (on, off) = (time.stim_start_step(), time.stim_end_step());
        for (t, &v) in row.iter().enumerate() {
            let expected = if t >= on && t < off { 1.0 } else { 0.0 };
            assert_eq!(v, expected, "step {}", t);
        }
        assert_eq!(row.sum(), (off - on) as f64);
    }

    #[test]
    fn test_stim_row_clipped_to_grid() {
        let time = TimeParams {
            stim: StimWindow { start: 0.5, end: 5.0 },
            ..TimeParams::default()
        };
        let row = time.stim_row();
        assert_eq!(row.len(), 5500);
        assert_eq!(row[5499], 1.0);
        assert_eq!(row[4999], 0.0);
    }

    #[test]
    fn test_degenerate_window() {
        let time = TimeParams { end: -3.0, ..TimeParams::default() };
        assert_eq!(time.steps_all(), 0);
        assert_eq!(time.stim_row().len(), 0);
    }

    #[test]
    fn test_spont_window() {
        let time = TimeParams::default();
        // halfway between -0.5 and 0.0 is -0.25 -> step 3500
        assert_eq!(time.spont_window(), 3500..4000);
    }

    #[test]
    fn test_trim_pretime() {
        let time = TimeParams { pre_start: 0.0, start: 0.002, end: 0.005, dt: 0.001, ..TimeParams::default() };
        let series = DMatrix::from_fn(2, time.steps_all(), |r, c| (r * 10 + c) as f64);
        let trimmed = time.trim_pretime(&series);
        assert_eq!(trimmed.ncols(), 3);
        assert_eq!(trimmed[(1, 0)], 12.0);
    }
}
