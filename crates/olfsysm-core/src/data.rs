//! Input Data Loading
//!
//! Parses the fixed-schema ORN response table:
//!
//! ```text
//! <header line>
//! <header line>
//! id1,id2,g0,g1,...,g23      one row per odor: odor-evoked rate changes
//! ...
//! id1,id2,g0,g1,...,g23      last row: spontaneous rates
//! ```
//!
//! One glomerulus column of the published dataset is unusable and always
//! skipped, so 24 columns yield G = 23 glomeruli.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nalgebra::{DMatrix, DVector};

use crate::error::{CoreError, CoreResult};
use crate::params::ModelParams;

/// Relative frequency with which each dataset column is chosen when drawing
/// PN->KC claws (index 7 is the unusable column).
pub const HC_CXN_WEIGHTS: [f64; 24] = [
    2.0, 24.0, 4.0, 30.0, 33.0, 8.0, 0.0, 0.0, 29.0, 6.0, 2.0, 4.0, 21.0, 18.0, 4.0, 12.0, 21.0,
    10.0, 27.0, 4.0, 26.0, 7.0, 26.0, 24.0,
];

/// Column layout of an ORN response table.
#[derive(Clone, Debug, PartialEq)]
pub struct HcDataLayout {
    /// Leading identifier columns per row
    pub id_columns: usize,
    /// Glomerulus columns following the identifiers
    pub glom_columns: usize,
    /// Glomerulus column (0-based, after the identifiers) to drop
    pub bad_column: Option<usize>,
    /// Connectivity draw weight per glomerulus column
    pub cxn_weights: Vec<f64>,
}

impl Default for HcDataLayout {
    fn default() -> Self {
        Self {
            id_columns: 2,
            glom_columns: HC_CXN_WEIGHTS.len(),
            bad_column: Some(7),
            cxn_weights: HC_CXN_WEIGHTS.to_vec(),
        }
    }
}

impl HcDataLayout {
    /// Glomerulus columns that are kept, in order.
    #[must_use]
    pub fn kept_columns(&self) -> Vec<usize> {
        (0..self.glom_columns).filter(|&c| Some(c) != self.bad_column).collect()
    }

    /// Number of glomeruli after dropping the bad column.
    #[must_use]
    pub fn n_gloms(&self) -> usize {
        self.kept_columns().len()
    }

    /// Connectivity draw weights for the kept glomeruli.
    #[must_use]
    pub fn kept_cxn_weights(&self) -> DVector<f64> {
        let kept = self.kept_columns();
        DVector::from_iterator(
            kept.len(),
            kept.iter().map(|&c| self.cxn_weights.get(c).copied().unwrap_or(0.0)),
        )
    }
}

/// Empirical connectivity draw weights for the 23 usable glomeruli.
#[must_use]
pub fn hc_cxn_weights() -> DVector<f64> {
    HcDataLayout::default().kept_cxn_weights()
}

/// Parsed ORN response table.
#[derive(Clone, Debug)]
pub struct HcData {
    /// Spontaneous rates (G)
    pub spont: DVector<f64>,
    /// Odor-evoked rate changes (G × O)
    pub delta: DMatrix<f64>,
    /// Odor labels built from the identifier columns
    pub odor_names: Vec<String>,
}

/// Load the default-layout table at `path` into `params`.
///
/// Overwrites `orn.data` and `kc.cxn_distrib`.
pub fn load_hc_data(params: &mut ModelParams, path: impl AsRef<Path>) -> CoreResult<()> {
    load_hc_data_with_layout(params, path, &HcDataLayout::default())
}

/// Load a table with an explicit column layout into `params`.
pub fn load_hc_data_with_layout(
    params: &mut ModelParams,
    path: impl AsRef<Path>,
    layout: &HcDataLayout,
) -> CoreResult<()> {
    let path = path.as_ref();
    let data = parse_hc_data(BufReader::new(File::open(path)?), layout)?;

    tracing::info!(
        "Loaded {} odors x {} glomeruli from {}",
        data.delta.ncols(),
        data.delta.nrows(),
        path.display()
    );

    params.orn.data.spont = data.spont;
    params.orn.data.delta = data.delta;
    params.orn.data.odor_names = data.odor_names;
    params.kc.cxn_distrib = layout.kept_cxn_weights();
    Ok(())
}

/// Parse a table from any buffered reader.
pub fn parse_hc_data(reader: impl BufRead, layout: &HcDataLayout) -> CoreResult<HcData> {
    let mut rows: Vec<(usize, String)> = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        // two header lines
        if idx < 2 || line.trim().is_empty() {
            continue;
        }
        rows.push((idx + 1, line));
    }

    let (spont_line, odor_lines) = rows
        .split_last()
        .ok_or(CoreError::MissingData("spontaneous rate row"))?;

    let kept = layout.kept_columns();
    let n_gloms = kept.len();

    let mut delta = DMatrix::zeros(n_gloms, odor_lines.len());
    let mut odor_names = Vec::with_capacity(odor_lines.len());
    for (odor, (line_no, line)) in odor_lines.iter().enumerate() {
        let (name, values) = parse_row(*line_no, line, layout, &kept)?;
        delta.set_column(odor, &values);
        odor_names.push(name);
    }

    let (_, spont) = parse_row(spont_line.0, &spont_line.1, layout, &kept)?;

    Ok(HcData { spont, delta, odor_names })
}

fn parse_row(
    line_no: usize,
    line: &str,
    layout: &HcDataLayout,
    kept: &[usize],
) -> CoreResult<(String, DVector<f64>)> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let needed = layout.id_columns + layout.glom_columns;
    if fields.len() < needed {
        return Err(CoreError::ShapeMismatch {
            what: "data row",
            expected: (1, needed),
            actual: (1, fields.len()),
        });
    }

    let name = fields[..layout.id_columns]
        .iter()
        .map(|f| f.trim_matches('"'))
        .collect::<Vec<_>>()
        .join(" ");

    let mut values = DVector::zeros(kept.len());
    for (g, &col) in kept.iter().enumerate() {
        let column = layout.id_columns + col;
        let text = fields[column];
        values[g] = text.parse::<f64>().map_err(|_| CoreError::Parse {
            line: line_no,
            column,
            value: text.to_string(),
        })?;
    }
    Ok((name, values))
}

// ============================================================================
// Tests
// ============================================================================
