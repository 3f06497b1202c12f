//! Named-Field Access
//!
//! Dotted-key get/set over `ModelParams` and `RunVars` for callers that only
//! speak strings (command line, scripting hosts). The key sets are closed
//! enums, so the numeric core never looks up a field by name; strings are
//! resolved once at the boundary.
//!
//! ```text
//! "kc.sp_target" ──FromStr──▶ ParamKey::KcSpTarget ──get/set──▶ FieldValue::Float
//! ```

use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector, RowDVector};
use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::params::{ModelParams, ThresholdMode};
use crate::run::RunVars;

// ============================================================================
// Values
// ============================================================================

/// Kind of value a field holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `f64`
    Float,
    /// `usize`
    UInt,
    /// `bool`
    Bool,
    /// Text
    Str,
    /// List of 0-based indices
    IndexList,
    /// Column vector
    Vector,
    /// Row vector
    Row,
    /// Matrix
    Matrix,
    /// One matrix per odor
    Matrices,
    /// One row per odor
    Rows,
    /// `f64` that may be absent
    MaybeFloat,
}

impl FieldKind {
    /// Human-readable kind name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::UInt => "unsigned integer",
            Self::Bool => "bool",
            Self::Str => "string",
            Self::IndexList => "index list",
            Self::Vector => "column vector",
            Self::Row => "row vector",
            Self::Matrix => "matrix",
            Self::Matrices => "matrix list",
            Self::Rows => "row list",
            Self::MaybeFloat => "optional float",
        }
    }
}

/// A field value crossing the named-field boundary.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Scalar float
    Float(f64),
    /// Scalar count
    UInt(usize),
    /// Flag
    Bool(bool),
    /// Text
    Str(String),
    /// Index list
    IndexList(Vec<usize>),
    /// Column vector
    Vector(DVector<f64>),
    /// Row vector
    Row(RowDVector<f64>),
    /// Matrix
    Matrix(DMatrix<f64>),
    /// Per-odor matrices
    Matrices(Vec<DMatrix<f64>>),
    /// Per-odor rows
    Rows(Vec<RowDVector<f64>>),
    /// Optional float
    MaybeFloat(Option<f64>),
}

impl FieldValue {
    /// Kind of this value.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::Float(_) => FieldKind::Float,
            Self::UInt(_) => FieldKind::UInt,
            Self::Bool(_) => FieldKind::Bool,
            Self::Str(_) => FieldKind::Str,
            Self::IndexList(_) => FieldKind::IndexList,
            Self::Vector(_) => FieldKind::Vector,
            Self::Row(_) => FieldKind::Row,
            Self::Matrix(_) => FieldKind::Matrix,
            Self::Matrices(_) => FieldKind::Matrices,
            Self::Rows(_) => FieldKind::Rows,
            Self::MaybeFloat(_) => FieldKind::MaybeFloat,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: impl Iterator<Item = T>) -> fmt::Result {
            write!(f, "[")?;
            for (i, item) in items.enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item)?;
            }
            write!(f, "]")
        }

        match self {
            Self::Float(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Str(v) => write!(f, "{}", v),
            Self::IndexList(v) => list(f, v.iter()),
            Self::Vector(v) => list(f, v.iter()),
            Self::Row(v) => list(f, v.iter()),
            Self::Matrix(m) => write!(f, "<{}x{} matrix>", m.nrows(), m.ncols()),
            Self::Matrices(ms) => write!(f, "<{} matrices>", ms.len()),
            Self::Rows(rs) => write!(f, "<{} rows>", rs.len()),
            Self::MaybeFloat(Some(v)) => write!(f, "{}", v),
            Self::MaybeFloat(None) => write!(f, "none"),
        }
    }
}

// ============================================================================
// Key Tables
// ============================================================================

macro_rules! field_keys {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $key:literal : $kind:ident,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(#[doc = $key] $variant,)*
        }

        impl $name {
            /// Every key, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// Dotted key string.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $key,)*
                }
            }

            /// Kind of value stored under this key.
            #[must_use]
            pub const fn kind(self) -> FieldKind {
                match self {
                    $(Self::$variant => FieldKind::$kind,)*
                }
            }

            fn lookup(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|k| k.name() == name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

field_keys! {
    /// Addressable model parameters.
    pub enum ParamKey {
        TimePreStart => "time.pre_start": Float,
        TimeStart => "time.start": Float,
        TimeEnd => "time.end": Float,
        TimeStimStart => "time.stim.start": Float,
        TimeStimEnd => "time.stim.end": Float,
        TimeDt => "time.dt": Float,
        OrnTaum => "orn.taum": Float,
        OrnPhysicalGloms => "orn.n_physical_gloms": UInt,
        OrnSpont => "orn.data.spont": Vector,
        OrnDelta => "orn.data.delta": Matrix,
        OrnRates => "orn.data.rates": Matrix,
        LnTaum => "ln.taum": Float,
        LnTauGa => "ln.tauGA": Float,
        LnTauGb => "ln.tauGB": Float,
        LnThr => "ln.thr": Float,
        LnInhsc => "ln.inhsc": Float,
        LnInhadd => "ln.inhadd": Float,
        PnTaum => "pn.taum": Float,
        PnOffset => "pn.offset": Float,
        PnTanhsc => "pn.tanhsc": Float,
        PnInhsc => "pn.inhsc": Float,
        PnInhadd => "pn.inhadd": Float,
        PnNoiseMean => "pn.noise.mean": Float,
        PnNoiseSd => "pn.noise.sd": Float,
        KcN => "kc.N": UInt,
        KcNclaws => "kc.nclaws": UInt,
        KcUniformPns => "kc.uniform_pns": Bool,
        KcCxnDistrib => "kc.cxn_distrib": Vector,
        KcEnableApl => "kc.enable_apl": Bool,
        KcThrMode => "kc.thr_mode": Str,
        KcFixedThr => "kc.fixed_thr": Float,
        KcUseFixedThr => "kc.use_fixed_thr": Bool,
        KcUseHomeostaticThrs => "kc.use_homeostatic_thrs": Bool,
        KcSpTarget => "kc.sp_target": Float,
        KcSpAcc => "kc.sp_acc": Float,
        KcSpLrCoeff => "kc.sp_lr_coeff": Float,
        KcMaxIters => "kc.max_iters": UInt,
        KcTuneFrom => "kc.tune_from": IndexList,
        KcTaum => "kc.taum": Float,
        KcAplTaum => "kc.apl_taum": Float,
        KcTauApl2Kc => "kc.tau_apl2kc": Float,
    }
}

field_keys! {
    /// Addressable run variables.
    pub enum RunVarKey {
        OrnSims => "orn.sims": Matrices,
        LnInhA => "ln.inhA.sims": Rows,
        LnInhB => "ln.inhB.sims": Rows,
        PnSims => "pn.sims": Matrices,
        KcWPnKc => "kc.wPNKC": Matrix,
        KcWAplKc => "kc.wAPLKC": Vector,
        KcWKcApl => "kc.wKCAPL": Row,
        KcThr => "kc.thr": Vector,
        KcResponses => "kc.responses": Matrix,
        KcSpikeCounts => "kc.spike_counts": Matrix,
        KcTuningIters => "kc.tuning_iters": UInt,
        KcTuningSparsity => "kc.tuning_sparsity": MaybeFloat,
    }
}

impl FromStr for ParamKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| CoreError::UnknownParameter(s.to_string()))
    }
}

impl FromStr for RunVarKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| CoreError::UnknownRunVariable(s.to_string()))
    }
}

impl ParamKey {
    /// Derived parameters that can be read but not written.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::OrnRates)
    }

    /// Parse command-line text into a value of this key's kind.
    ///
    /// Lists are comma-separated; matrices cannot be given as text.
    pub fn parse_value(self, text: &str) -> CoreResult<FieldValue> {
        let mismatch = || CoreError::TypeMismatch { key: self.name(), expected: self.kind().name() };
        let text = text.trim();
        let items = || text.split(',').map(str::trim).filter(|s| !s.is_empty());

        Ok(match self.kind() {
            FieldKind::Float => FieldValue::Float(text.parse().map_err(|_| mismatch())?),
            FieldKind::UInt => FieldValue::UInt(text.parse().map_err(|_| mismatch())?),
            FieldKind::Bool => FieldValue::Bool(text.parse().map_err(|_| mismatch())?),
            FieldKind::Str => FieldValue::Str(text.to_string()),
            FieldKind::IndexList => FieldValue::IndexList(
                items().map(str::parse::<usize>).collect::<Result<_, _>>().map_err(|_| mismatch())?,
            ),
            FieldKind::Vector => {
                let v: Vec<f64> = items().map(str::parse::<f64>).collect::<Result<_, _>>().map_err(|_| mismatch())?;
                FieldValue::Vector(DVector::from_vec(v))
            }
            _ => return Err(mismatch()),
        })
    }
}

// ============================================================================
// Value Extraction
// ============================================================================

struct Slot(&'static str);

impl Slot {
    fn mismatch(&self, expected: FieldKind) -> CoreError {
        CoreError::TypeMismatch { key: self.0, expected: expected.name() }
    }

    #[allow(clippy::cast_precision_loss)]
    fn float(&self, v: FieldValue) -> CoreResult<f64> {
        match v {
            FieldValue::Float(x) => Ok(x),
            FieldValue::UInt(x) => Ok(x as f64),
            _ => Err(self.mismatch(FieldKind::Float)),
        }
    }

    fn uint(&self, v: FieldValue) -> CoreResult<usize> {
        match v {
            FieldValue::UInt(x) => Ok(x),
            _ => Err(self.mismatch(FieldKind::UInt)),
        }
    }

    fn bool(&self, v: FieldValue) -> CoreResult<bool> {
        match v {
            FieldValue::Bool(x) => Ok(x),
            _ => Err(self.mismatch(FieldKind::Bool)),
        }
    }

    fn string(&self, v: FieldValue) -> CoreResult<String> {
        match v {
            FieldValue::Str(x) => Ok(x),
            _ => Err(self.mismatch(FieldKind::Str)),
        }
    }

    fn indices(&self, v: FieldValue) -> CoreResult<Vec<usize>> {
        match v {
            FieldValue::IndexList(x) => Ok(x),
            _ => Err(self.mismatch(FieldKind::IndexList)),
        }
    }

    fn vector(&self, v: FieldValue) -> CoreResult<DVector<f64>> {
        match v {
            FieldValue::Vector(x) => Ok(x),
            _ => Err(self.mismatch(FieldKind::Vector)),
        }
    }

    fn row(&self, v: FieldValue) -> CoreResult<RowDVector<f64>> {
        match v {
            FieldValue::Row(x) => Ok(x),
            _ => Err(self.mismatch(FieldKind::Row)),
        }
    }

    fn matrix(&self, v: FieldValue) -> CoreResult<DMatrix<f64>> {
        match v {
            FieldValue::Matrix(x) => Ok(x),
            _ => Err(self.mismatch(FieldKind::Matrix)),
        }
    }

    fn matrices(&self, v: FieldValue) -> CoreResult<Vec<DMatrix<f64>>> {
        match v {
            FieldValue::Matrices(x) => Ok(x),
            _ => Err(self.mismatch(FieldKind::Matrices)),
        }
    }

    fn rows(&self, v: FieldValue) -> CoreResult<Vec<RowDVector<f64>>> {
        match v {
            FieldValue::Rows(x) => Ok(x),
            _ => Err(self.mismatch(FieldKind::Rows)),
        }
    }

    fn maybe_float(&self, v: FieldValue) -> CoreResult<Option<f64>> {
        match v {
            FieldValue::MaybeFloat(x) => Ok(x),
            FieldValue::Float(x) => Ok(Some(x)),
            _ => Err(self.mismatch(FieldKind::MaybeFloat)),
        }
    }

    /// Replacement must keep the shape of what it replaces.
    fn same_shape(&self, current: (usize, usize), new: (usize, usize)) -> CoreResult<()> {
        if current == new {
            Ok(())
        } else {
            Err(CoreError::ShapeMismatch { what: self.0, expected: current, actual: new })
        }
    }
}

// ============================================================================
// Model Parameters
// ============================================================================

impl ModelParams {
    /// Read a parameter.
    #[must_use]
    pub fn get(&self, key: ParamKey) -> FieldValue {
        use FieldValue::{Bool, Float, IndexList, Matrix, Str, UInt, Vector};
        use ParamKey as K;

        match key {
            K::TimePreStart => Float(self.time.pre_start),
            K::TimeStart => Float(self.time.start),
            K::TimeEnd => Float(self.time.end),
            K::TimeStimStart => Float(self.time.stim.start),
            K::TimeStimEnd => Float(self.time.stim.end),
            K::TimeDt => Float(self.time.dt),
            K::OrnTaum => Float(self.orn.taum),
            K::OrnPhysicalGloms => UInt(self.orn.n_physical_gloms),
            K::OrnSpont => Vector(self.orn.data.spont.clone()),
            K::OrnDelta => Matrix(self.orn.data.delta.clone()),
            K::OrnRates => Matrix(self.orn.data.rates()),
            K::LnTaum => Float(self.ln.taum),
            K::LnTauGa => Float(self.ln.tau_ga),
            K::LnTauGb => Float(self.ln.tau_gb),
            K::LnThr => Float(self.ln.thr),
            K::LnInhsc => Float(self.ln.inhsc),
            K::LnInhadd => Float(self.ln.inhadd),
            K::PnTaum => Float(self.pn.taum),
            K::PnOffset => Float(self.pn.offset),
            K::PnTanhsc => Float(self.pn.tanhsc),
            K::PnInhsc => Float(self.pn.inhsc),
            K::PnInhadd => Float(self.pn.inhadd),
            K::PnNoiseMean => Float(self.pn.noise.mean),
            K::PnNoiseSd => Float(self.pn.noise.sd),
            K::KcN => UInt(self.kc.n),
            K::KcNclaws => UInt(self.kc.nclaws),
            K::KcUniformPns => Bool(self.kc.uniform_pns),
            K::KcCxnDistrib => Vector(self.kc.cxn_distrib.clone()),
            K::KcEnableApl => Bool(self.kc.enable_apl),
            K::KcThrMode => Str(self.kc.thr_mode.name().to_string()),
            K::KcFixedThr => Float(self.kc.fixed_thr),
            K::KcUseFixedThr => Bool(self.kc.thr_mode == ThresholdMode::Fixed),
            K::KcUseHomeostaticThrs => Bool(self.kc.thr_mode == ThresholdMode::Homeostatic),
            K::KcSpTarget => Float(self.kc.sp_target),
            K::KcSpAcc => Float(self.kc.sp_acc),
            K::KcSpLrCoeff => Float(self.kc.sp_lr_coeff),
            K::KcMaxIters => UInt(self.kc.max_iters),
            K::KcTuneFrom => IndexList(self.kc.tune_from.clone()),
            K::KcTaum => Float(self.kc.taum),
            K::KcAplTaum => Float(self.kc.apl_taum),
            K::KcTauApl2Kc => Float(self.kc.tau_apl2kc),
        }
    }

    /// Write a parameter.
    ///
    /// The two threshold flags are views of `kc.thr_mode`: setting one to
    /// `true` selects its mode, setting it to `false` falls back to the
    /// global mode if that mode was active.
    pub fn set(&mut self, key: ParamKey, value: FieldValue) -> CoreResult<()> {
        use ParamKey as K;
        let s = Slot(key.name());

        match key {
            K::TimePreStart => self.time.pre_start = s.float(value)?,
            K::TimeStart => self.time.start = s.float(value)?,
            K::TimeEnd => self.time.end = s.float(value)?,
            K::TimeStimStart => self.time.stim.start = s.float(value)?,
            K::TimeStimEnd => self.time.stim.end = s.float(value)?,
            K::TimeDt => self.time.dt = s.float(value)?,
            K::OrnTaum => self.orn.taum = s.float(value)?,
            K::OrnPhysicalGloms => self.orn.n_physical_gloms = s.uint(value)?,
            K::OrnSpont => self.set_spont(s.vector(value)?)?,
            K::OrnDelta => self.set_delta(s.matrix(value)?)?,
            K::OrnRates => return Err(CoreError::ReadOnly(key.name())),
            K::LnTaum => self.ln.taum = s.float(value)?,
            K::LnTauGa => self.ln.tau_ga = s.float(value)?,
            K::LnTauGb => self.ln.tau_gb = s.float(value)?,
            K::LnThr => self.ln.thr = s.float(value)?,
            K::LnInhsc => self.ln.inhsc = s.float(value)?,
            K::LnInhadd => self.ln.inhadd = s.float(value)?,
            K::PnTaum => self.pn.taum = s.float(value)?,
            K::PnOffset => self.pn.offset = s.float(value)?,
            K::PnTanhsc => self.pn.tanhsc = s.float(value)?,
            K::PnInhsc => self.pn.inhsc = s.float(value)?,
            K::PnInhadd => self.pn.inhadd = s.float(value)?,
            K::PnNoiseMean => self.pn.noise.mean = s.float(value)?,
            K::PnNoiseSd => self.pn.noise.sd = s.float(value)?,
            K::KcN => self.kc.n = s.uint(value)?,
            K::KcNclaws => self.kc.nclaws = s.uint(value)?,
            K::KcUniformPns => self.kc.uniform_pns = s.bool(value)?,
            K::KcCxnDistrib => self.kc.cxn_distrib = s.vector(value)?,
            K::KcEnableApl => self.kc.enable_apl = s.bool(value)?,
            K::KcThrMode => {
                self.kc.thr_mode = ThresholdMode::from_name(&s.string(value)?)
                    .ok_or_else(|| s.mismatch(FieldKind::Str))?;
            }
            K::KcFixedThr => self.kc.fixed_thr = s.float(value)?,
            K::KcUseFixedThr => self.set_mode_flag(ThresholdMode::Fixed, s.bool(value)?),
            K::KcUseHomeostaticThrs => self.set_mode_flag(ThresholdMode::Homeostatic, s.bool(value)?),
            K::KcSpTarget => self.kc.sp_target = s.float(value)?,
            K::KcSpAcc => self.kc.sp_acc = s.float(value)?,
            K::KcSpLrCoeff => self.kc.sp_lr_coeff = s.float(value)?,
            K::KcMaxIters => self.kc.max_iters = s.uint(value)?,
            K::KcTuneFrom => self.kc.tune_from = s.indices(value)?,
            K::KcTaum => self.kc.taum = s.float(value)?,
            K::KcAplTaum => self.kc.apl_taum = s.float(value)?,
            K::KcTauApl2Kc => self.kc.tau_apl2kc = s.float(value)?,
        }
        Ok(())
    }

    /// Read a parameter by dotted name.
    pub fn get_named(&self, name: &str) -> CoreResult<FieldValue> {
        Ok(self.get(name.parse()?))
    }

    /// Write a parameter by dotted name.
    pub fn set_named(&mut self, name: &str, value: FieldValue) -> CoreResult<()> {
        self.set(name.parse()?, value)
    }

    fn set_mode_flag(&mut self, mode: ThresholdMode, on: bool) {
        if on {
            self.kc.thr_mode = mode;
        } else if self.kc.thr_mode == mode {
            self.kc.thr_mode = ThresholdMode::Global;
        }
    }
}

// ============================================================================
// Run Variables
// ============================================================================

impl RunVars {
    /// Read a run variable.
    #[must_use]
    pub fn get(&self, key: RunVarKey) -> FieldValue {
        use FieldValue::{Matrices, Matrix, MaybeFloat, Row, Rows, UInt, Vector};
        use RunVarKey as K;

        match key {
            K::OrnSims => Matrices(self.orn.sims.clone()),
            K::LnInhA => Rows(self.ln.inh_a.clone()),
            K::LnInhB => Rows(self.ln.inh_b.clone()),
            K::PnSims => Matrices(self.pn.sims.clone()),
            K::KcWPnKc => Matrix(self.kc.w_pnkc.clone()),
            K::KcWAplKc => Vector(self.kc.w_aplkc.clone()),
            K::KcWKcApl => Row(self.kc.w_kcapl.clone()),
            K::KcThr => Vector(self.kc.thr.clone()),
            K::KcResponses => Matrix(self.kc.responses.clone()),
            K::KcSpikeCounts => Matrix(self.kc.spike_counts.clone()),
            K::KcTuningIters => UInt(self.kc.tuning_iters),
            K::KcTuningSparsity => MaybeFloat(self.kc.tuning_sparsity),
        }
    }

    /// Write a run variable. Replacements must keep their current shape.
    pub fn set(&mut self, key: RunVarKey, value: FieldValue) -> CoreResult<()> {
        use RunVarKey as K;
        let s = Slot(key.name());

        match key {
            K::OrnSims => replace_all(&s, &mut self.orn.sims, s.matrices(value)?)?,
            K::LnInhA => replace_all(&s, &mut self.ln.inh_a, s.rows(value)?)?,
            K::LnInhB => replace_all(&s, &mut self.ln.inh_b, s.rows(value)?)?,
            K::PnSims => replace_all(&s, &mut self.pn.sims, s.matrices(value)?)?,
            K::KcWPnKc => replace(&s, &mut self.kc.w_pnkc, s.matrix(value)?)?,
            K::KcWAplKc => replace(&s, &mut self.kc.w_aplkc, s.vector(value)?)?,
            K::KcWKcApl => replace(&s, &mut self.kc.w_kcapl, s.row(value)?)?,
            K::KcThr => replace(&s, &mut self.kc.thr, s.vector(value)?)?,
            K::KcResponses => replace(&s, &mut self.kc.responses, s.matrix(value)?)?,
            K::KcSpikeCounts => replace(&s, &mut self.kc.spike_counts, s.matrix(value)?)?,
            K::KcTuningIters => self.kc.tuning_iters = s.uint(value)?,
            K::KcTuningSparsity => self.kc.tuning_sparsity = s.maybe_float(value)?,
        }
        Ok(())
    }

    /// Read a run variable by dotted name.
    pub fn get_named(&self, name: &str) -> CoreResult<FieldValue> {
        Ok(self.get(name.parse()?))
    }

    /// Write a run variable by dotted name.
    pub fn set_named(&mut self, name: &str, value: FieldValue) -> CoreResult<()> {
        self.set(name.parse()?, value)
    }
}

fn replace<R, C, S>(
    slot: &Slot,
    current: &mut nalgebra::Matrix<f64, R, C, S>,
    new: nalgebra::Matrix<f64, R, C, S>,
) -> CoreResult<()>
where
    R: nalgebra::Dim,
    C: nalgebra::Dim,
    S: nalgebra::RawStorage<f64, R, C>,
{
    slot.same_shape(current.shape(), new.shape())?;
    *current = new;
    Ok(())
}

fn replace_all<R, C, S>(
    slot: &Slot,
    current: &mut Vec<nalgebra::Matrix<f64, R, C, S>>,
    new: Vec<nalgebra::Matrix<f64, R, C, S>>,
) -> CoreResult<()>
where
    R: nalgebra::Dim,
    C: nalgebra::Dim,
    S: nalgebra::RawStorage<f64, R, C>,
{
    slot.same_shape((current.len(), 1), (new.len(), 1))?;
    for (cur, m) in current.iter().zip(&new) {
        slot.same_shape(cur.shape(), m.shape())?;
    }
    *current = new;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_keys_round_trip_names() {
        for &key in ParamKey::ALL {
            assert_eq!(key.name().parse::<ParamKey>().unwrap(), key);
        }
        for &key in RunVarKey::ALL {
            assert_eq!(key.name().parse::<RunVarKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_unknown_keys() {
        let err = "kc.bogus".parse::<ParamKey>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownParameter(ref k) if k == "kc.bogus"));

        let err = RunVars::new(&ModelParams::default()).get_named("kc.nope").unwrap_err();
        assert!(matches!(err, CoreError::UnknownRunVariable(_)));
    }

    #[test]
    fn test_every_param_readable_and_writable() {
        let mut p = ModelParams::default();
        for &key in ParamKey::ALL {
            let value = p.get(key);
            assert_eq!(value.kind(), key.kind(), "{}", key);
            if key.is_read_only() {
                assert!(matches!(p.set(key, value), Err(CoreError::ReadOnly(_))));
            } else {
                p.set(key, value).unwrap();
            }
        }
        assert_eq!(p, ModelParams::default());
    }

    #[test]
    fn test_set_and_get_scalar() {
        let mut p = ModelParams::default();
        p.set_named("ln.tauGA", FieldValue::Float(0.25)).unwrap();
        p.set_named("kc.N", FieldValue::UInt(77)).unwrap();
        assert_eq!(p.ln.tau_ga, 0.25);
        assert_eq!(p.get_named("kc.N").unwrap(), FieldValue::UInt(77));

        // integers promote to float
        p.set(ParamKey::TimeDt, FieldValue::UInt(1)).unwrap();
        assert_eq!(p.time.dt, 1.0);
    }

    #[test]
    fn test_type_mismatch() {
        let mut p = ModelParams::default();
        let err = p.set(ParamKey::KcN, FieldValue::Float(1.5)).unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { key: "kc.N", .. }));

        let err = p.set(ParamKey::KcThrMode, FieldValue::Str("median".into())).unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { .. }));
    }

    #[test]
    fn test_threshold_flags() {
        let mut p = ModelParams::default();
        p.set(ParamKey::KcUseHomeostaticThrs, FieldValue::Bool(true)).unwrap();
        assert_eq!(p.kc.thr_mode, ThresholdMode::Homeostatic);

        // clearing an inactive flag changes nothing
        p.set(ParamKey::KcUseFixedThr, FieldValue::Bool(false)).unwrap();
        assert_eq!(p.kc.thr_mode, ThresholdMode::Homeostatic);

        p.set(ParamKey::KcUseHomeostaticThrs, FieldValue::Bool(false)).unwrap();
        assert_eq!(p.kc.thr_mode, ThresholdMode::Global);

        p.set(ParamKey::KcThrMode, FieldValue::Str("fixed".into())).unwrap();
        assert_eq!(p.get(ParamKey::KcUseFixedThr), FieldValue::Bool(true));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(ParamKey::KcSpTarget.parse_value("0.2").unwrap(), FieldValue::Float(0.2));
        assert_eq!(ParamKey::KcEnableApl.parse_value("false").unwrap(), FieldValue::Bool(false));
        assert_eq!(ParamKey::KcTuneFrom.parse_value("0, 2,5").unwrap(), FieldValue::IndexList(vec![0, 2, 5]));
        assert_eq!(ParamKey::KcTuneFrom.parse_value("").unwrap(), FieldValue::IndexList(vec![]));
        assert!(ParamKey::KcN.parse_value("-3").is_err());
        assert!(ParamKey::OrnDelta.parse_value("1,2").is_err());
    }

    #[test]
    fn test_orn_data_setters_check_shapes() {
        let mut p = ModelParams::default();
        p.set_orn_data(DVector::from_element(23, 1.0), DMatrix::zeros(23, 2)).unwrap();

        let err = p.set_named("orn.data.delta", FieldValue::Matrix(DMatrix::zeros(5, 2))).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { what: "orn.data.delta", .. }));
        let err = p.set_named("orn.data.spont", FieldValue::Vector(DVector::zeros(5))).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { what: "orn.data.spont", .. }));
        assert_eq!(p.n_gloms(), 23);
        assert_eq!(p.orn.data.delta.shape(), (23, 2));

        p.set_named("orn.data.delta", FieldValue::Matrix(DMatrix::from_element(23, 4, 2.0))).unwrap();
        assert_eq!(p.n_odors(), 4);
    }

    #[test]
    fn test_rates_are_read_only() {
        let mut p = ModelParams::default();
        p.set_orn_data(DVector::from_vec(vec![1.0, 2.0]), DMatrix::from_element(2, 1, 5.0)).unwrap();

        let rates = p.get_named("orn.data.rates").unwrap();
        assert_eq!(rates, FieldValue::Matrix(DMatrix::from_vec(2, 1, vec![6.0, 7.0])));

        let err = p.set_named("orn.data.rates", rates).unwrap_err();
        assert!(matches!(err, CoreError::ReadOnly("orn.data.rates")));
    }

    #[test]
    fn test_run_var_shape_is_fixed() {
        let mut p = ModelParams::default();
        p.set_orn_data(DVector::zeros(4), DMatrix::zeros(4, 2)).unwrap();
        p.kc.n = 10;
        let mut rv = RunVars::new(&p);

        let thr = DVector::from_element(10, 3.0);
        rv.set(RunVarKey::KcThr, FieldValue::Vector(thr.clone())).unwrap();
        assert_eq!(rv.kc.thr, thr);

        let err = rv.set(RunVarKey::KcThr, FieldValue::Vector(DVector::zeros(11))).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { what: "kc.thr", .. }));

        let err = rv.set(RunVarKey::OrnSims, FieldValue::Matrices(vec![DMatrix::zeros(4, 1)])).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_run_var_counters() {
        let mut rv = RunVars::new(&ModelParams::default());
        assert_eq!(rv.get(RunVarKey::KcTuningSparsity), FieldValue::MaybeFloat(None));
        rv.set_named("kc.tuning_sparsity", FieldValue::Float(0.1)).unwrap();
        rv.set_named("kc.tuning_iters", FieldValue::UInt(4)).unwrap();
        assert_eq!(rv.kc.tuning_sparsity, Some(0.1));
        assert_eq!(rv.kc.tuning_iters, 4);
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldValue::IndexList(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(FieldValue::Matrix(DMatrix::zeros(2, 3)).to_string(), "<2x3 matrix>");
        assert_eq!(FieldValue::MaybeFloat(None).to_string(), "none");
    }
}
