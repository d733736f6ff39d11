//! Error surface of the bounded solver.
//!
//! Variants fall into two families. Preconditions (malformed boxes, invalid
//! options, dimension mismatches) abort the caller; see
//! [`OptError::is_precondition`]. Everything else describes a numerical
//! failure inside a run, which `minimize_bounded` recovers from by
//! returning its best finite iterate.
use argmin::core::{ArgminError, Error};

/// Result alias for solver operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// The objective has no analytic gradient; finite differences are used.
    GradientNotImplemented,

    GradientDimMismatch { expected: usize, found: usize },

    /// A gradient entry is NaN/±inf.
    InvalidGradient { index: usize, value: f64, reason: &'static str },

    // ---- SolverOptions ----
    InvalidTolGrad { tol: f64, reason: &'static str },
    InvalidTolCost { tol: f64, reason: &'static str },
    InvalidMaxIter { max_iter: usize, reason: &'static str },
    NoTolerancesProvided,
    InvalidLBFGSMem { mem: usize, reason: &'static str },

    /// Wolfe constants must satisfy 0 < c1 < c2 < 1.
    InvalidWolfeConstants { c1: f64, c2: f64 },

    /// Line-search step bounds must satisfy 0 <= min < max.
    InvalidStepBounds { min: f64, max: f64 },

    // ---- Box constraints ----
    /// Lower bound, upper bound and start point must share one dimension.
    BoundsDimMismatch { lower: usize, upper: usize, start: usize },
    NonFiniteBound { index: usize, value: f64 },
    /// `lb[index] >= ub[index]`.
    InvertedBounds { index: usize, lower: f64, upper: f64 },
    NonFiniteStart { index: usize, value: f64 },
    EmptyProblem,

    // ---- Objective ----
    NonFiniteCost { value: f64 },
    /// The objective received a parameter vector of the wrong length.
    ObjectiveDimMismatch { expected: usize, found: usize },

    // ---- Solution ----
    InvalidSolution { index: usize, value: f64 },
    MissingSolution,

    // ---- Backend ----
    /// An argmin failure. `kind` names the argmin error class.
    Solver { kind: &'static str, text: String },
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptError::GradientNotImplemented => write!(f, "Analytic gradient not implemented"),
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient has {found} entries, expected {expected}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Gradient entry {index} is {value}: {reason}")
            }
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Invalid cost-change tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid iteration cap {max_iter}: {reason}")
            }
            OptError::NoTolerancesProvided => write!(f, "No stopping criterion provided"),
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "Invalid L-BFGS history size {mem}: {reason}")
            }
            OptError::InvalidWolfeConstants { c1, c2 } => {
                write!(f, "Invalid Wolfe constants c1 = {c1}, c2 = {c2}: need 0 < c1 < c2 < 1")
            }
            OptError::InvalidStepBounds { min, max } => {
                write!(f, "Invalid line-search step bounds [{min}, {max}]: need 0 <= min < max")
            }
            OptError::BoundsDimMismatch { lower, upper, start } => write!(
                f,
                "Box dimension mismatch: lower has {lower}, upper has {upper}, start point has {start}"
            ),
            OptError::NonFiniteBound { index, value } => {
                write!(f, "Bound {index} is not finite: {value}")
            }
            OptError::InvertedBounds { index, lower, upper } => {
                write!(f, "Box {index} is empty: lower {lower} is not below upper {upper}")
            }
            OptError::NonFiniteStart { index, value } => {
                write!(f, "Start point entry {index} is not finite: {value}")
            }
            OptError::EmptyProblem => write!(f, "Cannot minimize over zero parameters"),
            OptError::NonFiniteCost { value } => write!(f, "Objective returned {value}"),
            OptError::ObjectiveDimMismatch { expected, found } => {
                write!(f, "Objective expected {expected} parameters, found {found}")
            }
            OptError::InvalidSolution { index, value } => {
                write!(f, "Solution entry {index} is not finite: {value}")
            }
            OptError::MissingSolution => write!(f, "Solver finished without a best point"),
            OptError::Solver { kind, text } => write!(f, "Solver error ({kind}): {text}"),
        }
    }
}

impl OptError {
    /// Whether the error must abort the caller instead of being recovered
    /// inside the solver.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            OptError::BoundsDimMismatch { .. }
                | OptError::NonFiniteBound { .. }
                | OptError::InvertedBounds { .. }
                | OptError::NonFiniteStart { .. }
                | OptError::EmptyProblem
                | OptError::ObjectiveDimMismatch { .. }
                | OptError::InvalidTolGrad { .. }
                | OptError::InvalidTolCost { .. }
                | OptError::InvalidMaxIter { .. }
                | OptError::NoTolerancesProvided
                | OptError::InvalidLBFGSMem { .. }
                | OptError::InvalidWolfeConstants { .. }
                | OptError::InvalidStepBounds { .. }
        )
    }
}

impl From<Error> for OptError {
    fn from(err: Error) -> Self {
        // Errors raised by the adapter travel through argmin boxed.
        let err = match err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        let (kind, text) = match err.downcast::<ArgminError>() {
            Ok(ArgminError::InvalidParameter { text }) => ("invalid parameter", text),
            Ok(ArgminError::NotImplemented { text }) => ("not implemented", text),
            Ok(ArgminError::NotInitialized { text }) => ("not initialized", text),
            Ok(ArgminError::ConditionViolated { text }) => ("condition violated", text),
            Ok(ArgminError::CheckpointNotFound { text }) => ("checkpoint not found", text),
            Ok(ArgminError::PotentialBug { text }) => ("potential bug", text),
            Ok(ArgminError::ImpossibleError { text }) => ("impossible", text),
            Ok(other) => ("argmin", other.to_string()),
            Err(err) => ("backend", err.to_string()),
        };
        OptError::Solver { kind, text }
    }
}
