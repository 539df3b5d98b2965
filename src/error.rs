use std::{
    error::Error,
    fmt::{self, Display},
};

use rand_distr::NormalError;

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, MlpErr>;

/// The two families of failures the engine reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrKind {
    /// The caller built or fed the network wrong.
    Configuration,
    /// The caller used the network before building it.
    NotReady,
}

/// The crate's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum MlpErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    LayerOutOfRange {
        layer: usize,
        len: usize,
    },
    InvalidRange {
        start: usize,
        end: usize,
    },
    UnknownActivation(usize),
    InvalidTopology(&'static str),
    InvalidInput(&'static str),
    Distribution(String),
    NotInitialized,
    NoForwardPass,
}

impl MlpErr {
    /// Returns the family this error belongs to.
    pub fn kind(&self) -> ErrKind {
        match self {
            MlpErr::NotInitialized | MlpErr::NoForwardPass => ErrKind::NotReady,
            _ => ErrKind::Configuration,
        }
    }
}

impl Display for MlpErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlpErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "size mismatch for {what}: got {got}, expected {expected}"),
            MlpErr::LayerOutOfRange { layer, len } => {
                write!(f, "layer {layer} is out of range, the network has {len} layers")
            }
            MlpErr::InvalidRange { start, end } => {
                write!(f, "invalid layer range: start {start} is past end {end}")
            }
            MlpErr::UnknownActivation(id) => write!(f, "unknown activation id {id}"),
            MlpErr::InvalidTopology(msg) => write!(f, "invalid topology: {msg}"),
            MlpErr::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            MlpErr::Distribution(msg) => write!(f, "failed to build distribution: {msg}"),
            MlpErr::NotInitialized => write!(f, "the network has not been initialized"),
            MlpErr::NoForwardPass => {
                write!(f, "backward was called without a preceding forward pass")
            }
        }
    }
}

impl Error for MlpErr {}

/// Fails with a `SizeMismatch` whenever `got` differs from `expected`.
pub(crate) fn check_size(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(MlpErr::SizeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}

impl From<NormalError> for MlpErr {
    fn from(value: NormalError) -> Self {
        Self::Distribution(value.to_string())
    }
}
