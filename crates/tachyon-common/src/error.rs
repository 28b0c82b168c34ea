//! Error taxonomy for the core engine.
//!
//! - **`TachyonErrorKind`**: the canonical set of failure codes named in
//!   spec §6/§7 (precondition violations, lifecycle violations, resource
//!   exhaustion).
//! - **`TachyonError`**: one struct gluing a kind to an optional message.
//!
//! Numeric range events (spline argument outside range, `exp` outside its
//! safe domain) are *not* represented here — per spec §7 they are clamped
//! silently, not surfaced as errors.

use std::fmt;

/// All recognised failure codes (spec §6).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TachyonErrorKind {
    /// A `Date` was constructed from an out-of-range or malformed YYYYMM value.
    InvalidDate,
    /// Inserting a vector under an id that already exists in a non-zero-level cache.
    DuplicateKey,
    /// Assigning into a `CalcVector` that is already registered in its cache.
    CachedReassign,
    /// Spline break points do not lie on a common grid step and no GCD exists.
    NonUniform,
    /// A time-dependent spline's modulation vectors don't match the node count/length.
    ModulationShapeMismatch,
    /// The spline's init mode (`from_xy_points`) cannot be modulated.
    UnsupportedInitModeForModulation,
    /// The platform allocator failed to produce an aligned buffer.
    AlignmentAllocationFailure,
}

impl fmt::Display for TachyonErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidDate => "invalid date",
            Self::DuplicateKey => "duplicate cache key",
            Self::CachedReassign => "reassignment into a cached vector",
            Self::NonUniform => "non-uniform spline grid",
            Self::ModulationShapeMismatch => "modulation shape mismatch",
            Self::UnsupportedInitModeForModulation => "init mode does not support modulation",
            Self::AlignmentAllocationFailure => "aligned allocation failure",
        })
    }
}

/// The error type every fallible core operation returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TachyonError {
    pub kind: TachyonErrorKind,
    pub message: Option<String>,
}

impl TachyonError {
    pub fn new(kind: TachyonErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    pub fn with_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.message = Some(msg.into());
        self
    }
}

impl From<TachyonErrorKind> for TachyonError {
    fn from(kind: TachyonErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for TachyonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ref msg) = self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TachyonError {}

impl PartialEq<TachyonErrorKind> for TachyonError {
    fn eq(&self, other: &TachyonErrorKind) -> bool {
        self.kind == *other
    }
}

pub type Result<T> = std::result::Result<T, TachyonError>;
