//! Error representation shared by every chronoframe crate.
//!
//! - **`FrameErrorKind`** : the canonical taxonomy of engine failures
//! - **`ErrorContext`**   : lightweight identifying attributes (operation,
//!   offending label, position)
//! - **`FrameError`**     : one struct that glues the two together
//!
//! Errors are values: every fallible core operation returns
//! `FrameResult<T>` and fails fast with no partial results. Aggregates
//! with insufficient observations are *not* errors; they produce a null
//! scalar at the call site instead.

use std::{error::Error, fmt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The canonical set of engine error kinds. Kinds are never merged; a
/// caller can match on the kind to distinguish, say, a missing label from
/// an out-of-bounds position.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FrameErrorKind {
    /// Incompatible types for an operation.
    TypeMismatch,
    /// A value was read out of a null scalar where a value was required.
    NullDereference,
    /// Positional index outside the array bounds.
    OutOfRange,
    /// Label lookup miss on an index.
    KeyNotFound,
    /// The operation requires unique labels.
    UniquenessViolation,
    /// searchsorted / label slicing on a non-monotonic index.
    MonotonicityRequired,
    /// Bad enum combination, invalid weekmask, contradictory range
    /// parameters, and similar argument-level failures.
    InvalidArgument,
    /// Operation requested against an incompatible frequency.
    InvalidFrequency,
    /// Timezone localization hit a fold and the policy was `Raise`.
    AmbiguousTime,
    /// Timezone localization hit a gap and the policy was `Raise`.
    NonexistentTime,
    /// Delta normalization exceeded its documented bounds.
    Overflow,
    /// File or stream error surfaced from a collaborator.
    Io,
}

impl fmt::Display for FrameErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TypeMismatch => "type mismatch",
            Self::NullDereference => "null dereference",
            Self::OutOfRange => "out of range",
            Self::KeyNotFound => "key not found",
            Self::UniquenessViolation => "uniqueness violation",
            Self::MonotonicityRequired => "monotonicity required",
            Self::InvalidArgument => "invalid argument",
            Self::InvalidFrequency => "invalid frequency",
            Self::AmbiguousTime => "ambiguous time",
            Self::NonexistentTime => "nonexistent time",
            Self::Overflow => "overflow",
            Self::Io => "io error",
        })
    }
}

/// Identifying attributes of the failing input. Keep this minimal;
/// anything only one error kind needs belongs in the message.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ErrorContext {
    /// Name of the operation that failed, e.g. `"Index::get_loc"`.
    pub operation: Option<String>,
    /// Rendered form of the offending label or value.
    pub label: Option<String>,
    /// Offending position, when positional.
    pub position: Option<i64>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameError {
    pub kind: FrameErrorKind,
    pub message: Option<String>,
    pub context: ErrorContext,
}

/* ───────────────────── Constructors & helpers ─────────────────────── */

impl From<FrameErrorKind> for FrameError {
    fn from(kind: FrameErrorKind) -> Self {
        Self {
            kind,
            message: None,
            context: ErrorContext::default(),
        }
    }
}

impl FrameError {
    pub fn new(kind: FrameErrorKind) -> Self {
        kind.into()
    }

    pub fn type_mismatch() -> Self {
        Self::new(FrameErrorKind::TypeMismatch)
    }

    pub fn null_deref() -> Self {
        Self::new(FrameErrorKind::NullDereference)
    }

    pub fn out_of_range() -> Self {
        Self::new(FrameErrorKind::OutOfRange)
    }

    pub fn key_not_found() -> Self {
        Self::new(FrameErrorKind::KeyNotFound)
    }

    pub fn invalid_argument() -> Self {
        Self::new(FrameErrorKind::InvalidArgument)
    }

    pub fn invalid_frequency() -> Self {
        Self::new(FrameErrorKind::InvalidFrequency)
    }

    pub fn overflow() -> Self {
        Self::new(FrameErrorKind::Overflow)
    }

    /// Attach a human-readable explanation.
    pub fn with_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Attach the name of the failing operation.
    pub fn with_operation<S: Into<String>>(mut self, op: S) -> Self {
        self.context.operation = Some(op.into());
        self
    }

    /// Attach the rendered offending label or value.
    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.context.label = Some(label.into());
        self
    }

    /// Attach the offending position.
    pub fn with_position(mut self, position: i64) -> Self {
        self.context.position = Some(position);
        self
    }
}

/* ───────────────────────── Display / Error ────────────────────────── */

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(ref op) = self.context.operation {
            write!(f, " in {op}")?;
        }
        if let Some(ref msg) = self.message {
            write!(f, ": {msg}")?;
        }
        if let Some(ref label) = self.context.label {
            write!(f, " (label {label})")?;
        }
        if let Some(position) = self.context.position {
            write!(f, " (position {position})")?;
        }
        Ok(())
    }
}

impl Error for FrameError {}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        FrameError::new(FrameErrorKind::Io).with_message(err.to_string())
    }
}

pub type FrameResult<T> = Result<T, FrameError>;
