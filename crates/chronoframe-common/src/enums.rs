//! Policy and option enums used across the engine surface.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which end of a bin interval includes its boundary value. Grouper
/// options leave this unset (`Option<EdgeSide>`) to request the
/// frequency-dependent default.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EdgeSide {
    Left,
    Right,
}

/// Side argument for searchsorted-style insertion lookups.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SearchSide {
    Left,
    Right,
}

/// Day-of-period anchor for month/quarter/year offsets.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DayAnchor {
    Start,
    End,
}

/// How to resolve a date that is not a business day before applying a
/// business-day offset.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BusDayRoll {
    /// Fail on a non-business day.
    Raise,
    /// Advance to the next business day.
    Following,
    /// Retreat to the previous business day.
    Preceding,
    /// Advance, unless that crosses a month boundary; then retreat.
    ModifiedFollowing,
    /// Retreat, unless that crosses a month boundary; then advance.
    ModifiedPreceding,
    /// Produce a missing-value sentinel.
    Nat,
}

/// Resolution of a wall time that occurs twice during a daylight-saving
/// fold.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AmbiguousTime {
    Raise,
    Earliest,
    Latest,
    Nat,
}

/// Resolution of a wall time skipped by a daylight-saving gap.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NonexistentTime {
    Raise,
    ShiftForward,
    ShiftBackward,
    Nat,
}

/// Null handling for `Index::where_`-style filtering.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NullPlacement {
    Drop,
    EmitNull,
}

/// Aggregation kernels dispatched by the resample, group-by, and window
/// drivers. An enum rather than a kernel-name string, so a typo fails at
/// compile time.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    Sum,
    Mean,
    Min,
    Max,
    First,
    Last,
    Count,
    ApproxMedian,
    Product,
    Variance,
    Stddev,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::First => "first",
            Self::Last => "last",
            Self::Count => "count",
            Self::ApproxMedian => "approximate_median",
            Self::Product => "product",
            Self::Variance => "variance",
            Self::Stddev => "stddev",
        })
    }
}
