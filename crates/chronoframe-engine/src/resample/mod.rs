//! Time-bucketed grouping and the aggregation drivers.

pub mod aggregate;
pub mod grouper;

pub use aggregate::{group_by_aggregate, resample_aggregate};
pub use grouper::{GrouperOrigin, TimeBins, TimeGrouper, TimeGrouperOptions};
