pub mod enums;
pub mod error;
pub mod weekmask;

pub use enums::{
    AggregateOp, AmbiguousTime, BusDayRoll, DayAnchor, EdgeSide, NonexistentTime, NullPlacement,
    SearchSide,
};
pub use error::{FrameError, FrameErrorKind, FrameResult};
pub use weekmask::WeekMask;
