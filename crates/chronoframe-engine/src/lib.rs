pub mod array;
pub mod datetime;
pub mod factory;
pub mod index;
pub mod resample;
pub mod scalar;
pub mod temporal;
pub mod util;
pub mod window;

pub use array::Array;
pub use datetime::busdaycal::{BusinessDayCalendar, default_calendar};
pub use datetime::offsets::OffsetHandler;
pub use datetime::relativedelta::{RelativeDelta, RelativeDeltaOptions};
pub use datetime::timedelta::{TimeDelta, TimeDeltaComponents};
pub use datetime::types::DateTime;
pub use index::Index;
pub use resample::grouper::{TimeGrouper, TimeGrouperOptions};
pub use scalar::Scalar;

pub use chronoframe_common::{
    AggregateOp, AmbiguousTime, BusDayRoll, DayAnchor, EdgeSide, FrameError, FrameErrorKind,
    FrameResult, NonexistentTime, NullPlacement, SearchSide, WeekMask,
};
