//! Date/time value types and the calendar/offset engine.

pub mod busdaycal;
pub mod holiday;
pub mod offsets;
pub mod relativedelta;
pub mod timedelta;
pub mod types;

pub use busdaycal::{BusinessDayCalendar, default_calendar};
pub use offsets::{OffsetHandler, TickUnit};
pub use relativedelta::{RelativeDelta, RelativeDeltaOptions, WeekdayAnchor, easter};
pub use timedelta::{TimeDelta, TimeDeltaComponents};
pub use types::DateTime;
