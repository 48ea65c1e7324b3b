//! Timestamp-typed index specialization.
//!
//! These operations require the backing array to be a nanosecond
//! timestamp array; the timezone is read from the backing type.

use chrono_tz::Tz;

use chronoframe_common::{AmbiguousTime, FrameResult, NonexistentTime};

use crate::array::Array;
use crate::temporal::DayOfWeekOptions;

use super::Index;

impl Index {
    /// Zone of the backing timestamp type; fails on non-timestamp
    /// indexes.
    pub fn tz(&self) -> FrameResult<Option<Tz>> {
        self.array().timestamp_tz()
    }

    /// Truncate every label to local midnight.
    pub fn normalize(&self) -> FrameResult<Index> {
        self.with_array(self.array().dt()?.normalize()?)
    }

    pub fn tz_localize(
        &self,
        tz: Option<Tz>,
        ambiguous: AmbiguousTime,
        nonexistent: NonexistentTime,
    ) -> FrameResult<Index> {
        self.with_array(self.array().dt()?.tz_localize(tz, ambiguous, nonexistent)?)
    }

    pub fn tz_convert(&self, tz: Tz) -> FrameResult<Index> {
        self.with_array(self.array().dt()?.tz_convert(tz)?)
    }

    pub fn replace_tz(&self, tz: Option<Tz>) -> FrameResult<Index> {
        self.with_array(self.array().dt()?.replace_tz(tz)?)
    }

    /// Local wall-clock labels as a naive index.
    pub fn local_timestamp(&self) -> FrameResult<Index> {
        self.with_array(self.array().dt()?.local_timestamp()?)
    }

    pub fn day_of_week(&self, options: DayOfWeekOptions) -> FrameResult<Array> {
        self.array().dt()?.day_of_week(options)
    }
}
