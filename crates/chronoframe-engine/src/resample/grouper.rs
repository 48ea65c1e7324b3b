//! Translate (timestamp index, frequency) into bins and labels.
//!
//! The bin edges come from a `date_range` between adjusted first/last
//! edges; tick frequencies anchor the edges on the requested origin with
//! modular nanosecond arithmetic, non-tick frequencies snap to the
//! offset's own anchors. `closed` decides which edge owns a boundary
//! value, `label` which edge names the bucket.

use chronoframe_common::{AmbiguousTime, EdgeSide, FrameError, FrameResult, NonexistentTime};

use crate::array::Array;
use crate::datetime::offsets::{OffsetHandler, TickUnit};
use crate::datetime::timedelta::TimeDelta;
use crate::datetime::types::{DateTime, naive_to_nanos, nanos_to_naive};
use crate::factory::index::{DateRangeOptions, date_range};
use crate::index::Index;
use crate::util::{floor_div, pymod};

#[derive(Debug, Clone, PartialEq)]
pub enum GrouperOrigin {
    Epoch,
    Start,
    StartDay,
    End,
    EndDay,
    Timestamp(DateTime),
}

impl Default for GrouperOrigin {
    fn default() -> Self {
        GrouperOrigin::StartDay
    }
}

#[derive(Clone)]
pub struct TimeGrouperOptions {
    pub freq: OffsetHandler,
    pub closed: Option<EdgeSide>,
    pub label: Option<EdgeSide>,
    pub origin: GrouperOrigin,
    pub offset: Option<TimeDelta>,
}

impl TimeGrouperOptions {
    pub fn new(freq: OffsetHandler) -> Self {
        TimeGrouperOptions {
            freq,
            closed: None,
            label: None,
            origin: GrouperOrigin::default(),
            offset: None,
        }
    }

    pub fn with_closed(mut self, closed: EdgeSide) -> Self {
        self.closed = Some(closed);
        self
    }

    pub fn with_label(mut self, label: EdgeSide) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_origin(mut self, origin: GrouperOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_offset(mut self, offset: TimeDelta) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Bin result: `bins[i]` is the cumulative upper source position of
/// bucket `i`; `labels` names the buckets.
#[derive(Debug, Clone)]
pub struct TimeBins {
    pub bins: Vec<i64>,
    pub labels: Index,
}

pub struct TimeGrouper {
    freq: OffsetHandler,
    closed: EdgeSide,
    label: EdgeSide,
    origin: GrouperOrigin,
    offset: Option<TimeDelta>,
}

impl TimeGrouper {
    /// Resolve the closed/label defaults: end-anchored and weekly
    /// frequencies label on the right, as do End/EndDay origins;
    /// everything else on the left.
    pub fn new(options: TimeGrouperOptions) -> FrameResult<Self> {
        let TimeGrouperOptions {
            freq,
            mut closed,
            mut label,
            origin,
            offset,
        } = options;

        if freq.n() <= 0 {
            return Err(FrameError::invalid_frequency()
                .with_operation("TimeGrouper::new")
                .with_message("grouping frequency must be positive")
                .with_label(freq.name()));
        }

        if freq.is_end() || freq.is_week() {
            closed = closed.or(Some(EdgeSide::Right));
            label = label.or(Some(EdgeSide::Right));
        } else if matches!(origin, GrouperOrigin::End | GrouperOrigin::EndDay) {
            closed = closed.or(Some(EdgeSide::Right));
            label = label.or(Some(EdgeSide::Right));
        }

        Ok(TimeGrouper {
            freq,
            closed: closed.unwrap_or(EdgeSide::Left),
            label: label.unwrap_or(EdgeSide::Left),
            origin,
            offset,
        })
    }

    pub fn freq(&self) -> &OffsetHandler {
        &self.freq
    }

    pub fn closed(&self) -> EdgeSide {
        self.closed
    }

    pub fn label(&self) -> EdgeSide {
        self.label
    }

    /// Bins and labels for a timestamp index.
    pub fn get_time_bins(&self, index: &Index) -> FrameResult<TimeBins> {
        let tz = index.tz()?;
        if index.size() == 0 {
            return Ok(TimeBins {
                bins: Vec::new(),
                labels: index.iloc(Some(0), Some(0), 1)?,
            });
        }

        let ax = index.array();
        let first = ax.at(0)?.as_datetime()?;
        let last = ax.at(-1)?.as_datetime()?;
        let (first_edge, last_edge) = self.get_timestamp_range_edges(tz, &first, &last)?;

        let binner = date_range(DateRangeOptions {
            start: Some(first_edge),
            end: Some(last_edge),
            offset: Some(self.freq.clone()),
            tz,
            ambiguous: AmbiguousTime::Earliest,
            nonexistent: NonexistentTime::ShiftForward,
            ..Default::default()
        })?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            freq = %self.freq.name(),
            edges = binner.size(),
            points = index.size(),
            "computed resample binner"
        );

        let pre_adjust = binner.clone();
        let (binner, bin_edges) = self.adjust_bin_edges(binner, ax)?;
        let bins = generate_bins(ax, &bin_edges, self.closed)?;

        let mut labels = if self.closed == EdgeSide::Right {
            if self.label == EdgeSide::Right {
                binner.iloc(Some(1), None, 1)?
            } else {
                binner
            }
        } else if self.label == EdgeSide::Right {
            binner.iloc(Some(1), None, 1)?
        } else {
            pre_adjust
        };

        if bins.len() < labels.size() {
            labels = labels.iloc(Some(0), Some(bins.len() as i64), 1)?;
        }

        Ok(TimeBins { bins, labels })
    }

    /// Group-id expansion: each source position mapped to its bucket
    /// label.
    pub fn apply(&self, index: &Index) -> FrameResult<Array> {
        let TimeBins { bins, labels } = self.get_time_bins(index)?;
        if bins.is_empty() {
            return Ok(labels.array().clone());
        }
        if (index.size() as i64) < bins.len() as i64 {
            return Err(FrameError::invalid_argument()
                .with_operation("TimeGrouper::apply")
                .with_message("up-sampling is not supported through the aggregation path"));
        }
        let rep = bucket_sizes(&bins);
        let mut comp_ids: Vec<Option<i64>> = Vec::with_capacity(index.size());
        for (bucket, count) in rep.iter().enumerate() {
            for _ in 0..*count {
                comp_ids.push(Some(bucket as i64));
            }
        }
        labels
            .array()
            .take(&crate::factory::array::from_options_i64(comp_ids), false)
    }

    /// First/last bin edges around the observed range.
    fn get_timestamp_range_edges(
        &self,
        index_tz: Option<chrono_tz::Tz>,
        first: &DateTime,
        last: &DateTime,
    ) -> FrameResult<(DateTime, DateTime)> {
        if let Some((unit, _)) = self.freq.as_tick() {
            let mut origin = self.origin.clone();
            match &origin {
                GrouperOrigin::Timestamp(at) => {
                    if at.is_aware() != index_tz.is_some() {
                        return Err(FrameError::invalid_argument()
                            .with_operation("TimeGrouper::get_timestamp_range_edges")
                            .with_message("origin must have the same timezone as the index")
                            .with_label(at.to_string()));
                    }
                }
                GrouperOrigin::Epoch => {
                    let epoch = match index_tz {
                        None => DateTime::parse("1970-01-01")?,
                        Some(tz) => DateTime::parse("1970-01-01")?
                            .tz_localize(tz, AmbiguousTime::Earliest, NonexistentTime::ShiftForward)?
                            .ok_or_else(|| {
                                FrameError::invalid_argument()
                                    .with_operation("TimeGrouper::get_timestamp_range_edges")
                            })?,
                    };
                    origin = GrouperOrigin::Timestamp(epoch);
                }
                _ => {}
            }

            // Day frequencies bucket in naive local time, then re-zone.
            let day_tz = if unit == TickUnit::Day { index_tz } else { None };
            let (first_in, last_in, origin_in) = if day_tz.is_some() {
                let stripped_origin = match origin {
                    GrouperOrigin::Timestamp(at) => GrouperOrigin::Timestamp(at.tz_strip()?),
                    other => other,
                };
                (first.tz_strip()?, last.tz_strip()?, stripped_origin)
            } else {
                (*first, *last, origin)
            };

            let (mut first_adj, mut last_adj) =
                self.adjust_dates_anchored(&first_in, &last_in, &origin_in)?;

            if let Some(tz) = day_tz {
                first_adj = first_adj
                    .tz_localize(tz, AmbiguousTime::Raise, NonexistentTime::Raise)?
                    .ok_or_else(|| {
                        FrameError::invalid_argument()
                            .with_operation("TimeGrouper::get_timestamp_range_edges")
                    })?;
                last_adj = last_adj
                    .tz_localize(tz, AmbiguousTime::Raise, NonexistentTime::ShiftForward)?
                    .ok_or_else(|| {
                        FrameError::invalid_argument()
                            .with_operation("TimeGrouper::get_timestamp_range_edges")
                    })?;
            }
            Ok((first_adj, last_adj))
        } else {
            let first = first.normalize()?;
            let last = last.normalize()?;
            let first = if self.closed == EdgeSide::Left {
                self.freq.rollforward(&first)?
            } else {
                self.freq.rsub(&first)?
            };
            let last = self.freq.add(&last)?;
            Ok((first, last))
        }
    }

    /// Anchor the edges on the origin with modular arithmetic over
    /// nanoseconds. The `closed == Right, foffset > loffset` branch keeps
    /// its historically asymmetric first edge.
    fn adjust_dates_anchored(
        &self,
        first: &DateTime,
        last: &DateTime,
        origin: &GrouperOrigin,
    ) -> FrameResult<(DateTime, DateTime)> {
        let freq_nanos = self.freq.nanos()?;
        let f = first.value();
        let l = last.value();

        let mut origin_ts = match origin {
            GrouperOrigin::StartDay => first.normalize()?.value(),
            GrouperOrigin::Start => f,
            GrouperOrigin::End | GrouperOrigin::EndDay => {
                let origin_last = if *origin == GrouperOrigin::End {
                    l
                } else {
                    ceil_day(last)?.value()
                };
                let mut sub_freq_times = floor_div(origin_last - f, freq_nanos);
                if self.closed == EdgeSide::Left {
                    sub_freq_times += 1;
                }
                origin_last - sub_freq_times * freq_nanos
            }
            GrouperOrigin::Timestamp(at) => at.value(),
            GrouperOrigin::Epoch => 0,
        };
        if let Some(offset) = &self.offset {
            origin_ts += offset.to_nanoseconds()?;
        }

        let foffset = pymod(f - origin_ts, freq_nanos);
        let loffset = pymod(l - origin_ts, freq_nanos);

        let (fresult, lresult) = if self.closed == EdgeSide::Right {
            let fresult = if foffset > loffset { f - foffset } else { f - freq_nanos };
            let lresult = if loffset > 0 { l + (freq_nanos - loffset) } else { l };
            (fresult, lresult)
        } else {
            let fresult = if foffset > 0 { f - foffset } else { f };
            let lresult = if loffset > 0 {
                l + (freq_nanos - loffset)
            } else {
                l + freq_nanos
            };
            (fresult, lresult)
        };

        Ok((
            DateTime::new(fresult, first.tz()),
            DateTime::new(lresult, last.tz()),
        ))
    }

    /// End-anchored and weekly frequencies build their edges in naive
    /// time; a penultimate edge already past the data trims both by one.
    fn adjust_bin_edges(&self, binner: Index, ax: &Array) -> FrameResult<(Index, Array)> {
        if self.freq.is_end() || self.freq.is_week() {
            let mut binner = binner;
            let mut bin_edges = if self.closed == EdgeSide::Right {
                let stripped = binner.array().dt()?.tz_localize(
                    None,
                    AmbiguousTime::Raise,
                    NonexistentTime::Raise,
                )?;
                match ax.timestamp_tz()? {
                    None => stripped,
                    Some(tz) => stripped.dt()?.tz_localize(
                        Some(tz),
                        AmbiguousTime::Earliest,
                        NonexistentTime::ShiftForward,
                    )?,
                }
            } else {
                binner.array().clone()
            };

            if bin_edges.len() >= 2 {
                let penultimate = bin_edges.at(-2)?;
                let data_max = ax.max(true)?;
                if !data_max.is_null()
                    && penultimate.compare(&data_max)? == std::cmp::Ordering::Greater
                {
                    bin_edges = bin_edges.slice(Some(0), Some(-1), 1)?;
                    binner = binner.iloc(Some(0), Some(-1), 1)?;
                }
            }
            Ok((binner, bin_edges))
        } else {
            let edges = binner.array().clone();
            Ok((binner, edges))
        }
    }
}

/// Two-pointer sweep assigning each source position to a bucket.
pub fn generate_bins(values: &Array, edges: &Array, closed: EdgeSide) -> FrameResult<Vec<i64>> {
    let lenidx = values.len() as i64;
    let lenbin = edges.len() as i64;
    if lenidx == 0 || lenbin == 0 {
        return Err(FrameError::invalid_argument()
            .with_operation("generate_bins")
            .with_message("invalid length for values or for binner"));
    }
    let vals = values.timestamps()?;
    let bounds = edges.timestamps()?;
    if vals.value(0) < bounds.value(0) {
        return Err(FrameError::invalid_argument()
            .with_operation("generate_bins")
            .with_message("values fall before the first bin"));
    }
    if vals.value(vals.len() - 1) > bounds.value(bounds.len() - 1) {
        return Err(FrameError::invalid_argument()
            .with_operation("generate_bins")
            .with_message("values fall after the last bin"));
    }

    let mut bins = Vec::with_capacity((lenbin - 1) as usize);
    let mut j: i64 = 0;
    for i in 0..(lenbin - 1) {
        let r_bin = bounds.value((i + 1) as usize);
        match closed {
            EdgeSide::Right => {
                while j < lenidx && vals.value(j as usize) <= r_bin {
                    j += 1;
                }
            }
            EdgeSide::Left => {
                while j < lenidx && vals.value(j as usize) < r_bin {
                    j += 1;
                }
            }
        }
        bins.push(j);
    }
    Ok(bins)
}

/// Per-bucket sizes from cumulative bounds.
pub(crate) fn bucket_sizes(bins: &[i64]) -> Vec<i64> {
    use rayon::prelude::*;
    let mut rep = vec![0i64; bins.len()];
    if bins.len() > 100_000 {
        rep[1..]
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, slot)| *slot = bins[i + 1] - bins[i]);
    } else {
        for i in 1..bins.len() {
            rep[i] = bins[i] - bins[i - 1];
        }
    }
    rep[0] = bins[0];
    rep
}

fn ceil_day(dt: &DateTime) -> FrameResult<DateTime> {
    const DAY: i64 = 86_400 * 1_000_000_000;
    let wall = naive_to_nanos(dt.local())?;
    let rem = wall.rem_euclid(DAY);
    let ceiled = if rem == 0 { wall } else { wall - rem + DAY };
    let naive = nanos_to_naive(ceiled);
    DateTime::combine(naive.date(), naive.time(), dt.tz())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::array::timestamps_from_strs;
    use crate::factory::{index as index_factory, offset};
    use crate::scalar::Scalar;

    fn minute_index(start: &str, end: &str) -> Index {
        index_factory::date_range(index_factory::DateRangeOptions {
            start: Some(DateTime::parse(start).unwrap()),
            end: Some(DateTime::parse(end).unwrap()),
            offset: Some(offset::minutes(1)),
            ..Default::default()
        })
        .unwrap()
    }

    fn label_strings(labels: &Index) -> Vec<String> {
        (0..labels.size() as i64)
            .map(|i| labels.at(i).unwrap().as_datetime().unwrap().to_string())
            .collect()
    }

    #[test]
    fn five_minute_bins_closed_right() {
        let index = minute_index("2000-01-01 00:00:00", "2000-01-01 00:13:00");
        let grouper = TimeGrouper::new(
            TimeGrouperOptions::new(offset::minutes(5))
                .with_closed(EdgeSide::Right)
                .with_label(EdgeSide::Right),
        )
        .unwrap();
        let TimeBins { bins, labels } = grouper.get_time_bins(&index).unwrap();
        assert_eq!(bins, vec![1, 6, 11, 14]);
        assert_eq!(
            label_strings(&labels),
            vec![
                "2000-01-01",
                "2000-01-01 00:05:00.000000",
                "2000-01-01 00:10:00.000000",
                "2000-01-01 00:15:00.000000",
            ]
        );
    }

    #[test]
    fn five_minute_bins_closed_left() {
        let index = minute_index("2000-01-01 00:00:00", "2000-01-01 00:13:00");
        let grouper = TimeGrouper::new(
            TimeGrouperOptions::new(offset::minutes(5)).with_closed(EdgeSide::Left),
        )
        .unwrap();
        let TimeBins { bins, labels } = grouper.get_time_bins(&index).unwrap();
        assert_eq!(bins, vec![5, 10, 14]);
        assert_eq!(labels.size(), 3);
        assert_eq!(
            labels.at(0).unwrap().as_datetime().unwrap(),
            DateTime::parse("2000-01-01 00:00:00").unwrap()
        );
    }

    #[test]
    fn default_sides_resolve_left_for_ticks() {
        let grouper = TimeGrouper::new(TimeGrouperOptions::new(offset::minutes(3))).unwrap();
        assert_eq!(grouper.closed(), EdgeSide::Left);
        assert_eq!(grouper.label(), EdgeSide::Left);

        let end_anchored = TimeGrouper::new(TimeGrouperOptions::new(offset::month_end(1))).unwrap();
        assert_eq!(end_anchored.closed(), EdgeSide::Right);
        assert_eq!(end_anchored.label(), EdgeSide::Right);

        let weekly =
            TimeGrouper::new(TimeGrouperOptions::new(offset::weeks(1, None))).unwrap();
        assert_eq!(weekly.closed(), EdgeSide::Right);

        let end_origin = TimeGrouper::new(
            TimeGrouperOptions::new(offset::minutes(3)).with_origin(GrouperOrigin::End),
        )
        .unwrap();
        assert_eq!(end_origin.closed(), EdgeSide::Right);
    }

    #[test]
    fn empty_index_gives_empty_bins() {
        let empty = Index::new(timestamps_from_strs(&[], None).unwrap(), "").unwrap();
        let grouper = TimeGrouper::new(TimeGrouperOptions::new(offset::minutes(5))).unwrap();
        let TimeBins { bins, labels } = grouper.get_time_bins(&empty).unwrap();
        assert!(bins.is_empty());
        assert_eq!(labels.size(), 0);
    }

    #[test]
    fn bins_are_weakly_increasing_and_bounded() {
        let index = minute_index("2000-01-01 00:00:00", "2000-01-01 01:40:00");
        for closed in [EdgeSide::Left, EdgeSide::Right] {
            let grouper = TimeGrouper::new(
                TimeGrouperOptions::new(offset::minutes(7)).with_closed(closed),
            )
            .unwrap();
            let TimeBins { bins, labels } = grouper.get_time_bins(&index).unwrap();
            assert!(bins.windows(2).all(|w| w[0] <= w[1]));
            assert_eq!(*bins.last().unwrap(), index.size() as i64);
            assert_eq!(labels.size(), bins.len());
        }
    }

    #[test]
    fn grouper_offset_shifts_bin_edges() {
        let index = minute_index("2000-01-01 00:00:00", "2000-01-01 00:13:00");
        let grouper = TimeGrouper::new(
            TimeGrouperOptions::new(offset::minutes(5))
                .with_offset(TimeDelta::new(crate::TimeDeltaComponents {
                    minutes: 2.0,
                    ..Default::default()
                }).unwrap()),
        )
        .unwrap();
        let TimeBins { bins, labels } = grouper.get_time_bins(&index).unwrap();
        assert_eq!(
            labels.at(0).unwrap().as_datetime().unwrap(),
            DateTime::parse("1999-12-31 23:57:00").unwrap()
        );
        assert_eq!(*bins.last().unwrap(), 14);
    }

    #[test]
    fn explicit_timestamp_origin_anchors_edges() {
        let index = minute_index("2000-01-01 00:00:00", "2000-01-01 00:13:00");
        let grouper = TimeGrouper::new(
            TimeGrouperOptions::new(offset::minutes(5)).with_origin(GrouperOrigin::Timestamp(
                DateTime::parse("1999-12-31 23:59:00").unwrap(),
            )),
        )
        .unwrap();
        let TimeBins { bins, labels } = grouper.get_time_bins(&index).unwrap();
        assert_eq!(
            labels.at(0).unwrap().as_datetime().unwrap(),
            DateTime::parse("1999-12-31 23:59:00").unwrap()
        );
        assert!(bins.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn epoch_origin_is_accepted() {
        let index = minute_index("2000-01-01 00:03:00", "2000-01-01 00:13:00");
        let grouper = TimeGrouper::new(
            TimeGrouperOptions::new(offset::minutes(5)).with_origin(GrouperOrigin::Epoch),
        )
        .unwrap();
        let TimeBins { bins, labels } = grouper.get_time_bins(&index).unwrap();
        // Epoch anchoring puts edges on :00/:05/:10 boundaries.
        assert_eq!(
            labels.at(0).unwrap().as_datetime().unwrap(),
            DateTime::parse("2000-01-01 00:00:00").unwrap()
        );
        assert_eq!(*bins.last().unwrap(), index.size() as i64);
    }

    #[test]
    fn month_end_bins_label_on_period_ends() {
        let index = index_factory::date_range(index_factory::DateRangeOptions {
            start: Some(DateTime::parse("2023-01-05").unwrap()),
            end: Some(DateTime::parse("2023-03-20").unwrap()),
            offset: Some(offset::days(1)),
            ..Default::default()
        })
        .unwrap();
        let grouper = TimeGrouper::new(TimeGrouperOptions::new(offset::month_end(1))).unwrap();
        let TimeBins { bins, labels } = grouper.get_time_bins(&index).unwrap();
        assert_eq!(
            label_strings(&labels),
            vec!["2023-01-31", "2023-02-28", "2023-03-31"]
        );
        // 27 January days, 28 February days, 20 March days.
        assert_eq!(bins, vec![27, 55, 75]);
    }

    #[test]
    fn generate_bins_validates_coverage() {
        let values = timestamps_from_strs(&["2020-01-01 00:00:00"], None).unwrap();
        let edges =
            timestamps_from_strs(&["2020-01-01 01:00:00", "2020-01-01 02:00:00"], None).unwrap();
        let err = generate_bins(&values, &edges, EdgeSide::Left).unwrap_err();
        assert_eq!(err.kind, chronoframe_common::FrameErrorKind::InvalidArgument);
    }

    #[test]
    fn apply_expands_labels_over_positions() {
        let index = minute_index("2000-01-01 00:00:00", "2000-01-01 00:08:00");
        let grouper = TimeGrouper::new(TimeGrouperOptions::new(offset::minutes(3))).unwrap();
        let expanded = grouper.apply(&index).unwrap();
        assert_eq!(expanded.len(), 9);
        // First three positions carry the first bucket's label.
        let first = expanded.at(0).unwrap();
        let third = expanded.at(2).unwrap();
        let fourth = expanded.at(3).unwrap();
        assert_eq!(first, third);
        assert_ne!(first, fourth);
        assert_eq!(
            first,
            Scalar::from_datetime(&DateTime::parse("2000-01-01 00:00:00").unwrap())
        );
    }

    #[test]
    fn grouper_rejects_non_positive_frequency() {
        assert!(TimeGrouper::new(TimeGrouperOptions::new(offset::minutes(0))).is_err());
        assert!(TimeGrouper::new(TimeGrouperOptions::new(offset::minutes(-5))).is_err());
    }
}
