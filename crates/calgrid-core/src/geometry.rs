use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use crate::datetime::{MINUTES_PER_DAY, local_midnight};
use crate::grouping::{group_by_overlap, has_cross_group_overlap};
use crate::item::CalendarItem;
use crate::navigation::add_days;

/// Percent box inside a 24-hour day column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutRect {
    pub fn stretched(self) -> Self {
        Self {
            left: 0.0,
            width: 100.0,
            ..self
        }
    }
}

/// Where a month cell sits on a multi-day bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentRole {
    First,
    Middle,
    Last,
    None,
}

pub fn segment_role(item: &CalendarItem, cell_date: NaiveDate, tz: &Tz) -> SegmentRole {
    let is_first = item.local_start_day(tz) == cell_date;
    let is_last = item.local_end_day(tz) == cell_date;

    match (is_first, is_last) {
        (true, true) => SegmentRole::None,
        (true, false) => SegmentRole::First,
        (false, true) => SegmentRole::Last,
        (false, false) => SegmentRole::Middle,
    }
}

fn share_of_day(minutes: i64) -> f64 {
    minutes.clamp(0, MINUTES_PER_DAY) as f64 / MINUTES_PER_DAY as f64 * 100.0
}

/// Box for `item` in the column of `day`. Start and end are clamped to the
/// day so items spilling over midnight still fit the column.
pub fn compute_time_rect(
    item: &CalendarItem,
    day: NaiveDate,
    group_index: usize,
    group_count: usize,
    tz: &Tz,
) -> LayoutRect {
    let (start, end) = item.span();
    let day_start = local_midnight(day, tz);
    let day_end = local_midnight(add_days(day, 1), tz);

    let effective_start = start.max(day_start);
    let effective_end = end.min(day_end).max(effective_start);

    let columns = group_count.max(1) as f64;
    let width = 100.0 / columns;

    LayoutRect {
        top: share_of_day((effective_start - day_start).num_minutes()),
        left: group_index as f64 * width,
        width,
        height: share_of_day((effective_end - effective_start).num_minutes()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedBlock {
    pub item: CalendarItem,
    pub group_index: usize,
    pub group_count: usize,
    pub rect: LayoutRect,
}

/// Full hour-grid layout of one day column. Items with no real collision
/// outside their own column are stretched to full width.
#[tracing::instrument(skip(day_items, tz), fields(count = day_items.len(), day = %day))]
pub fn layout_day_column(day_items: &[CalendarItem], day: NaiveDate, tz: &Tz) -> Vec<TimedBlock> {
    let groups = group_by_overlap(day_items);
    let group_count = groups.len();

    let mut blocks = Vec::with_capacity(day_items.len());
    for (group_index, group) in groups.iter().enumerate() {
        for item in group {
            let mut rect = compute_time_rect(item, day, group_index, group_count, tz);
            if !has_cross_group_overlap(item, group_index, &groups) {
                rect = rect.stretched();
            }
            blocks.push(TimedBlock {
                item: item.clone(),
                group_index,
                group_count,
                rect,
            });
        }
    }

    blocks
}
