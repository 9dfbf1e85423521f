//! Bounded slot assignment for month grids and lane rows for the week
//! header strip.
//!
//! Month cells show a fixed number of stacked slots. Multi-day items claim
//! slots first, longest first, so a bar keeps the same row across every day
//! it covers; whatever does not fit is hidden behind a "+N more" counter.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, trace};

use crate::geometry::{SegmentRole, segment_role};
use crate::item::{CalendarItem, ItemId};
use crate::window::TimeWindow;

pub const DEFAULT_MONTH_SLOTS: usize = 3;

/// Item id to slot index. An item missing from the map did not fit.
pub type SlotMap = BTreeMap<ItemId, usize>;

/// Month-grid placement order: multi-day before single-day, multi-day by
/// longer span then earlier start, single-day by earlier start.
fn month_order<'a>(
    multi_day: &'a [CalendarItem],
    single_day: &'a [CalendarItem],
    tz: &Tz,
) -> Vec<&'a CalendarItem> {
    let mut multi: Vec<&CalendarItem> = multi_day.iter().collect();
    multi.sort_by(|a, b| {
        b.duration_days(tz)
            .cmp(&a.duration_days(tz))
            .then_with(|| a.span().0.cmp(&b.span().0))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut single: Vec<&CalendarItem> = single_day.iter().collect();
    single.sort_by(|a, b| a.span().0.cmp(&b.span().0).then_with(|| a.id.cmp(&b.id)));

    multi.into_iter().chain(single).collect()
}

#[tracing::instrument(
    skip(multi_day, single_day, tz),
    fields(multi = multi_day.len(), single = single_day.len(), start = %window.start, end = %window.end)
)]
pub fn assign_month_slots(
    multi_day: &[CalendarItem],
    single_day: &[CalendarItem],
    window: TimeWindow,
    max_slots: usize,
    tz: &Tz,
) -> SlotMap {
    let mut occupied = vec![vec![false; max_slots]; window.len_days()];
    let mut slots = SlotMap::new();
    let mut hidden = 0usize;

    for item in month_order(multi_day, single_day, tz) {
        let Some((from, to)) = window.clamp(item.local_start_day(tz), item.local_end_day(tz)) else {
            trace!(id = %item.id, "item outside window");
            continue;
        };
        let first = window.index_of(from) as usize;
        let last = window.index_of(to) as usize;

        let free = (0..max_slots).find(|&slot| (first..=last).all(|day| !occupied[day][slot]));

        match free {
            Some(slot) => {
                for day in &mut occupied[first..=last] {
                    day[slot] = true;
                }
                slots.insert(item.id, slot);
            }
            None => hidden += 1,
        }
    }

    debug!(assigned = slots.len(), hidden, "assigned month slots");
    slots
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellEntry {
    pub id: ItemId,
    pub position: Option<usize>,
    pub multi_day: bool,
    pub role: SegmentRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub entries: Vec<CellEntry>,
    /// Items touching the day that have no visible slot.
    pub overflow: usize,
}

/// Everything touching `date`, multi-day first, then by slot, hidden items
/// last.
pub fn month_cell_entries(
    date: NaiveDate,
    multi_day: &[CalendarItem],
    single_day: &[CalendarItem],
    slots: &SlotMap,
    tz: &Tz,
) -> DayCell {
    let multi = multi_day.iter().map(|item| (item, true));
    let single = single_day.iter().map(|item| (item, false));

    let mut entries: Vec<CellEntry> = multi
        .chain(single)
        .filter(|(item, _)| item.touches_day(date, tz))
        .map(|(item, multi_day)| CellEntry {
            id: item.id,
            position: slots.get(&item.id).copied(),
            multi_day,
            role: segment_role(item, date, tz),
        })
        .collect();

    entries.sort_by(|a, b| {
        b.multi_day
            .cmp(&a.multi_day)
            .then_with(|| match (a.position, b.position) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.id.cmp(&b.id))
    });

    let overflow = entries.iter().filter(|entry| entry.position.is_none()).count();

    DayCell {
        date,
        entries,
        overflow,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekRowItem {
    pub id: ItemId,
    /// Day offsets inside the week, both inclusive.
    pub start_index: usize,
    pub end_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeekRow {
    pub items: Vec<WeekRowItem>,
}

impl WeekRow {
    fn is_free(&self, start: usize, end: usize) -> bool {
        self.items
            .iter()
            .all(|placed| placed.end_index < start || placed.start_index > end)
    }

    pub fn item_on(&self, day_index: usize) -> Option<&WeekRowItem> {
        self.items
            .iter()
            .find(|placed| placed.start_index <= day_index && day_index <= placed.end_index)
    }
}

/// Unbounded lane rows for multi-day items in the strip above a week grid.
#[tracing::instrument(skip(multi_day, tz), fields(count = multi_day.len()))]
pub fn assign_week_rows(multi_day: &[CalendarItem], week: TimeWindow, tz: &Tz) -> Vec<WeekRow> {
    let mut clamped: Vec<WeekRowItem> = multi_day
        .iter()
        .filter_map(|item| {
            let (from, to) = week.clamp(item.local_start_day(tz), item.local_end_day(tz))?;
            Some(WeekRowItem {
                id: item.id,
                start_index: week.index_of(from) as usize,
                end_index: week.index_of(to) as usize,
            })
        })
        .collect();

    clamped.sort_by(|a, b| {
        a.start_index
            .cmp(&b.start_index)
            .then_with(|| (b.end_index - b.start_index).cmp(&(a.end_index - a.start_index)))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut rows: Vec<WeekRow> = Vec::new();
    for item in clamped {
        match rows
            .iter_mut()
            .find(|row| row.is_free(item.start_index, item.end_index))
        {
            Some(row) => row.items.push(item),
            None => rows.push(WeekRow { items: vec![item] }),
        }
    }

    debug!(rows = rows.len(), "assigned week rows");
    rows
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::classify::classify_by_duration;
    use crate::item::UserId;

    fn at(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, m, d, h, 0, 0).single().expect("valid timestamp")
    }

    fn item(id: u64, start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarItem {
        CalendarItem::new(ItemId(id), start, end, format!("item {id}"), UserId(1)).expect("valid item")
    }

    fn ymd(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).expect("valid date")
    }

    fn january() -> TimeWindow {
        TimeWindow::new(ymd(1, 1), ymd(1, 31))
    }

    #[test]
    fn multi_day_item_outranks_single_day_item() {
        let tz = chrono_tz::UTC;
        let items = vec![item(2, at(1, 31, 15), at(1, 31, 16)), item(1, at(1, 30, 11), at(2, 1, 20))];
        let split = classify_by_duration(&items, &tz);

        let slots = assign_month_slots(&split.multi_day, &split.single_day, january(), DEFAULT_MONTH_SLOTS, &tz);

        assert_eq!(slots.get(&ItemId(1)), Some(&0));
        assert_eq!(slots.get(&ItemId(2)), Some(&1));
    }

    #[test]
    fn fourth_item_on_full_day_overflows() {
        let tz = chrono_tz::UTC;
        let single: Vec<_> = (0..4).map(|n| item(n + 1, at(1, 10, 8 + n as u32), at(1, 10, 9 + n as u32))).collect();

        let slots = assign_month_slots(&[], &single, january(), DEFAULT_MONTH_SLOTS, &tz);
        assert_eq!(slots.len(), 3);
        assert!(!slots.contains_key(&ItemId(4)));

        let cell = month_cell_entries(ymd(1, 10), &[], &single, &slots, &tz);
        assert_eq!(cell.entries.len(), 4);
        assert_eq!(cell.overflow, 1);
        assert_eq!(cell.entries.last().map(|e| e.id), Some(ItemId(4)));
    }

    #[test]
    fn same_slot_items_never_share_a_day() {
        let tz = chrono_tz::UTC;
        let items = vec![
            item(1, at(1, 1, 9), at(1, 5, 9)),
            item(2, at(1, 3, 9), at(1, 9, 9)),
            item(3, at(1, 6, 9), at(1, 7, 9)),
            item(4, at(1, 4, 9), at(1, 4, 10)),
            item(5, at(1, 6, 12), at(1, 6, 13)),
            item(6, Utc.with_ymd_and_hms(2024, 12, 28, 9, 0, 0).single().expect("valid timestamp"), at(1, 2, 9)),
            item(7, at(1, 30, 9), at(2, 3, 9)),
            item(8, at(1, 7, 9), at(1, 7, 10)),
        ];
        let split = classify_by_duration(&items, &tz);
        let window = january();
        let slots = assign_month_slots(&split.multi_day, &split.single_day, window, DEFAULT_MONTH_SLOTS, &tz);

        let by_id: BTreeMap<ItemId, &CalendarItem> = items.iter().map(|i| (i.id, i)).collect();
        for (a, slot_a) in &slots {
            for (b, slot_b) in &slots {
                if a >= b || slot_a != slot_b {
                    continue;
                }
                let ra = window.clamp(by_id[a].local_start_day(&tz), by_id[a].local_end_day(&tz));
                let rb = window.clamp(by_id[b].local_start_day(&tz), by_id[b].local_end_day(&tz));
                let (Some((a0, a1)), Some((b0, b1))) = (ra, rb) else {
                    panic!("assigned items must intersect the window");
                };
                assert!(a1 < b0 || b1 < a0, "{a} and {b} share slot {slot_a}");
            }
        }

        let again = assign_month_slots(&split.multi_day, &split.single_day, window, DEFAULT_MONTH_SLOTS, &tz);
        assert_eq!(slots, again);
    }

    #[test]
    fn items_outside_window_get_no_slot() {
        let tz = chrono_tz::UTC;
        let outside = vec![item(1, at(2, 10, 9), at(2, 10, 10))];
        let slots = assign_month_slots(&[], &outside, january(), DEFAULT_MONTH_SLOTS, &tz);
        assert!(slots.is_empty());
    }

    #[test]
    fn week_rows_stack_overlapping_bars() {
        let tz = chrono_tz::UTC;
        let week = TimeWindow::new(ymd(1, 26), ymd(2, 1));
        let multi = vec![
            item(1, at(1, 24, 9), at(1, 28, 9)),
            item(2, at(1, 27, 9), at(1, 30, 9)),
            item(3, at(1, 29, 9), at(2, 5, 9)),
        ];

        let rows = assign_week_rows(&multi, week, &tz);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].items.iter().map(|i| i.id.0).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(rows[1].items[0].id, ItemId(2));
        assert_eq!(rows[0].item_on(6).map(|i| i.id), Some(ItemId(3)));
        assert_eq!(rows[0].items[0].start_index, 0);
    }
}
