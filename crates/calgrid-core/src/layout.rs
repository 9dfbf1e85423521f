//! Per-view pipelines: classify, assign, map.
//!
//! Every build starts from the raw item list and keeps no state between
//! calls, so callers may hand over a fresh list on every render.

use chrono::{NaiveDate, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use crate::agenda::{AgendaDay, group_agenda};
use crate::classify::classify_by_duration;
use crate::geometry::{TimedBlock, layout_day_column};
use crate::grouping::items_on_day;
use crate::item::CalendarItem;
use crate::navigation::CalendarView;
use crate::slots::{DayCell, SlotMap, WeekRow, assign_month_slots, assign_week_rows, month_cell_entries};
use crate::window::{GridCell, TimeWindow, month_grid_cells};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCell {
    pub grid: GridCell,
    pub day: DayCell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthLayout {
    pub window: TimeWindow,
    pub max_slots: usize,
    pub slots: SlotMap,
    pub cells: Vec<MonthCell>,
}

impl MonthLayout {
    #[tracing::instrument(skip(items, tz), fields(count = items.len()))]
    pub fn build(
        items: &[CalendarItem],
        focus: NaiveDate,
        week_start: Weekday,
        max_slots: usize,
        tz: &Tz,
    ) -> Self {
        let window = TimeWindow::for_view(CalendarView::Month, focus, week_start);
        let grid = month_grid_cells(focus, week_start);
        // Padding days are drawn too, so they take part in slotting.
        let grid_window = match (grid.first(), grid.last()) {
            (Some(first), Some(last)) => TimeWindow::new(first.date, last.date),
            _ => window,
        };
        let split = classify_by_duration(items, tz);
        let slots = assign_month_slots(&split.multi_day, &split.single_day, grid_window, max_slots, tz);

        let cells = grid
            .into_iter()
            .map(|cell| MonthCell {
                grid: cell,
                day: month_cell_entries(cell.date, &split.multi_day, &split.single_day, &slots, tz),
            })
            .collect();

        Self {
            window,
            max_slots,
            slots,
            cells,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayColumn {
    pub date: NaiveDate,
    pub blocks: Vec<TimedBlock>,
}

/// Hour-grid layout for the week and day views: a lane strip for multi-day
/// items on top, one column of timed blocks per day below.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeGridLayout {
    pub window: TimeWindow,
    pub rows: Vec<WeekRow>,
    pub columns: Vec<DayColumn>,
}

impl TimeGridLayout {
    #[tracing::instrument(skip(items, tz), fields(count = items.len()))]
    pub fn build(
        items: &[CalendarItem],
        view: CalendarView,
        focus: NaiveDate,
        week_start: Weekday,
        tz: &Tz,
    ) -> Self {
        let view = match view {
            CalendarView::Day => CalendarView::Day,
            _ => CalendarView::Week,
        };
        let window = TimeWindow::for_view(view, focus, week_start);
        let split = classify_by_duration(items, tz);
        let rows = assign_week_rows(&split.multi_day, window, tz);

        let columns = window
            .days()
            .map(|date| {
                let day_items = items_on_day(&split.single_day, date, tz);
                DayColumn {
                    date,
                    blocks: layout_day_column(&day_items, date, tz),
                }
            })
            .collect();

        Self {
            window,
            rows,
            columns,
        }
    }
}

pub fn build_agenda(items: &[CalendarItem], focus: NaiveDate, tz: &Tz) -> Vec<AgendaDay> {
    let split = classify_by_duration(items, tz);
    group_agenda(&split.single_day, &split.multi_day, focus, tz)
}
