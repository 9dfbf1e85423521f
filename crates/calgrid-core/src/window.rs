use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::navigation::{
    CalendarView, add_days, first_day_of_month, last_day_of_month, start_of_week,
};

/// Inclusive range of local days covered by one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    pub fn for_view(view: CalendarView, focus: NaiveDate, week_start: Weekday) -> Self {
        match view {
            CalendarView::Day => Self::new(focus, focus),
            CalendarView::Week => {
                let start = start_of_week(focus, week_start);
                Self::new(start, add_days(start, 6))
            }
            CalendarView::Month | CalendarView::Agenda => Self::new(
                first_day_of_month(focus.year(), focus.month()),
                last_day_of_month(focus.year(), focus.month()),
            ),
            CalendarView::Year => Self::new(
                first_day_of_month(focus.year(), 1),
                last_day_of_month(focus.year(), 12),
            ),
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn len_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.len_days() as i64).map(move |offset| add_days(self.start, offset))
    }

    /// Intersection of `[from, to]` with the window, if any.
    pub fn clamp(&self, from: NaiveDate, to: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let from = from.max(self.start);
        let to = to.min(self.end);
        (from <= to).then_some((from, to))
    }

    /// Zero-based day offset from the window start.
    pub fn index_of(&self, day: NaiveDate) -> i64 {
        (day - self.start).num_days()
    }
}

/// One cell of a month grid, including the padding days of adjacent months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridCell {
    pub date: NaiveDate,
    pub current_month: bool,
}

/// Leading days of the previous month, the month itself, then trailing days
/// up to the end of the last week row.
pub fn month_grid_cells(focus: NaiveDate, week_start: Weekday) -> Vec<GridCell> {
    let first = first_day_of_month(focus.year(), focus.month());
    let last = last_day_of_month(focus.year(), focus.month());
    let grid_start = start_of_week(first, week_start);
    let grid_end = add_days(start_of_week(last, week_start), 6);

    TimeWindow::new(grid_start, grid_end)
        .days()
        .map(|date| GridCell {
            date,
            current_month: date.month() == focus.month() && date.year() == focus.year(),
        })
        .collect()
}
