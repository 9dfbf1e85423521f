use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;

use crate::item::{CalendarItem, ItemId};
use crate::navigation::{CalendarView, add_days};
use crate::window::TimeWindow;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgendaDay {
    pub date: NaiveDate,
    pub items: Vec<CalendarItem>,
    pub multi_day: Vec<CalendarItem>,
}

/// Days of the focus month that carry anything, ascending. Single-day items
/// land on their start day, multi-day items on every day they cover.
#[tracing::instrument(skip(single_day, multi_day, tz), fields(focus = %focus))]
pub fn group_agenda(
    single_day: &[CalendarItem],
    multi_day: &[CalendarItem],
    focus: NaiveDate,
    tz: &Tz,
) -> Vec<AgendaDay> {
    let month = TimeWindow::for_view(CalendarView::Agenda, focus, chrono::Weekday::Sun);
    let mut days: BTreeMap<NaiveDate, AgendaDay> = BTreeMap::new();

    for item in single_day {
        let date = item.local_start_day(tz);
        if !month.contains(date) {
            continue;
        }
        days.entry(date)
            .or_insert_with(|| AgendaDay {
                date,
                ..AgendaDay::default()
            })
            .items
            .push(item.clone());
    }

    for item in multi_day {
        let Some((from, to)) = month.clamp(item.local_start_day(tz), item.local_end_day(tz)) else {
            continue;
        };
        let mut date = from;
        while date <= to {
            days.entry(date)
                .or_insert_with(|| AgendaDay {
                    date,
                    ..AgendaDay::default()
                })
                .multi_day
                .push(item.clone());
            date = add_days(date, 1);
        }
    }

    for day in days.values_mut() {
        day.items.sort_by(|a, b| a.span().0.cmp(&b.span().0).then_with(|| a.id.cmp(&b.id)));
    }

    days.into_values().collect()
}

/// Per day of the month holding `month_start`, ids whose local start or end
/// is that day. Feeds the year-view mini calendars.
pub fn year_month_items(
    items: &[CalendarItem],
    month_start: NaiveDate,
    tz: &Tz,
) -> Vec<(NaiveDate, Vec<ItemId>)> {
    let month = TimeWindow::for_view(CalendarView::Month, month_start, chrono::Weekday::Sun);
    month
        .days()
        .map(|date| {
            let ids = items
                .iter()
                .filter(|item| item.local_start_day(tz) == date || item.local_end_day(tz) == date)
                .map(|item| item.id)
                .collect();
            (date, ids)
        })
        .collect()
}

/// First day of each month of the year containing `focus`.
pub fn year_months(focus: NaiveDate) -> Vec<NaiveDate> {
    (1..=12)
        .filter_map(|month| NaiveDate::from_ymd_opt(focus.year(), month, 1))
        .collect()
}
