use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  Weekday
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};

use crate::error::LayoutError;
use crate::item::CalendarItem;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize
)]
#[serde(rename_all = "lowercase")]
pub enum CalendarView {
  Day,
  Week,
  #[default]
  Month,
  Year,
  Agenda
}

impl CalendarView {
  pub fn all() -> [Self; 5] {
    [
      Self::Day,
      Self::Week,
      Self::Month,
      Self::Year,
      Self::Agenda
    ]
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Day => "day",
      | Self::Week => "week",
      | Self::Month => "month",
      | Self::Year => "year",
      | Self::Agenda => "agenda"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::Day => "Day",
      | Self::Week => "Week",
      | Self::Month => "Month",
      | Self::Year => "Year",
      | Self::Agenda => "Agenda"
    }
  }

  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "day" => Some(Self::Day),
      | "week" => Some(Self::Week),
      | "month" => Some(Self::Month),
      | "year" => Some(Self::Year),
      | "agenda" => {
        Some(Self::Agenda)
      }
      | _ => None
    }
  }
}

impl std::str::FromStr for CalendarView {
  type Err = LayoutError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Self::from_key(s).ok_or_else(|| {
      LayoutError::InvalidView(
        s.to_string()
      )
    })
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Direction {
  Previous,
  Next
}

impl Direction {
  fn step(self) -> i32 {
    match self {
      | Self::Previous => -1,
      | Self::Next => 1
    }
  }
}

/// Moves the reference date one view unit. Months and years clamp the
/// day to the target month length, so Jan 31 + 1 month lands on Feb 28
/// and does not come back to Jan 31.
pub fn navigate_date(
  date: NaiveDate,
  view: CalendarView,
  direction: Direction
) -> NaiveDate {
  let step = direction.step();
  match view {
    | CalendarView::Day => {
      add_days(date, i64::from(step))
    }
    | CalendarView::Week => {
      add_days(
        date,
        i64::from(step) * 7
      )
    }
    | CalendarView::Month
    | CalendarView::Agenda => {
      shift_months(date, step)
    }
    | CalendarView::Year => {
      shift_years(date, step)
    }
  }
}

pub fn format_range_label(
  view: CalendarView,
  date: NaiveDate,
  week_start: Weekday
) -> String {
  const RANGE_FORMAT: &str =
    "%b %-d, %Y";

  match view {
    | CalendarView::Month => {
      let start = first_day_of_month(
        date.year(),
        date.month()
      );
      let end = last_day_of_month(
        date.year(),
        date.month()
      );
      format!(
        "{} - {}",
        start.format(RANGE_FORMAT),
        end.format(RANGE_FORMAT)
      )
    }
    | CalendarView::Week => {
      let start =
        start_of_week(date, week_start);
      let end = add_days(start, 6);
      format!(
        "{} - {}",
        start.format(RANGE_FORMAT),
        end.format(RANGE_FORMAT)
      )
    }
    | CalendarView::Day => {
      date
        .format("%A, %B %-d, %Y")
        .to_string()
    }
    | CalendarView::Year => {
      date.year().to_string()
    }
    | CalendarView::Agenda => {
      date.format("%B %Y").to_string()
    }
  }
}

/// Items whose local start shares the view period with `date`.
pub fn events_count(
  items: &[CalendarItem],
  date: NaiveDate,
  view: CalendarView,
  week_start: Weekday,
  tz: &Tz
) -> usize {
  items
    .iter()
    .filter(|item| {
      let start =
        item.local_start_day(tz);
      match view {
        | CalendarView::Day => {
          start == date
        }
        | CalendarView::Week => {
          start_of_week(
            start, week_start
          ) == start_of_week(
            date, week_start
          )
        }
        | CalendarView::Month
        | CalendarView::Agenda => {
          start.year() == date.year()
            && start.month()
              == date.month()
        }
        | CalendarView::Year => {
          start.year() == date.year()
        }
      }
    })
    .count()
}

pub fn parse_week_start(
  raw: &str
) -> Weekday {
  if raw
    .trim()
    .eq_ignore_ascii_case("monday")
  {
    Weekday::Mon
  } else {
    Weekday::Sun
  }
}

pub fn shift_years(
  date: NaiveDate,
  years: i32
) -> NaiveDate {
  let year =
    date.year().saturating_add(years);
  let month = date.month();
  let day = date
    .day()
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or(date)
}

pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let mut year = date.year();
  let mut month =
    date.month() as i32 + months;

  while month < 1 {
    month += 12;
    year = year.saturating_sub(1);
  }
  while month > 12 {
    month -= 12;
    year = year.saturating_add(1);
  }

  let month = month as u32;
  let day = date
    .day()
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or(date)
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::*;
  use crate::item::{
    ItemId,
    UserId
  };

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn day_week_month_round_trip_across_boundaries() {
    let dates = [
      ymd(2024, 12, 31),
      ymd(2025, 1, 15),
      ymd(2024, 2, 29),
      ymd(2025, 12, 28)
    ];
    let views = [
      CalendarView::Day,
      CalendarView::Week
    ];

    for date in dates {
      for view in views {
        let there = navigate_date(
          date,
          view,
          Direction::Next
        );
        assert_eq!(
          navigate_date(
            there,
            view,
            Direction::Previous
          ),
          date
        );
      }
    }

    let mid = ymd(2024, 12, 15);
    let next = navigate_date(
      mid,
      CalendarView::Month,
      Direction::Next
    );
    assert_eq!(next, ymd(2025, 1, 15));
    assert_eq!(
      navigate_date(
        next,
        CalendarView::Month,
        Direction::Previous
      ),
      mid
    );
  }

  #[test]
  fn month_end_clamps_and_does_not_round_trip() {
    let jan31 = ymd(2025, 1, 31);
    let feb = navigate_date(
      jan31,
      CalendarView::Month,
      Direction::Next
    );
    assert_eq!(feb, ymd(2025, 2, 28));
    assert_eq!(
      navigate_date(
        feb,
        CalendarView::Month,
        Direction::Previous
      ),
      ymd(2025, 1, 28)
    );

    assert_eq!(
      navigate_date(
        ymd(2024, 2, 29),
        CalendarView::Year,
        Direction::Next
      ),
      ymd(2025, 2, 28)
    );
  }

  #[test]
  fn range_labels_per_view() {
    let date = ymd(2025, 1, 1);
    assert_eq!(
      format_range_label(
        CalendarView::Month,
        date,
        Weekday::Sun
      ),
      "Jan 1, 2025 - Jan 31, 2025"
    );
    assert_eq!(
      format_range_label(
        CalendarView::Week,
        date,
        Weekday::Sun
      ),
      "Dec 29, 2024 - Jan 4, 2025"
    );
    assert_eq!(
      format_range_label(
        CalendarView::Week,
        date,
        Weekday::Mon
      ),
      "Dec 30, 2024 - Jan 5, 2025"
    );
    assert_eq!(
      format_range_label(
        CalendarView::Day,
        ymd(2025, 1, 31),
        Weekday::Sun
      ),
      "Friday, January 31, 2025"
    );
    assert_eq!(
      format_range_label(
        CalendarView::Year,
        date,
        Weekday::Sun
      ),
      "2025"
    );
  }

  #[test]
  fn view_keys_parse() {
    for view in CalendarView::all() {
      assert_eq!(
        CalendarView::from_key(
          view.as_key()
        ),
        Some(view)
      );
    }
    assert!(
      "quarter"
        .parse::<CalendarView>()
        .is_err()
    );
  }

  #[test]
  fn counts_events_per_period() {
    let at = |d: u32| {
      Utc
        .with_ymd_and_hms(
          2025, 1, d, 9, 0, 0
        )
        .single()
        .expect("valid timestamp")
    };
    let items = [1_u32, 2, 5, 31]
      .iter()
      .enumerate()
      .map(|(idx, d)| {
        CalendarItem::new(
          ItemId(idx as u64),
          at(*d),
          at(*d),
          "x",
          UserId(1)
        )
        .expect("valid item")
      })
      .collect::<Vec<_>>();
    let tz = chrono_tz::UTC;
    let focus = ymd(2025, 1, 2);

    assert_eq!(
      events_count(
        &items,
        focus,
        CalendarView::Day,
        Weekday::Sun,
        &tz
      ),
      1
    );
    assert_eq!(
      events_count(
        &items,
        focus,
        CalendarView::Week,
        Weekday::Sun,
        &tz
      ),
      2
    );
    assert_eq!(
      events_count(
        &items,
        focus,
        CalendarView::Month,
        Weekday::Sun,
        &tz
      ),
      4
    );
  }
}
