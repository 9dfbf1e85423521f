use chrono::{
  DateTime,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone,
  Timelike,
  Utc
};
use chrono_tz::Tz;

pub const MINUTES_PER_DAY: i64 = 1_440;

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured calendar timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Resolves a wall-clock time in `tz`. Ambiguous times take the earliest
/// instant; times inside a DST gap move forward to the first valid minute.
pub fn local_to_utc(
  local_naive: NaiveDateTime,
  tz: &Tz
) -> DateTime<Utc> {
  let mut candidate = local_naive;
  for _ in 0..=180 {
    match tz
      .from_local_datetime(&candidate)
    {
      | LocalResult::Single(local_dt) => {
        return local_dt
          .with_timezone(&Utc);
      }
      | LocalResult::Ambiguous(
        first,
        second
      ) => {
        tracing::trace!(
          first = %first,
          second = %second,
          "ambiguous local datetime; using earliest"
        );
        let chosen = if first <= second {
          first
        } else {
          second
        };
        return chosen
          .with_timezone(&Utc);
      }
      | LocalResult::None => {
        candidate +=
          Duration::minutes(1);
      }
    }
  }

  tracing::warn!(
    local = %local_naive,
    "local datetime unresolvable; reading it as UTC"
  );
  local_naive.and_utc()
}

pub fn local_midnight(
  day: NaiveDate,
  tz: &Tz
) -> DateTime<Utc> {
  local_to_utc(
    day.and_time(NaiveTime::MIN),
    tz
  )
}

/// Local wall-clock minutes as a share of a 24-hour column. Reads the
/// clock face, not elapsed time, so DST days keep the line on its hour.
pub fn time_of_day_percent(
  now: DateTime<Utc>,
  tz: &Tz
) -> f64 {
  let local = now.with_timezone(tz);
  let minutes = (i64::from(local.hour())
    * 60
    + i64::from(local.minute()))
  .clamp(0, MINUTES_PER_DAY);
  minutes as f64
    / MINUTES_PER_DAY as f64
    * 100.0
}
