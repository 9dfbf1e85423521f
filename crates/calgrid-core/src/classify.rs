use chrono_tz::Tz;
use tracing::debug;

use crate::item::CalendarItem;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DurationSplit {
    pub single_day: Vec<CalendarItem>,
    pub multi_day: Vec<CalendarItem>,
}

/// Splits items on whether their local start and end fall on the same day.
/// Input order is preserved inside each half.
#[tracing::instrument(skip(items), fields(count = items.len()))]
pub fn classify_by_duration(items: &[CalendarItem], tz: &Tz) -> DurationSplit {
    let (multi_day, single_day): (Vec<_>, Vec<_>) = items
        .iter()
        .cloned()
        .partition(|item| item.is_multi_day(tz));

    debug!(
        single_day = single_day.len(),
        multi_day = multi_day.len(),
        "classified items by duration"
    );

    DurationSplit {
        single_day,
        multi_day,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::item::{ItemId, UserId};

    fn item(id: u64, start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarItem {
        CalendarItem::new(ItemId(id), start, end, format!("item {id}"), UserId(1)).expect("valid item")
    }

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, h, 0, 0).single().expect("valid timestamp")
    }

    #[test]
    fn empty_input_gives_empty_halves() {
        let split = classify_by_duration(&[], &chrono_tz::UTC);
        assert!(split.single_day.is_empty());
        assert!(split.multi_day.is_empty());
    }

    #[test]
    fn partition_is_lossless_and_ordered() {
        let items = vec![
            item(1, at(30, 11), at(31, 20)),
            item(2, at(31, 15), at(31, 16)),
            item(3, at(2, 0), at(2, 23)),
            item(4, at(5, 22), at(6, 1)),
        ];

        let split = classify_by_duration(&items, &chrono_tz::UTC);

        assert_eq!(split.single_day.len() + split.multi_day.len(), items.len());
        let single: Vec<_> = split.single_day.iter().map(|i| i.id.0).collect();
        let multi: Vec<_> = split.multi_day.iter().map(|i| i.id.0).collect();
        assert_eq!(single, vec![2, 3]);
        assert_eq!(multi, vec![1, 4]);
    }
}
