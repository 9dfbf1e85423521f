//! Column grouping for the hour grids of the week and day views.

use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::debug;

use crate::item::CalendarItem;

/// Chains same-day items into non-overlapping columns. Items go into the
/// first group whose last item has ended by the time they start.
#[tracing::instrument(skip(day_items), fields(count = day_items.len()))]
pub fn group_by_overlap(day_items: &[CalendarItem]) -> Vec<Vec<CalendarItem>> {
    let mut sorted: Vec<&CalendarItem> = day_items.iter().collect();
    sorted.sort_by(|a, b| a.span().0.cmp(&b.span().0).then_with(|| a.id.cmp(&b.id)));

    let mut groups: Vec<Vec<CalendarItem>> = Vec::new();
    for item in sorted {
        let start = item.span().0;
        let open = groups.iter_mut().find(|group| {
            group
                .last()
                .map(|last| last.span().1 <= start)
                .unwrap_or(true)
        });

        match open {
            Some(group) => group.push(item.clone()),
            None => groups.push(vec![item.clone()]),
        }
    }

    debug!(groups = groups.len(), "grouped day items");
    groups
}

/// Open-interval overlap: touching endpoints do not count.
pub fn intervals_overlap(a: &CalendarItem, b: &CalendarItem) -> bool {
    let (a_start, a_end) = a.span();
    let (b_start, b_end) = b.span();
    a_start < b_end && b_start < a_end
}

/// True when `item` really collides with something in another column.
pub fn has_cross_group_overlap(
    item: &CalendarItem,
    group_index: usize,
    groups: &[Vec<CalendarItem>],
) -> bool {
    groups
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != group_index)
        .any(|(_, group)| group.iter().any(|other| intervals_overlap(item, other)))
}

/// Items whose local start or end falls on `day`.
pub fn items_on_day(items: &[CalendarItem], day: NaiveDate, tz: &Tz) -> Vec<CalendarItem> {
    items
        .iter()
        .filter(|item| item.local_start_day(tz) == day || item.local_end_day(tz) == day)
        .cloned()
        .collect()
}
