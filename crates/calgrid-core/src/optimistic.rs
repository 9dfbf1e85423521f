//! Local item cache with optimistic writes.
//!
//! A mutation is applied to the cache immediately and handed back as a
//! pending token. The caller later commits it (optionally with the copy the
//! backend returned) or rolls it back, which restores the entry that was
//! there before the mutation.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::datetime::local_to_utc;
use crate::error::LayoutError;
use crate::item::{CalendarItem, ItemId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Upsert(CalendarItem),
    Remove(ItemId),
}

impl Mutation {
    pub fn id(&self) -> ItemId {
        match self {
            Self::Upsert(item) => item.id,
            Self::Remove(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PendingMutation {
    pub token: u64,
    pub id: ItemId,
}

#[derive(Debug, Clone)]
struct Snapshot {
    id: ItemId,
    previous: Option<CalendarItem>,
}

#[derive(Debug, Clone, Default)]
pub struct OptimisticCache {
    items: BTreeMap<ItemId, CalendarItem>,
    pending: BTreeMap<u64, Snapshot>,
    next_token: u64,
}

impl OptimisticCache {
    pub fn new(items: impl IntoIterator<Item = CalendarItem>) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
            ..Self::default()
        }
    }

    pub fn get(&self, id: ItemId) -> Option<&CalendarItem> {
        self.items.get(&id)
    }

    /// Current items in id order, ready to hand to the layout engine.
    pub fn items(&self) -> Vec<CalendarItem> {
        self.items.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[tracing::instrument(skip(self, mutation), fields(id = %mutation.id()))]
    pub fn apply(&mut self, mutation: Mutation) -> PendingMutation {
        let id = mutation.id();
        let previous = match mutation {
            Mutation::Upsert(item) => self.items.insert(id, item),
            Mutation::Remove(id) => self.items.remove(&id),
        };

        self.next_token += 1;
        let token = self.next_token;
        self.pending.insert(token, Snapshot { id, previous });
        debug!(token, "applied optimistic mutation");

        PendingMutation { token, id }
    }

    /// Drops the snapshot. A confirmed copy from the backend replaces the
    /// optimistic one.
    #[tracing::instrument(skip(self, confirmed), fields(token = pending.token, id = %pending.id))]
    pub fn commit(
        &mut self,
        pending: PendingMutation,
        confirmed: Option<CalendarItem>,
    ) -> Result<(), LayoutError> {
        self.pending
            .remove(&pending.token)
            .ok_or(LayoutError::UnknownMutation(pending.token))?;

        if let Some(item) = confirmed {
            self.items.insert(item.id, item);
        }
        debug!("committed mutation");
        Ok(())
    }

    /// Restores the entry seen before the mutation. Last write wins: a later
    /// mutation on the same id that is still pending is overwritten.
    #[tracing::instrument(skip(self), fields(token = pending.token, id = %pending.id))]
    pub fn rollback(&mut self, pending: PendingMutation) -> Result<(), LayoutError> {
        let snapshot = self
            .pending
            .remove(&pending.token)
            .ok_or(LayoutError::UnknownMutation(pending.token))?;

        if self.pending.values().any(|other| other.id == snapshot.id) {
            warn!("rolling back under a newer pending mutation of the same item");
        }

        match snapshot.previous {
            Some(item) => {
                self.items.insert(snapshot.id, item);
            }
            None => {
                self.items.remove(&snapshot.id);
            }
        }
        info!("rolled back mutation");
        Ok(())
    }
}

fn shifted(item: &CalendarItem, new_start: DateTime<Utc>) -> CalendarItem {
    let (start, end) = item.span();
    let duration: Duration = end - start;
    CalendarItem {
        start: new_start,
        end: new_start + duration,
        ..item.clone()
    }
}

/// Drop on an hour-grid slot: new local start at `hour:minute`, same length.
pub fn reschedule_to_slot(item: &CalendarItem, date: NaiveDate, hour: u32, minute: u32, tz: &Tz) -> CalendarItem {
    let time = NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0).unwrap_or(NaiveTime::MIN);
    shifted(item, local_to_utc(date.and_time(time), tz))
}

/// Drop on a month cell: keeps the local time of day and the length.
pub fn reschedule_to_day(item: &CalendarItem, date: NaiveDate, tz: &Tz) -> CalendarItem {
    let time = item.span().0.with_timezone(tz).time();
    shifted(item, local_to_utc(date.and_time(time), tz))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};

    use super::*;
    use crate::item::UserId;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, h, m, 0).single().expect("valid timestamp")
    }

    fn item(id: u64, start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarItem {
        CalendarItem::new(ItemId(id), start, end, format!("item {id}"), UserId(1)).expect("valid item")
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).expect("valid date")
    }

    #[test]
    fn rollback_restores_previous_entry() {
        let original = item(1, at(10, 9, 0), at(10, 10, 0));
        let mut cache = OptimisticCache::new(vec![original.clone()]);

        let moved = reschedule_to_slot(&original, day(12), 14, 30, &chrono_tz::UTC);
        let pending = cache.apply(Mutation::Upsert(moved.clone()));
        assert_eq!(cache.get(ItemId(1)), Some(&moved));

        cache.rollback(pending).expect("rollback");
        assert_eq!(cache.get(ItemId(1)), Some(&original));
        assert_eq!(cache.pending_count(), 0);
    }

    #[test]
    fn rollback_of_insert_removes_item() {
        let mut cache = OptimisticCache::default();
        let pending = cache.apply(Mutation::Upsert(item(9, at(1, 9, 0), at(1, 10, 0))));
        assert_eq!(cache.len(), 1);

        cache.rollback(pending).expect("rollback");
        assert!(cache.is_empty());
    }

    #[test]
    fn commit_keeps_change_and_takes_confirmed_copy() {
        let original = item(1, at(10, 9, 0), at(10, 10, 0));
        let mut cache = OptimisticCache::new(vec![original.clone()]);

        let pending = cache.apply(Mutation::Remove(ItemId(1)));
        assert!(cache.get(ItemId(1)).is_none());
        cache.commit(pending, None).expect("commit");
        assert!(cache.get(ItemId(1)).is_none());

        let created = item(2, at(3, 9, 0), at(3, 9, 30));
        let pending = cache.apply(Mutation::Upsert(created.clone()));
        let mut confirmed = created.clone();
        confirmed.title = "from backend".to_string();
        cache.commit(pending, Some(confirmed.clone())).expect("commit");
        assert_eq!(cache.get(ItemId(2)), Some(&confirmed));

        assert_eq!(cache.commit(pending, None), Err(LayoutError::UnknownMutation(pending.token)));
    }

    #[test]
    fn reschedule_keeps_duration_and_time_of_day() {
        let tz = chrono_tz::UTC;
        let original = item(1, at(10, 9, 15), at(11, 10, 45));

        let to_slot = reschedule_to_slot(&original, day(20), 8, 0, &tz);
        assert_eq!(to_slot.start, at(20, 8, 0));
        assert_eq!(to_slot.end - to_slot.start, original.end - original.start);

        let to_day = reschedule_to_day(&original, day(5), &tz);
        assert_eq!(to_day.start.with_timezone(&tz).hour(), 9);
        assert_eq!(to_day.start.with_timezone(&tz).minute(), 15);
        assert_eq!(to_day.end, at(6, 10, 45));
    }
}
