//! UI preferences that survive restarts, kept apart from the session-only
//! view state.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{Datelike, NaiveDate, Timelike, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::item::{CalendarItem, UserId};
use crate::navigation::{CalendarView, Direction, navigate_date};

pub const PREFERENCES_KEY: &str = "calendar-preferences";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    map: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.map.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key under a namespace directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    pub dir: PathBuf,
}

impl FileStore {
    #[tracing::instrument(skip(dir))]
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        info!(dir = %dir.display(), "opened preference store");
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(anyhow!("invalid storage key: {key:?}"));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("failed reading {}", path.display()))?;
        Ok(Some(raw))
    }

    #[tracing::instrument(skip(self, value))]
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        debug!(file = %path.display(), bytes = value.len(), "writing preference key atomically");

        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("failed removing {}", path.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeVariant {
    Dot,
    #[default]
    Colored,
}

impl BadgeVariant {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "dot" => Some(Self::Dot),
            "colored" => Some(Self::Colored),
            _ => None,
        }
    }
}

/// Whole hours, `to` exclusive, `0..=24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    pub from: u32,
    pub to: u32,
}

impl HourRange {
    pub const fn new(from: u32, to: u32) -> Self {
        Self { from, to }
    }

    pub fn is_off(&self) -> bool {
        self.from == 0 && self.to == 0
    }

    pub fn contains(&self, hour: u32) -> bool {
        self.from <= hour && hour < self.to
    }

    fn sanitize(&mut self) {
        self.from = self.from.min(24);
        self.to = self.to.min(24);
        if self.to < self.from {
            self.to = self.from;
        }
    }
}

impl std::str::FromStr for HourRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once('-')
            .ok_or_else(|| anyhow!("expected FROM-TO hours, got: {s}"))?;
        let from: u32 = from.trim().parse().with_context(|| format!("invalid hour: {from}"))?;
        let to: u32 = to.trim().parse().with_context(|| format!("invalid hour: {to}"))?;
        if from > 24 || to > 24 || to < from {
            return Err(anyhow!("hour range out of bounds: {s}"));
        }
        Ok(Self { from, to })
    }
}

pub const DEFAULT_VISIBLE_HOURS: HourRange = HourRange::new(7, 18);

/// Working hours per weekday, keyed 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkingHours(pub BTreeMap<u8, HourRange>);

impl Default for WorkingHours {
    fn default() -> Self {
        let mut days = BTreeMap::new();
        days.insert(0, HourRange::new(0, 0));
        for weekday in 1..=5 {
            days.insert(weekday, HourRange::new(8, 17));
        }
        days.insert(6, HourRange::new(8, 12));
        Self(days)
    }
}

impl WorkingHours {
    pub fn for_weekday(&self, weekday: Weekday) -> HourRange {
        let key = weekday.num_days_from_sunday() as u8;
        self.0.get(&key).copied().unwrap_or(HourRange::new(0, 0))
    }

    pub fn is_working_hour(&self, weekday: Weekday, hour: u32) -> bool {
        let range = self.for_weekday(weekday);
        !range.is_off() && range.contains(hour)
    }

    pub fn set(&mut self, weekday: Weekday, range: HourRange) {
        self.0.insert(weekday.num_days_from_sunday() as u8, range);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub badge_variant: BadgeVariant,

    #[serde(default = "default_visible_hours")]
    pub visible_hours: HourRange,

    #[serde(default)]
    pub working_hours: WorkingHours,
}

fn default_visible_hours() -> HourRange {
    DEFAULT_VISIBLE_HOURS
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            badge_variant: BadgeVariant::default(),
            visible_hours: DEFAULT_VISIBLE_HOURS,
            working_hours: WorkingHours::default(),
        }
    }
}

impl Preferences {
    pub fn sanitize(&mut self) {
        self.visible_hours.sanitize();
        self.working_hours.0.retain(|day, _| *day < 7);
        for range in self.working_hours.0.values_mut() {
            range.sanitize();
        }
    }

    /// Missing or unreadable payloads fall back to defaults.
    #[tracing::instrument(skip(store))]
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let raw = match store.get(PREFERENCES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no stored preferences; using defaults");
                return Self::default();
            }
            Err(error) => {
                warn!(error = %error, "failed reading preferences; using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str::<Preferences>(&raw) {
            Ok(mut prefs) => {
                prefs.sanitize();
                debug!(badge = ?prefs.badge_variant, "loaded preferences");
                prefs
            }
            Err(error) => {
                warn!(error = %error, "failed parsing stored preferences; using defaults");
                Self::default()
            }
        }
    }

    #[tracing::instrument(skip(self, store))]
    pub fn save(&self, store: &mut dyn KeyValueStore) -> anyhow::Result<()> {
        let payload = serde_json::to_string(self).context("failed to serialize preferences")?;
        store.set(PREFERENCES_KEY, &payload)
    }
}

/// Visible hours widened to cover every timed item that falls outside.
pub fn effective_visible_hours(visible: HourRange, items: &[CalendarItem], tz: &Tz) -> HourRange {
    let mut range = visible;
    for item in items.iter().filter(|item| !item.is_multi_day(tz)) {
        let (start, end) = item.span();
        let start = start.with_timezone(tz);
        let end = end.with_timezone(tz);

        range.from = range.from.min(start.hour());
        let end_hour = if end.minute() > 0 || end.second() > 0 {
            end.hour() + 1
        } else {
            end.hour()
        };
        range.to = range.to.max(end_hour.min(24));
    }
    range
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserFilter {
    #[default]
    All,
    User(UserId),
}

impl UserFilter {
    pub fn matches(&self, item: &CalendarItem) -> bool {
        match self {
            Self::All => true,
            Self::User(id) => item.owner == *id,
        }
    }
}

/// Session-only state owned by whoever drives the UI. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub view: CalendarView,
    pub selected_date: NaiveDate,
    pub selected_user: UserFilter,
}

impl ViewState {
    pub fn new(selected_date: NaiveDate) -> Self {
        Self {
            view: CalendarView::default(),
            selected_date,
            selected_user: UserFilter::All,
        }
    }

    pub fn navigate(&mut self, direction: Direction) {
        self.selected_date = navigate_date(self.selected_date, self.view, direction);
    }

    pub fn today(&mut self, today: NaiveDate) {
        self.selected_date = today;
    }

    pub fn visible_items<'a>(&self, items: &'a [CalendarItem]) -> Vec<&'a CalendarItem> {
        items
            .iter()
            .filter(|item| self.selected_user.matches(item))
            .collect()
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self.selected_date.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::tempdir;

    use super::*;
    use crate::item::ItemId;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, h, m, 0).single().expect("valid timestamp")
    }

    #[test]
    fn defaults_match_shipped_preferences() {
        let prefs = Preferences::default();
        assert_eq!(prefs.badge_variant, BadgeVariant::Colored);
        assert_eq!(prefs.visible_hours, HourRange::new(7, 18));
        assert!(!prefs.working_hours.is_working_hour(Weekday::Sun, 10));
        assert!(prefs.working_hours.is_working_hour(Weekday::Mon, 8));
        assert!(!prefs.working_hours.is_working_hour(Weekday::Mon, 17));
        assert!(!prefs.working_hours.is_working_hour(Weekday::Sat, 12));
    }

    #[test]
    fn round_trips_through_memory_store() {
        let mut store = MemoryStore::default();
        let mut prefs = Preferences::default();
        prefs.badge_variant = BadgeVariant::Dot;
        prefs.working_hours.set(Weekday::Sun, HourRange::new(10, 14));

        prefs.save(&mut store).expect("save prefs");
        assert_eq!(Preferences::load(&store), prefs);
    }

    #[test]
    fn corrupt_payload_falls_back_to_defaults() {
        let mut store = MemoryStore::default();
        store.set(PREFERENCES_KEY, "{not json").expect("set raw");
        assert_eq!(Preferences::load(&store), Preferences::default());
    }

    #[test]
    fn partial_payload_is_filled_and_sanitized() {
        let mut store = MemoryStore::default();
        store
            .set(PREFERENCES_KEY, r#"{"badgeVariant":"dot","visibleHours":{"from":20,"to":30}}"#)
            .expect("set raw");

        let prefs = Preferences::load(&store);
        assert_eq!(prefs.badge_variant, BadgeVariant::Dot);
        assert_eq!(prefs.visible_hours, HourRange::new(20, 24));
        assert_eq!(prefs.working_hours, WorkingHours::default());
    }

    #[test]
    fn file_store_persists_between_handles() {
        let temp = tempdir().expect("tempdir");
        let mut store = FileStore::open(temp.path()).expect("open store");
        store.set("answer", "42").expect("set key");

        let reopened = FileStore::open(temp.path()).expect("reopen store");
        assert_eq!(reopened.get("answer").expect("get key"), Some("42".to_string()));
        assert!(store.set("../escape", "x").is_err());

        store.remove("answer").expect("remove key");
        assert_eq!(store.get("answer").expect("get key"), None);
    }

    #[test]
    fn visible_hours_expand_to_cover_items() {
        let tz = chrono_tz::UTC;
        let items = vec![
            CalendarItem::new(ItemId(1), at(6, 30), at(7, 30), "early", UserId(1)).expect("valid item"),
            CalendarItem::new(ItemId(2), at(18, 0), at(19, 15), "late", UserId(1)).expect("valid item"),
        ];
        assert_eq!(effective_visible_hours(DEFAULT_VISIBLE_HOURS, &items, &tz), HourRange::new(6, 20));
        assert_eq!(effective_visible_hours(DEFAULT_VISIBLE_HOURS, &[], &tz), DEFAULT_VISIBLE_HOURS);
    }

    #[test]
    fn view_state_filters_and_navigates() {
        let mut state = ViewState::new(NaiveDate::from_ymd_opt(2025, 1, 31).expect("valid date"));
        state.navigate(Direction::Next);
        assert_eq!(state.selected_date, NaiveDate::from_ymd_opt(2025, 2, 28).expect("valid date"));

        let items = vec![
            CalendarItem::new(ItemId(1), at(9, 0), at(10, 0), "a", UserId(1)).expect("valid item"),
            CalendarItem::new(ItemId(2), at(9, 0), at(10, 0), "b", UserId(2)).expect("valid item"),
        ];
        state.selected_user = UserFilter::User(UserId(2));
        assert_eq!(state.visible_items(&items).len(), 1);
        assert!(!state.is_weekend());
    }

    #[test]
    fn hour_range_parses() {
        assert_eq!("9-17".parse::<HourRange>().expect("parse range"), HourRange::new(9, 17));
        assert!("17-9".parse::<HourRange>().is_err());
    }
}
