use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,

    #[serde(alias = "name")]
    pub display_name: String,

    #[serde(default, alias = "picturePath")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventColor {
    #[default]
    Blue,
    Green,
    Red,
    Yellow,
    Purple,
    Orange,
    Gray,
}

impl EventColor {
    pub fn as_key(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Purple => "purple",
            Self::Orange => "orange",
            Self::Gray => "gray",
        }
    }
}

/// A scheduled item as the layout engine sees it. `end` is inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawItem")]
pub struct CalendarItem {
    pub id: ItemId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    pub color: EventColor,
    pub owner: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Deserialize)]
struct RawItem {
    id: ItemId,
    #[serde(alias = "startDate")]
    start: DateTime<Utc>,
    #[serde(alias = "endDate")]
    end: DateTime<Utc>,
    title: String,
    #[serde(default)]
    color: EventColor,
    #[serde(alias = "userId", alias = "ownerId")]
    owner: UserId,
    #[serde(default)]
    description: Option<String>,
}

impl TryFrom<RawItem> for CalendarItem {
    type Error = LayoutError;

    fn try_from(raw: RawItem) -> Result<Self, Self::Error> {
        let mut item = CalendarItem::new(raw.id, raw.start, raw.end, raw.title, raw.owner)?;
        item.color = raw.color;
        item.description = raw.description;
        Ok(item)
    }
}

impl CalendarItem {
    pub fn new(
        id: ItemId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        title: impl Into<String>,
        owner: UserId,
    ) -> Result<Self, LayoutError> {
        if end < start {
            return Err(LayoutError::InvalidRange { id, start, end });
        }

        Ok(Self {
            id,
            start,
            end,
            title: title.into(),
            color: EventColor::default(),
            owner,
            description: None,
        })
    }

    pub fn with_color(mut self, color: EventColor) -> Self {
        self.color = color;
        self
    }

    /// Start and end ordered, so a hand-built inverted item still lays out.
    pub fn span(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        if self.end < self.start {
            (self.end, self.start)
        } else {
            (self.start, self.end)
        }
    }

    pub fn local_start_day(&self, tz: &Tz) -> NaiveDate {
        self.span().0.with_timezone(tz).date_naive()
    }

    pub fn local_end_day(&self, tz: &Tz) -> NaiveDate {
        self.span().1.with_timezone(tz).date_naive()
    }

    pub fn is_multi_day(&self, tz: &Tz) -> bool {
        self.local_start_day(tz) != self.local_end_day(tz)
    }

    /// Whole local days between start and end, the month-grid sort key.
    pub fn duration_days(&self, tz: &Tz) -> i64 {
        (self.local_end_day(tz) - self.local_start_day(tz)).num_days()
    }

    pub fn touches_day(&self, day: NaiveDate, tz: &Tz) -> bool {
        self.local_start_day(tz) <= day && day <= self.local_end_day(tz)
    }
}
