use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::item::ItemId;

/// Domain rejections raised by the layout engine and its caches.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("item {id} ends before it starts ({start} > {end})")]
    InvalidRange {
        id: ItemId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("no pending mutation with token {0}")]
    UnknownMutation(u64),

    #[error("unknown calendar view: {0}")]
    InvalidView(String),
}
