use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::item::{CalendarItem, User};

#[tracing::instrument(skip(path))]
pub fn load_items(path: &Path) -> anyhow::Result<Vec<CalendarItem>> {
    load_jsonl(path).with_context(|| format!("failed to load items from {}", path.display()))
}

#[tracing::instrument(skip(path, items))]
pub fn save_items(path: &Path, items: &[CalendarItem]) -> anyhow::Result<()> {
    save_jsonl_atomic(path, items).with_context(|| format!("failed to save items to {}", path.display()))
}

#[tracing::instrument(skip(path))]
pub fn load_users(path: &Path) -> anyhow::Result<Vec<User>> {
    load_jsonl(path).with_context(|| format!("failed to load users from {}", path.display()))
}

fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }

        let record: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(record);
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

fn save_jsonl_atomic<T: Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = records.len(), "saving jsonl atomically");

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    for record in records {
        let serialized = serde_json::to_string(record)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use super::*;
    use crate::item::{ItemId, UserId};

    #[test]
    fn items_survive_a_save_and_load() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("items.jsonl");
        let start = Utc.with_ymd_and_hms(2025, 1, 30, 11, 0, 0).single().expect("valid timestamp");
        let end = Utc.with_ymd_and_hms(2025, 2, 1, 20, 0, 0).single().expect("valid timestamp");
        let items = vec![CalendarItem::new(ItemId(1), start, end, "Lorem Ipsum", UserId(2)).expect("valid item")];

        save_items(&path, &items).expect("save items");
        assert_eq!(load_items(&path).expect("load items"), items);
    }

    #[test]
    fn reports_the_bad_line() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("items.jsonl");
        fs::write(
            &path,
            "{\"id\":1,\"start\":\"2025-01-02T00:00:00Z\",\"end\":\"2025-01-01T00:00:00Z\",\"title\":\"x\",\"owner\":1}\n",
        )
        .expect("write fixture");

        let err = load_items(&path).expect_err("inverted item must fail");
        assert!(format!("{err:#}").contains("line 1"));
    }

    #[test]
    fn loads_users_with_front_end_names() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("users.jsonl");
        fs::write(&path, "{\"id\":1,\"name\":\"Michael Johnson\",\"picturePath\":null}\n\n").expect("write fixture");

        let users = load_users(&path).expect("load users");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].display_name, "Michael Johnson");
        assert_eq!(users[0].id, UserId(1));
    }
}
