use std::collections::BTreeMap;
use std::io::Write;

use chrono::{Datelike, NaiveDate, Timelike, Weekday};
use chrono_tz::Tz;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::agenda::AgendaDay;
use crate::geometry::SegmentRole;
use crate::item::{CalendarItem, EventColor, ItemId};
use crate::layout::{MonthLayout, TimeGridLayout};
use crate::preferences::{BadgeVariant, HourRange, Preferences, WorkingHours};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    tz: Tz,
}

impl Renderer {
    pub fn new(color: bool, tz: Tz) -> Self {
        Self { color, tz }
    }

    pub fn print_json<W: Write, T: Serialize>(&self, out: &mut W, value: &T) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(&mut *out, value)?;
        writeln!(out)?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(cells = layout.cells.len()))]
    pub fn print_month<W: Write>(
        &self,
        out: &mut W,
        layout: &MonthLayout,
        items: &[CalendarItem],
        badge: BadgeVariant,
    ) -> anyhow::Result<()> {
        let index = item_index(items);

        let mut headers = vec!["Date".to_string()];
        headers.extend((1..=layout.max_slots).map(|slot| format!("Slot {slot}")));
        headers.push("More".to_string());

        let mut rows = Vec::with_capacity(layout.cells.len());
        for cell in &layout.cells {
            let date = cell.grid.date.format("%a %b %-d").to_string();
            let date = if cell.grid.current_month {
                date
            } else {
                self.paint(&date, "2")
            };

            let mut row = vec![date];
            row.extend((0..layout.max_slots).map(|slot| {
                cell.day
                    .entries
                    .iter()
                    .find(|entry| entry.position == Some(slot))
                    .map(|entry| match index.get(&entry.id) {
                        Some(item) => self.badge(item, &segment_text(&item.title, entry.role), badge),
                        None => "?".to_string(),
                    })
                    .unwrap_or_default()
            }));

            let more = if cell.day.overflow > 0 {
                self.paint(&format!("+{} more", cell.day.overflow), "33")
            } else {
                String::new()
            };
            row.push(more);
            rows.push(row);
        }

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip_all, fields(columns = layout.columns.len()))]
    pub fn print_time_grid<W: Write>(
        &self,
        out: &mut W,
        layout: &TimeGridLayout,
        items: &[CalendarItem],
        visible: HourRange,
        working: &WorkingHours,
        now: Option<f64>,
    ) -> anyhow::Result<()> {
        let index = item_index(items);
        let days: Vec<NaiveDate> = layout.window.days().collect();

        if !layout.rows.is_empty() {
            let headers = vec!["Row".to_string(), "From".to_string(), "To".to_string(), "Item".to_string()];
            let mut rows = Vec::new();
            for (row_index, row) in layout.rows.iter().enumerate() {
                for lane in &row.items {
                    let day_label = |offset: usize| {
                        days.get(offset)
                            .map(|day| day.format("%a %-d").to_string())
                            .unwrap_or_default()
                    };
                    rows.push(vec![
                        row_index.to_string(),
                        day_label(lane.start_index),
                        day_label(lane.end_index),
                        index
                            .get(&lane.id)
                            .map(|item| self.paint(&item.title, ansi_code(item.color)))
                            .unwrap_or_else(|| "?".to_string()),
                    ]);
                }
            }
            write_table(&mut *out, headers, rows)?;
            writeln!(out)?;
        }

        writeln!(out, "visible hours {:02}:00-{:02}:00", visible.from, visible.to)?;
        if let Some(now) = now {
            writeln!(out, "now at {}", self.paint(&percent(now), "31"))?;
        }

        let headers = vec![
            "Date".to_string(),
            "Time".to_string(),
            "Item".to_string(),
            "Top".to_string(),
            "Left".to_string(),
            "Width".to_string(),
            "Height".to_string(),
            "Hours".to_string(),
        ];
        let mut rows = Vec::new();
        for column in &layout.columns {
            for block in &column.blocks {
                rows.push(vec![
                    column.date.format("%a %b %-d").to_string(),
                    self.time_span(&block.item),
                    self.paint(&block.item.title, ansi_code(block.item.color)),
                    percent(block.rect.top),
                    percent(block.rect.left),
                    percent(block.rect.width),
                    percent(block.rect.height),
                    self.working_label(&block.item, working),
                ]);
            }
        }
        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip_all, fields(days = days.len()))]
    pub fn print_agenda<W: Write>(&self, out: &mut W, days: &[AgendaDay]) -> anyhow::Result<()> {
        if days.is_empty() {
            writeln!(out, "No events scheduled for the selected month")?;
            return Ok(());
        }

        for day in days {
            writeln!(out, "{}", self.paint(&day.date.format("%A, %B %-d, %Y").to_string(), "1"))?;
            for item in &day.multi_day {
                writeln!(out, "  {:<13} {}", "all day", self.paint(&item.title, ansi_code(item.color)))?;
            }
            for item in &day.items {
                writeln!(out, "  {:<13} {}", self.time_span(item), item.title)?;
            }
        }
        Ok(())
    }

    pub fn print_year<W: Write>(
        &self,
        out: &mut W,
        months: &[(NaiveDate, Vec<(NaiveDate, Vec<ItemId>)>)],
    ) -> anyhow::Result<()> {
        let headers = vec!["Month".to_string(), "Items".to_string(), "Days".to_string()];
        let rows = months
            .iter()
            .map(|(month, days)| {
                let busy: Vec<String> = days
                    .iter()
                    .filter(|(_, ids)| !ids.is_empty())
                    .map(|(date, ids)| format!("{}({})", date.format("%-d"), ids.len()))
                    .collect();
                let total: usize = days.iter().map(|(_, ids)| ids.len()).sum();
                vec![month.format("%B").to_string(), total.to_string(), busy.join(" ")]
            })
            .collect();
        write_table(out, headers, rows)
    }

    pub fn print_range<W: Write>(&self, out: &mut W, label: &str, count: usize) -> anyhow::Result<()> {
        let noun = if count == 1 { "event" } else { "events" };
        writeln!(out, "{label}  {}", self.paint(&format!("{count} {noun}"), "33"))?;
        Ok(())
    }

    pub fn print_preferences<W: Write>(&self, out: &mut W, prefs: &Preferences) -> anyhow::Result<()> {
        writeln!(out, "badge     {:?}", prefs.badge_variant)?;
        writeln!(out, "visible   {}-{}", prefs.visible_hours.from, prefs.visible_hours.to)?;
        for weekday in [
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ] {
            let range = prefs.working_hours.for_weekday(weekday);
            let text = if range.is_off() {
                "off".to_string()
            } else {
                format!("{}-{}", range.from, range.to)
            };
            writeln!(out, "{:<9} {text}", weekday.to_string().to_ascii_lowercase())?;
        }
        Ok(())
    }

    fn badge(&self, item: &CalendarItem, text: &str, variant: BadgeVariant) -> String {
        let code = ansi_code(item.color);
        match variant {
            BadgeVariant::Colored => self.paint(text, code),
            BadgeVariant::Dot => format!("{} {text}", self.paint("\u{25cf}", code)),
        }
    }

    /// "off" when the block starts outside the working hours of its day.
    fn working_label(&self, item: &CalendarItem, working: &WorkingHours) -> String {
        let start = item.span().0.with_timezone(&self.tz);
        if working.is_working_hour(start.weekday(), start.hour()) {
            "work".to_string()
        } else {
            self.paint("off", "2")
        }
    }

    fn time_span(&self, item: &CalendarItem) -> String {
        let (start, end) = item.span();
        format!(
            "{}-{}",
            start.with_timezone(&self.tz).format("%H:%M"),
            end.with_timezone(&self.tz).format("%H:%M")
        )
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn item_index(items: &[CalendarItem]) -> BTreeMap<ItemId, &CalendarItem> {
    items.iter().map(|item| (item.id, item)).collect()
}

fn ansi_code(color: EventColor) -> &'static str {
    match color {
        EventColor::Blue => "34",
        EventColor::Green => "32",
        EventColor::Red => "31",
        EventColor::Yellow => "33",
        EventColor::Purple => "35",
        EventColor::Orange => "38;5;208",
        EventColor::Gray => "90",
    }
}

fn segment_text(title: &str, role: SegmentRole) -> String {
    match role {
        SegmentRole::First => format!("{title} >"),
        SegmentRole::Middle => "> >".to_string(),
        SegmentRole::Last => format!("> {title}"),
        SegmentRole::None => title.to_string(),
    }
}

fn percent(value: f64) -> String {
    format!("{value:.2}%")
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
