use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use chrono::{NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::agenda::{year_month_items, year_months};
use crate::cli::{Command, DateArg, PrefsCommand};
use crate::config::CalendarConfig;
use crate::datetime::time_of_day_percent;
use crate::item::{CalendarItem, UserId};
use crate::layout::{MonthLayout, TimeGridLayout, build_agenda};
use crate::navigation::{CalendarView, Direction, events_count, format_range_label};
use crate::preferences::{
    BadgeVariant, KeyValueStore, PREFERENCES_KEY, Preferences, UserFilter, ViewState, effective_visible_hours,
};
use crate::render::Renderer;
use crate::source::load_items;

const ITEMS_FILE: &str = "items.jsonl";

/// Everything a command needs besides its own arguments.
pub struct Context<'a> {
    pub cfg: &'a CalendarConfig,
    pub tz: Tz,
    pub week_start: Weekday,
    pub items_path: PathBuf,
    pub explicit_items: bool,
    pub user: Option<u64>,
    pub json: bool,
    pub store: &'a mut dyn KeyValueStore,
}

#[tracing::instrument(skip_all)]
pub fn dispatch<W: Write>(
    ctx: &mut Context<'_>,
    renderer: &Renderer,
    out: &mut W,
    command: Command,
) -> anyhow::Result<()> {
    debug!(command = ?command, "dispatching command");

    match command {
        Command::Month(date) => cmd_view(ctx, renderer, out, CalendarView::Month, &date),
        Command::Week(date) => cmd_view(ctx, renderer, out, CalendarView::Week, &date),
        Command::Day(date) => cmd_view(ctx, renderer, out, CalendarView::Day, &date),
        Command::Agenda(date) => cmd_view(ctx, renderer, out, CalendarView::Agenda, &date),
        Command::Year(date) => cmd_view(ctx, renderer, out, CalendarView::Year, &date),
        Command::Range { view, date } => cmd_range(ctx, renderer, out, view, &date),
        Command::Navigate {
            view,
            direction,
            date,
        } => cmd_navigate(ctx, renderer, out, view, direction.into(), &date),
        Command::Prefs(prefs) => cmd_prefs(ctx, renderer, out, prefs),
    }
}

fn today(tz: &Tz) -> NaiveDate {
    Utc::now().with_timezone(tz).date_naive()
}

fn view_state(ctx: &Context<'_>, view: CalendarView, date: &DateArg) -> ViewState {
    let mut state = ViewState::new(date.date.unwrap_or_else(|| today(&ctx.tz)));
    state.view = view;
    if let Some(user) = ctx.user {
        state.selected_user = UserFilter::User(UserId(user));
    }
    state
}

fn load_visible_items(ctx: &Context<'_>, state: &ViewState) -> anyhow::Result<Vec<CalendarItem>> {
    let items = read_items(&ctx.items_path, ctx.explicit_items)?;
    let visible: Vec<CalendarItem> = state.visible_items(&items).into_iter().cloned().collect();
    debug!(total = items.len(), visible = visible.len(), "filtered items by user");
    Ok(visible)
}

fn read_items(path: &Path, explicit: bool) -> anyhow::Result<Vec<CalendarItem>> {
    if !explicit && !path.exists() {
        info!(file = %path.display(), "no item file yet; rendering an empty calendar");
        return Ok(Vec::new());
    }
    load_items(path)
}

#[tracing::instrument(skip(ctx, renderer, out, date))]
fn cmd_view<W: Write>(
    ctx: &Context<'_>,
    renderer: &Renderer,
    out: &mut W,
    view: CalendarView,
    date: &DateArg,
) -> anyhow::Result<()> {
    let state = view_state(ctx, view, date);
    let items = load_visible_items(ctx, &state)?;
    let focus = state.selected_date;

    writeln!(out, "{}", format_range_label(view, focus, ctx.week_start))?;

    match view {
        CalendarView::Month => {
            let layout = MonthLayout::build(&items, focus, ctx.week_start, ctx.cfg.month_slots, &ctx.tz);
            if ctx.json {
                renderer.print_json(out, &layout)
            } else {
                let prefs = Preferences::load(&*ctx.store);
                renderer.print_month(out, &layout, &items, prefs.badge_variant)
            }
        }
        CalendarView::Week | CalendarView::Day => {
            let prefs = Preferences::load(&*ctx.store);
            let layout = TimeGridLayout::build(&items, view, focus, ctx.week_start, &ctx.tz);
            if ctx.json {
                renderer.print_json(out, &layout)
            } else {
                let visible = effective_visible_hours(prefs.visible_hours, &items, &ctx.tz);
                let now = Utc::now();
                let marker = layout
                    .window
                    .contains(now.with_timezone(&ctx.tz).date_naive())
                    .then(|| time_of_day_percent(now, &ctx.tz));
                renderer.print_time_grid(out, &layout, &items, visible, &prefs.working_hours, marker)
            }
        }
        CalendarView::Agenda => {
            let days = build_agenda(&items, focus, &ctx.tz);
            if ctx.json {
                renderer.print_json(out, &days)
            } else {
                renderer.print_agenda(out, &days)
            }
        }
        CalendarView::Year => {
            let months: Vec<_> = year_months(focus)
                .into_iter()
                .map(|month| (month, year_month_items(&items, month, &ctx.tz)))
                .collect();
            if ctx.json {
                renderer.print_json(out, &months)
            } else {
                renderer.print_year(out, &months)
            }
        }
    }
}

fn cmd_range<W: Write>(
    ctx: &Context<'_>,
    renderer: &Renderer,
    out: &mut W,
    view: CalendarView,
    date: &DateArg,
) -> anyhow::Result<()> {
    let state = view_state(ctx, view, date);
    let items = load_visible_items(ctx, &state)?;
    let label = format_range_label(view, state.selected_date, ctx.week_start);
    let count = events_count(&items, state.selected_date, view, ctx.week_start, &ctx.tz);
    renderer.print_range(out, &label, count)
}

fn cmd_navigate<W: Write>(
    ctx: &Context<'_>,
    renderer: &Renderer,
    out: &mut W,
    view: CalendarView,
    direction: Direction,
    date: &DateArg,
) -> anyhow::Result<()> {
    let mut state = view_state(ctx, view, date);
    state.navigate(direction);
    info!(date = %state.selected_date, "navigated");

    writeln!(out, "{}", state.selected_date.format("%Y-%m-%d"))?;
    let items = load_visible_items(ctx, &state)?;
    let label = format_range_label(view, state.selected_date, ctx.week_start);
    let count = events_count(&items, state.selected_date, view, ctx.week_start, &ctx.tz);
    renderer.print_range(out, &label, count)
}

fn cmd_prefs<W: Write>(
    ctx: &mut Context<'_>,
    renderer: &Renderer,
    out: &mut W,
    command: PrefsCommand,
) -> anyhow::Result<()> {
    match command {
        PrefsCommand::Show => {
            let prefs = Preferences::load(&*ctx.store);
            if ctx.json {
                renderer.print_json(out, &prefs)
            } else {
                renderer.print_preferences(out, &prefs)
            }
        }
        PrefsCommand::Set {
            badge,
            visible,
            working,
        } => {
            let mut prefs = Preferences::load(&*ctx.store);
            if let Some(raw) = badge {
                prefs.badge_variant =
                    BadgeVariant::from_key(&raw).ok_or_else(|| anyhow!("unknown badge variant: {raw}"))?;
            }
            if let Some(range) = visible {
                prefs.visible_hours = range;
            }
            for entry in working {
                prefs.working_hours.set(entry.weekday, entry.range);
            }
            prefs.sanitize();
            prefs.save(ctx.store)?;
            info!("saved preferences");
            renderer.print_preferences(out, &prefs)
        }
        PrefsCommand::Reset => {
            ctx.store.remove(PREFERENCES_KEY)?;
            info!("cleared stored preferences");
            renderer.print_preferences(out, &Preferences::default())
        }
    }
}

pub fn items_path(data_dir: &Path, explicit: Option<&Path>) -> PathBuf {
    explicit.map(Path::to_path_buf).unwrap_or_else(|| data_dir.join(ITEMS_FILE))
}

pub fn stdout_is_terminal() -> bool {
    io::stdout().is_terminal()
}
