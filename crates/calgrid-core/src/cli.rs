use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::navigation::{CalendarView, Direction};
use crate::preferences::HourRange;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

/// `sat=8-12` style working hours entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayHours {
    pub weekday: chrono::Weekday,
    pub range: HourRange,
}

impl std::str::FromStr for DayHours {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (day, range) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected DAY=FROM-TO, got: {s}"))?;
        let weekday = day
            .trim()
            .parse::<chrono::Weekday>()
            .map_err(|_| anyhow!("unknown weekday: {day}"))?;
        Ok(Self {
            weekday,
            range: range.parse()?,
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "calgrid",
    version,
    about = "Calgrid: calendar layout engine",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Item file; defaults to items.jsonl in the data directory.
    #[arg(long = "items", global = true)]
    pub items: Option<PathBuf>,

    /// Only show items owned by this user id.
    #[arg(long = "user", global = true)]
    pub user: Option<u64>,

    /// Print layouts as JSON instead of tables.
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DateArg {
    /// Focus date, YYYY-MM-DD. Today in the configured timezone if absent.
    #[arg(long = "date", value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Month grid with bounded slots per day.
    Month(DateArg),
    /// Week hour grid plus the multi-day strip.
    Week(DateArg),
    /// Single day hour grid.
    Day(DateArg),
    /// Days of the month that carry items.
    Agenda(DateArg),
    /// Per-month item days for the whole year.
    Year(DateArg),
    /// Header label and item count for a view.
    Range {
        #[arg(long = "view", value_parser = parse_view)]
        view: CalendarView,
        #[command(flatten)]
        date: DateArg,
    },
    /// Step the focus date one view unit.
    Navigate {
        #[arg(long = "view", value_parser = parse_view)]
        view: CalendarView,
        #[arg(long = "direction", value_enum)]
        direction: DirectionArg,
        #[command(flatten)]
        date: DateArg,
    },
    #[command(subcommand)]
    Prefs(PrefsCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum PrefsCommand {
    Show,
    Set {
        #[arg(long = "badge")]
        badge: Option<String>,
        #[arg(long = "visible")]
        visible: Option<HourRange>,
        #[arg(long = "working", action = ArgAction::Append)]
        working: Vec<DayHours>,
    },
    Reset,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionArg {
    #[value(alias = "prev")]
    Previous,
    Next,
}

impl From<DirectionArg> for Direction {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Previous => Direction::Previous,
            DirectionArg::Next => Direction::Next,
        }
    }
}

fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|err| anyhow!("invalid date {raw}: {err}"))
}

fn parse_view(raw: &str) -> anyhow::Result<CalendarView> {
    Ok(raw.parse::<CalendarView>()?)
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
