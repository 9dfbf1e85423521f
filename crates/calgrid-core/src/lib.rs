pub mod agenda;
pub mod classify;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod geometry;
pub mod grouping;
pub mod item;
pub mod layout;
pub mod navigation;
pub mod optimistic;
pub mod preferences;
pub mod render;
pub mod slots;
pub mod source;
pub mod window;

use std::ffi::OsString;
use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use error::LayoutError;
pub use item::{
  CalendarItem,
  ItemId,
  UserId
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting calgrid"
  );

  let mut cfg =
    config::CalendarConfig::load(
      cli.config.as_deref()
    )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  )?;

  let tz = cfg.resolve_timezone();
  let week_start = cfg.week_start_day();
  debug!(%tz, ?week_start, "resolved calendar settings");

  let data_dir =
    config::resolve_data_dir(&cfg)
      .context(
        "failed to resolve data \
         directory"
      )?;

  let mut store =
    preferences::FileStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open preference \
         store at {}",
        data_dir.display()
      )
    })?;

  let renderer = render::Renderer::new(
    !cli.no_color
      && commands::stdout_is_terminal(),
    tz
  );

  let mut ctx = commands::Context {
    cfg: &cfg,
    tz,
    week_start,
    items_path: commands::items_path(
      &data_dir,
      cli.items.as_deref()
    ),
    explicit_items: cli.items.is_some(),
    user: cli.user,
    json: cli.json,
    store: &mut store
  };

  let mut out = io::stdout().lock();
  commands::dispatch(
    &mut ctx,
    &renderer,
    &mut out,
    cli.command
  )?;

  info!("done");
  Ok(())
}
