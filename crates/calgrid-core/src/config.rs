use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Weekday;
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::datetime::parse_timezone;
use crate::navigation::parse_week_start;
use crate::slots::DEFAULT_MONTH_SLOTS;

const CONFIG_FILE: &str =
  "calgrid.toml";
const CONFIG_ENV_VAR: &str =
  "CALGRID_CONFIG";
const DEFAULT_TIMEZONE: &str = "UTC";

fn default_week_start() -> String {
  "sunday".to_string()
}

fn default_month_slots() -> usize {
  DEFAULT_MONTH_SLOTS
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
  pub timezone:    Option<String>,
  #[serde(default = "default_week_start")]
  pub week_start:  String,
  #[serde(
    default = "default_month_slots"
  )]
  pub month_slots: usize,
  pub data_dir:    Option<PathBuf>,
  #[serde(skip)]
  pub loaded_from: Option<PathBuf>
}

impl Default for CalendarConfig {
  fn default() -> Self {
    Self {
      timezone:    None,
      week_start:  default_week_start(),
      month_slots: default_month_slots(),
      data_dir:    None,
      loaded_from: None
    }
  }
}

impl CalendarConfig {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) = resolve_config_path(
      config_override
    ) else {
      warn!(
        "no calgrid.toml found; using \
         defaults"
      );
      return Ok(Self::default());
    };

    if config_override.is_none()
      && !path.exists()
    {
      debug!(file = %path.display(), "config file not present; using defaults");
      return Ok(Self::default());
    }

    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    let mut config =
      Self::from_toml(&text)
        .with_context(|| {
          format!(
            "failed to parse {}",
            path.display()
          )
        })?;
    config.loaded_from = Some(path);

    info!(
      timezone = ?config.timezone,
      week_start = %config.week_start,
      month_slots = config.month_slots,
      "loaded calendar config"
    );
    Ok(config)
  }

  pub fn from_toml(
    text: &str
  ) -> anyhow::Result<Self> {
    let mut config =
      toml::from_str::<CalendarConfig>(
        text
      )?;
    config.sanitize();
    Ok(config)
  }

  pub fn sanitize(&mut self) {
    if self.week_start.trim().is_empty()
    {
      self.week_start =
        default_week_start();
    }

    if self.month_slots == 0 {
      self.month_slots =
        default_month_slots();
    }

    if self
      .timezone
      .as_deref()
      .is_some_and(|tz| {
        tz.trim().is_empty()
      })
    {
      self.timezone = None;
    }
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      match key.as_str() {
        | "timezone" => {
          self.timezone = Some(v)
        }
        | "week_start" => {
          self.week_start = v
        }
        | "month_slots" => {
          self.month_slots = v
            .trim()
            .parse()
            .with_context(|| {
              format!(
                "invalid month_slots: \
                 {v}"
              )
            })?;
        }
        | "data_dir" => {
          self.data_dir =
            Some(PathBuf::from(v))
        }
        | other => {
          return Err(anyhow!(
            "unknown config key: \
             {other}"
          ));
        }
      }
    }
    self.sanitize();
    Ok(())
  }

  pub fn week_start_day(
    &self
  ) -> Weekday {
    parse_week_start(&self.week_start)
  }

  pub fn resolve_timezone(&self) -> Tz {
    if let Some(raw) =
      self.timezone.as_deref()
      && let Some(tz) =
        parse_timezone(raw, CONFIG_FILE)
    {
      return tz;
    }

    parse_timezone(
      DEFAULT_TIMEZONE,
      "calgrid-default"
    )
    .unwrap_or(chrono_tz::UTC)
  }
}

#[tracing::instrument(skip(cfg))]
pub fn resolve_data_dir(
  cfg: &CalendarConfig
) -> anyhow::Result<PathBuf> {
  let dir = match cfg.data_dir.as_deref()
  {
    | Some(path) => expand_tilde(path),
    | None => dirs::data_dir()
      .ok_or_else(|| {
        anyhow!(
          "cannot determine data \
           directory"
        )
      })?
      .join("calgrid")
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(expand_tilde(path));
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(expand_tilde(
        Path::new(trimmed)
      ));
    }
  }

  dirs::config_dir().map(|dir| {
    dir
      .join("calgrid")
      .join(CONFIG_FILE)
  })
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;

  #[test]
  fn missing_keys_take_defaults() {
    let config =
      CalendarConfig::from_toml(
        "timezone = \"Europe/Berlin\"\n"
      )
      .expect("parse config");
    assert_eq!(config.week_start, "sunday");
    assert_eq!(
      config.month_slots,
      DEFAULT_MONTH_SLOTS
    );
    assert_eq!(
      config.resolve_timezone(),
      chrono_tz::Europe::Berlin
    );
  }

  #[test]
  fn sanitizes_zero_slots_and_bad_timezone() {
    let config =
      CalendarConfig::from_toml(
        "month_slots = 0\ntimezone = \
         \"Nowhere/Else\"\nweek_start \
         = \"monday\"\n"
      )
      .expect("parse config");
    assert_eq!(
      config.month_slots,
      DEFAULT_MONTH_SLOTS
    );
    assert_eq!(
      config.resolve_timezone(),
      chrono_tz::UTC
    );
    assert_eq!(
      config.week_start_day(),
      Weekday::Mon
    );
  }

  #[test]
  fn overrides_apply_and_reject_unknown_keys() {
    let mut config =
      CalendarConfig::default();
    config
      .apply_overrides(vec![
        (
          "rc.month_slots".to_string(),
          "4".to_string()
        ),
        (
          "week_start".to_string(),
          "monday".to_string()
        ),
      ])
      .expect("apply overrides");
    assert_eq!(config.month_slots, 4);
    assert_eq!(
      config.week_start_day(),
      Weekday::Mon
    );

    assert!(
      config
        .apply_overrides(vec![(
          "colour".to_string(),
          "on".to_string()
        )])
        .is_err()
    );
  }

  #[test]
  fn explicit_config_file_is_loaded() {
    let temp =
      tempdir().expect("tempdir");
    let path =
      temp.path().join("calgrid.toml");
    fs::write(
      &path,
      "week_start = \"monday\"\n"
    )
    .expect("write config");

    let config =
      CalendarConfig::load(Some(&path))
        .expect("load config");
    assert_eq!(
      config.loaded_from.as_deref(),
      Some(path.as_path())
    );
    assert_eq!(
      config.week_start_day(),
      Weekday::Mon
    );

    assert!(
      CalendarConfig::load(Some(
        &temp.path().join("missing.toml")
      ))
      .is_err()
    );
  }
}
