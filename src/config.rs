/*
 *  config.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Layered configuration: defaults, YAML file, environment, command line
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use chrono::NaiveDateTime;
use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::{Path, PathBuf}, str::FromStr};
use thiserror::Error;

use crate::display::slots::Slot;
use crate::display::transition::TransitionEffect;

/// Sentinel the deployment scripts export when no key was provisioned.
pub const API_KEY_NOT_SET: &str = "key_not_set";

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    /// Query value understood by OpenWeatherMap.
    pub fn as_query(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub fn temp_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    pub fn speed_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "m/s",
            Units::Imperial => "mph",
        }
    }
}

impl FromStr for Units {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            other => Err(ConfigError::Validation(format!("unknown units '{other}'"))),
        }
    }
}

/// Daily window, in whole local hours, during which the panel is lit.
///
/// `start <= end` is a plain window `[start, end)`; `start > end` wraps
/// past midnight, so `22-6` is lit from 22:00 until 05:59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperatingHours {
    pub start: u32,
    pub end: u32,
}

impl OperatingHours {
    pub fn is_active(&self, hour: u32) -> bool {
        if self.start <= self.end {
            self.start <= hour && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

impl Default for OperatingHours {
    fn default() -> Self {
        Self { start: 8, end: 22 }
    }
}

impl FromStr for OperatingHours {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ConfigError::Validation(format!("operating hours '{s}' must look like H1-H2"));
        let (a, b) = s.trim().split_once('-').ok_or_else(bad)?;
        let start: u32 = a.trim().parse().map_err(|_| bad())?;
        let end: u32 = b.trim().parse().map_err(|_| bad())?;
        if start > 24 || end > 24 {
            return Err(ConfigError::Validation(format!(
                "operating hours '{s}' out of range 0..=24"
            )));
        }
        Ok(Self { start, end })
    }
}

impl TryFrom<String> for OperatingHours {
    type Error = ConfigError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<OperatingHours> for String {
    fn from(h: OperatingHours) -> Self {
        h.to_string()
    }
}

impl fmt::Display for OperatingHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    #[default]
    Ssd1322,
    /// in-memory panel, no hardware
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub driver: DriverKind,
    pub width: u32,
    pub height: u32,
    pub rotate_deg: u16,
    pub spi_bus: String,
    pub spi_speed_hz: u32,
    pub gpio_chip: String,
    pub dc_pin: u32,
    pub rst_pin: u32,
    pub brightness: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Ssd1322,
            width: 256,
            height: 64,
            rotate_deg: 0,
            spi_bus: "/dev/spidev0.0".into(),
            spi_speed_hz: 8_000_000,
            gpio_chip: "/dev/gpiochip0".into(),
            dc_pin: 24,
            rst_pin: 25,
            brightness: 255,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { max_retries: 3, retry_delay_secs: 2, request_timeout_secs: 10 }
    }
}

/// Effective application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub location: String,
    pub other_location: Option<String>,
    pub units: Units,
    /// tz database name for the clock; unknown names fall back to UTC
    pub timezone: String,
    pub display: DisplayConfig,
    pub debug: bool,
    /// ISO date or date-time the clock starts from when `debug` is on
    pub debug_date: Option<String>,
    pub fps: u32,
    pub update_interval_secs: i64,
    pub fps_log_interval_secs: u64,
    pub force_refresh: bool,
    pub operating_hours: OperatingHours,
    pub inactive_poll_secs: u64,
    /// 0 switches views once the tip has scrolled off
    pub display_duration_secs: u64,
    pub scroll_pause_secs: f64,
    pub scroll_off_screen_wait_secs: f64,
    pub transition_duration_secs: f64,
    pub transition_effect: TransitionEffect,
    pub show_umbrella_icon: bool,
    pub weather_slots: [Slot; 4],
    pub cache_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            location: "London".into(),
            other_location: None,
            units: Units::Metric,
            timezone: "Europe/London".into(),
            display: DisplayConfig::default(),
            debug: false,
            debug_date: None,
            fps: 40,
            update_interval_secs: 1800,
            fps_log_interval_secs: 30,
            force_refresh: false,
            operating_hours: OperatingHours::default(),
            inactive_poll_secs: 60,
            display_duration_secs: 0,
            scroll_pause_secs: 2.0,
            scroll_off_screen_wait_secs: 1.0,
            transition_duration_secs: 0.2,
            transition_effect: TransitionEffect::Wipe,
            show_umbrella_icon: true,
            weather_slots: [Slot::Desc, Slot::Sun, Slot::Humidity, Slot::LastUpdated],
            cache_dir: PathBuf::from("cache"),
            assets_dir: PathBuf::from("assets"),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// The API key, unless it is blank or the provisioning sentinel.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && *k != API_KEY_NOT_SET)
    }

    /// Debug start instant, honoured only in debug mode.
    pub fn debug_start(&self) -> Option<NaiveDateTime> {
        if !self.debug {
            return None;
        }
        self.debug_date.as_deref().and_then(parse_debug_date)
    }

    /// Copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Config {
        let mut c = self.clone();
        if c.api_key().is_some() {
            c.api_key = Some("********".into());
        }
        c
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "wxmons", version, about = "WxMonS weather dashboard")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// verbose logging and debug clock
    #[arg(long, action = ArgAction::SetTrue)]
    pub debug: bool,
    /// drive the in-memory panel instead of hardware
    #[arg(long, action = ArgAction::SetTrue)]
    pub headless: bool,
    /// ignore the cached timestamp and fetch at startup
    #[arg(long, action = ArgAction::SetTrue)]
    pub force_refresh: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long, value_enum)]
    pub units: Option<Units>,
    /// tz database name, e.g. Europe/London
    #[arg(long)]
    pub timezone: Option<String>,
    #[arg(long)]
    pub fps: Option<u32>,
}

/// Public entry point: read YAML, overlay the process environment and CLI, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    load_with(cli, |k| std::env::var(k).ok())
}

/// As [`load`], with an injectable environment lookup.
pub fn load_with<F>(cli: &Cli, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // 1) defaults, 2) YAML (missing keys keep their defaults)
    let mut cfg = if let Some(p) = cli.config.as_ref() {
        if !p.exists() {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
        read_yaml(p)?
    } else if let Some(p) = find_config_file() {
        read_yaml(&p)?
    } else {
        Config::default()
    };

    // 3) environment, 4) CLI
    apply_env(&mut cfg, env)?;
    apply_cli_overrides(&mut cfg, cli);

    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/wxmons/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/wxmons.yaml");
        if p.exists() { return Some(p) }
    }
    for candidate in &["wxmons.yaml", "config.yaml", "config/wxmons.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{key}: cannot parse '{raw}'")))
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Overlay the deployment environment variables onto `cfg`.
fn apply_env<F>(cfg: &mut Config, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = env("openWeatherApiKey") { cfg.api_key = Some(v); }
    if let Some(v) = env("location") { cfg.location = v; }
    if let Some(v) = env("otherLocation") {
        cfg.other_location = Some(v).filter(|s| !s.trim().is_empty());
    }
    if let Some(v) = env("units") { cfg.units = v.parse()?; }
    if let Some(v) = env("TZ").filter(|s| !s.trim().is_empty()) { cfg.timezone = v.trim().to_string(); }
    if let Some(v) = env("screenRotation") { cfg.display.rotate_deg = parse_env("screenRotation", &v)?; }
    if let Some(v) = env("dcPin") { cfg.display.dc_pin = parse_env("dcPin", &v)?; }
    if let Some(v) = env("rstPin") { cfg.display.rst_pin = parse_env("rstPin", &v)?; }
    if let Some(v) = env("debug") { cfg.debug = parse_flag(&v); }
    if let Some(v) = env("debugDate") { cfg.debug_date = Some(v); }
    if let Some(v) = env("fps") { cfg.fps = parse_env("fps", &v)?; }
    if let Some(v) = env("updateIntervalSeconds") {
        cfg.update_interval_secs = parse_env("updateIntervalSeconds", &v)?;
    }
    if let Some(v) = env("forceRefresh") { cfg.force_refresh = parse_flag(&v); }
    if let Some(v) = env("operatingHours") { cfg.operating_hours = v.parse()?; }
    if let Some(v) = env("displayDuration") {
        cfg.display_duration_secs = parse_env("displayDuration", &v)?;
    }
    if let Some(v) = env("scrollPauseSeconds") {
        cfg.scroll_pause_secs = parse_env("scrollPauseSeconds", &v)?;
    }
    if let Some(v) = env("scrollOffScreenWaitSeconds") {
        cfg.scroll_off_screen_wait_secs = parse_env("scrollOffScreenWaitSeconds", &v)?;
    }
    if let Some(v) = env("transitionDurationSeconds") {
        cfg.transition_duration_secs = parse_env("transitionDurationSeconds", &v)?;
    }
    if let Some(v) = env("transitionEffect") {
        cfg.transition_effect = v.parse().map_err(ConfigError::Validation)?;
    }
    if let Some(v) = env("showBrollyIcon") { cfg.show_umbrella_icon = parse_flag(&v); }
    for (i, key) in ["weatherSlot1", "weatherSlot2", "weatherSlot3", "weatherSlot4"].iter().enumerate() {
        if let Some(v) = env(key) {
            cfg.weather_slots[i] = v.parse().map_err(ConfigError::Validation)?;
        }
    }
    Ok(())
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.debug { cfg.debug = true; }
    if cli.headless { cfg.display.driver = DriverKind::Mock; }
    if cli.force_refresh { cfg.force_refresh = true; }
    if let Some(l) = cli.location.as_ref() { cfg.location = l.clone(); }
    if let Some(u) = cli.units { cfg.units = u; }
    if let Some(tz) = cli.timezone.as_ref() { cfg.timezone = tz.clone(); }
    if let Some(f) = cli.fps { cfg.fps = f; }
}

fn parse_debug_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Invariants the rest of the program relies on.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.fps == 0 {
        return Err(ConfigError::Validation("fps must be > 0".into()));
    }
    if cfg.display.width == 0 || cfg.display.height == 0 {
        return Err(ConfigError::Validation("display width/height must be > 0".into()));
    }
    if !matches!(cfg.display.rotate_deg, 0 | 180) {
        return Err(ConfigError::Validation("display rotate_deg must be 0|180".into()));
    }
    if !(cfg.transition_duration_secs > 0.0) {
        return Err(ConfigError::Validation("transition duration must be > 0".into()));
    }
    if cfg.scroll_pause_secs < 0.0 || cfg.scroll_off_screen_wait_secs < 0.0 {
        return Err(ConfigError::Validation("scroll timings must be >= 0".into()));
    }
    if cfg.update_interval_secs <= 0 {
        return Err(ConfigError::Validation("update interval must be > 0".into()));
    }
    if cfg.http.max_retries == 0 {
        return Err(ConfigError::Validation("http.max_retries must be >= 1".into()));
    }
    if cfg.operating_hours.start > 24 || cfg.operating_hours.end > 24 {
        return Err(ConfigError::Validation("operating hours out of range 0..=24".into()));
    }
    if cfg.debug {
        if let Some(d) = cfg.debug_date.as_deref() {
            if parse_debug_date(d).is_none() {
                return Err(ConfigError::Validation(format!("debug date '{d}' is not ISO-8601")));
            }
        }
    }
    Ok(())
}
