/*
 *  main.rs
 *
 *  WxMonS - weather at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Entry point: configuration, panel bring-up, loop and shutdown
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


use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{debug, info};
use tokio::signal::unix::{SignalKind, signal};

use wxmons::app::FrameLoop;
use wxmons::build_info::BUILD_DATE;
use wxmons::cache::FileCache;
use wxmons::config::{self, Cli, Config};
use wxmons::display::drivers::Panel;
use wxmons::time_source::{self, TimeSource};
use wxmons::weather::{OwmClient, WeatherApiError};

/// Waits for SIGINT, SIGTERM or SIGHUP.
async fn signal_handler() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli).context("loading configuration")?;

    if cli.dump_config {
        print!("{}", serde_yaml::to_string(&cfg.redacted())?);
        return Ok(());
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(if cfg.debug { "debug" } else { "info" }))
        .format_timestamp_secs()
        .init();

    info!("{} - weather at a glance", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);
    debug!("effective configuration:\n{}", serde_yaml::to_string(&cfg.redacted())?);

    time_source::apply_timezone(&cfg.timezone);

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?
        .block_on(serve(cfg))
}

async fn serve(cfg: Config) -> anyhow::Result<()> {
    let panel = Panel::open(&cfg.display).context("display bring-up")?;

    let source = match OwmClient::new(&cfg) {
        Ok(client) => Some(client),
        Err(WeatherApiError::MissingApiKey) => None,
        Err(e) => return Err(e).context("creating weather client"),
    };

    let time = if cfg.debug { TimeSource::from_debug(cfg.debug_start()) } else { TimeSource::System };
    let cache = FileCache::new(cfg.cache_dir.clone());
    let mut frame_loop = FrameLoop::new(&cfg, panel, source, cache, time);

    tokio::select! {
        _ = frame_loop.run() => {}
        res = signal_handler() => res.context("installing signal handlers")?,
    }

    frame_loop.shutdown();
    info!("{} stopped", env!("CARGO_PKG_NAME"));
    Ok(())
}
