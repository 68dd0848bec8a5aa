pub mod cli;
pub mod core;
pub mod feed;
pub mod providers;
pub mod series;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::instrument::{Instrument, InstrumentRegistry, StaticRegistry};
use crate::feed::{FeedOptions, SeriesFeed};
use anyhow::{Context, Result, bail};
use chrono::{Duration, NaiveDate, Utc};
use std::path::PathBuf;
use tracing::debug;

/// How far back a request reaches when no start date is given.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 365;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateArgs {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateArgs {
    /// Missing `to` is today, missing `from` reaches back a year from `to`.
    pub fn resolve(&self) -> (NaiveDate, NaiveDate) {
        let to = self.to.unwrap_or_else(|| Utc::now().date_naive());
        let from = self
            .from
            .unwrap_or_else(|| to - Duration::days(DEFAULT_LOOKBACK_DAYS));
        (from, to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Fetch {
        codes: Vec<String>,
        dates: DateArgs,
        interpolate: bool,
        no_refresh: bool,
    },
    Export {
        code: String,
        dates: DateArgs,
        interpolate: bool,
        output: Option<PathBuf>,
    },
    Sources,
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

/// Wires the cache store and the configured providers into a feed.
pub fn build_feed(config: &AppConfig) -> Result<SeriesFeed> {
    let store = store::open_store(config);
    let providers =
        providers::build_providers(config).context("Failed to configure providers")?;
    Ok(SeriesFeed::new(
        store,
        providers,
        FeedOptions::from_config(config),
    ))
}

fn resolve_all(registry: &StaticRegistry, codes: &[String]) -> Result<Vec<Instrument>> {
    codes
        .iter()
        .map(|code| {
            registry
                .resolve(code)
                .with_context(|| format!("Unknown instrument code: '{code}'"))
        })
        .collect()
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let mut config = load_config(config_path)?;
    let registry = StaticRegistry::new(config.instruments.clone());

    match command {
        AppCommand::Fetch {
            codes,
            dates,
            interpolate,
            no_refresh,
        } => {
            if codes.is_empty() {
                bail!("No instrument codes given");
            }
            if no_refresh {
                config.refresh = false;
            }
            let instruments = resolve_all(&registry, &codes)?;
            let feed = build_feed(&config)?;
            let (from, to) = dates.resolve();
            let summaries = cli::fetch::run(&feed, &instruments, from, to, interpolate).await;
            if summaries.iter().all(|s| !s.is_found()) {
                bail!("No data found for any of: {}", codes.join(", "));
            }
            Ok(())
        }
        AppCommand::Export {
            code,
            dates,
            interpolate,
            output,
        } => {
            let instrument = registry
                .resolve(&code)
                .with_context(|| format!("Unknown instrument code: '{code}'"))?;
            let feed = build_feed(&config)?;
            let (from, to) = dates.resolve();
            cli::export::run(&feed, &instrument, from, to, interpolate, output.as_deref()).await
        }
        AppCommand::Sources => {
            let providers =
                providers::build_providers(&config).context("Failed to configure providers")?;
            println!(
                "{}",
                cli::sources::display_as_table(&providers, config.refresh)
            );
            Ok(())
        }
    }
}
