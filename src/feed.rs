//! Series acquisition: cache first, remote providers only for the holes.

use crate::core::bar::{Bar, Provenance, Series};
use crate::core::calendar::{is_business_day, last_weekday, previous_business_day};
use crate::core::config::AppConfig;
use crate::core::error::{FeedError, Result};
use crate::core::instrument::Instrument;
use crate::core::provider::{BarProvider, SeriesStore};
use crate::series::clean::clean;
use crate::series::gaps::{covering_range, find_missing};
use crate::series::interpolate::{InterpolationStrategy, extend_to_from_date};
use crate::series::reconcile::{merge, upsert_latest};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

/// Process-wide acquisition settings.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// Whether remote providers are consulted. When off only the cache is read.
    pub refresh: bool,
    pub strategy: InterpolationStrategy,
    /// Upper bound on every single provider call.
    pub timeout: Duration,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            refresh: true,
            strategy: InterpolationStrategy::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl FeedOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            refresh: config.refresh,
            strategy: config.interpolation,
            timeout: config.request_timeout(),
        }
    }
}

/// Per-call acquisition switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireOptions {
    pub interpolate: bool,
    pub clean: bool,
}

impl AcquireOptions {
    pub fn new(interpolate: bool) -> Self {
        Self {
            interpolate,
            clean: true,
        }
    }
}

/// One async mutex per instrument, created on first use.
///
/// Entries nobody holds or waits on are pruned on the next `lock` call, so
/// the map only grows with the number of instruments in flight.
#[derive(Default)]
pub struct InstrumentLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl InstrumentLocks {
    pub async fn lock(&self, instrument: &Instrument) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Holders and waiters keep their own clone of the Arc
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(instrument.cache_key()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Normalizes both endpoints to business days, swapping them if they end up
/// reversed.
pub fn normalize_range(from: NaiveDate, to: NaiveDate) -> (NaiveDate, NaiveDate) {
    let from = last_weekday(from);
    let to = last_weekday(to);
    if from > to { (to, from) } else { (from, to) }
}

/// A unit-price bar for every business day in `[from, to]`, extended back
/// from a single bar at `to`.
pub fn cash_series(instrument: &Instrument, from: NaiveDate, to: NaiveDate) -> Series {
    let bars = extend_to_from_date(vec![Bar::flat(to, 1.0)], from)
        .into_iter()
        .map(|bar| bar.with_provenance(Provenance::Cash))
        .collect();
    Series::new(instrument.clone(), bars)
}

/// The bars of `series` inside `[from, to]` plus the nearest business day
/// bar on either side. `series` must be sorted and unique by date.
fn with_neighbours(series: Series, from: NaiveDate, to: NaiveDate) -> Series {
    let before = series
        .bars
        .iter()
        .rev()
        .find(|b| b.date < from && is_business_day(b.date))
        .cloned();
    let after = series
        .bars
        .iter()
        .find(|b| b.date > to && is_business_day(b.date))
        .cloned();
    let instrument = series.instrument.clone();

    let mut bars: Vec<Bar> = before.into_iter().collect();
    bars.extend(series.window(from, to).bars);
    bars.extend(after);
    Series::new(instrument, bars)
}

/// Combines a series store with remote providers.
///
/// Providers are consulted in the order given, except that a provider serving
/// the instrument's preferred source is always tried first.
pub struct SeriesFeed {
    store: Arc<dyn SeriesStore>,
    providers: Vec<Arc<dyn BarProvider>>,
    options: FeedOptions,
    locks: InstrumentLocks,
}

impl SeriesFeed {
    pub fn new(
        store: Arc<dyn SeriesStore>,
        providers: Vec<Arc<dyn BarProvider>>,
        options: FeedOptions,
    ) -> Self {
        Self {
            store,
            providers,
            options,
            locks: InstrumentLocks::default(),
        }
    }

    /// Daily bars for `instrument` over `[from, to]`, cleaned.
    ///
    /// Returns `None` when neither the cache nor any provider has data.
    pub async fn acquire(
        &self,
        instrument: &Instrument,
        from: NaiveDate,
        to: NaiveDate,
        interpolate: bool,
    ) -> Option<Series> {
        self.acquire_with(instrument, from, to, AcquireOptions::new(interpolate))
            .await
    }

    #[instrument(skip(self, instrument, options), fields(code = %instrument))]
    pub async fn acquire_with(
        &self,
        instrument: &Instrument,
        from: NaiveDate,
        to: NaiveDate,
        options: AcquireOptions,
    ) -> Option<Series> {
        let (from, to) = normalize_range(from, to);

        if instrument.is_cash() {
            return Some(cash_series(instrument, from, to));
        }

        let series = {
            let _guard = self.locks.lock(instrument).await;
            self.refresh(instrument, from, to).await
        };
        let Some(series) = series else {
            warn!("No data for {} between {} and {}", instrument, from, to);
            return None;
        };

        let series = if options.clean { clean(series) } else { series };
        let series = if options.interpolate {
            let anchored = with_neighbours(series, from, to);
            self.options
                .strategy
                .interpolate(&anchored, from, to)
                .window(from, to)
        } else {
            series.window(from, to)
        };
        Some(series.sorted())
    }

    /// Cache read, remote fill of the holes, write-back and live quote top-up.
    /// Runs under the instrument lock.
    async fn refresh(&self, instrument: &Instrument, from: NaiveDate, to: NaiveDate) -> Option<Series> {
        let cached = match self.store.read_series(instrument).await {
            Ok(series) => series.filter(|s| !s.is_empty()).map(Series::unique_by_date),
            Err(e) => {
                warn!("Failed to read cached series for {}: {}", instrument, e);
                None
            }
        };

        if !self.options.refresh {
            debug!("Refresh disabled, using cache for {}", instrument);
            return cached;
        }
        let Some(provider) = self.select_provider(instrument) else {
            debug!("No provider available for {}, using cache", instrument);
            return cached;
        };

        let range = match &cached {
            Some(cached) => {
                // Today's bar is left to the live quote
                let missing = find_missing(&cached.bars, from, previous_business_day(to));
                covering_range(&missing)
            }
            None => Some((from, to)),
        };
        let Some((fetch_from, fetch_to)) = range else {
            debug!("Cache covers {}..{} for {}", from, to, instrument);
            return cached;
        };

        let remote = match self
            .bounded(provider.as_ref(), provider.fetch(instrument, fetch_from, fetch_to))
            .await
        {
            Ok(Some(series)) => series,
            Ok(None) => {
                debug!("{} has no data for {} in {}..{}", provider.name(), instrument, fetch_from, fetch_to);
                return cached;
            }
            Err(e) => {
                warn!("Fetch from {} failed for {}: {}", provider.name(), instrument, e);
                return cached;
            }
        };
        info!(
            "Fetched {} bars for {} from {}",
            remote.len(),
            instrument,
            provider.name()
        );

        let base = cached.unwrap_or_else(|| Series::empty(instrument.clone()));
        let mut merged = merge(&base, &remote);
        if let Err(e) = self.store.write_series(instrument, &merged).await {
            warn!("Failed to store series for {}: {}", instrument, e);
        }

        match self
            .bounded(provider.as_ref(), provider.fetch_latest_quote(instrument))
            .await
        {
            Ok(Some(quote)) if quote.has_valid_close() => upsert_latest(&mut merged, quote),
            Ok(_) => debug!("No live quote for {}", instrument),
            Err(e) => warn!("Failed to populate quote for {}: {}", instrument, e),
        }
        Some(merged)
    }

    /// First available provider, preferring the instrument's own source.
    fn select_provider(&self, instrument: &Instrument) -> Option<&Arc<dyn BarProvider>> {
        let available = || self.providers.iter().filter(|p| p.is_available());
        available()
            .find(|p| p.source() == instrument.source)
            .or_else(|| available().next())
    }

    async fn bounded<T>(
        &self,
        provider: &dyn BarProvider,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.options.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout {
                provider: provider.name().to_string(),
            }),
        }
    }
}
