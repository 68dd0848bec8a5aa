//! Provider and store abstractions

use crate::core::bar::{Bar, Series};
use crate::core::error::Result;
use crate::core::instrument::{Instrument, Source};
use async_trait::async_trait;
use chrono::NaiveDate;

/// A source of daily bars, remote or local.
///
/// `fetch` returns `Ok(None)` when the provider simply has no data for the
/// instrument or range; errors are reserved for I/O and protocol failures.
#[async_trait]
pub trait BarProvider: Send + Sync {
    fn name(&self) -> &str;

    fn source(&self) -> Source;

    /// Cheap readiness check. Must not perform I/O.
    fn is_available(&self) -> bool;

    async fn fetch(
        &self,
        instrument: &Instrument,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<Series>>;

    /// The single most recent bar, used to top up a series with today's price.
    async fn fetch_latest_quote(&self, instrument: &Instrument) -> Result<Option<Bar>>;
}

/// Persisted series, keyed by instrument.
#[async_trait]
pub trait SeriesStore: BarProvider {
    async fn read_series(&self, instrument: &Instrument) -> Result<Option<Series>>;

    /// Replaces the stored series. Returns once the write is durable.
    async fn write_series(&self, instrument: &Instrument, series: &Series) -> Result<()>;
}
