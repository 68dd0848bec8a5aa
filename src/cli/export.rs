use crate::core::instrument::Instrument;
use crate::feed::SeriesFeed;
use crate::series::export::series_to_csv;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

/// Acquires one series and writes it in export format to `output`, or to
/// stdout when no output file is given.
pub async fn run(
    feed: &SeriesFeed,
    instrument: &Instrument,
    from: NaiveDate,
    to: NaiveDate,
    interpolate: bool,
    output: Option<&Path>,
) -> Result<()> {
    let Some(series) = feed.acquire(instrument, from, to, interpolate).await else {
        bail!("No data found for {instrument} between {from} and {to}");
    };
    let csv = series_to_csv(&series.bars)
        .with_context(|| format!("Failed to serialize series for {instrument}"))?;

    match output {
        Some(path) => {
            std::fs::write(path, csv)
                .with_context(|| format!("Failed to write series to {}", path.display()))?;
            info!("Wrote {} bars for {} to {}", series.len(), instrument, path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}
