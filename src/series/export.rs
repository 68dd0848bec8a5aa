//! The plain-text series format shared with reporting tools.
//!
//! ```text
//! date,open,high,low,close,volume
//! 2017-01-01,12.30,9.30,10.00,12.20,23,TestCache
//! ```
//!
//! Prices carry two decimals, volume is an integer, and the provenance tag is
//! an optional trailing column with no header of its own.

use crate::core::bar::{Bar, Provenance};
use crate::core::error::{FeedError, Result};
use crate::series::clean::parse_bar_date;
use tracing::warn;

pub const HEADER: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// Writes `bars` in export format, one row per bar.
pub fn series_to_csv(bars: &[Bar]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for bar in bars {
        let mut record = vec![
            bar.date.format("%Y-%m-%d").to_string(),
            format!("{:.2}", bar.open),
            format!("{:.2}", bar.high),
            format!("{:.2}", bar.low),
            format!("{:.2}", bar.close),
            bar.volume.to_string(),
        ];
        if let Some(provenance) = &bar.provenance {
            record.push(provenance.to_string());
        }
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FeedError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| FeedError::Malformed(e.to_string()))
}

/// Reads bars written by [`series_to_csv`].
///
/// Rows with an unparseable date or close are skipped and counted; the count
/// is returned alongside the bars. Missing open/high/low fall back to close.
pub fn series_from_csv(input: &str) -> Result<(Vec<Bar>, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let mut bars = Vec::new();
    let mut malformed = 0;
    for record in reader.records() {
        let record = record?;
        match parse_record(&record) {
            Some(bar) => bars.push(bar),
            None => malformed += 1,
        }
    }

    if malformed > 0 {
        warn!(malformed, "Skipped malformed rows while reading series");
    }
    Ok((bars, malformed))
}

fn parse_record(record: &csv::StringRecord) -> Option<Bar> {
    let date = parse_bar_date(record.get(0)?)?;
    let price = |index: usize| {
        record
            .get(index)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
    };
    let close = price(4)?;
    let volume = record
        .get(5)
        .and_then(|s| s.parse::<f64>().ok())
        .map(|v| v.max(0.0) as u64);

    let bar = Bar::from_parts(date, price(1), price(2), price(3), close, volume);
    Some(match record.get(6).filter(|s| !s.is_empty()) {
        Some(tag) => bar.with_provenance(Provenance::from(tag)),
        None => bar,
    })
}
