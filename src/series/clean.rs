use crate::core::bar::{Bar, Series};
use chrono::{Datelike, NaiveDate, Utc};
use tracing::{debug, warn};

/// Oldest year a bar may carry before it is treated as a bad point.
pub const MIN_PLAUSIBLE_YEAR: i32 = 1900;

/// Parses a provider date. Only ISO `YYYY-MM-DD` is accepted.
pub fn parse_bar_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Removes structurally invalid bars, using today as the plausibility horizon.
pub fn clean(series: Series) -> Series {
    clean_until(series, Utc::now().date_naive())
}

/// Removes bars dated outside `[MIN_PLAUSIBLE_YEAR, horizon year + 1]`, bars
/// whose close is not a finite positive price, and bars that do not come strictly after the
/// previously kept bar. Never adds or reorders bars.
pub fn clean_until(series: Series, horizon: NaiveDate) -> Series {
    let max_year = horizon.year() + 1;
    let before = series.len();

    let mut kept: Vec<Bar> = Vec::with_capacity(before);
    for bar in series.bars {
        let year = bar.date.year();
        if !(MIN_PLAUSIBLE_YEAR..=max_year).contains(&year) {
            debug!(date = %bar.date, "Dropping bar with implausible date");
            continue;
        }
        if !bar.has_valid_close() {
            debug!(date = %bar.date, close = bar.close, "Dropping bar with invalid close");
            continue;
        }
        if kept.last().is_some_and(|prev| prev.date >= bar.date) {
            debug!(date = %bar.date, "Dropping out of order bar");
            continue;
        }
        kept.push(bar);
    }

    let dropped = before - kept.len();
    if dropped > 0 {
        warn!(
            instrument = %series.instrument,
            dropped,
            "Removed bad points from series"
        );
    }
    Series::new(series.instrument, kept)
}
