use crate::core::bar::{Bar, Series};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Merges `incoming` into `base`, keeping one bar per date.
///
/// Bars already in `base` always win: an incoming bar is only added when its
/// date is new and its close is a usable price. The result is sorted by date
/// and carries the instrument of `base`.
pub fn merge(base: &Series, incoming: &Series) -> Series {
    let mut by_date: BTreeMap<NaiveDate, Bar> = BTreeMap::new();
    for bar in &base.bars {
        by_date.entry(bar.date).or_insert_with(|| bar.clone());
    }
    for bar in &incoming.bars {
        if bar.has_valid_close() && !by_date.contains_key(&bar.date) {
            by_date.insert(bar.date, bar.clone());
        }
    }
    Series::new(base.instrument.clone(), by_date.into_values().collect())
}

/// Puts `bar` into the series, replacing any bar with the same date.
pub fn upsert_latest(series: &mut Series, bar: Bar) {
    match series.bars.binary_search_by_key(&bar.date, |b| b.date) {
        Ok(index) => series.bars[index] = bar,
        Err(index) => series.bars.insert(index, bar),
    }
}
