//! Fills missing business days with synthetic bars.
//!
//! Interior gaps are filled according to the chosen [`InterpolationStrategy`].
//! Gaps at either end of the requested range are always filled flat from the
//! nearest real bar, whatever the strategy. Real bars are never touched and
//! every synthetic bar is tagged [`Provenance::Interpolated`].

use crate::core::bar::{Bar, Provenance, Series};
use crate::core::calendar::{business_days, business_days_between};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationStrategy {
    /// Repeat the last known close until the next real bar.
    FlatLine,
    /// Step the close evenly from one real bar to the next.
    #[default]
    Linear,
}

impl InterpolationStrategy {
    /// Returns a sorted copy of `series` with every business day between
    /// `from` and `to` present. An empty series stays empty.
    pub fn interpolate(&self, series: &Series, from: NaiveDate, to: NaiveDate) -> Series {
        let mut bars = series.bars.clone();
        bars.sort_by_key(|b| b.date);

        let mut filled = Vec::with_capacity(bars.len());
        for (index, bar) in bars.iter().enumerate() {
            filled.push(bar.clone());
            if let Some(next) = bars.get(index + 1) {
                match self {
                    InterpolationStrategy::FlatLine => filled.extend(flat_between(bar, next)),
                    InterpolationStrategy::Linear => filled.extend(linear_between(bar, next)),
                }
            }
        }

        let filled = extend_to_from_date(filled, from);
        let filled = extend_to_to_date(filled, to);
        Series::new(series.instrument.clone(), filled)
    }
}

/// Prepends copies of the oldest bar for every business day from `from` up
/// to it. `bars` must be sorted ascending.
pub fn extend_to_from_date(bars: Vec<Bar>, from: NaiveDate) -> Vec<Bar> {
    let Some(oldest) = bars.first() else {
        return bars;
    };
    if oldest.date <= from {
        return bars;
    }
    let mut extended: Vec<Bar> = business_days(from, oldest.date - Duration::days(1))
        .map(|d| oldest.carried_to(d))
        .collect();
    extended.extend(bars);
    extended
}

/// Appends copies of the newest bar for every business day after it up to
/// `to`. `bars` must be sorted ascending.
pub fn extend_to_to_date(mut bars: Vec<Bar>, to: NaiveDate) -> Vec<Bar> {
    let Some(newest) = bars.last().cloned() else {
        return bars;
    };
    if newest.date >= to {
        return bars;
    }
    bars.extend(business_days(newest.date + Duration::days(1), to).map(|d| newest.carried_to(d)));
    bars
}

fn gap_days(older: &Bar, newer: &Bar) -> impl Iterator<Item = NaiveDate> {
    business_days(older.date + Duration::days(1), newer.date - Duration::days(1))
}

fn flat_between(older: &Bar, newer: &Bar) -> Vec<Bar> {
    gap_days(older, newer).map(|d| older.carried_to(d)).collect()
}

fn linear_between(older: &Bar, newer: &Bar) -> Vec<Bar> {
    let span = business_days_between(older.date, newer.date);
    if span == 0 {
        return Vec::new();
    }
    let step = (newer.close - older.close) / span as f64;
    gap_days(older, newer)
        .enumerate()
        .map(|(i, d)| {
            Bar::flat(d, older.close + step * (i + 1) as f64)
                .with_provenance(Provenance::Interpolated)
        })
        .collect()
}
