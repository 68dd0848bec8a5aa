//! Price bars and series, the values every other module passes around.

use crate::core::instrument::Instrument;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Marks where a bar came from. Synthetic bars are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    Yahoo,
    Amfi,
    Manual,
    LiveQuote,
    Interpolated,
    Cash,
    Other(String),
}

impl Provenance {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Provenance::Interpolated | Provenance::Cash)
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Yahoo => write!(f, "Yahoo"),
            Provenance::Amfi => write!(f, "Amfi"),
            Provenance::Manual => write!(f, "Manual"),
            Provenance::LiveQuote => write!(f, "LiveQuote"),
            Provenance::Interpolated => write!(f, "Interpolated"),
            Provenance::Cash => write!(f, "Cash"),
            Provenance::Other(tag) => write!(f, "{tag}"),
        }
    }
}

impl From<&str> for Provenance {
    fn from(tag: &str) -> Self {
        match tag {
            "Yahoo" => Provenance::Yahoo,
            "Amfi" => Provenance::Amfi,
            "Manual" => Provenance::Manual,
            "LiveQuote" => Provenance::LiveQuote,
            "Interpolated" => Provenance::Interpolated,
            "Cash" => Provenance::Cash,
            other => Provenance::Other(other.to_string()),
        }
    }
}

/// One trading day's OHLCV summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub provenance: Option<Provenance>,
}

impl Bar {
    /// A bar where open, high and low all equal the close and volume is zero.
    pub fn flat(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
            provenance: None,
        }
    }

    /// Builds a bar from provider fields, defaulting missing prices to the
    /// close and missing volume to zero.
    pub fn from_parts(
        date: NaiveDate,
        open: Option<f64>,
        high: Option<f64>,
        low: Option<f64>,
        close: f64,
        volume: Option<u64>,
    ) -> Self {
        Self {
            date,
            open: open.unwrap_or(close),
            high: high.unwrap_or(close),
            low: low.unwrap_or(close),
            close,
            volume: volume.unwrap_or(0),
            provenance: None,
        }
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// A copy of this bar moved to `date`, tagged as synthetic.
    pub fn carried_to(&self, date: NaiveDate) -> Self {
        Bar::flat(date, self.close).with_provenance(Provenance::Interpolated)
    }

    pub fn is_synthetic(&self) -> bool {
        self.provenance.as_ref().is_some_and(Provenance::is_synthetic)
    }

    /// Whether the close is a usable price. Zero closes are treated as corrupt.
    pub fn has_valid_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// Bars for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub instrument: Instrument,
    pub bars: Vec<Bar>,
}

impl Series {
    pub fn new(instrument: Instrument, bars: Vec<Bar>) -> Self {
        Self { instrument, bars }
    }

    pub fn empty(instrument: Instrument) -> Self {
        Self::new(instrument, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// The bar with the latest date, regardless of ordering.
    pub fn most_recent(&self) -> Option<&Bar> {
        self.bars.iter().max_by_key(|b| b.date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|b| b.date)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&Bar> {
        self.bars.iter().find(|b| b.date == date)
    }

    pub fn sort(&mut self) {
        self.bars.sort_by_key(|b| b.date);
    }

    pub fn sorted(mut self) -> Self {
        self.sort();
        self
    }

    /// Keeps only bars on business days within `[from, to]`.
    pub fn window(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.bars.retain(|b| {
            b.date >= from && b.date <= to && crate::core::calendar::is_business_day(b.date)
        });
        self
    }

    /// Sorted, with one bar per date. The first bar seen for a date wins.
    pub fn unique_by_date(mut self) -> Self {
        self.sort();
        self.bars.dedup_by_key(|b| b.date);
        self
    }
}
