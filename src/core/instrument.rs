//! Instrument identity and the registry that resolves codes into instruments.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

/// Where a bar or a series came from, and which adapter serves an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Yahoo,
    Amfi,
    Manual,
    Cache,
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Source::Yahoo => "yahoo",
                Source::Amfi => "amfi",
                Source::Manual => "manual",
                Source::Cache => "cache",
            }
        )
    }
}

impl FromStr for Source {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yahoo" => Ok(Source::Yahoo),
            "amfi" => Ok(Source::Amfi),
            "manual" | "csv" => Ok(Source::Manual),
            "cache" => Ok(Source::Cache),
            _ => Err(anyhow::anyhow!("Invalid source: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Etf,
    Fund,
    Bond,
    Cash,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub code: String,
    #[serde(default)]
    pub exchange: Option<String>,
    pub asset_class: AssetClass,
    pub source: Source,
}

pub const CASH_CODE: &str = "CASH";

impl Instrument {
    pub fn new(code: &str, exchange: Option<&str>, asset_class: AssetClass, source: Source) -> Self {
        Self {
            code: code.to_uppercase(),
            exchange: exchange.map(str::to_uppercase),
            asset_class,
            source,
        }
    }

    pub fn equity(code: &str) -> Self {
        Self::new(code, None, AssetClass::Equity, Source::Yahoo)
    }

    /// The synthetic cash instrument, always worth exactly one unit.
    pub fn cash() -> Self {
        Self::new(CASH_CODE, None, AssetClass::Cash, Source::Manual)
    }

    pub fn is_cash(&self) -> bool {
        self.asset_class == AssetClass::Cash
    }

    /// Key used for the cache store, the per-instrument locks and CSV file names.
    pub fn cache_key(&self) -> String {
        match &self.exchange {
            Some(exchange) => format!("{}.{}", self.code, exchange),
            None => self.code.clone(),
        }
    }
}

impl Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cache_key())
    }
}

/// Resolves user supplied codes into instruments.
pub trait InstrumentRegistry: Send + Sync {
    fn resolve(&self, code: &str) -> Option<Instrument>;
}

/// Registry over a fixed list of known instruments, falling back to a guess
/// based on the shape of the code for anything not listed.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    known: HashMap<String, Instrument>,
}

impl StaticRegistry {
    pub fn new(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        let known = instruments
            .into_iter()
            .flat_map(|i| [(i.code.clone(), i.clone()), (i.cache_key(), i)])
            .collect();
        Self { known }
    }

    fn guess(code: &str) -> Option<Instrument> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        if code.eq_ignore_ascii_case(CASH_CODE) {
            return Some(Instrument::cash());
        }
        if looks_like_isin(code) {
            return Some(Instrument::new(code, None, AssetClass::Fund, Source::Amfi));
        }
        match code.rsplit_once('.') {
            Some((symbol, exchange)) if !symbol.is_empty() && !exchange.is_empty() => Some(
                Instrument::new(symbol, Some(exchange), AssetClass::Equity, Source::Yahoo),
            ),
            _ => Some(Instrument::equity(code)),
        }
    }
}

impl InstrumentRegistry for StaticRegistry {
    fn resolve(&self, code: &str) -> Option<Instrument> {
        self.known
            .get(&code.trim().to_uppercase())
            .cloned()
            .or_else(|| Self::guess(code))
    }
}

fn looks_like_isin(code: &str) -> bool {
    code.len() == 12
        && code.is_ascii()
        && code[..2].chars().all(|c| c.is_ascii_alphabetic())
        && code.chars().all(|c| c.is_ascii_alphanumeric())
        && code[2..].chars().any(|c| c.is_ascii_digit())
}
