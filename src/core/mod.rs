//! Core types and abstractions shared by the feed, providers and stores

pub mod bar;
pub mod calendar;
pub mod config;
pub mod error;
pub mod instrument;
pub mod log;
pub mod provider;

// Re-export main types for cleaner imports
pub use bar::{Bar, Provenance, Series};
pub use error::FeedError;
pub use instrument::{AssetClass, Instrument, InstrumentRegistry, Source, StaticRegistry};
pub use provider::{BarProvider, SeriesStore};
