use crate::core::bar::{Bar, Series};
use crate::core::error::Result;
use crate::core::instrument::{Instrument, Source};
use crate::core::provider::{BarProvider, SeriesStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory series store. Contents live as long as the value does.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, Vec<Bar>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BarProvider for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn source(&self) -> Source {
        Source::Cache
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn fetch(
        &self,
        instrument: &Instrument,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<Series>> {
        Ok(self
            .read_series(instrument)
            .await?
            .map(|s| s.window(from, to))
            .filter(|s| !s.is_empty()))
    }

    async fn fetch_latest_quote(&self, instrument: &Instrument) -> Result<Option<Bar>> {
        Ok(self
            .read_series(instrument)
            .await?
            .and_then(|s| s.most_recent().cloned()))
    }
}

#[async_trait]
impl SeriesStore for MemoryStore {
    async fn read_series(&self, instrument: &Instrument) -> Result<Option<Series>> {
        let key = instrument.cache_key();
        let cache = self.inner.lock().await;
        match cache.get(&key) {
            Some(bars) => {
                debug!("Cache HIT for key: {:?}", key);
                Ok(Some(Series::new(instrument.clone(), bars.clone())))
            }
            None => {
                debug!("Cache MISS for key: {:?}", key);
                Ok(None)
            }
        }
    }

    async fn write_series(&self, instrument: &Instrument, series: &Series) -> Result<()> {
        let key = instrument.cache_key();
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {:?}", key);
        cache.insert(key, series.bars.clone());
        Ok(())
    }
}
