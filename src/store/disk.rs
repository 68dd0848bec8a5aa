use crate::core::bar::{Bar, Series};
use crate::core::error::Result;
use crate::core::instrument::{Instrument, Source};
use crate::core::provider::{BarProvider, SeriesStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

const PARTITION: &str = "series";

#[derive(Serialize, Deserialize)]
struct StoredSeries {
    bars: Vec<Bar>,
    updated_at: DateTime<Utc>,
}

/// Series store persisted in a fjall keyspace, one entry per instrument.
pub struct DiskStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let keyspace = Config::new(path).open()?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        debug!("Opened series store at {}", path.display());
        Ok(Self {
            keyspace,
            partition,
        })
    }
}

#[async_trait]
impl BarProvider for DiskStore {
    fn name(&self) -> &str {
        "disk"
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
impl SeriesStore for DiskStore {
    async fn read_series(&self, instrument: &Instrument) -> Result<Option<Series>> {
        let key = instrument.cache_key();
        let Some(value) = self.partition.get(key.as_str())? else {
            debug!("Cache MISS for key: {:?}", key);
            return Ok(None);
        };

        match serde_json::from_slice::<StoredSeries>(&value) {
            Ok(entry) => {
                debug!(
                    "Cache HIT for key: {:?} ({} bars, updated {})",
                    key,
                    entry.bars.len(),
                    entry.updated_at
                );
                Ok(Some(Series::new(instrument.clone(), entry.bars)))
            }
            Err(e) => {
                // An unreadable entry is as good as no entry; drop it so the
                // next refresh rebuilds it.
                warn!("Discarding corrupt cache entry for {}: {}", key, e);
                self.partition.remove(key.as_str())?;
                Ok(None)
            }
        }
    }

    async fn write_series(&self, instrument: &Instrument, series: &Series) -> Result<()> {
        let key = instrument.cache_key();
        let entry = StoredSeries {
            bars: series.bars.clone(),
            updated_at: Utc::now(),
        };
        self.partition
            .insert(key.as_str(), serde_json::to_vec(&entry)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Cache PUT for key: {:?} ({} bars)", key, series.len());
        Ok(())
    }
}
