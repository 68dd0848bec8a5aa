pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::provider::SeriesStore;
pub use disk::DiskStore;
pub use memory::MemoryStore;
use std::sync::Arc;
use tracing::warn;

/// Opens the persistent store under the configured data directory.
///
/// Falls back to an in-memory store when the data directory cannot be
/// determined or opened, so a run still works, just without persistence.
pub fn open_store(config: &AppConfig) -> Arc<dyn SeriesStore> {
    let opened = config
        .default_data_path()
        .map(|path| path.join("cache"))
        .and_then(|path| DiskStore::open(&path).map_err(anyhow::Error::from));

    match opened {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Series cache unavailable, using memory only: {e}");
            Arc::new(MemoryStore::new())
        }
    }
}
