pub mod amfi_provider;
pub mod csv_dir;
pub mod util;
pub mod yahoo_finance;

use crate::core::config::AppConfig;
use crate::core::error::Result;
use crate::core::instrument::Source;
use crate::core::provider::BarProvider;
pub use amfi_provider::AmfiProvider;
pub use csv_dir::CsvDirProvider;
use std::sync::Arc;
use tracing::debug;
pub use yahoo_finance::YahooFinanceProvider;

const DEFAULT_ORDER: [Source; 3] = [Source::Yahoo, Source::Amfi, Source::Manual];

/// Remote sources in the order they should be consulted: the configured
/// priority first, then the remaining sources in their default order.
pub fn source_order(priority: &[Source]) -> Vec<Source> {
    let mut order: Vec<Source> = Vec::new();
    for source in priority.iter().chain(DEFAULT_ORDER.iter()) {
        if *source != Source::Cache && !order.contains(source) {
            order.push(*source);
        }
    }
    order
}

/// Builds every configured provider, ordered by [`source_order`].
pub fn build_providers(config: &AppConfig) -> Result<Vec<Arc<dyn BarProvider>>> {
    let timeout = config.request_timeout();
    let mut providers: Vec<Arc<dyn BarProvider>> = Vec::new();

    for source in source_order(&config.priority) {
        match source {
            Source::Yahoo => {
                if let Some(yahoo) = &config.providers.yahoo {
                    providers.push(Arc::new(
                        YahooFinanceProvider::new(&yahoo.base_url, timeout)?
                            .with_enabled(yahoo.enabled),
                    ));
                }
            }
            Source::Amfi => {
                if let Some(amfi) = &config.providers.amfi {
                    providers.push(Arc::new(
                        AmfiProvider::new(&amfi.base_url, timeout)?.with_enabled(amfi.enabled),
                    ));
                }
            }
            Source::Manual => {
                if let Some(csv) = config.providers.csv.as_ref().filter(|c| c.enabled) {
                    providers.push(Arc::new(CsvDirProvider::new(&csv.directory)));
                }
            }
            Source::Cache => {}
        }
    }

    debug!(
        "Configured providers: {:?}",
        providers.iter().map(|p| p.name()).collect::<Vec<_>>()
    );
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CsvProviderConfig;

    #[test]
    fn test_source_order_defaults() {
        assert_eq!(source_order(&[]), DEFAULT_ORDER.to_vec());
    }

    #[test]
    fn test_source_order_respects_priority() {
        assert_eq!(
            source_order(&[Source::Manual, Source::Cache, Source::Manual]),
            vec![Source::Manual, Source::Yahoo, Source::Amfi]
        );
    }

    #[test]
    fn test_build_providers() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig {
            priority: vec![Source::Amfi],
            ..AppConfig::default()
        };
        config.providers.csv = Some(CsvProviderConfig {
            directory: dir.path().to_string_lossy().into_owned(),
            enabled: true,
        });

        let providers = build_providers(&config).unwrap();
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["amfi", "yahoo", "csv"]);
        assert!(providers.iter().all(|p| p.is_available()));
    }

    #[test]
    fn test_build_providers_skips_unconfigured() {
        let mut config = AppConfig::default();
        config.providers.amfi = None;
        if let Some(yahoo) = config.providers.yahoo.as_mut() {
            yahoo.enabled = false;
        }

        let providers = build_providers(&config).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name(), "yahoo");
        assert!(!providers[0].is_available());
    }
}
