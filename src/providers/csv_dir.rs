use crate::core::bar::{Bar, Provenance, Series};
use crate::core::error::Result;
use crate::core::instrument::{Instrument, Source};
use crate::core::provider::BarProvider;
use crate::series::export::series_from_csv;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Manually maintained series, one `<CODE[.EXCHANGE]>.csv` file per
/// instrument in the export format.
pub struct CsvDirProvider {
    directory: PathBuf,
    available: bool,
}

impl CsvDirProvider {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        let directory = directory.as_ref().to_path_buf();
        let available = directory.is_dir();
        if !available {
            debug!("CSV directory {} does not exist", directory.display());
        }
        Self {
            directory,
            available,
        }
    }

    pub fn path_for(&self, instrument: &Instrument) -> PathBuf {
        self.directory.join(format!("{}.csv", instrument.cache_key()))
    }

    async fn read_bars(&self, instrument: &Instrument) -> Result<Option<Vec<Bar>>> {
        let path = self.path_for(instrument);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No CSV file for {} at {}", instrument, path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let (mut bars, _) = series_from_csv(&content)?;
        for bar in &mut bars {
            if bar.provenance.is_none() {
                bar.provenance = Some(Provenance::Manual);
            }
        }
        bars.sort_by_key(|b| b.date);
        Ok(Some(bars))
    }
}

#[async_trait]
impl BarProvider for CsvDirProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn source(&self) -> Source {
        Source::Manual
    }

    fn is_available(&self) -> bool {
        self.available
    }

    #[instrument(name = "CsvFileRead", skip(self, instrument), fields(code = %instrument))]
    async fn fetch(
        &self,
        instrument: &Instrument,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<Series>> {
        let Some(mut bars) = self.read_bars(instrument).await? else {
            return Ok(None);
        };
        bars.retain(|b| b.date >= from && b.date <= to);
        if bars.is_empty() {
            return Ok(None);
        }
        Ok(Some(Series::new(instrument.clone(), bars)))
    }

    async fn fetch_latest_quote(&self, instrument: &Instrument) -> Result<Option<Bar>> {
        Ok(self
            .read_bars(instrument)
            .await?
            .and_then(|bars| bars.into_iter().max_by_key(|b| b.date)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    const CONTENT: &str = "date,open,high,low,close,volume\n\
        2017-04-05,1.00,2.00,0.50,1.50,10\n\
        2017-04-03,1.00,1.00,1.00,1.00,0,Yahoo\n\
        garbage,1,1,1,1,1\n\
        2017-04-07,2.00,2.00,2.00,2.00,0\n";

    #[tokio::test]
    async fn test_csv_dir_fetch() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("FUND.csv"), CONTENT).unwrap();
        let provider = CsvDirProvider::new(dir.path());
        assert!(provider.is_available());

        let series = provider
            .fetch(&Instrument::equity("FUND"), date("2017-04-03"), date("2017-04-05"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[0].date, date("2017-04-03"));
        assert_eq!(series.bars[0].provenance, Some(Provenance::Yahoo));
        assert_eq!(series.bars[1].close, 1.5);
        assert_eq!(series.bars[1].volume, 10);
        assert_eq!(series.bars[1].provenance, Some(Provenance::Manual));
    }

    #[tokio::test]
    async fn test_csv_dir_latest_quote() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("FUND.csv"), CONTENT).unwrap();
        let provider = CsvDirProvider::new(dir.path());

        let latest = provider
            .fetch_latest_quote(&Instrument::equity("FUND"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.date, date("2017-04-07"));
    }

    #[tokio::test]
    async fn test_csv_dir_missing_file() {
        let dir = tempdir().unwrap();
        let provider = CsvDirProvider::new(dir.path());

        let result = provider
            .fetch(&Instrument::equity("NOPE"), date("2017-04-03"), date("2017-04-05"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_csv_dir_missing_directory_is_unavailable() {
        let dir = tempdir().unwrap();
        let provider = CsvDirProvider::new(dir.path().join("absent"));
        assert!(!provider.is_available());
    }
}
