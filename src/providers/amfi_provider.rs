use crate::core::bar::{Bar, Provenance, Series};
use crate::core::error::{FeedError, Result};
use crate::core::instrument::{Instrument, Source};
use crate::core::provider::BarProvider;
use crate::providers::util::{http_client, with_retry};
use crate::series::clean::parse_bar_date;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Net asset values for Indian mutual funds, keyed by ISIN.
pub struct AmfiProvider {
    base_url: String,
    client: reqwest::Client,
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct AmfiResponse {
    nav: f64,
    date: String,
    #[serde(default)]
    historical_nav: Vec<(String, f64)>,
}

impl AmfiResponse {
    /// All NAVs as close-only bars, sorted and unique by date. The headline
    /// NAV wins over a historical entry for the same day.
    fn into_bars(self) -> Vec<Bar> {
        let mut skipped = 0;
        let mut bars: Vec<Bar> = Vec::with_capacity(self.historical_nav.len() + 1);

        if let Some(date) = parse_bar_date(&self.date) {
            bars.push(Bar::flat(date, self.nav).with_provenance(Provenance::Amfi));
        } else {
            skipped += 1;
        }
        for (raw, nav) in &self.historical_nav {
            match parse_bar_date(raw) {
                Some(date) => bars.push(Bar::flat(date, *nav).with_provenance(Provenance::Amfi)),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(skipped, "Skipped AMFI entries with unparseable dates");
        }

        // Stable sort keeps the headline NAV first among equal dates
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        bars
    }
}

impl AmfiProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(AmfiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
            enabled: true,
        })
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    async fn nav(&self, isin: &str) -> Result<Option<AmfiResponse>> {
        let url = format!("{}/nav/{}", self.base_url, isin);
        debug!("Requesting NAV data from {}", url);

        let response = with_retry(|| self.client.get(&url).send(), 3, 500).await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FeedError::Status {
                provider: self.name().to_string(),
                status,
            });
        }

        let response_text = response.text().await?;
        // Check for empty or non-JSON responses before parsing
        if response_text.trim().is_empty() {
            return Err(FeedError::Malformed(format!(
                "empty response for ISIN {isin}"
            )));
        }

        Ok(Some(serde_json::from_str(&response_text)?))
    }
}

#[async_trait]
impl BarProvider for AmfiProvider {
    fn name(&self) -> &str {
        "amfi"
    }

    fn source(&self) -> Source {
        Source::Amfi
    }

    fn is_available(&self) -> bool {
        self.enabled
    }

    #[instrument(name = "AmfiNavFetch", skip(self, instrument), fields(isin = %instrument.code))]
    async fn fetch(
        &self,
        instrument: &Instrument,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<Series>> {
        let Some(response) = self.nav(&instrument.code).await? else {
            return Ok(None);
        };

        let mut bars = response.into_bars();
        bars.retain(|b| b.date >= from && b.date <= to);
        if bars.is_empty() {
            return Ok(None);
        }
        debug!("Fetched {} NAVs for {}", bars.len(), instrument.code);
        Ok(Some(Series::new(instrument.clone(), bars)))
    }

    async fn fetch_latest_quote(&self, instrument: &Instrument) -> Result<Option<Bar>> {
        let Some(response) = self.nav(&instrument.code).await? else {
            return Ok(None);
        };
        Ok(parse_bar_date(&response.date)
            .map(|date| Bar::flat(date, response.nav).with_provenance(Provenance::LiveQuote)))
    }
}
