use crate::core::bar::{Bar, Provenance, Series};
use crate::core::error::{FeedError, Result};
use crate::core::instrument::{Instrument, Source};
use crate::core::provider::BarProvider;
use crate::providers::util::{http_client, with_retry};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(alias = "regularMarketTime")]
    regular_market_time: Option<i64>,
    #[serde(alias = "regularMarketDayHigh")]
    regular_market_day_high: Option<f64>,
    #[serde(alias = "regularMarketDayLow")]
    regular_market_day_low: Option<f64>,
    #[serde(alias = "regularMarketVolume")]
    regular_market_volume: Option<u64>,
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug, Default)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Exchange-local calendar date of a Yahoo timestamp.
fn trading_date(timestamp: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(timestamp + gmtoffset, 0).map(|dt| dt.date_naive())
}

fn at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten()
}

fn bars_from_chart(item: &ChartItem) -> Vec<Bar> {
    let (Some(timestamps), Some(quote)) = (
        item.timestamp.as_ref(),
        item.indicators.as_ref().and_then(|i| i.quote.first()),
    ) else {
        return Vec::new();
    };

    let mut skipped = 0;
    let bars: Vec<Bar> = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let date = trading_date(*ts, item.meta.gmtoffset);
            let close = at(&quote.close, i);
            match (date, close) {
                (Some(date), Some(close)) => Some(
                    Bar::from_parts(
                        date,
                        at(&quote.open, i),
                        at(&quote.high, i),
                        at(&quote.low, i),
                        close,
                        quote.volume.get(i).copied().flatten(),
                    )
                    .with_provenance(Provenance::Yahoo),
                ),
                _ => {
                    skipped += 1;
                    None
                }
            }
        })
        .collect();

    if skipped > 0 {
        debug!(skipped, "Skipped Yahoo rows without a date or close");
    }
    bars
}

/// Daily bars and live quotes from the Yahoo Finance chart API.
pub struct YahooFinanceProvider {
    base_url: String,
    client: reqwest::Client,
    enabled: bool,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self> {
        Ok(YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
            enabled: true,
        })
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Requests a chart. A 404 means Yahoo does not know the ticker.
    async fn chart(&self, ticker: &str, query: &[(&str, String)]) -> Result<Option<ChartItem>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        debug!("Requesting chart data from {} {:?}", url, query);

        let response = with_retry(|| self.client.get(&url).query(query).send(), 2, 500).await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("Yahoo has no chart for {}", ticker);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FeedError::Status {
                provider: self.name().to_string(),
                status,
            });
        }

        let text = response.text().await?;
        let data: YahooChartResponse = serde_json::from_str(&text)?;
        Ok(data.chart.result.and_then(|r| r.into_iter().next()))
    }
}

#[async_trait]
impl BarProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn source(&self) -> Source {
        Source::Yahoo
    }

    fn is_available(&self) -> bool {
        self.enabled
    }

    #[instrument(
        name = "YahooHistoryFetch",
        skip(self, instrument),
        fields(ticker = %instrument)
    )]
    async fn fetch(
        &self,
        instrument: &Instrument,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<Series>> {
        let period1 = from.and_hms_opt(0, 0, 0).map(|d| d.and_utc().timestamp());
        let period2 = (to + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .map(|d| d.and_utc().timestamp());
        let (Some(period1), Some(period2)) = (period1, period2) else {
            return Err(FeedError::Malformed(format!("invalid range {from}..{to}")));
        };

        let query = [
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("interval", "1d".to_string()),
        ];
        let Some(item) = self.chart(&instrument.cache_key(), &query).await? else {
            return Ok(None);
        };

        let mut bars = bars_from_chart(&item);
        bars.retain(|b| b.date >= from && b.date <= to);
        if bars.is_empty() {
            debug!("No Yahoo bars for {} in {}..{}", instrument, from, to);
            return Ok(None);
        }
        Ok(Some(Series::new(instrument.clone(), bars).sorted()))
    }

    #[instrument(
        name = "YahooQuoteFetch",
        skip(self, instrument),
        fields(ticker = %instrument)
    )]
    async fn fetch_latest_quote(&self, instrument: &Instrument) -> Result<Option<Bar>> {
        let query = [
            ("interval", "1d".to_string()),
            ("range", "1d".to_string()),
        ];
        let Some(item) = self.chart(&instrument.cache_key(), &query).await? else {
            return Ok(None);
        };

        let meta = &item.meta;
        let Some(price) = meta.regular_market_price else {
            return Ok(None);
        };
        let date = meta
            .regular_market_time
            .and_then(|ts| trading_date(ts, meta.gmtoffset))
            .unwrap_or_else(|| Utc::now().date_naive());
        let open = item
            .indicators
            .as_ref()
            .and_then(|i| i.quote.first())
            .and_then(|q| q.open.iter().rev().find_map(|o| *o));

        Ok(Some(
            Bar::from_parts(
                date,
                open,
                meta.regular_market_day_high,
                meta.regular_market_day_low,
                price,
                meta.regular_market_volume,
            )
            .with_provenance(Provenance::LiveQuote),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ts(d: &str) -> i64 {
        // 14:30 UTC, the US open
        date(d).and_hms_opt(14, 30, 0).unwrap().and_utc().timestamp()
    }

    fn provider(server: &MockServer) -> YahooFinanceProvider {
        YahooFinanceProvider::new(&server.uri(), std::time::Duration::from_secs(5)).unwrap()
    }

    pub async fn create_mock_server(ticker: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v8/finance/chart/{ticker}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn history_body() -> String {
        format!(
            r#"{{
                "chart": {{
                    "result": [{{
                        "meta": {{ "currency": "USD", "regularMarketPrice": 110.0, "gmtoffset": -14400 }},
                        "timestamp": [{}, {}, {}, {}],
                        "indicators": {{
                            "quote": [{{
                                "open": [100.0, null, 101.0, 103.0],
                                "high": [110.0, 111.0, 112.0, 113.0],
                                "low": [90.0, 91.0, 92.0, 93.0],
                                "close": [105.0, 104.0, null, 102.0],
                                "volume": [1000, 2000, 3000, null]
                            }}]
                        }}
                    }}],
                    "error": null
                }}
            }}"#,
            ts("2017-04-03"),
            ts("2017-04-04"),
            ts("2017-04-05"),
            ts("2017-04-06")
        )
    }

    #[tokio::test]
    async fn test_successful_history_fetch() {
        let mock_server = create_mock_server("AAPL", 200, &history_body()).await;
        let provider = provider(&mock_server);

        let series = provider
            .fetch(&Instrument::equity("AAPL"), date("2017-04-03"), date("2017-04-06"))
            .await
            .unwrap()
            .unwrap();

        // The row without a close is skipped
        assert_eq!(series.len(), 3);
        let first = &series.bars[0];
        assert_eq!(first.date, date("2017-04-03"));
        assert_eq!(first.open, 100.0);
        assert_eq!(first.high, 110.0);
        assert_eq!(first.low, 90.0);
        assert_eq!(first.close, 105.0);
        assert_eq!(first.volume, 1000);
        assert_eq!(first.provenance, Some(Provenance::Yahoo));

        // Missing open falls back to close, missing volume to zero
        assert_eq!(series.bars[1].open, 104.0);
        assert_eq!(series.bars[2].date, date("2017-04-06"));
        assert_eq!(series.bars[2].volume, 0);
    }

    #[tokio::test]
    async fn test_history_fetch_filters_to_range() {
        let mock_server = create_mock_server("AAPL", 200, &history_body()).await;
        let provider = provider(&mock_server);

        let series = provider
            .fetch(&Instrument::equity("AAPL"), date("2017-04-04"), date("2017-04-04"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars[0].close, 104.0);
    }

    #[tokio::test]
    async fn test_history_uses_exchange_ticker() {
        let mock_server = create_mock_server("VOD.L", 200, &history_body()).await;
        let provider = provider(&mock_server);
        let vod = Instrument::new(
            "VOD",
            Some("L"),
            crate::core::instrument::AssetClass::Equity,
            Source::Yahoo,
        );

        let series = provider
            .fetch(&vod, date("2017-04-03"), date("2017-04-06"))
            .await
            .unwrap();
        assert!(series.is_some());
    }

    #[tokio::test]
    async fn test_no_result_is_no_data() {
        let body = r#"{"chart": {"result": [], "error": null}}"#;
        let mock_server = create_mock_server("INVALID", 200, body).await;
        let provider = provider(&mock_server);

        let result = provider
            .fetch(&Instrument::equity("INVALID"), date("2017-04-03"), date("2017-04-06"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_no_data() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found"}}}"#;
        let mock_server = create_mock_server("NOPE", 404, body).await;
        let provider = provider(&mock_server);

        let result = provider
            .fetch(&Instrument::equity("NOPE"), date("2017-04-03"), date("2017-04-06"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_failure() {
        let mock_server = create_mock_server("AAPL", 500, "").await;
        let provider = provider(&mock_server);

        let result = provider
            .fetch(&Instrument::equity("AAPL"), date("2017-04-03"), date("2017-04-06"))
            .await;
        assert!(matches!(result, Err(FeedError::Status { .. })));
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error from yahoo"
        );
    }

    #[tokio::test]
    async fn test_malformed_response_is_failure() {
        let body = r#"{"chart": {"results": []}"#;
        let mock_server = create_mock_server("AAPL", 200, body).await;
        let provider = provider(&mock_server);

        let result = provider
            .fetch(&Instrument::equity("AAPL"), date("2017-04-03"), date("2017-04-06"))
            .await;
        assert!(matches!(result, Err(FeedError::Parse(_))));
    }

    #[tokio::test]
    async fn test_latest_quote() {
        let mock_server = MockServer::start().await;
        let body = format!(
            r#"{{
                "chart": {{
                    "result": [{{
                        "meta": {{
                            "regularMarketPrice": 150.65,
                            "regularMarketTime": {},
                            "regularMarketDayHigh": 151.0,
                            "regularMarketDayLow": 149.5,
                            "regularMarketVolume": 12345,
                            "gmtoffset": -14400
                        }},
                        "timestamp": [{}],
                        "indicators": {{ "quote": [{{ "open": [150.0], "close": [150.65] }}] }}
                    }}]
                }}
            }}"#,
            ts("2017-04-07") + 3600,
            ts("2017-04-07")
        );
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("range", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        let quote = provider
            .fetch_latest_quote(&Instrument::equity("AAPL"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(quote.date, date("2017-04-07"));
        assert_eq!(quote.close, 150.65);
        assert_eq!(quote.open, 150.0);
        assert_eq!(quote.high, 151.0);
        assert_eq!(quote.low, 149.5);
        assert_eq!(quote.volume, 12345);
        assert_eq!(quote.provenance, Some(Provenance::LiveQuote));
    }

    #[test]
    fn test_availability_follows_enabled_flag() {
        let provider =
            YahooFinanceProvider::new("http://localhost", std::time::Duration::from_secs(1))
                .unwrap();
        assert!(provider.is_available());
        assert!(!provider.with_enabled(false).is_available());
    }
}
