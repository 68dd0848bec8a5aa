use super::ui;
use crate::core::bar::Series;
use crate::core::instrument::Instrument;
use crate::feed::SeriesFeed;
use chrono::NaiveDate;
use comfy_table::Cell;
use futures::future::join_all;

/// What one acquisition produced, reduced to a table row.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub instrument: Instrument,
    pub bars: usize,
    pub synthetic: usize,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
    pub last_close: Option<f64>,
    pub change_pct: Option<f64>,
}

impl SeriesSummary {
    pub fn new(instrument: Instrument, series: Option<&Series>) -> Self {
        let first = series.and_then(Series::first);
        let last = series.and_then(Series::last);
        let change_pct = match (first, last) {
            (Some(first), Some(last)) if first.close > 0.0 => {
                Some((last.close - first.close) / first.close * 100.0)
            }
            _ => None,
        };

        Self {
            instrument,
            bars: series.map_or(0, Series::len),
            synthetic: series.map_or(0, |s| s.bars.iter().filter(|b| b.is_synthetic()).count()),
            first: first.map(|b| b.date),
            last: last.map(|b| b.date),
            last_close: last.map(|b| b.close),
            change_pct,
        }
    }

    pub fn is_found(&self) -> bool {
        self.bars > 0
    }
}

pub fn display_as_table(summaries: &[SeriesSummary]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Instrument"),
        ui::header_cell("Bars"),
        ui::header_cell("Synthetic"),
        ui::header_cell("From"),
        ui::header_cell("To"),
        ui::header_cell("Last Close"),
        ui::header_cell("Change"),
    ]);

    for summary in summaries {
        let name = if summary.is_found() {
            Cell::new(summary.instrument.to_string())
        } else {
            Cell::new(ui::style_text(
                &format!("{} (not found)", summary.instrument),
                ui::StyleType::Error,
            ))
        };
        table.add_row(vec![
            name,
            Cell::new(summary.bars),
            Cell::new(summary.synthetic),
            ui::format_optional_cell(summary.first, |d| d.to_string()),
            ui::format_optional_cell(summary.last, |d| d.to_string()),
            ui::format_optional_cell(summary.last_close, |c| format!("{c:.2}")),
            match summary.change_pct {
                Some(change) => ui::change_cell(change),
                None => ui::format_optional_cell(None::<f64>, |c| c.to_string()),
            },
        ]);
    }

    table.to_string()
}

/// Acquires every instrument concurrently and prints a summary table.
pub async fn run(
    feed: &SeriesFeed,
    instruments: &[Instrument],
    from: NaiveDate,
    to: NaiveDate,
    interpolate: bool,
) -> Vec<SeriesSummary> {
    let pb = ui::new_progress_bar(instruments.len() as u64, true);
    pb.set_message("Fetching series...");

    let futures = instruments.iter().map(|instrument| {
        let pb_clone = pb.clone();
        async move {
            let series = feed.acquire(instrument, from, to, interpolate).await;
            pb_clone.inc(1);
            SeriesSummary::new(instrument.clone(), series.as_ref())
        }
    });
    let summaries = join_all(futures).await;
    pb.finish_and_clear();

    println!(
        "Series {} to {}\n",
        ui::style_text(&from.to_string(), ui::StyleType::Title),
        ui::style_text(&to.to_string(), ui::StyleType::Title)
    );
    println!("{}", display_as_table(&summaries));
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bar::{Bar, Provenance};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_summary_of_series() {
        let instrument = Instrument::equity("AAPL");
        let series = Series::new(
            instrument.clone(),
            vec![
                Bar::flat(date("2017-04-03"), 100.0),
                Bar::flat(date("2017-04-04"), 105.0).with_provenance(Provenance::Interpolated),
                Bar::flat(date("2017-04-05"), 110.0),
            ],
        );

        let summary = SeriesSummary::new(instrument, Some(&series));
        assert!(summary.is_found());
        assert_eq!(summary.bars, 3);
        assert_eq!(summary.synthetic, 1);
        assert_eq!(summary.first, Some(date("2017-04-03")));
        assert_eq!(summary.last, Some(date("2017-04-05")));
        assert_eq!(summary.last_close, Some(110.0));
        assert!((summary.change_pct.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_not_found() {
        let summary = SeriesSummary::new(Instrument::equity("NOPE"), None);
        assert!(!summary.is_found());
        assert_eq!(summary.change_pct, None);

        let table = display_as_table(&[summary]);
        assert!(table.contains("NOPE"));
        assert!(table.contains("not found"));
        assert!(table.contains("N/A"));
    }
}
