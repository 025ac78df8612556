// src/utils/fetch.rs

use std::path::Path;

use chrono::NaiveDate;
use log::info;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{PriceObservation, Series};
use crate::utils::cache;

/// Position of the price table among the `<table>` elements of the source page.
pub const PRICE_TABLE_INDEX: usize = 2;

const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];

/// Where the HTML comes from.
pub trait PageSource: Send + Sync {
    fn fetch_page(&self, url: &str) -> Result<String>;
}

/// Downloads pages with a blocking `reqwest` client. Must be called off the async executor.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpPageSource;

impl PageSource for HttpPageSource {
    fn fetch_page(&self, url: &str) -> Result<String> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let response = client.get(url).send()?.error_for_status()?;
        Ok(response.text()?)
    }
}

/// Downloads the source page, extracts the price series, sorts it and
/// writes it to the CSV cache. Nothing is written unless every row parsed.
pub fn fetch_series(source: &dyn PageSource, url: &str, cache_path: &Path) -> Result<Series> {
    info!("Fetching price table from {}", url);
    let html = source.fetch_page(url)?;

    let mut series = parse_price_table(&html, PRICE_TABLE_INDEX)?;
    series.sort_by_key(|obs| obs.date);

    cache::write_series(cache_path, &series)?;
    info!(
        "Fetched {} observations, cached to {}",
        series.len(),
        cache_path.display()
    );
    Ok(series)
}

/// Reads the (Date, Price) rows of the `table_index`-th table, in page order.
/// The first row holds the column titles and is skipped.
pub fn parse_price_table(html: &str, table_index: usize) -> Result<Series> {
    let document = Html::parse_document(html);
    let tables = selector("table")?;
    let rows = selector("tr")?;
    let cells = selector("td, th")?;

    let found = document.select(&tables).count();
    let table = document
        .select(&tables)
        .nth(table_index)
        .ok_or(AppError::TableNotFound {
            index: table_index,
            found,
        })?;

    let mut series = Vec::new();
    for (row_no, row) in table.select(&rows).enumerate().skip(1) {
        let texts: Vec<String> = row.select(&cells).map(cell_text).collect();
        if texts.iter().all(|t| t.is_empty()) {
            continue;
        }
        if texts.len() < 2 {
            return Err(AppError::MalformedRow {
                row: row_no,
                message: format!("expected 2 cells, found {}", texts.len()),
            });
        }

        series.push(PriceObservation {
            date: parse_date(&texts[0])?,
            price: parse_price(&texts[1])?,
        });
    }

    Ok(series)
}

/// Parses a price written with `.` for thousands and `,` for decimals.
pub fn parse_price(raw: &str) -> Result<f64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let normalized = if compact.contains(',') {
        compact.replace('.', "").replace(',', ".")
    } else if is_thousands_grouped(&compact) {
        compact.replace('.', "")
    } else {
        compact
    };

    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(AppError::InvalidPrice(raw.trim().to_string())),
    }
}

/// Parses a day-first date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| AppError::InvalidDate(raw.to_string()))
}

// "1.234" and "12.345.678" are grouped; "82.5" is not.
fn is_thousands_grouped(value: &str) -> bool {
    let mut groups = value.split('.');
    let Some(head) = groups.next() else {
        return false;
    };
    let tail: Vec<&str> = groups.collect();
    !tail.is_empty()
        && (1..=3).contains(&head.len())
        && head.chars().all(|c| c.is_ascii_digit())
        && tail
            .iter()
            .all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::Html(format!("bad selector '{}': {}", css, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::cache::read_series;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn page(price_rows: &[(&str, &str)]) -> String {
        let rows: String = price_rows
            .iter()
            .map(|(d, p)| format!("<tr><td class=\"dxgv\">{}</td><td class=\"dxgv\">{}</td></tr>", d, p))
            .collect();
        format!(
            "<html><body>\
             <table><tr><td>menu</td></tr></table>\
             <table><tr><td>Brent - FOB</td></tr></table>\
             <table>\
               <tr><td>Data</td><td>Preço - petróleo bruto - Brent (FOB)</td></tr>\
               {}\
             </table>\
             </body></html>",
            rows
        )
    }

    struct FixedPage {
        html: Option<String>,
        calls: AtomicUsize,
    }

    impl PageSource for FixedPage {
        fn fetch_page(&self, _url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.html.clone().ok_or_else(|| {
                AppError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "unreachable",
                ))
            })
        }
    }

    fn temp_csv(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("brent_fetch_{}_{}.csv", name, std::process::id()))
    }

    #[test]
    fn prices_use_brazilian_separators() {
        assert_eq!(parse_price("82,47").unwrap(), 82.47);
        assert_eq!(parse_price("1.234,5").unwrap(), 1234.5);
        assert_eq!(parse_price("1.234").unwrap(), 1234.0);
        assert_eq!(parse_price("82.5").unwrap(), 82.5);
        assert_eq!(parse_price(" 9 ").unwrap(), 9.0);
        assert!(matches!(parse_price(""), Err(AppError::InvalidPrice(_))));
        assert!(matches!(parse_price("-1,0"), Err(AppError::InvalidPrice(_))));
        assert!(matches!(parse_price("NaN"), Err(AppError::InvalidPrice(_))));
    }

    #[test]
    fn dates_are_day_first() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(parse_date("01/03/2024").unwrap(), expected);
        assert_eq!(parse_date("01-03-2024").unwrap(), expected);
        assert_eq!(parse_date("2024-03-01").unwrap(), expected);
        assert!(matches!(parse_date("03/31/2024"), Err(AppError::InvalidDate(_))));
    }

    #[test]
    fn reads_third_table_and_drops_header_row() {
        let html = page(&[("03/01/2024", "78,25"), ("02/01/2024", "75,89")]);
        let series = parse_price_table(&html, PRICE_TABLE_INDEX).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(series[0].price, 78.25);
        assert_eq!(series[1].price, 75.89);
    }

    #[test]
    fn missing_table_is_reported() {
        let err = parse_price_table("<table></table>", PRICE_TABLE_INDEX).unwrap_err();
        assert!(matches!(err, AppError::TableNotFound { index: 2, found: 1 }));
    }

    #[test]
    fn short_rows_are_malformed() {
        let html = page(&[("03/01/2024", "78,25")]).replace(
            "</table>\
             </body>",
            "<tr><td>04/01/2024</td></tr></table></body>",
        );
        let err = parse_price_table(&html, PRICE_TABLE_INDEX).unwrap_err();
        assert!(matches!(err, AppError::MalformedRow { row: 2, .. }));
    }

    #[test]
    fn fetch_sorts_and_caches() {
        let path = temp_csv("sorts");
        let source = FixedPage {
            html: Some(page(&[
                ("05/01/2024", "79,10"),
                ("03/01/2024", "78,25"),
                ("04/01/2024", "77,00"),
            ])),
            calls: AtomicUsize::new(0),
        };

        let series = fetch_series(&source, "http://example.test", &path).unwrap();
        let dates: Vec<u32> = series.iter().map(|o| chrono::Datelike::day(&o.date)).collect();
        assert_eq!(dates, vec![3, 4, 5]);
        assert_eq!(read_series(&path).unwrap(), series);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn duplicate_dates_keep_source_order() {
        let path = temp_csv("duplicates");
        let source = FixedPage {
            html: Some(page(&[
                ("04/01/2024", "77,00"),
                ("03/01/2024", "78,25"),
                ("03/01/2024", "78,40"),
                ("02/01/2024", "76,10"),
            ])),
            calls: AtomicUsize::new(0),
        };

        let series = fetch_series(&source, "http://example.test", &path).unwrap();
        let prices: Vec<f64> = series.iter().map(|o| o.price).collect();
        assert_eq!(prices, vec![76.10, 78.25, 78.40, 77.00]);
        assert_eq!(series[1].date, series[2].date);
        assert_eq!(read_series(&path).unwrap(), series);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn failed_fetch_leaves_cache_untouched() {
        let path = temp_csv("untouched");
        std::fs::write(&path, "Date,Price\n2024-01-02,75.5\n").unwrap();

        let unreachable = FixedPage {
            html: None,
            calls: AtomicUsize::new(0),
        };
        assert!(fetch_series(&unreachable, "http://example.test", &path).is_err());

        let bad_price = FixedPage {
            html: Some(page(&[("03/01/2024", "n/d")])),
            calls: AtomicUsize::new(0),
        };
        assert!(matches!(
            fetch_series(&bad_price, "http://example.test", &path),
            Err(AppError::InvalidPrice(_))
        ));

        assert_eq!(read_series(&path).unwrap().len(), 1);
        std::fs::remove_file(&path).ok();
    }
}
