// src/dashboard/page.rs

use crate::config::DEFAULT_SOURCE_URL;
use crate::dashboard::DashboardView;
use crate::models::MAX_HORIZON;
use crate::pipeline::FetchStatus;

pub const SUCCESS_BANNER: &str = "Data loaded successfully!";
pub const ERROR_BANNER_PREFIX: &str = "Failed to load data:";

/// Documentation of the forecasting approach the model follows.
pub const MODEL_DOCS_URL: &str = "https://facebook.github.io/prophet/docs/quick_start.html";

const STYLE: &str = "body{font-family:sans-serif;max-width:1240px;margin:2em auto;padding:0 1em;color:#222}\
.banner{padding:.75em 1em;border-radius:4px;margin:1em 0}\
.success{background:#e6f4ea;color:#1e4620}\
.error{background:#fdecea;color:#611a15}\
table{border-collapse:collapse}td,th{padding:.3em .8em;border-bottom:1px solid #ddd;text-align:right}\
form label{display:block;margin:.5em 0}";

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the full dashboard page.
pub fn render_page(view: &DashboardView) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">");
    html.push_str("<title>Brent crude oil price projection</title>");
    html.push_str(&format!("<style>{}</style></head><body>", STYLE));

    html.push_str("<h1>Brent crude oil price projection</h1>");
    html.push_str(
        "<p>This application projects the price of Brent crude oil with an additive \
         time-series model (trend, seasonality and uncertainty intervals).</p>",
    );
    html.push_str("<h2>Dataset</h2>");

    match &view.fetch {
        FetchStatus::Loaded { rows } => html.push_str(&format!(
            "<div class=\"banner success\">{} ({} rows)</div>",
            SUCCESS_BANNER, rows
        )),
        FetchStatus::Failed(message) => html.push_str(&format!(
            "<div class=\"banner error\">{} {}</div>",
            ERROR_BANNER_PREFIX,
            escape_html(message)
        )),
    }

    if view.can_download {
        html.push_str("<p><a class=\"download\" href=\"/download\" download=\"raw_data.csv\">Download data as CSV</a></p>");
    }

    if let (Some(first), Some(last)) = (view.first_date, view.last_date) {
        html.push_str(&format!(
            "<p><strong>Period available in the dataset:</strong> {} to {}</p>",
            first, last
        ));
    }

    html.push_str("<h2>Projection of future values</h2>");
    html.push_str(&format!(
        "<form method=\"get\" action=\"/\">\
         <label>Number of days to project: \
         <input type=\"number\" name=\"horizon\" min=\"1\" max=\"{}\" value=\"{}\"></label>\
         <label>Number of historical days to show in the chart: \
         <input type=\"number\" name=\"lookback\" min=\"1\" max=\"{}\" value=\"{}\"></label>\
         <button type=\"submit\">Update</button></form>",
        MAX_HORIZON, view.params.horizon, view.available, view.params.lookback
    ));

    match &view.chart_svg {
        Ok(svg) => html.push_str(&format!("<figure class=\"chart\">{}</figure>", svg)),
        Err(message) => html.push_str(&format!(
            "<p class=\"banner error\">Chart unavailable: {}</p>",
            escape_html(message)
        )),
    }

    html.push_str("<h3>Projected values</h3>");
    html.push_str(&render_forecast_table(view));

    html.push_str(&format!(
        "<h3>References</h3><ul>\
         <li>IPEA: <a href=\"{}\">Brent crude oil price per barrel (FOB)</a></li>\
         <li>Prophet: <a href=\"{}\">Documentation</a></li>\
         </ul>",
        escape_html(DEFAULT_SOURCE_URL),
        MODEL_DOCS_URL
    ));
    html.push_str("</body></html>");
    html
}

fn render_forecast_table(view: &DashboardView) -> String {
    let mut table = String::from(
        "<table class=\"forecast\"><thead><tr><th>Date</th><th>Projection (USD)</th>\
         <th>Lower bound</th><th>Upper bound</th></tr></thead><tbody>",
    );
    for row in &view.forecast {
        table.push_str(&format!(
            "<tr class=\"forecast-row\"><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td></tr>",
            row.date, row.mean, row.lower, row.upper
        ));
    }
    table.push_str("</tbody></table>");
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{ChartData, ViewParams};
    use crate::models::ForecastRow;
    use chrono::NaiveDate;

    fn view(fetch: FetchStatus, can_download: bool) -> DashboardView {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        DashboardView {
            fetch,
            can_download,
            first_date: NaiveDate::from_ymd_opt(1987, 5, 20),
            last_date: Some(date),
            available: 100,
            params: ViewParams {
                horizon: 2,
                lookback: 30,
            },
            chart: ChartData {
                history: vec![],
                projection: vec![],
            },
            forecast: vec![
                ForecastRow {
                    date: date.succ_opt().unwrap(),
                    mean: 80.123,
                    lower: 78.0,
                    upper: 82.0,
                },
                ForecastRow {
                    date: date.succ_opt().unwrap().succ_opt().unwrap(),
                    mean: 80.5,
                    lower: 77.5,
                    upper: 83.25,
                },
            ],
            chart_svg: Ok("<svg></svg>".into()),
        }
    }

    #[test]
    fn success_page_offers_download() {
        let html = render_page(&view(FetchStatus::Loaded { rows: 100 }, true));
        assert!(html.contains(SUCCESS_BANNER));
        assert!(!html.contains(ERROR_BANNER_PREFIX));
        assert!(html.contains("href=\"/download\""));
        assert!(html.contains("1987-05-20 to 2024-06-03"));
        assert!(html.contains("<td>2024-06-04</td><td>80.12</td>"));
        assert_eq!(html.matches("class=\"forecast-row\"").count(), 2);
        assert!(html.contains("max=\"100\" value=\"30\""));
    }

    #[test]
    fn references_cite_source_and_model_docs() {
        let html = render_page(&view(FetchStatus::Loaded { rows: 100 }, true));
        let references = &html[html.find("<h3>References</h3>").unwrap()..];
        assert!(references.contains("ipeadata.gov.br"));
        assert!(references.contains(&format!("href=\"{}\"", MODEL_DOCS_URL)));
        assert_eq!(references.matches("<li>").count(), 2);
    }

    #[test]
    fn failure_page_shows_escaped_error_without_download() {
        let html = render_page(&view(FetchStatus::Failed("<timeout>".into()), false));
        assert!(html.contains("Failed to load data: &lt;timeout&gt;"));
        assert!(!html.contains(SUCCESS_BANNER));
        assert!(!html.contains("href=\"/download\""));
    }

    #[test]
    fn chart_failure_is_shown_inline() {
        let mut v = view(FetchStatus::Loaded { rows: 1 }, true);
        v.chart_svg = Err("no fonts".into());
        let html = render_page(&v);
        assert!(html.contains("Chart unavailable: no fonts"));
    }
}
