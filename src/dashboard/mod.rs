// src/dashboard/mod.rs

pub mod page;

use chrono::NaiveDate;
use log::warn;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{ForecastRow, PriceObservation, MAX_HORIZON};
use crate::pipeline::{FetchStatus, Pipeline};
use crate::utils::charting::render_chart_svg;

pub const DEFAULT_HORIZON: usize = 5;
pub const DEFAULT_LOOKBACK: usize = 30;
pub const CHART_SIZE: (u32, u32) = (1200, 600);

/// Raw query string of the dashboard routes.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct ViewQuery {
    pub horizon: Option<usize>,
    pub lookback: Option<usize>,
}

/// Validated user inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewParams {
    pub horizon: usize,
    pub lookback: usize,
}

impl ViewQuery {
    /// Applies defaults and checks `1 <= horizon <= 30` and `1 <= lookback <= available`.
    pub fn resolve(&self, available: usize) -> Result<ViewParams> {
        let horizon = self.horizon.unwrap_or(DEFAULT_HORIZON);
        if !(1..=MAX_HORIZON).contains(&horizon) {
            return Err(AppError::InvalidInput(format!(
                "horizon must be between 1 and {}, got {}",
                MAX_HORIZON, horizon
            )));
        }

        let lookback = self
            .lookback
            .unwrap_or_else(|| DEFAULT_LOOKBACK.min(available).max(1));
        if lookback == 0 || lookback > available {
            return Err(AppError::InvalidInput(format!(
                "lookback must be between 1 and {}, got {}",
                available, lookback
            )));
        }

        Ok(ViewParams { horizon, lookback })
    }
}

/// Points drawn on the chart: a trailing history window and the projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub history: Vec<PriceObservation>,
    pub projection: Vec<ForecastRow>,
}

impl ChartData {
    pub fn build(series: &[PriceObservation], forecast: &[ForecastRow], lookback: usize) -> Self {
        let start = series.len().saturating_sub(lookback);
        ChartData {
            history: series[start..].to_vec(),
            projection: forecast.to_vec(),
        }
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let dates = self
            .history
            .iter()
            .map(|o| o.date)
            .chain(self.projection.iter().map(|r| r.date));
        dates.fold(None, |range, d| match range {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })
    }

    pub fn price_range(&self) -> Option<(f64, f64)> {
        let values = self
            .history
            .iter()
            .map(|o| o.price)
            .chain(self.projection.iter().flat_map(|r| [r.lower, r.mean, r.upper]));
        values.fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// One rendered state of the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub fetch: FetchStatus,
    pub can_download: bool,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub available: usize,
    pub params: ViewParams,
    pub chart: ChartData,
    pub forecast: Vec<ForecastRow>,
    /// Rendered chart, or the reason it could not be drawn.
    pub chart_svg: std::result::Result<String, String>,
}

/// Runs the pipeline and assembles everything the page shows.
pub fn build_view(pipeline: &Pipeline, query: &ViewQuery) -> Result<DashboardView> {
    let snapshot = pipeline.refresh()?;
    let series = snapshot.series.as_slice();
    let params = query.resolve(series.len())?;

    let forecast = pipeline.forecast(&snapshot.model, params.horizon)?;
    let chart = ChartData::build(series, &forecast, params.lookback);
    let chart_svg = render_chart_svg(&chart, CHART_SIZE.0, CHART_SIZE.1).map_err(|e| {
        warn!("Chart could not be rendered: {}", e);
        e.to_string()
    });

    Ok(DashboardView {
        can_download: snapshot.fetched.is_some(),
        fetch: snapshot.fetch,
        first_date: series.iter().map(|o| o.date).min(),
        last_date: series.iter().map(|o| o.date).max(),
        available: series.len(),
        params,
        chart,
        forecast,
        chart_svg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn history(len: usize) -> Vec<PriceObservation> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        (0..len)
            .map(|i| PriceObservation {
                date: start + Duration::days(i as i64),
                price: 70.0 + (i % 9) as f64,
            })
            .collect()
    }

    fn projection(after: NaiveDate, horizon: usize) -> Vec<ForecastRow> {
        (1..=horizon)
            .map(|h| ForecastRow {
                date: after + Duration::days(h as i64),
                mean: 75.0,
                lower: 73.0,
                upper: 77.5,
            })
            .collect()
    }

    #[test]
    fn defaults_fit_the_available_history() {
        let params = ViewQuery::default().resolve(500).unwrap();
        assert_eq!(params, ViewParams { horizon: 5, lookback: 30 });

        let params = ViewQuery::default().resolve(12).unwrap();
        assert_eq!(params.lookback, 12);
    }

    #[test]
    fn out_of_range_inputs_are_rejected() {
        let cases = [
            ViewQuery { horizon: Some(0), lookback: None },
            ViewQuery { horizon: Some(31), lookback: None },
            ViewQuery { horizon: None, lookback: Some(0) },
            ViewQuery { horizon: None, lookback: Some(101) },
        ];
        for query in cases {
            assert!(
                matches!(query.resolve(100), Err(AppError::InvalidInput(_))),
                "{:?}",
                query
            );
        }
        assert!(ViewQuery { horizon: Some(30), lookback: Some(100) }.resolve(100).is_ok());
    }

    #[test]
    fn chart_shows_lookback_window_and_projection() {
        let series = history(500);
        let forecast = projection(series[499].date, 5);
        let chart = ChartData::build(&series, &forecast, 40);

        assert_eq!(chart.history.len(), 40);
        assert_eq!(chart.history.last(), series.last());
        assert_eq!(chart.history[0], series[460]);
        assert_eq!(chart.projection.len(), 5);
    }

    #[test]
    fn lookback_is_capped_by_available_rows() {
        let series = history(8);
        let chart = ChartData::build(&series, &[], 50);
        assert_eq!(chart.history.len(), 8);
    }

    #[test]
    fn ranges_cover_history_and_band() {
        let series = history(3);
        let forecast = projection(series[2].date, 2);
        let chart = ChartData::build(&series, &forecast, 3);

        let (first, last) = chart.date_range().unwrap();
        assert_eq!(first, series[0].date);
        assert_eq!(last, forecast[1].date);
        assert_eq!(chart.price_range(), Some((70.0, 77.5)));

        let empty = ChartData::build(&[], &[], 10);
        assert_eq!(empty.date_range(), None);
    }
}
