// src/utils/charting.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use plotters::prelude::*;

use crate::dashboard::ChartData;
use crate::error::{AppError, Result};

pub const CHART_TITLE: &str = "Brent crude (FOB) price projection";

fn chart_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Chart(e.to_string())
}

fn at_midnight(date: NaiveDate) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(date.and_time(NaiveTime::default()), Utc)
}

/// Draws history, projection and the shaded band into an SVG document.
pub fn render_chart_svg(data: &ChartData, width: u32, height: u32) -> Result<String> {
    let (first, last) = data
        .date_range()
        .ok_or_else(|| AppError::Chart("nothing to plot".into()))?;
    let (low, high) = data
        .price_range()
        .ok_or_else(|| AppError::Chart("nothing to plot".into()))?;

    let x_min = at_midnight(first);
    let x_max = if last > first {
        at_midnight(last)
    } else {
        at_midnight(first) + chrono::Duration::days(1)
    };
    let padding = (high - low).max(1e-8) * 0.1;
    let y_min = (low - padding).max(0.0);
    let y_max = high + padding;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(CHART_TITLE, ("sans-serif", 28))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Price (USD)")
            .draw()
            .map_err(chart_err)?;

        if !data.projection.is_empty() {
            let band: Vec<(DateTime<Utc>, f64)> = data
                .projection
                .iter()
                .map(|row| (at_midnight(row.date), row.upper))
                .chain(
                    data.projection
                        .iter()
                        .rev()
                        .map(|row| (at_midnight(row.date), row.lower)),
                )
                .collect();
            chart
                .draw_series(std::iter::once(Polygon::new(band, RED.mix(0.2).filled())))
                .map_err(chart_err)?;
        }

        chart
            .draw_series(LineSeries::new(
                data.history.iter().map(|obs| (at_midnight(obs.date), obs.price)),
                &BLUE,
            ))
            .map_err(chart_err)?
            .label("Historical data")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

        chart
            .draw_series(LineSeries::new(
                data.projection.iter().map(|row| (at_midnight(row.date), row.mean)),
                &RED,
            ))
            .map_err(chart_err)?
            .label("Projection")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }

    Ok(svg)
}
