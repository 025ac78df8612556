// src/api/handlers.rs

use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::api::AppState;
use crate::dashboard::page::render_page;
use crate::dashboard::{build_view, ViewQuery, DEFAULT_HORIZON, DEFAULT_LOOKBACK};
use crate::error::{AppError, Result};
use crate::models::{ForecastRow, PriceObservation};
use crate::utils::cache::to_csv_bytes;

/// Runs the synchronous pipeline on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Task(e.to_string()))?
}

pub async fn index(
    data: web::Data<AppState>,
    query: web::Query<ViewQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let view = blocking(move || build_view(&data.pipeline, &query)).await?;

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render_page(&view)))
}

pub async fn chart_svg(
    data: web::Data<AppState>,
    query: web::Query<ViewQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let view = blocking(move || build_view(&data.pipeline, &query)).await?;
    let svg = view.chart_svg.map_err(AppError::Chart)?;

    Ok(HttpResponse::Ok().content_type("image/svg+xml").body(svg))
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub horizon: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub horizon: usize,
    pub rows: Vec<ForecastRow>,
}

pub async fn forecast_json(
    data: web::Data<AppState>,
    query: web::Query<ForecastQuery>,
) -> Result<HttpResponse> {
    let view_query = ViewQuery {
        horizon: Some(query.horizon.unwrap_or(DEFAULT_HORIZON)),
        lookback: None,
    };
    let rows = blocking(move || {
        let snapshot = data.pipeline.refresh()?;
        let params = view_query.resolve(snapshot.series.len())?;
        data.pipeline.forecast(&snapshot.model, params.horizon)
    })
    .await?;

    Ok(HttpResponse::Ok().json(ForecastResponse {
        horizon: rows.len(),
        rows,
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub lookback: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub lookback: usize,
    pub total: usize,
    pub rows: Vec<PriceObservation>,
}

pub async fn history_json(
    data: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse> {
    let requested = query.lookback;
    let response = blocking(move || {
        let series = data.pipeline.refresh()?.series;
        let params = ViewQuery {
            horizon: None,
            lookback: Some(requested.unwrap_or_else(|| DEFAULT_LOOKBACK.min(series.len()))),
        }
        .resolve(series.len())?;
        let start = series.len() - params.lookback;
        Ok(HistoryResponse {
            lookback: params.lookback,
            total: series.len(),
            rows: series[start..].to_vec(),
        })
    })
    .await?;

    Ok(HttpResponse::Ok().json(response))
}

/// The data fetched by this process as a CSV attachment.
pub async fn download_csv(data: web::Data<AppState>) -> Result<HttpResponse> {
    let Some(series) = data.pipeline.fetched_series() else {
        return Ok(HttpResponse::NotFound()
            .content_type("text/plain; charset=utf-8")
            .body("No data has been fetched yet."));
    };
    let bytes = to_csv_bytes(&series)?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename("raw_data.csv".into())],
        })
        .body(bytes))
}
