// src/api/mod.rs

use crate::pipeline::Pipeline;

/// Application state shared by every worker.
pub struct AppState {
    pub pipeline: Pipeline,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        AppState { pipeline }
    }
}

pub mod handlers;

pub use handlers::{chart_svg, download_csv, forecast_json, history_json, index};
