//! Brent crude price dashboard: scrapes the IPEA price table, caches it as
//! CSV, fits an additive time-series model and serves the forecast over HTTP.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod utils;

pub use error::{AppError, Result};
