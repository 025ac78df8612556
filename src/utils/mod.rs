// src/utils/mod.rs

pub mod cache;
pub mod charting;
pub mod fetch;
pub mod linalg;
pub mod memo;

pub use cache::{read_series, to_csv_bytes, write_series};
pub use fetch::{fetch_series, parse_price_table, HttpPageSource, PageSource};
