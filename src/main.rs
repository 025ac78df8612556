// src/main.rs

use actix_web::web;
use log::{error, info};

use brent_forecast::api::AppState;
use brent_forecast::config::Settings;
use brent_forecast::pipeline::Pipeline;
use brent_forecast::server::run_server;
use brent_forecast::utils::HttpPageSource;

#[actix_web::main]
async fn main() -> Result<(), std::io::Error> {
    // Load .env before the logger reads RUST_LOG
    dotenv::dotenv().ok();

    // Initialize the logger
    env_logger::init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };
    info!(
        "Source {} cached at {}",
        settings.source_url,
        settings.cache_path.display()
    );

    // The first request triggers the fetch; nothing is downloaded at start-up.
    let pipeline = Pipeline::new(settings.clone(), Box::new(HttpPageSource));
    let app_state = web::Data::new(AppState::new(pipeline));

    run_server(&settings, app_state).await
}
