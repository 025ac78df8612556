// src/server.rs

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use log::info;

use crate::api::{self, AppState};
use crate::config::Settings;

/// Registers the dashboard routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(api::index))
        .route("/chart.svg", web::get().to(api::chart_svg))
        .route("/download", web::get().to(api::download_csv))
        .route("/api/forecast", web::get().to(api::forecast_json))
        .route("/api/history", web::get().to(api::history_json));
}

// Running the Actix web server
pub async fn run_server(settings: &Settings, app_state: web::Data<AppState>) -> std::io::Result<()> {
    info!("Dashboard listening on http://{}:{}", settings.host, settings.port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive()) // read-only JSON views
            .app_data(app_state.clone())
            .configure(configure)
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await
}
