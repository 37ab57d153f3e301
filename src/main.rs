use std::time::Duration;

use actix_web::middleware::NormalizePath;
use actix_web::web::{self, Data};
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod engine;
mod error;
mod model;
mod models;
mod routes;
mod store;
mod utils;

use config::Config;
use db::init_db;

use crate::api::AppEngine;
use crate::docs::ApiDoc;
use crate::engine::{EngineSettings, LeaveEngine};
use crate::error::LeaveError;
use crate::store::mysql::MySqlLeaveStore;
use crate::utils::leave_type_cache::LeaveTypeCache;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HRM leave service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, prefix = %config.api_prefix, "Server starting...");

    let pool = init_db(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let engine: Data<AppEngine> = Data::new(LeaveEngine::new(
        MySqlLeaveStore::new(pool),
        LeaveTypeCache::new(Duration::from_secs(config.leave_type_cache_ttl_secs)),
        EngineSettings {
            allow_half_day: config.allow_half_day,
        },
    ));

    let engine_for_warmup = engine.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = engine_for_warmup.warm_up().await {
            warn!(error = %e, "Failed to warm up leave type cache");
        }
    });

    // one limiter shared by every worker
    let limiter = routes::build_limiter(config.rate_protected_per_min)?;
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                LeaveError::validation(format!("Invalid JSON payload: {err}")).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                LeaveError::validation(format!("Invalid query string: {err}")).into()
            }))
            .app_data(engine.clone())
            .app_data(Data::new(config.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config, &limiter))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
