// src/main.rs
use actix_web::{
    http::header,
    middleware::{Compress, DefaultHeaders, Logger},
    web, App, HttpServer,
};
use actix_cors::Cors;
use anyhow::Context;
use chrono::Utc;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqlitePool,
};
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod booking;
mod booking_handlers;
mod config;
mod db;
mod error;
mod handlers;
mod inventory;
mod models;
mod session;
mod ward_handlers;

use config::{load_config, Config};
use session::{JwtSessionProvider, SessionProvider};

pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Config,
    pub sessions: Arc<dyn SessionProvider>,
}

// ==================== MAIN ====================

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (this calls load_env_file internally)
    let config = load_config()?;

    // Setup logging
    setup_logging(&config)?;

    // Validate production config
    if env::var("POCKETCARE_ENV").as_deref() == Ok("production") {
        validate_production_config(&config)?;
    }

    config.print_startup_info();

    // Setup database
    setup_database(&config.database.url).await?;

    // Create database pool
    let pool = create_database_pool(&config.database).await?;

    // Run migrations
    db::run_migrations(&pool).await?;

    // Create default hospital if needed
    create_default_hospital_if_needed(&pool).await?;

    // Session provider
    let sessions: Arc<dyn SessionProvider> = Arc::new(JwtSessionProvider::new(
        &config.auth.jwt_secret,
        config.auth.token_expiration_hours,
    ));

    // Create app state
    let app_state = Arc::new(AppState {
        db_pool: pool.clone(),
        config: config.clone(),
        sessions,
    });

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server at http://{}", bind_address);

    let workers = config.server.workers;
    let keep_alive = std::time::Duration::from_secs(config.server.keep_alive);
    let client_timeout = std::time::Duration::from_secs(config.server.client_timeout);
    let client_shutdown = std::time::Duration::from_secs(config.server.client_shutdown);

    let server = HttpServer::new(move || {
        let cors = setup_cors(&config.security.allowed_origins);
        let security_headers = setup_security_headers(&config.security);

        App::new()
            .wrap(cors)
            .wrap(security_headers)
            .wrap(Logger::default())
            .wrap(Compress::default())
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::PayloadConfig::new(config.security.max_request_size))

            // Health check (no auth)
            .route("/health", web::get().to(handlers::health_check))

            // Hospital-side ward management
            .service(
                web::scope("/bed-management")
                    .route("/bed-wards", web::get().to(ward_handlers::get_bed_wards))
                    .route("/bed-wards", web::post().to(ward_handlers::upsert_bed_ward))
                    .route("/bed-wards/{id}", web::put().to(ward_handlers::update_bed_ward))
                    .route("/bed-wards/{id}", web::delete().to(ward_handlers::delete_bed_ward))
                    .route("/bed-summary", web::get().to(handlers::get_bed_summary))
                    .route("/bed-allocation-logs", web::get().to(ward_handlers::get_allocation_logs))
                    .route("/bed-allocation-logs", web::post().to(ward_handlers::create_allocation_log)),
            )

            // Hospital-side booking views
            .service(
                web::scope("/hospital")
                    .route("/bed-bookings", web::get().to(booking_handlers::get_hospital_bookings))
                    .route("/bed-bookings/by-ward", web::get().to(booking_handlers::get_bookings_by_ward))
                    .route("/bed-bookings/{id}/status", web::put().to(booking_handlers::update_booking_status)),
            )

            // Patient-side booking
            .service(
                web::scope("/user")
                    .route("/bed-bookings", web::post().to(booking_handlers::create_bed_booking))
                    .route("/bed-bookings", web::get().to(booking_handlers::get_user_bookings))
                    .route("/bed-bookings/{id}", web::delete().to(booking_handlers::cancel_bed_booking)),
            )
    });

    let server = server
        .keep_alive(keep_alive)
        .client_request_timeout(client_timeout)
        .client_disconnect_timeout(client_shutdown);

    let server = if let Some(workers) = workers {
        server.workers(workers)
    } else {
        server
    };

    server
        .bind(&bind_address)?
        .run()
        .await
        .context("Server failed to run")?;

    Ok(())
}

// ==================== HELPER FUNCTIONS ====================

pub fn setup_cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::USER_AGENT,
        ])
        .expose_headers(vec![header::CONTENT_LENGTH])
        .max_age(3600);

    let is_production = env::var("POCKETCARE_ENV").as_deref() == Ok("production");

    if allowed_origins.contains(&"*".to_string()) {
        if is_production {
            log::error!("Wildcard CORS origin (*) is not allowed in production");
            panic!("Cannot start server with wildcard CORS in production");
        }
        log::warn!("Using wildcard CORS (*) in development mode");
        cors = cors.allow_any_origin().allow_any_header().allow_any_method();
    } else {
        for origin in allowed_origins {
            if origin.is_empty() {
                continue;
            }
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

fn setup_logging(config: &Config) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

fn validate_production_config(config: &Config) -> anyhow::Result<()> {
    if config.auth.jwt_secret == "your-secret-key-here" || config.auth.jwt_secret.len() < 32 {
        anyhow::bail!("Insecure JWT secret in production! Must be at least 32 characters.");
    }

    if config.security.allowed_origins.contains(&"*".to_string()) {
        anyhow::bail!("Wildcard CORS origins not allowed in production!");
    }

    Ok(())
}

async fn setup_database(database_url: &str) -> anyhow::Result<()> {
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        log::info!("Creating database: {}", database_url);
        Sqlite::create_database(database_url).await?;
    }
    Ok(())
}

async fn create_database_pool(db_config: &config::DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&db_config.url)
        .with_context(|| format!("Invalid database URL: {}", db_config.url))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(db_config.max_connections)
        .min_connections(db_config.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(db_config.connect_timeout))
        .idle_timeout(std::time::Duration::from_secs(db_config.idle_timeout))
        .connect_with(options)
        .await?;
    Ok(pool)
}

fn setup_security_headers(config: &config::SecurityConfig) -> DefaultHeaders {
    let mut headers = DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("X-XSS-Protection", "1; mode=block"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"));

    if config.require_https {
        headers = headers.add((
            "Strict-Transport-Security",
            "max-age=31536000; includeSubDomains; preload",
        ));
    }

    headers
}

async fn create_default_hospital_if_needed(pool: &SqlitePool) -> anyhow::Result<()> {
    let hospital_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM hospitals")
        .fetch_one(pool)
        .await?;

    if hospital_count.0 == 0 {
        let name =
            env::var("DEFAULT_HOSPITAL_NAME").unwrap_or_else(|_| "PocketCare General".to_string());
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO hospitals (name, city, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&name)
        .bind("Pune")
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        log::warn!(
            "Default hospital '{}' created with id {}",
            name,
            result.last_insert_rowid()
        );
    }

    Ok(())
}
