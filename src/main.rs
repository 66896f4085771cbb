use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, http, middleware::Logger, web};
use autograph::config::{AppConfig, StoreBackend};
use autograph::db::mongodb::{ensure_content_indexes, get_database};
use autograph::routes::init_routes;
use autograph::state::AppState;
use autograph::store::{MemoryVisitStore, MongoVisitStore, VisitStore};
use dotenv::dotenv;
use env_logger::Env;
use log::{debug, error, info, warn};

// How often expired rate-limit windows are swept
const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize the stores
    let (db, visits) = match config.store_backend {
        StoreBackend::MongoDb => {
            let db = match get_database(&config).await {
                Ok(db) => db,
                Err(e) => {
                    error!("Error connecting to the database: {}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = ensure_content_indexes(&db).await {
                error!("Error creating content indexes: {}", e);
                std::process::exit(1);
            }
            let visits: Arc<dyn VisitStore> = Arc::new(MongoVisitStore::new(db.clone()));
            (Some(db), visits)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory visit store; content endpoints are disabled");
            let visits: Arc<dyn VisitStore> = Arc::new(MemoryVisitStore::new());
            (None, visits)
        }
    };

    // Visit recording relies on the unique ipAddress index
    if let Err(e) = visits.init().await {
        error!("Error initializing visit store: {}", e);
        std::process::exit(1);
    }

    let bind = (config.host.clone(), config.port);
    let cors_origins = config.cors_origins.clone();
    let app_state = web::Data::new(AppState::new(config, db, visits));

    let limiter = app_state.limiter.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(LIMITER_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = limiter.cleanup(chrono::Utc::now());
            if removed > 0 {
                debug!("Swept {} expired rate-limit windows", removed);
            }
        }
    });

    info!("Server running on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        let logger = Logger::new("%a \"%r\" %s %b \"%{Referer}i\" \"%{User-Agent}i\" %D ms");
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec![http::header::AUTHORIZATION, http::header::ACCEPT])
            .allowed_header(http::header::CONTENT_TYPE)
            .supports_credentials()
            .max_age(3600);
        App::new()
            .wrap(logger)
            .wrap(cors)
            .app_data(app_state.clone())
            .configure(init_routes)
    })
    .bind(bind)?
    .run()
    .await
}
