use actix_web::{web, App, HttpServer};
use realtime_messaging_service::{
    config,
    db,
    delivery::DeliveryService,
    error, logging,
    presence::{ActiveChatTracker, PresenceRegistry},
    routes,
    state::AppState,
    store::PgMessageStore,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let db = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    let registry = PresenceRegistry::new();
    let tracker = ActiveChatTracker::new();
    let store = Arc::new(PgMessageStore::new(db.clone()));
    let delivery = DeliveryService::new(registry, tracker, store);

    let state = AppState {
        db: db.clone(),
        delivery,
        config: cfg.clone(),
    };

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting realtime-messaging-service");

    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .service(routes::wsroute::ws_handler)
            .service(routes::wsroute::metrics_handler)
            .route("/health", web::get().to(|| async { "OK" }))
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(format!("bind: {e}")))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(format!("run: {e}")))
}
