use actix_web::{middleware, web, App, HttpServer};
use kreels_notification_service::{
    handlers::{
        register_devices, register_notifications, register_preferences, register_realtime,
    },
    metrics,
    services::PushProvider,
    Config, ConnectionManager, ExpoPushClient, FanoutService, NotificationService,
    PushDispatcher,
};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting notification service");

    let config = Config::from_env().map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("config error: {}", e))
    })?;

    // One shared pool per process, built once at startup and passed into
    // every service.
    let db_pool = match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Successfully connected to database");
            pool
        }
        Err(e) => {
            tracing::error!("Failed to connect to database: {}", e);
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "Database connection failed",
            ));
        }
    };

    let push_provider: Arc<dyn PushProvider> = Arc::new(ExpoPushClient::new(
        config.push.endpoint.clone(),
        config.push.access_token.clone(),
    ));

    let notification_service = Arc::new(NotificationService::new(db_pool.clone()));
    let push_dispatcher = Arc::new(PushDispatcher::new(
        notification_service.clone(),
        push_provider.clone(),
    ));
    let connection_manager = Arc::new(ConnectionManager::new());
    let fanout_service = Arc::new(FanoutService::new(
        db_pool.clone(),
        notification_service.clone(),
        push_dispatcher,
        connection_manager.clone(),
    ));

    let addr = format!("0.0.0.0:{}", config.app.port);
    tracing::info!("Starting HTTP server on {}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(notification_service.clone()))
            .app_data(web::Data::new(fanout_service.clone()))
            .app_data(web::Data::new(connection_manager.clone()))
            .app_data(web::Data::new(push_provider.clone()))
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(|cfg| {
                register_notifications(cfg);
                register_devices(cfg);
                register_preferences(cfg);
                register_realtime(cfg);
            })
    })
    .bind(&addr)?
    .run()
    .await
}
