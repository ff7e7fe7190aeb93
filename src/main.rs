use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use health_companion::config::Config;
use health_companion::dispatcher::{ChatBackend, RagDispatcher};
use health_companion::store::postgres::PgProfileStore;
use health_companion::{build_router, db, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let config = Config::from_env()?;
    let database_url = config.database_url.clone().unwrap_or_default();

    let pool = db::create_pool(&database_url, config.db_max_connections).await?;
    let store = Arc::new(PgProfileStore::new(pool));

    let chat_backend: Option<Arc<dyn ChatBackend>> = match config.rag_service_url.as_deref() {
        Some(url) => {
            tracing::info!("Chat requests will be forwarded to {}", url);
            let dispatcher = RagDispatcher::new(
                url,
                config.rag_collection.clone(),
                Duration::from_secs(config.rag_timeout_secs),
            )?;
            Some(Arc::new(dispatcher))
        }
        None => {
            tracing::warn!("RAG_SERVICE_URL not set. Chat endpoints will answer 503.");
            None
        }
    };

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, store, chat_backend));
    let app = build_router(state);

    // ConnectInfo provides the socket address the auth rate limiter keys on
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,health_companion=trace,sqlx=info,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,health_companion=info,sqlx=warn,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("🩺 Health companion starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );
    tracing::info!("Log level: {}", log_level);
    tracing::info!(
        "Configuration - Database: {}, RAG service: {}",
        if std::env::var("DATABASE_URL").is_ok() { "✅" } else { "❌" },
        if std::env::var("RAG_SERVICE_URL").is_ok() { "✅" } else { "❌" }
    );

    Ok(())
}
