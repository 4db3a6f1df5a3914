use library_ledger::{
    adapters::{
        memory::InMemoryLibraryStore,
        postgres::{PostgresBookRepository, PostgresBorrowReadModel},
    },
    api::{handlers::AppState, router::create_router},
    application::library::ServiceDependencies,
    config::AppConfig,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_ledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    // Initialize adapters
    let service_deps = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Using PostgreSQL store");

            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(database_url)
                .await
                .expect("Failed to connect to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            ServiceDependencies {
                book_repository: Arc::new(PostgresBookRepository::new(pool.clone())),
                borrow_read_model: Arc::new(PostgresBorrowReadModel::new(pool)),
            }
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; using in-memory store");

            let store = Arc::new(InMemoryLibraryStore::new());
            ServiceDependencies {
                book_repository: store.clone(),
                borrow_read_model: store,
            }
        }
    };

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    // Create router
    let app = create_router(app_state);

    // Server configuration
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
