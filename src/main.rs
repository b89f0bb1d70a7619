use axum::http::{header, HeaderValue, Method};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wardscore::{
    analysis::{
        repository::{InMemoryAnalysisRepository, PostgresAnalysisRepository},
        scoring::SimulatedReplayScorer,
    },
    ranking::repository::{InMemoryRankingRepository, PostgresRankingRepository},
    replay::repository::{InMemoryReplayRepository, PostgresReplayRepository},
    user::repository::{InMemoryUserRepository, PostgresUserRepository},
    AnalysisRepository, AppError, AppState, CachedUserRepository, Config, InMemoryCacheStore,
    RankingRepository, ReplayRepository, UserRepository,
};

struct Repositories {
    users: Arc<dyn UserRepository>,
    replays: Arc<dyn ReplayRepository>,
    analyses: Arc<dyn AnalysisRepository>,
    rankings: Arc<dyn RankingRepository>,
}

async fn build_repositories(config: &Config) -> Result<Repositories, Box<dyn std::error::Error>> {
    match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(database_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Connected to PostgreSQL and applied migrations");

            Ok(Repositories {
                users: Arc::new(PostgresUserRepository::new(pool.clone())),
                replays: Arc::new(PostgresReplayRepository::new(pool.clone())),
                analyses: Arc::new(PostgresAnalysisRepository::new(pool.clone())),
                rankings: Arc::new(PostgresRankingRepository::new(pool)),
            })
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory repositories");
            Ok(Repositories {
                users: Arc::new(InMemoryUserRepository::new()),
                replays: Arc::new(InMemoryReplayRepository::new()),
                analyses: Arc::new(InMemoryAnalysisRepository::new()),
                rankings: Arc::new(InMemoryRankingRepository::new()),
            })
        }
    }
}

fn cors_layer(config: &Config) -> Result<CorsLayer, AppError> {
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|_| {
        AppError::Config(format!("CORS_ORIGIN is not a valid origin: {}", config.cors_origin))
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static("x-user-id"),
        ]))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wardscore=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ward score service");

    let config = Config::from_env()?;
    let repositories = build_repositories(&config).await?;

    // Single-user reads go through the cache; every other path hits the store
    let user_repository: Arc<dyn UserRepository> = Arc::new(CachedUserRepository::new(
        repositories.users,
        Arc::new(InMemoryCacheStore::new()),
        config.user_cache_ttl,
    ));

    let cors = cors_layer(&config)?;
    let bind_address = config.bind_address.clone();

    let app_state = AppState::new(
        user_repository,
        repositories.replays,
        repositories.analyses,
        repositories.rankings,
        Arc::new(SimulatedReplayScorer::new()),
        Arc::new(config),
    );

    let app = wardscore::router(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Server running on http://{}", bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}
