//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::PgStore, llm::OpenAiCorrectionAdapter},
    config::Config,
    error::ApiError,
    web::{
        balance_handler, check_handler, get_session_handler, list_sessions_handler,
        purchase_handler, reconcile_handler, renewal_handler, rest::ApiDoc, session_view_handler,
        state::AppState,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, patch, post},
    Router,
};
use redpen_core::models::{ModelCatalog, PlanCatalog};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgStore::new(db_pool));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Provider Adapter ---
    let provider_config = OpenAIConfig::new()
        .with_api_key(&config.provider_api_key)
        .with_api_base(&config.provider_base_url);
    let provider_client = Client::with_config(provider_config);
    let provider = Arc::new(OpenAiCorrectionAdapter::new(provider_client));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        sessions: store.clone(),
        credits: store,
        provider,
        models: ModelCatalog::new(),
        plans: PlanCatalog::new(),
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/check", post(check_handler))
        .route("/sessions", get(list_sessions_handler))
        .route("/sessions/{id}", get(get_session_handler))
        .route("/sessions/{id}/corrections", patch(reconcile_handler))
        .route("/sessions/{id}/view", get(session_view_handler))
        .route("/credits", get(balance_handler))
        .route("/credits/purchase", post(purchase_handler))
        .route("/credits/renewal", post(renewal_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
