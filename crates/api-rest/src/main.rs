//! Standalone admin REST API server binary.
//!
//! ## Purpose
//! Serves the admin write API over the reference data pipeline, with
//! OpenAPI/Swagger documentation.
//!
//! ## Environment Variables
//! - `PLANTAO_REST_ADDR`: server address (default: "0.0.0.0:3001")
//! - `PLANTAO_DATA_DIR`: data root containing `data-src/` and `data/`
//!   (default: current directory)
//! - `PLANTAO_ADMIN_TOKEN`: token expected in `X-Admin-Token` on writes;
//!   when unset, the write endpoints are disabled and answer 503

use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_rest::{app, ApiDoc, AppState};
use plantao_core::{data_dir_from_env_value, CoreConfig, DataPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("PLANTAO_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let data_dir = data_dir_from_env_value(std::env::var("PLANTAO_DATA_DIR").ok());
    if !data_dir.exists() {
        anyhow::bail!("data directory does not exist: {}", data_dir.display());
    }

    let admin_token = std::env::var("PLANTAO_ADMIN_TOKEN").ok();
    if admin_token.as_deref().map(str::trim).unwrap_or("").is_empty() {
        tracing::warn!("no admin token configured; write endpoints are disabled");
    }

    tracing::info!("-- Starting Plantão admin API on {}", addr);
    tracing::info!("-- Data root: {}", data_dir.display());

    let state = AppState::new(DataPipeline::new(CoreConfig::new(data_dir)), admin_token);

    let router = app(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
