use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use hushlog_anonymizer::JobContext;
use hushlog_core::models::model::ModelSelector;
use hushlog_lambda::config::AppConfig;
use hushlog_lambda::router;
use hushlog_lambda::state::AppState;
use hushlog_openai::client::OpenAiClient;
use hushlog_storage::postgres::{self, PgQueryLogStore};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Structured JSON logging for CloudWatch
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env()?;

    let pool = postgres::connect(&config.database_url, config.database_max_connections).await?;
    let store = Arc::new(PgQueryLogStore::new(pool));
    let completions = OpenAiClient::new(&config.openai_base_url, config.openai_timeout)?;

    let state = AppState {
        job: JobContext {
            store: store.clone(),
            usage: store,
            completions: Arc::new(completions),
            model: ModelSelector::ANONYMIZER,
            default_api_key: config.openai_api_key.clone(),
        },
    };

    let app = router(state);

    match &config.local_addr {
        Some(addr) => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(addr = %addr, "serving anonymization trigger locally");
            axum::serve(listener, app).await?;
            Ok(())
        }
        None => lambda_http::run(app).await.map_err(|e| eyre::eyre!(e)),
    }
}
