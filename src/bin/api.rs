use advisory_chat_orchestrator::{
    api::start_server,
    completion::{HttpCompletionClient, MockCompletionClient},
    orchestrator::Orchestrator,
    state::InMemorySessionStore,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    let fixed_recommendations = std::env::var("FIXED_RECOMMENDATIONS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    info!("🚀 Advisory Chat Orchestrator - API Server");
    info!("📍 Port: {}", api_port);

    // The model endpoint is optional; without one the mock client keeps
    // the conversation flows exercisable
    let orchestrator = match std::env::var("MODEL_ENDPOINT_URL") {
        Ok(endpoint) if !endpoint.trim().is_empty() => {
            info!("🧠 Model endpoint: {}", endpoint);
            Orchestrator::new(Box::new(HttpCompletionClient::new(endpoint)))
        }
        _ => {
            eprintln!("⚠️  MODEL_ENDPOINT_URL not set; using the mock completion client");
            Orchestrator::new(Box::new(MockCompletionClient::new()))
        }
    }
    .with_fixed_recommendations(fixed_recommendations);

    let store = Arc::new(InMemorySessionStore::new());

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    start_server(Arc::new(orchestrator), store, api_port).await?;

    Ok(())
}
