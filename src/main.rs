use std::sync::Arc;

use tower_http::cors::CorsLayer;

use vibe_booking::config::AppConfig;
use vibe_booking::llm::create_provider;
use vibe_booking::wizard::{
    GenerationOrchestrator, LlmGenerationService, WizardRouteState, WizardSession, wizard_routes,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...");
            std::process::exit(1);
        }
    };

    let port = config.server.port;
    eprintln!("🧳 Vibe Booking v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Session WS: ws://0.0.0.0:{}/ws", port);
    eprintln!("   Session API: http://0.0.0.0:{}/api/session\n", port);

    let llm = create_provider(&config.llm)?;
    let service = Arc::new(LlmGenerationService::new(llm, config.generation.clone()));
    let session = WizardSession::new(&config.session);
    let orchestrator = Arc::new(GenerationOrchestrator::new(session, service));

    let app = wizard_routes(WizardRouteState::new(orchestrator)).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!(port, "Vibe Booking server started");
    axum::serve(listener, app).await?;

    Ok(())
}
