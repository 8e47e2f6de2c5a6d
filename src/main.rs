use std::sync::Arc;
use std::time::Duration;

use nutri_assist::config::BotConfig;
use nutri_assist::engine::ConversationEngine;
use nutri_assist::generator::{GeneratorBackend, GeneratorConfig, create_generator};
use nutri_assist::routes::{AppState, chat_routes};
use nutri_assist::store::{LibSqlStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Read API key from environment
    let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_else(|_| {
        eprintln!("Error: ANTHROPIC_API_KEY not set");
        eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...");
        std::process::exit(1);
    });

    let model = std::env::var("NUTRI_ASSIST_MODEL")
        .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string());

    let port: u16 = std::env::var("NUTRI_ASSIST_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let generator_timeout_secs: u64 = std::env::var("NUTRI_ASSIST_GEN_TIMEOUT_SECS")
        .unwrap_or_else(|_| "20".to_string())
        .parse()
        .unwrap_or(20);

    let config = BotConfig {
        generator_timeout: Duration::from_secs(generator_timeout_secs),
        ..Default::default()
    };

    let db_path = std::env::var("NUTRI_ASSIST_DB_PATH").unwrap_or_else(|_| config.db_path.clone());

    eprintln!("🥗 {} v{}", config.name, env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", model);
    eprintln!("   Chat API: http://0.0.0.0:{}/api/chat", port);
    eprintln!("   Database: {}\n", db_path);

    // Answer generator
    let generator_config = GeneratorConfig {
        backend: GeneratorBackend::Anthropic,
        api_key: secrecy::SecretString::from(api_key),
        model,
        timeout: config.generator_timeout,
    };
    let generator = create_generator(&generator_config)?;

    // ── Store ────────────────────────────────────────────────────────
    let db_path_ref = std::path::Path::new(&db_path);
    let store: Arc<dyn Store> = Arc::new(LibSqlStore::new_local(db_path_ref).await.unwrap_or_else(
        |e| {
            eprintln!("Error: Failed to open database at {}: {}", db_path, e);
            std::process::exit(1);
        },
    ));

    // ── Engine + routes ─────────────────────────────────────────────
    let engine = Arc::new(ConversationEngine::new(
        Arc::clone(&store),
        generator,
        config.clone(),
    ));

    let app = chat_routes(AppState {
        engine,
        store,
        config,
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}
