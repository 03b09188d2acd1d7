use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use luna::config::LunaConfig;
use luna::engine::select::Selector;
use luna::engine::RuleEngine;
use luna::llm_client::GenerativeClient;
use luna::orchestrator::Orchestrator;
use luna::server::{self, ServerState};
use luna::sessions::SessionStore;
use luna::store::UserStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,luna=debug")),
        )
        .init();

    tracing::info!("Luna starting...");

    let config = Arc::new(LunaConfig::load());
    if config.gemini_api_key.is_none() {
        tracing::warn!("No Gemini API key configured; running on the rule engine only");
    }

    let selector = match config.selector_seed {
        Some(seed) => Selector::seeded(seed),
        None => Selector::from_entropy(),
    };
    let orchestrator = Arc::new(Orchestrator::new(
        RuleEngine::new(selector),
        Arc::new(GenerativeClient::new(&config)),
        config.clone(),
    ));

    let sessions = Arc::new(SessionStore::load(config.sessions_path())?);
    tracing::info!("Session data at {:?}", config.sessions_path());

    let state = ServerState {
        orchestrator,
        users: Arc::new(UserStore::new()),
        sessions,
        config,
    };

    server::serve(state).await
}
