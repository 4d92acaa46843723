//! The `giveaway-server` binary.
//!
//! Configuration is read from `giveaway.toml` (or the file named by
//! `GIVEAWAY_CONFIG`), then `GIVEAWAY__SECTION__KEY` environment overrides,
//! with a `.env` file loaded first when present.

use std::sync::Arc;

use anyhow::Context;
use giveaway_actions::register_all;
use giveaway_config::ConfigLoader;
use giveaway_procedure::{Environment, ProcedureRegistry, TagCache};
use giveaway_server::{Server, TokenSessions};
use giveaway_store::{MemoryStore, Store};
use giveaway_telemetry::init_telemetry;

const DEFAULT_CONFIG_FILE: &str = "giveaway.toml";
const CONFIG_FILE_VAR: &str = "GIVEAWAY_CONFIG";
const ENV_PREFIX: &str = "GIVEAWAY";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loader = ConfigLoader::new().with_dotenv();
    let config_file =
        std::env::var(CONFIG_FILE_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let config = loader
        .with_optional_file(&config_file)
        .with_context(|| format!("failed to read {config_file}"))?
        .with_env_prefix(ENV_PREFIX)
        .load()
        .context("invalid configuration")?;

    init_telemetry(&config.telemetry()).context("failed to initialise telemetry")?;

    let sessions = TokenSessions::from_config(&config.sessions);
    if sessions.is_empty() {
        tracing::warn!("no session tokens configured, only public procedures will succeed");
    }

    let db: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let env = Environment::builder(db)
        .sessions(Arc::new(sessions))
        .cache(Arc::new(TagCache::new(config.cache.clone())))
        .build();

    let mut registry = ProcedureRegistry::new();
    register_all(&mut registry);

    Server::builder()
        .config(config.server.clone())
        .token_header(config.sessions.token_header.clone())
        .registry(registry)
        .environment(env)
        .build()?
        .run()
        .await?;

    Ok(())
}
