//! Entry point for the `sandwich` daemon binary.
//!
//! Configuration is read entirely from the environment; there is no
//! on-disk config file format. A single manager is started here for the
//! token in `DISCORD_TOKEN`, running every shard `/gateway/bot`
//! recommends, publishing through an in-process `LocalProducer`. Swap in
//! a different `Producer` implementation to ship events elsewhere.

use sandwich_gateway::{Manager, ManagerConfig};
use sandwich_model::Intents;
use sandwich_producer::LocalProducer;
use sandwich_rs::Sandwich;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn intents_from_env() -> Intents {
    match std::env::var("SANDWICH_INTENTS") {
        Ok(raw) => raw
            .split('|')
            .filter_map(|name| match name.trim() {
                "GUILDS" => Some(Intents::GUILDS),
                "GUILD_MEMBERS" => Some(Intents::GUILD_MEMBERS),
                "GUILD_BANS" => Some(Intents::GUILD_BANS),
                "GUILD_EMOJIS" => Some(Intents::GUILD_EMOJIS),
                "GUILD_INTEGRATIONS" => Some(Intents::GUILD_INTEGRATIONS),
                "GUILD_WEBHOOKS" => Some(Intents::GUILD_WEBHOOKS),
                "GUILD_INVITES" => Some(Intents::GUILD_INVITES),
                "GUILD_VOICE_STATES" => Some(Intents::GUILD_VOICE_STATES),
                "GUILD_PRESENCES" => Some(Intents::GUILD_PRESENCES),
                "GUILD_MESSAGES" => Some(Intents::GUILD_MESSAGES),
                "GUILD_MESSAGE_REACTIONS" => Some(Intents::GUILD_MESSAGE_REACTIONS),
                "GUILD_MESSAGE_TYPING" => Some(Intents::GUILD_MESSAGE_TYPING),
                "DIRECT_MESSAGES" => Some(Intents::DIRECT_MESSAGES),
                "DIRECT_MESSAGE_REACTIONS" => Some(Intents::DIRECT_MESSAGE_REACTIONS),
                "DIRECT_MESSAGE_TYPING" => Some(Intents::DIRECT_MESSAGE_TYPING),
                "" => None,
                other => {
                    tracing::warn!(intent = other, "unrecognized intent name, ignoring");
                    None
                }
            })
            .fold(Intents::empty(), |acc, i| acc | i),
        Err(_) => Intents::NON_PRIVILEGED,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let token = std::env::var("DISCORD_TOKEN").expect("DISCORD_TOKEN must be set");
    let intents = intents_from_env();
    let chunk_guilds_on_startup = std::env::var("SANDWICH_CHUNK_GUILDS_ON_STARTUP")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let mut manager_config = ManagerConfig::new(intents);
    manager_config.chunk_guilds_on_startup = chunk_guilds_on_startup;

    let sandwich = Sandwich::new(sandwich_state::CacheConfig::default());
    let producer = Arc::new(LocalProducer::new(Default::default()));

    let manager = Arc::new(Manager::new(
        "main",
        token,
        manager_config,
        sandwich.state().clone(),
        producer,
        "sandwich",
    )?);

    sandwich.register_manager(manager.clone())?;

    info!("connecting to the gateway");
    manager.initialize(false).await?;
    info!(guilds = manager.total_guild_count(), "ready");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    sandwich.close_all().await;

    Ok(())
}
