use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;

use hookbot::bot::{self, App, Registry};
use hookbot::config::BotConfig;
use hookbot::db::Database;
use hookbot::localization::init_localization;
use hookbot::modules::default_modules;
use hookbot::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = BotConfig::from_env()?;
    init_tracing(config.log_format)?;

    info!("Starting hookbot");

    init_localization().context("Failed to load messages")?;

    info!(path = %config.database_path.display(), "Opening database");
    let db = Database::open(&config.database_path).await?;

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let registry = Registry::new(default_modules(http)).context("Invalid module registration")?;

    let bot = Bot::new(&config.bot_token);
    bot.set_my_commands(registry.bot_commands())
        .await
        .context("Failed to register bot commands")?;

    let app = Arc::new(App::new(registry, db, config.reset_command));

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(bot::message_handler))
        .branch(Update::filter_callback_query().endpoint(bot::callback_handler));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
