use anyhow::Result;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing_subscriber::EnvFilter;

mod commands;
mod i18n;
mod services;
mod session;
mod state;

// Initialize i18n at crate root (required by rust-i18n)
rust_i18n::i18n!("locales", fallback = "en");

use crate::commands::{
    handle_admin_add_balance, handle_admin_grant_uses, handle_callback, handle_help, handle_me, handle_message,
    handle_prefs, handle_start, handle_version, Command,
};
use crate::state::AppState;

fn schema() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    let admin_commands = dptree::filter(|msg: Message, state: Arc<AppState>| {
        msg.from
            .as_ref()
            .is_some_and(|user| state.config.is_admin(user.id.0 as i64))
    })
    .branch(case![Command::AdminAddBalance(args)].endpoint(handle_admin_add_balance))
    .branch(case![Command::AdminGrantUses(args)].endpoint(handle_admin_grant_uses));

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start(payload)].endpoint(handle_start))
        .branch(case![Command::Help].endpoint(handle_help))
        .branch(case![Command::Me].endpoint(handle_me))
        .branch(case![Command::Prefs(args)].endpoint(handle_prefs))
        .branch(case![Command::Version].endpoint(handle_version))
        .branch(admin_commands);

    // Commands that matched no branch (admin commands from non-admins) fall
    // through to the plain message handler.
    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(dptree::endpoint(handle_message));

    let callback_query_handler = Update::filter_callback_query().endpoint(handle_callback);

    dptree::entry()
        .branch(message_handler)
        .branch(callback_query_handler)
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting SniperLM bot...");

    let app_state = Arc::new(AppState::new().await?);
    tracing::info!(
        "AppState initialized (storage: {:?}, admins: {})",
        app_state.config.storage_backend,
        app_state.config.admin_ids.len()
    );

    let bot = Bot::new(&app_state.config.bot_token);
    tracing::info!("Bot created");

    let mut dispatcher = Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![app_state.clone()])
        .enable_ctrlc_handler()
        .build();

    tracing::info!("Bot is running and waiting for updates...");
    dispatcher.dispatch().await;

    Ok(())
}
