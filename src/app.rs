//! Entry point for running the bot in your own process.
//!
//! ```no_run
//! use picguessr_core::{app, config::{Config, SharedConfig}};
//!
//! # async fn start(config: Config) {
//! app::run(SharedConfig::new(config)).await;
//! # }
//! ```

use anyhow::Error;
use teloxide::{prelude::*, types::MenuButton};

use crate::{
    config::{Config, SharedConfig},
    database::{DatabaseManager, FileDatabaseProvider},
    dispatcher::build_dispatcher,
    module_mgr::ModuleManager,
    modules::{games::Games, openai::OpenAI, scores::Scores},
    types::HandlerResult,
};

async fn update_menu(bot: Bot, module_mgr: &ModuleManager) -> HandlerResult {
    let mut commands = vec![];
    module_mgr.with_all_modules(|m| commands.extend(m.commands().into_iter()));
    bot.set_my_commands(commands).await?;
    Ok(())
}

async fn init_bot(config: &Config, module_mgr: &ModuleManager) -> Result<Bot, Error> {
    let bot = Bot::new(&config.telegram_bot_token);
    bot.set_chat_menu_button()
        .menu_button(MenuButton::Commands)
        .await?;
    update_menu(bot.clone(), module_mgr).await?;
    Ok(bot)
}

/// Serves the bot until it receives Ctrl-C.
pub async fn run(config: SharedConfig) {
    let database_path = config.score_database_path();
    debug!("Opening score database at {}...", database_path.display());
    let db_mgr =
        match DatabaseManager::with_db_provider(FileDatabaseProvider::new(&database_path)) {
            Ok(db_mgr) => db_mgr,
            Err(err) => {
                error!("Failed to open the score database: {}", err);
                return;
            }
        };

    debug!("Initializing modules...");
    let mut module_mgr = ModuleManager::new();
    module_mgr.register_module(crate::modules::config::Config::new(config.clone()));
    module_mgr.register_module(OpenAI);
    // Registered before the games so "/score" sent as a reply is not a guess.
    module_mgr.register_module(Scores::new(db_mgr));
    module_mgr.register_module(Games);

    info!("Initializing bot...");
    let bot = match init_bot(&config, &module_mgr).await {
        Ok(bot) => bot,
        Err(err) => {
            error!("Failed to init bot: {}", err);
            return;
        }
    };

    info!("Loading game content...");
    let mut built_dispatcher = match build_dispatcher(bot, module_mgr).await {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            error!("Failed to init modules: {}", err);
            return;
        }
    };
    info!("Bot is started!");
    built_dispatcher.dispatch().await;
}
