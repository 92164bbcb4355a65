use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use chatpipe::application::auth::{StaffAuthority, StandardAuthorizer};
use chatpipe::application::errors::BotError;
use chatpipe::application::interactivity::InteractivityEngine;
use chatpipe::application::messaging::{CommandDispatcher, Handler, Pipe};
use chatpipe::application::services::{default_commands, ChatTracker, FeedbackListener, FEEDBACK_LISTENER};
use chatpipe::domain::entities::{Update, User};
use chatpipe::domain::traits::{AdminRoster, ChatInventory, Messenger, StorageBackend};
use chatpipe::infrastructure::adapters::{ConsoleAdapter, TelegramAdapter};
use chatpipe::infrastructure::config::Config;
use chatpipe::infrastructure::database::Database;
use chatpipe::infrastructure::runner;

#[derive(Parser)]
#[command(name = "chatpipe")]
#[command(about = "Chat bot with command dispatching and persisted conversations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run_bot(&cli.config, cli.token),
        Commands::Version => {
            println!("chatpipe v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(config_path: &str, token_override: Option<String>) -> Result<Config, BotError> {
    let mut config = if Path::new(config_path).exists() {
        Config::load(config_path)?
    } else {
        tracing::info!("{} not found, using defaults and environment", config_path);
        Config::load_env()
    };

    if let Some(token) = token_override {
        config.telegram.token = Some(token);
        config.telegram.enabled = true;
    }

    config.validate()?;
    Ok(config)
}

/// Everything the pipe is built from
struct Wiring {
    messenger: Arc<dyn Messenger>,
    bot_id: i64,
    bot_username: String,
    db: Arc<Database>,
}

fn build_pipe(config: &Config, wiring: Wiring) -> Result<Pipe<Update>, BotError> {
    let Wiring {
        messenger,
        bot_id,
        bot_username,
        db,
    } = wiring;
    let owner = config.bot.owner_id;
    let toggles = &config.default_commands;

    let storage: Arc<dyn StorageBackend> = db.clone();
    let roster: Arc<dyn AdminRoster> = db.clone();
    let inventory: Arc<dyn ChatInventory> = db;

    let mut engine = InteractivityEngine::new(&config.storage.namespace, storage);
    if toggles.feedback {
        engine.register_listener(FEEDBACK_LISTENER, Arc::new(FeedbackListener::new(messenger.clone(), owner)))?;
    }
    let engine = Arc::new(engine);

    let mut authority = StaffAuthority::new(messenger.clone()).with_roster(roster.clone());
    if let Some(owner) = owner {
        authority = authority.with_owner(owner);
    } else {
        tracing::warn!("No bot owner configured, owner-only commands are disabled");
    }
    let authorizer = Arc::new(StandardAuthorizer::new(Arc::new(authority)));

    let mut dispatcher = CommandDispatcher::new(bot_username, messenger.clone(), authorizer);
    if toggles.ping {
        dispatcher.add(default_commands::ping(messenger.clone()))?;
    }
    if toggles.cancel {
        dispatcher.add(default_commands::cancel(messenger.clone(), engine.clone()))?;
    }
    if toggles.feedback {
        dispatcher.add(default_commands::feedback(engine.clone()))?;
    }
    if toggles.promote {
        dispatcher.add(default_commands::promote(messenger.clone(), roster.clone(), owner))?;
    }
    if toggles.demote {
        dispatcher.add(default_commands::demote(messenger.clone(), roster, owner))?;
    }
    // snapshot of the commands above, so it goes last
    if toggles.update_commands {
        let commands = dispatcher.list();
        dispatcher.add(default_commands::update_commands(messenger.clone(), commands))?;
    }
    tracing::info!("Registered {} commands", dispatcher.list().len());

    let mut pipe: Pipe<Update> = Pipe::new();
    pipe.register_handler(Arc::new(ChatTracker::new(inventory, bot_id)));
    pipe.register_handler(Arc::new(dispatcher));
    pipe.register_handler(engine);
    tracing::debug!("Pipe ready with {} handlers", pipe.len());
    Ok(pipe)
}

fn open_database(config: &Config) -> Result<Arc<Database>, BotError> {
    let db = match &config.storage.database_path {
        Some(path) => Database::new(path)?,
        None => Database::open_in_memory()?,
    };
    tracing::info!("Database initialized");
    Ok(Arc::new(db))
}

fn run_bot(config_path: &str, token_override: Option<String>) -> Result<(), BotError> {
    let config = load_config(config_path, token_override)?;
    tracing::info!("Starting chatpipe: {}", config.bot.name);

    let db = open_database(&config)?;
    let rt = tokio::runtime::Runtime::new().map_err(|e| BotError::Internal(e.to_string()))?;

    match config.telegram.token.clone().filter(|_| config.telegram.enabled) {
        Some(token) => {
            // the blocking client must be created and dropped outside the runtime
            let mut bot = TelegramAdapter::new(token, config.telegram.poll_timeout_seconds)?;
            bot.fetch_bot_info()?;
            let info = bot.bot_info();
            tracing::info!("Bot started: @{}", info.username);

            let bot = Arc::new(bot);
            let bot_username = if config.bot.username.is_empty() {
                info.username.clone()
            } else {
                config.bot.username.clone()
            };
            let pipe = build_pipe(
                &config,
                Wiring {
                    messenger: bot.clone(),
                    bot_id: info.id,
                    bot_username,
                    db,
                },
            )?;

            rt.block_on(runner::run_polling(bot.clone(), Arc::new(pipe), config.telegram.poll_timeout_seconds));
            rt.shutdown_timeout(Duration::from_secs(config.telegram.poll_timeout_seconds + 1));
            drop(bot);
        }
        None => {
            let username = if config.bot.username.is_empty() {
                "console".to_string()
            } else {
                config.bot.username.clone()
            };
            let console = Arc::new(ConsoleAdapter::new().without_history().with_username(username.clone()));
            let pipe = build_pipe(
                &config,
                Wiring {
                    messenger: console.clone(),
                    bot_id: console.bot_info().id,
                    bot_username: username,
                    db,
                },
            )?;

            let user = User::new(config.bot.owner_id.unwrap_or(1)).with_username("you");
            let pipe: Arc<dyn Handler<Update>> = Arc::new(pipe);
            rt.block_on(runner::run_console(pipe, user));
            // stdin reader may still be parked on a blocking thread
            rt.shutdown_timeout(Duration::from_secs(1));
        }
    }

    Ok(())
}

fn init_config() -> Result<(), BotError> {
    let yaml = Config::default().to_yaml()?;
    println!("{}", yaml);
    println!("\nSave this to config.yaml and adjust as needed.");
    Ok(())
}
