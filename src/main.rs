use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

mod domain;
mod application;
mod infrastructure;
#[cfg(test)]
mod test_support;

use application::errors::{BotError, PlatformError};
use application::services::{
    AdminPolicy, AutoresponderService, ChannelPoller, CommandService, DehoistService, IntervalService,
    MessageService,
};
use application::sticky::StickyService;
use domain::traits::{AutoresponderStore, ChatPlatform, ImageSource, IntervalStore, StickyStore};
use infrastructure::adapters::console::ConsoleAdapter;
use infrastructure::adapters::discord::DiscordAdapter;
use infrastructure::config::Config;
use infrastructure::database::Database;
use infrastructure::images::HttpImageSource;
use infrastructure::storage::MemoryStore;

/// Messages fetched per channel per poll
const POLL_BATCH: u8 = 50;

#[derive(Parser)]
#[command(name = "stickybot")]
#[command(about = "Keeps a pinned-style message at the bottom of busy channels", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Discord bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run {
        /// Keep stickies in memory only
        #[arg(long)]
        memory: bool,
    },
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
    /// List stored stickies
    List,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { memory } => run_bot(&cli.config, cli.token, memory),
        Commands::Version => {
            println!("stickybot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(),
        Commands::List => list_stickies(&cli.config),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(config_path: &str, token_override: Option<String>) -> Result<Config, BotError> {
    let mut config = if std::path::Path::new(config_path).exists() {
        let mut config = Config::load(config_path)?;
        config.apply_env();
        config
    } else {
        tracing::info!("No config at {}, using defaults and environment", config_path);
        Config::load_env()
    };

    if let Some(token) = token_override {
        config.discord.token = Some(token);
        config.discord.enabled = true;
    }

    config.validate()?;
    Ok(config)
}

fn runtime() -> Result<tokio::runtime::Runtime, BotError> {
    tokio::runtime::Runtime::new().map_err(|e| BotError::Internal(format!("Failed to start runtime: {}", e)))
}

struct Stores {
    stickies: Arc<dyn StickyStore>,
    responders: Arc<dyn AutoresponderStore>,
    intervals: Arc<dyn IntervalStore>,
}

impl Stores {
    fn shared<S>(store: Arc<S>) -> Self
    where
        S: StickyStore + AutoresponderStore + IntervalStore + 'static,
    {
        Self {
            stickies: store.clone(),
            responders: store.clone(),
            intervals: store,
        }
    }
}

/// Open SQLite, falling back to memory if it cannot be used
fn open_stores(config: &Config, memory: bool) -> Stores {
    if !memory {
        match Database::new(&config.database.path) {
            Ok(db) => {
                tracing::info!("Database initialized at {}", config.database.path.display());
                return Stores::shared(Arc::new(db));
            }
            Err(e) => {
                tracing::error!("Failed to initialize database: {}, stickies will not survive a restart", e);
            }
        }
    }

    Stores::shared(Arc::new(MemoryStore::new()))
}

struct Services {
    stickies: Arc<StickyService>,
    intervals: Arc<IntervalService>,
    watcher: MessageService,
}

async fn build_services(
    config: &Config,
    platform: Arc<dyn ChatPlatform>,
    policy: AdminPolicy,
    memory: bool,
) -> Result<Services, BotError> {
    let stores = open_stores(config, memory);
    let images: Arc<dyn ImageSource> = Arc::new(HttpImageSource::new(
        config.intervals.image_url.clone(),
        Duration::from_secs(config.discord.request_timeout_seconds),
    )?);

    let stickies = Arc::new(
        StickyService::new(stores.stickies, Arc::clone(&platform))
            .with_warning_text(config.sticky.warning_text.clone()),
    );
    let responders = Arc::new(AutoresponderService::new(stores.responders));
    let intervals = Arc::new(
        IntervalService::new(stores.intervals, Arc::clone(&platform), images)
            .with_caption(config.intervals.caption.clone())
            .with_min_interval_minutes(config.intervals.min_interval_minutes),
    );

    let sticky_count = stickies.load().await;
    let responder_count = responders.load().await;
    let interval_count = intervals.load().await;
    tracing::info!(
        "Loaded {} stickies, {} autoresponders and {} interval posts",
        sticky_count,
        responder_count,
        interval_count
    );

    let commands = CommandService::new(
        Arc::clone(&stickies),
        Arc::clone(&responders),
        Arc::clone(&intervals),
        policy,
        &config.bot.prefix,
    )
    .with_default_cooldown(config.sticky.default_cooldown_seconds);

    let watcher = MessageService::new(
        platform,
        Arc::clone(&stickies),
        commands,
        responders,
        &config.bot.prefix,
    );

    Ok(Services {
        stickies,
        intervals,
        watcher,
    })
}

fn run_bot(config_path: &str, token_override: Option<String>, memory: bool) -> Result<(), BotError> {
    let config = load_config(config_path, token_override)?;
    tracing::info!("Starting {}", config.bot.name);

    let rt = runtime()?;
    rt.block_on(async {
        if config.discord.enabled {
            let mut bot = DiscordAdapter::new(&config.discord)?;
            bot.fetch_bot_info().await?;
            let info = bot.bot_info();
            tracing::info!("Bot started: {} ({})", info.username, info.id);

            let platform: Arc<dyn ChatPlatform> = Arc::new(bot);
            let services = build_services(&config, Arc::clone(&platform), config.admin_policy(), memory).await?;
            run_discord_bot(&config, platform, services).await;
        } else {
            let bot = Arc::new(ConsoleAdapter::new());
            let platform: Arc<dyn ChatPlatform> = bot.clone();
            // The local operator owns the console session
            let services = build_services(&config, platform, AdminPolicy::allow_all(), memory).await?;
            run_console_bot(bot, services).await;
        }
        Ok::<(), BotError>(())
    })
}

/// Channels to poll: configured watch list plus every sticky and interval channel
async fn polled_channels(config: &Config, services: &Services) -> BTreeSet<(String, String)> {
    let mut channels: BTreeSet<(String, String)> = config
        .discord
        .watch_channels
        .iter()
        .map(|w| (w.guild_id.clone(), w.channel_id.clone()))
        .collect();
    channels.extend(services.stickies.registry().channels().await);
    channels.extend(
        services
            .intervals
            .active()
            .await
            .into_iter()
            .map(|post| (post.guild_id, post.channel_id)),
    );
    channels
}

/// Periodically dehoist members of every guild the bot is working in
fn spawn_dehoist_sweeper(config: &Config, platform: Arc<dyn ChatPlatform>, services: &Services) {
    if !config.dehoist.enabled {
        return;
    }

    let dehoist = DehoistService::new(platform);
    let stickies = Arc::clone(&services.stickies);
    let intervals = Arc::clone(&services.intervals);
    let watched: BTreeSet<String> = config.discord.watch_channels.iter().map(|w| w.guild_id.clone()).collect();
    let period = Duration::from_secs(config.dehoist.sweep_interval_seconds);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;

            let mut guilds = watched.clone();
            guilds.extend(stickies.registry().channels().await.into_iter().map(|(guild, _)| guild));
            guilds.extend(intervals.active().await.into_iter().map(|post| post.guild_id));

            for guild_id in guilds.iter().filter(|g| !g.is_empty()) {
                if let Err(e) = dehoist.sweep(guild_id).await {
                    tracing::warn!("Dehoist sweep of {} failed: {}", guild_id, e);
                }
            }
        }
    });
}

async fn run_discord_bot(config: &Config, platform: Arc<dyn ChatPlatform>, services: Services) {
    let interval = Duration::from_secs(config.discord.poll_interval_seconds);
    let mut poller = ChannelPoller::new(POLL_BATCH);

    tracing::info!(
        "Starting message loop ({} sticky channels, {} watched)",
        services.stickies.registry().count().await,
        config.discord.watch_channels.len()
    );
    spawn_dehoist_sweeper(config, Arc::clone(&platform), &services);

    loop {
        for (guild_id, channel_id) in polled_channels(config, &services).await {
            let messages = match poller.poll(platform.as_ref(), &channel_id).await {
                Ok(messages) => messages,
                Err(PlatformError::RateLimited { retry_after_ms }) => {
                    tracing::warn!("Rate limited polling {}, backing off {}ms", channel_id, retry_after_ms);
                    tokio::time::sleep(Duration::from_millis(retry_after_ms)).await;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Failed to poll channel {}: {}", channel_id, e);
                    continue;
                }
            };

            if !messages.is_empty() {
                tracing::debug!("Received {} messages in {}", messages.len(), channel_id);
            }
            for mut message in messages {
                if message.guild_id.is_none() {
                    message.guild_id = Some(guild_id.clone());
                }
                services.watcher.handle(message).await;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                return;
            }
        }
    }
}

async fn run_console_bot(bot: Arc<ConsoleAdapter>, services: Services) {
    let info = bot.bot_info();
    tracing::info!("Bot started: @{} (console mode, type messages below)", info.username);

    while let Some(message) = bot.next_message().await {
        if message.content.is_empty() {
            continue;
        }
        if let Some(task) = services.watcher.handle(message).await {
            // Keep console output in order
            if let Err(e) = task.await {
                tracing::error!("Sticky task failed: {}", e);
            }
        }
    }
}

fn list_stickies(config_path: &str) -> Result<(), BotError> {
    let config = load_config(config_path, None)?;
    let db = Database::new(&config.database.path)?;

    let rt = runtime()?;
    let stickies = rt.block_on(db.load_stickies())?;

    if stickies.is_empty() {
        println!("No stickied messages.");
        return Ok(());
    }
    for sticky in stickies {
        println!(
            "guild {} channel {} (cooldown {}s, warning {}): {}",
            sticky.guild_id,
            sticky.channel_id,
            sticky.cooldown_ms / 1000,
            if sticky.include_warning { "on" } else { "off" },
            sticky.content.replace('\n', " ")
        );
    }
    Ok(())
}

fn init_config() -> Result<(), BotError> {
    let yaml = Config::default().to_yaml()?;
    println!("{}", yaml);
    println!("\nSave this to config.yaml and adjust as needed.");
    Ok(())
}
