//! Punisher Bot - Main Entry Point
//!
//! Tracks daily intern standups in a Telegram chat and punishes the interns
//! who skip them.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::{RwLock, mpsc, watch};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use punisher_bot::commands::CommandHandler;
use punisher_bot::config::{BotSettings, StandupRules, TelegramConfig};
use punisher_bot::ingest::{UpdateHandler, UpdatePoller};
use punisher_bot::punish::{HttpLinkChecker, PoetryLinkGenerator, Punisher};
use punisher_bot::scheduler::{
    ComplianceSweeper, DailyScheduler, PersistentState, SchedulerMessage, SchedulerState,
    SweepError, SystemClock,
};
use punisher_bot::standup::StandupClassifier;
use punisher_bot::storage::{self, MySqlStorage};
use punisher_bot::telegram::TelegramBot;

/// Per-request timeout when checking poetry links.
const POETRY_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Telegram bot that punishes interns for missed standups.
#[derive(Parser, Debug)]
#[command(name = "punisher_bot")]
#[command(about = "Track intern standups and punish the ones who skip them")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run one compliance sweep and exit.
    #[arg(long)]
    sweep_now: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;
    let settings =
        BotSettings::from_env().context("Failed to load bot settings from environment")?;

    let rules = load_rules(&settings)?;
    info!(
        "Standup policy: {} (tag {:?}, {} keyword groups)",
        rules.policy,
        rules.tag,
        rules.keyword_groups.len()
    );

    let pool = storage::connect(&settings.database_url)
        .await
        .context("Failed to connect to the database")?;
    storage::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    let store = Arc::new(MySqlStorage::new(pool));

    let bot = Arc::new(
        TelegramBot::connect(&tg_config)
            .await
            .context("Failed to connect to Telegram")?,
    );

    let clock = Arc::new(SystemClock);
    let checker = HttpLinkChecker::new(POETRY_CHECK_TIMEOUT)
        .context("Failed to build the poetry link checker")?;
    let poetry = PoetryLinkGenerator::new(Arc::new(checker), settings.poetry_attempts);

    let punisher = Arc::new(
        Punisher::new(
            store.clone(),
            bot.clone(),
            settings.interns_chat_id,
            settings.punishment,
            poetry,
        )
        .with_exercise_range(settings.exercise_range),
    );
    info!("Punishment policy: {}", settings.punishment);

    let sweeper = Arc::new(ComplianceSweeper::new(
        store.clone(),
        store.clone(),
        Arc::clone(&punisher),
        bot.clone(),
        settings.interns_chat_id,
        settings.timezone,
        clock.clone(),
    ));

    if args.sweep_now {
        return match sweeper.run_daily_check().await {
            Ok(summary) => {
                info!("Sweep finished: {}", summary);
                Ok(())
            }
            Err(SweepError::DayOff) => {
                info!("Day off, nothing to do");
                Ok(())
            }
            Err(e) => Err(e).context("Sweep failed"),
        };
    }

    let state = Arc::new(RwLock::new(SchedulerState::from_persistent(
        &PersistentState::load(&settings.state_path),
    )));

    let (scheduler_tx, scheduler_rx) = mpsc::channel::<SchedulerMessage>(32);

    let scheduler = DailyScheduler::new(
        sweeper,
        Arc::clone(&state),
        settings.state_path.clone(),
        settings.punish_time,
        settings.timezone,
        clock.clone(),
    );

    let mut handler = UpdateHandler::new(
        StandupClassifier::new(rules),
        store.clone(),
        store.clone(),
        bot.clone(),
        clock,
    )
    .with_mentors_chat(settings.mentors_destination())
    .with_scheduler(scheduler_tx.clone());

    match (settings.require_mention, bot.handle()) {
        (true, Some(handle)) => {
            info!("Admin commands enabled with prefix {}", handle);
            handler = handler.with_commands(CommandHandler::new(
                handle,
                store.clone(),
                punisher,
                bot.clone(),
                Arc::clone(&state),
                settings.initial_lives,
            ));
        }
        (true, None) => warn!("Bot account has no username, admin commands disabled"),
        (false, _) => info!("Admin commands disabled"),
    }

    let mut poller = UpdatePoller::new(bot.clone(), handler);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    info!("Starting punisher bot...");

    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_rx).await;
    });
    let poller_handle = tokio::spawn(async move {
        poller.run(shutdown_rx).await;
    });

    info!("Bot is running. Use Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Received Ctrl+C, shutting down...");

    let _ = shutdown_tx.send(true);
    let _ = scheduler_tx.send(SchedulerMessage::Shutdown).await;
    let _ = poller_handle.await;
    let _ = scheduler_handle.await;

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the classifier rules and applies the policy override.
fn load_rules(settings: &BotSettings) -> Result<StandupRules> {
    let mut rules = match &settings.standup_rules_path {
        Some(path) => StandupRules::load_from_file(path)
            .with_context(|| format!("Failed to load standup rules from {}", path.display()))?,
        None => StandupRules::default(),
    };

    if let Some(policy) = settings.standup_policy {
        rules.policy = policy;
    }

    rules
        .validate()
        .context("Standup rules validation failed")?;

    Ok(rules)
}
