use std::collections::HashSet;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use tallybot::cli::{self, Cli, Command, ConfigCommand};
use tallybot::commands::Dispatcher;
use tallybot::config;
use tallybot::gateway::slack::{SlackApiConfig, SlackGateway};
use tallybot::gateway::{DynMessaging, DynReactions};
use tallybot::lists::FileListStore;
use tallybot::logging;
use tallybot::server::{self, AppState};
use tallybot::vote::{OptionSource, SessionTuning, VoteSession};

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        None | Some(Command::Start) => run(cli.config.as_deref()),
        Some(Command::Config(ConfigCommand::Show)) => {
            cli::handle_config_show(cli.config.as_deref())
        }
        Some(Command::Config(ConfigCommand::Path)) => {
            cli::handle_config_path(cli.config.as_deref());
            Ok(())
        }
        Some(Command::Version) => {
            cli::handle_version();
            Ok(())
        }
    }
}

#[tokio::main]
async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let cfg = config::load(config_path)?;
    logging::init(&cfg.logging);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting tallybot");

    let gateway = Arc::new(SlackGateway::new(SlackApiConfig {
        bot_token: cfg.slack.bot_token.clone(),
        api_base: cfg.slack.api_base.clone(),
        timeout_secs: cfg.slack.timeout_secs,
    }));

    // Knowing our own user id lets the dispatcher drop our own messages
    // instead of parsing them as commands.
    let self_id = match gateway.auth_test().await {
        Ok(id) => {
            info!(user_id = %id, "Authenticated with Slack");
            Some(id)
        }
        Err(e) => {
            warn!(error = %e, "auth.test failed; own messages will not be filtered");
            None
        }
    };

    let admins: Arc<HashSet<String>> = Arc::new(cfg.vote.admins.iter().cloned().collect());

    let messaging: DynMessaging = gateway.clone();
    let reactions: DynReactions = gateway.clone();

    let options = OptionSource::new(Arc::new(FileListStore::new(&cfg.vote.lists_dir)));

    let tuning = SessionTuning {
        max_timer_secs: cfg.vote.max_timer_secs,
        default_duration_secs: cfg.vote.default_duration_secs,
        default_top_n: cfg.vote.default_top_n,
        options_settle: Duration::from_millis(cfg.vote.options_settle_ms),
        countdown_settle: Duration::from_millis(cfg.vote.countdown_settle_ms),
        admins: admins.clone(),
    };

    let session = Arc::new(VoteSession::new(
        tuning,
        messaging.clone(),
        reactions,
        options,
    ));

    let dispatcher = Arc::new(Dispatcher::new(
        session,
        messaging,
        admins,
        cfg.vote.broadcast_channels.clone(),
        self_id,
    ));

    let state = AppState {
        dispatcher,
        signing_secret: cfg.slack.signing_secret.clone(),
    };

    let listener = TcpListener::bind(&cfg.server.bind).await?;
    info!(address = %cfg.server.bind, "Listening for Slack events");

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
