pub mod bridge;
pub mod config;
pub mod host;
pub mod mqtt;

use crate::bridge::{CommandRouter, QueryTimeouts, ScheduledTask, Scheduler, StatePublisher};
use crate::config::BridgeConfig;
use crate::host::hostname::lookup_hostname;
use crate::host::{AppleScriptMusic, MuteSync, Pmset, PresenceClient};
use crate::mqtt::{Gateway, Namespace};
use color_eyre::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = BridgeConfig::locate()?;
    let config = BridgeConfig::load(&config_path).await?;
    setup_logging(config.log_level()?);
    info!("Loaded config from {}", config_path.display());

    let hostname = match &config.hostname {
        Some(hostname) => hostname.clone(),
        None => lookup_hostname()?,
    };
    let namespace = Namespace::new(&config.app_id, &hostname)?;
    info!("Publishing under {}", namespace);

    // Handlers only need the command sender; the worker starts once we are online.
    let (router, commands) = CommandRouter::channel();
    let mut gateway = Gateway::create(config.gateway_settings(), namespace);
    for (suffix, handler) in router.handlers() {
        gateway.register(suffix, handler);
    }
    let gateway = gateway.connect().await?;

    let presence: Option<Arc<dyn PresenceClient>> = match config.mutesync.token() {
        Some(token) => {
            let client = MuteSync::new(&config.mutesync.ip, config.mutesync.port, token)?;
            info!("Reporting mutesync presence from {}", client.url());
            Some(Arc::new(client))
        }
        None => {
            info!("No mutesync token configured, presence reporting disabled");
            None
        }
    };
    let state = StatePublisher::new(
        gateway.handle()?,
        Arc::new(AppleScriptMusic::new(config.music.player.clone())),
        Arc::new(Pmset::new()?),
        presence,
        QueryTimeouts {
            music: config.music.query_timeout(),
            presence: config.mutesync.query_timeout(),
            battery: config.battery.query_timeout(),
        },
    );
    let _command_worker = commands.spawn(state.clone());

    let shutdown = CancellationToken::new();
    let gateway_task = tokio::spawn(gateway.run(shutdown.clone()));

    let scheduler = Scheduler::new(
        state,
        ScheduledTask::music(config.music.refresh_interval()),
        ScheduledTask::battery(config.battery.refresh_interval()),
        config.battery.on_failure,
    );
    let outcome = tokio::select! {
        result = scheduler.run(shutdown.clone()) => result,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutting down");
            Ok(())
        }
    };

    shutdown.cancel();
    match gateway_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("MQTT gateway stopped with error: {}", e),
        Err(e) => warn!("MQTT gateway task failed: {}", e),
    }
    outcome?;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    Ok(())
}

fn setup_logging(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
