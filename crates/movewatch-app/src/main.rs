// movewatch entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Build the evaluator and publisher
// 4. Spawn the board-feed WebSocket server task
// 5. Install the Ctrl+C handler
// 6. Run one monitoring session
// 7. Cleanup on exit

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use movewatch_app::board_feed::WsPositionSource;
use movewatch_app::monitor::Monitor;
use movewatch_app::publisher::ChatPublisher;
use movewatch_core::capability::Publisher;
use movewatch_core::{config, ws_server};
use movewatch_eval::CloudEvaluator;

/// Log directives used when `RUST_LOG` is unset. The binary logs under its
/// own crate name, `movewatch`, separately from the library crates.
const DEFAULT_LOG_FILTER: &str =
    "movewatch=info,movewatch_app=info,movewatch_core=info,movewatch_eval=info,warn";

/// Board-feed events buffered between ticks. The monitor drains the queue
/// once per tick; heartbeats are dropped by the server when it is full.
const FEED_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("movewatch starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    let settings = config.monitor_settings();
    info!(
        "Config loaded: {} ticks every {}s, evaluator at {}",
        settings.tick_count, config.monitor.tick_interval_seconds, config.evaluator.base_url
    );

    // 3. Collaborators
    let evaluator = CloudEvaluator::from_config(&config);
    let publisher = ChatPublisher::from_config(&config);
    match &publisher {
        ChatPublisher::Webhook(_) => info!("Publishing to chat webhook"),
        ChatPublisher::Disabled => info!("Publisher disabled (no webhook configured)"),
    }

    // 4. Board feed
    let (feed_tx, feed_rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
    let listener = ws_server::bind(config.ws_port)
        .await
        .with_context(|| format!("failed to bind board feed on port {}", config.ws_port))?;
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_server::run(listener, feed_tx).await {
            error!("Board feed server error: {}", e);
        }
    });

    // 5. Ctrl+C ends the session after the current tick
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received");
            let _ = shutdown_tx.send(true);
        }
    });

    // 6. Monitoring session
    let started = chrono::Utc::now();
    let caption = format!(
        "{} ({})",
        config.publisher.video_caption,
        started.format("%Y-%m-%d %H:%M UTC")
    );
    let mut monitor = Monitor::new(WsPositionSource::new(feed_rx), evaluator, publisher, settings)
        .with_video_caption(caption.clone())
        .with_shutdown(shutdown_rx);

    let outcome = monitor.run().await;

    // 7. Cleanup
    ws_handle.abort();

    match outcome {
        Ok(report) => {
            info!(
                "Session complete: {} annotations over {} moves",
                report.annotations, report.accepted_moves
            );
            Ok(())
        }
        Err(e) => {
            error!("{e}");
            if let Some(path) = &e.artifact {
                let aborted = format!("Session aborted: {caption}");
                if let Err(upload) = monitor.publisher().post_file(&aborted, path).await {
                    error!("Failed to upload video after abort: {upload}");
                }
            }
            Err(e.into())
        }
    }
}

/// Initialize tracing to log to `logs/movewatch.log`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("movewatch.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn default_filter_keeps_startup_logs() {
        let subscriber = tracing_subscriber::fmt::Subscriber::builder()
            .with_env_filter(EnvFilter::new(DEFAULT_LOG_FILTER))
            .with_writer(std::io::sink)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            // Same crate, and so same target prefix, as the logs in `main`.
            assert!(module_path!().starts_with("movewatch::"));
            assert!(tracing::enabled!(Level::INFO));
            assert!(!tracing::enabled!(Level::DEBUG));

            assert!(tracing::enabled!(target: "movewatch_app::monitor", Level::INFO));
            assert!(tracing::enabled!(target: "movewatch_eval::client", Level::WARN));
            assert!(!tracing::enabled!(target: "hyper::proto", Level::INFO));
            assert!(tracing::enabled!(target: "hyper::proto", Level::WARN));
        });
    }
}
