//! Vigil application binary - composition root.
//!
//! Ties the Vigil crates together into a single executable:
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Build the occurrence store and notification scheduler
//! 3. Wire the detection adapter and monitor loop
//! 4. Run the requested command (`monitor`, `replay` or `classify`)
//!
//! Domain events are printed to stdout as JSON lines. Logs go to stderr.

mod cli;
mod console;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use vigil_alert::{ChannelListener, NotificationScheduler, SchedulerTimings};
use vigil_core::{classify, DomainEvent, VigilConfig};
use vigil_detect::adapter::validate_duration;
use vigil_detect::{DetectionAdapter, DetectionMonitor, RandomSampler, ScriptedDetector};
use vigil_store::OccurrenceStore;

use cli::{CliArgs, Command, ReplayArgs};
use console::{Console, ConsoleCommand};

/// Print every domain event as one JSON line until all senders are gone.
async fn event_printer(mut rx: mpsc::UnboundedReceiver<DomainEvent>) {
    while let Some(event) = rx.recv().await {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!(error = %e, event = event.event_name(), "Failed to encode event"),
        }
    }
}

/// Run the random sampler with live alerts and the operator console.
async fn run_monitor(
    config: &VigilConfig,
    seconds: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(event_printer(rx));

    let store = Arc::new(OccurrenceStore::new());

    let scheduler = if config.notifications.visual {
        let timings = SchedulerTimings::from(&config.notifications);
        tracing::info!(
            auto_dismiss_ms = timings.auto_dismiss.as_millis() as u64,
            exit_delay_ms = timings.exit_delay.as_millis() as u64,
            "Visual notifications enabled"
        );
        Some(Arc::new(NotificationScheduler::with_timings(
            Arc::new(ChannelListener::new(tx.clone())),
            timings,
        )))
    } else {
        tracing::info!("Visual notifications disabled in config");
        None
    };

    let mut adapter = DetectionAdapter::new(Arc::clone(&store)).with_events(tx.clone());
    if let Some(scheduler) = &scheduler {
        adapter = adapter.with_notifications(Arc::clone(scheduler));
    }
    let monitor = Arc::new(DetectionMonitor::new(Arc::new(adapter)).with_events(tx.clone()));
    let console = Console::new(
        Arc::clone(&store),
        scheduler.clone(),
        tx,
        config.review.page_size,
    );

    let mut sampler = RandomSampler::from_config(&config.detection);
    tracing::info!(
        interval_secs = config.detection.interval_secs,
        probability = config.detection.probability,
        categories = config.detection.enabled_categories.len(),
        "Random sampler configured"
    );
    let monitor_task = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move { monitor.run(&mut sampler).await })
    };

    let deadline = async {
        match seconds {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    eprintln!("{}", console::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received, shutting down");
                break;
            }
            _ = &mut deadline => {
                tracing::info!("Time limit reached, shutting down");
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<ConsoleCommand>() {
                    Ok(ConsoleCommand::Quit) => break,
                    Ok(command) => match console.execute(&command) {
                        Ok(reply) => println!("{}", reply),
                        Err(e) => eprintln!("error: {}", e),
                    },
                    Err(e) => eprintln!("error: {}", e),
                },
                Ok(None) => {
                    tracing::debug!("stdin closed; console disabled");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin; console disabled");
                    stdin_open = false;
                }
            },
        }
    }

    monitor.shutdown();
    let stats = monitor_task.await?;
    if let Some(scheduler) = &scheduler {
        scheduler.shutdown();
    }
    tracing::info!(
        received = stats.received,
        accepted = stats.accepted,
        rejected = stats.rejected,
        "Monitor finished"
    );
    println!("{}", console.counts()?);

    // Dropping the last senders lets the printer drain and exit.
    drop(console);
    drop(monitor);
    drop(scheduler);
    printer.await?;
    Ok(())
}

/// Replay recorded detections and print one review page.
async fn run_replay(
    config: &VigilConfig,
    args: &ReplayArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(&args.file)?;
    let mut detector = ScriptedDetector::from_json(&json)?;
    tracing::info!(path = %args.file.display(), events = detector.remaining(), "Replaying detections");

    let store = Arc::new(OccurrenceStore::new());
    let monitor = DetectionMonitor::new(Arc::new(DetectionAdapter::new(Arc::clone(&store))));
    let stats = monitor.run(&mut detector).await;
    if stats.rejected > 0 {
        tracing::warn!(rejected = stats.rejected, "Some detections were rejected");
    }

    let page_size = args.resolve_page_size(config.review.page_size);
    let view = store.view(&args.filters(), args.page, page_size)?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn run_classify(seconds: i64) -> Result<(), Box<dyn std::error::Error>> {
    let severity = classify(validate_duration(seconds)?);
    println!(
        "{} ({}): {}",
        severity.code(),
        severity.label(),
        severity.description()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = VigilConfig::load_or_default(&config_file);

    // Tracing.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Vigil v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    match &args.command {
        Command::Monitor { seconds } => run_monitor(&config, *seconds).await,
        Command::Replay(replay) => run_replay(&config, replay).await,
        Command::Classify { seconds } => run_classify(*seconds),
    }
}
