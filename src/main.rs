// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fogbarn

//! FogBarn - Edge-to-Fog Telemetry Reduction
//!
//! Runs the aggregation engine headless. Aggregation and retention ticks are
//! driven by the scheduler; anomalies and device changes are logged as they
//! are published. With `--demo` a simulated greenhouse feeds the engine.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use fogbarn::core::Scheduler;
use fogbarn::sensors::SensorSimulator;
use fogbarn::{Config, Engine, Severity, NAME, VERSION};

/// FogBarn - Edge-to-Fog Telemetry Reduction
#[derive(Parser, Debug)]
#[command(name = "fogbarn")]
#[command(author = "FogBarn Project")]
#[command(version = VERSION)]
#[command(about = "Multi-window sensor aggregation and anomaly detection for edge fleets")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Demo mode with a simulated greenhouse
    #[arg(long)]
    demo: bool,

    /// Override the aggregation interval in seconds
    #[arg(long)]
    aggregation_interval: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::from_level(log_level).into()))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{} - Edge-to-Fog Telemetry Reduction", NAME, VERSION);

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(secs) = args.aggregation_interval {
        config.aggregation.interval_secs = secs;
    }
    config.validate()?;

    info!("Configuration loaded from {:?}", config_path);
    info!("Demo mode: {}", config.demo_mode);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_headless(config))
}

/// Run the engine until Ctrl+C
async fn run_headless(config: Config) -> Result<()> {
    let demo = config.demo_mode.then(|| config.demo.clone());
    let engine = Arc::new(Engine::new(config));
    info!("Core engine initialized");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut handles = Vec::new();

    // Log outbound notifications
    let mut anomalies = engine.event_bus().subscribe_anomalies();
    let mut anomaly_shutdown = shutdown_tx.subscribe();
    handles.push(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(anomaly) = anomalies.recv() => match anomaly.severity {
                    Severity::Critical => warn!("[CRITICAL] {} @ {}", anomaly.message, anomaly.location),
                    severity => info!("[{}] {} @ {}", severity, anomaly.message, anomaly.location),
                },
                _ = anomaly_shutdown.recv() => break,
                else => break,
            }
        }
    }));

    let mut devices = engine.event_bus().subscribe_devices();
    let mut device_shutdown = shutdown_tx.subscribe();
    handles.push(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = devices.recv() => info!("Device {}: {:?}", event.device_id, event.change),
                _ = device_shutdown.recv() => break,
                else => break,
            }
        }
    }));

    // Demo greenhouse
    if let Some(demo) = demo {
        SensorSimulator::register_demo_devices(&engine);

        let engine = Arc::clone(&engine);
        let mut demo_shutdown = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            let mut simulator = SensorSimulator::new(demo.offline_probability);
            let mut ticker = tokio::time::interval(demo.interval());

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        simulator.step(&engine);
                    }
                    _ = demo_shutdown.recv() => {
                        info!("Demo simulator stopped after {} readings", simulator.readings_generated());
                        break;
                    }
                }
            }
        }));
        info!("Demo greenhouse started");
    }

    // Periodic ticks
    let scheduler = Scheduler::new();
    engine.schedule(&scheduler).await;
    handles.extend(scheduler.start(&shutdown_tx).await);

    info!("🚀 {} running", NAME);
    info!("   Press Ctrl+C to shutdown");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received, cleaning up...");
    let _ = shutdown_tx.send(());

    for handle in handles {
        let _ = handle.await;
    }

    let stats = engine.stats();
    info!(
        "{} shutdown complete: {} readings, {} aggregates, {} anomalies",
        NAME, stats.readings_ingested, stats.aggregates_produced, stats.anomalies_emitted
    );

    Ok(())
}
