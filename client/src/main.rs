use clap::Parser;
use client::network::{Client, ClientSettings, View};
use client::reconciler::Interpolation;
use client::walker::RandomWalker;
use log::{info, warn};
use shared::{Position, DEFAULT_SPAWN_X, DEFAULT_SPAWN_Y, MOVEMENT_SEND_INTERVAL_MS};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, sleep, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless random-walk client", long_about = None)]
struct Args {
    /// WebSocket URL of the relay server
    #[arg(short = 's', long, env = "SYNC_SERVER_URL", default_value = "ws://127.0.0.1:3000")]
    server: String,

    /// Local simulation rate in Hz
    #[arg(short = 't', long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=1000))]
    tick_rate: u32,

    /// Minimum milliseconds between movement updates
    #[arg(long, default_value_t = MOVEMENT_SEND_INTERVAL_MS)]
    send_interval: u64,

    /// Remote actor smoothing: snap, linear[:speed] or exponential[:rate]
    #[arg(short = 'i', long, default_value = "exponential:12")]
    interpolation: Interpolation,

    /// Seed for the random walk
    #[arg(long)]
    seed: Option<u64>,

    /// Disconnect after this many seconds (runs until Ctrl+C otherwise)
    #[arg(short = 'd', long)]
    duration: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    info!("Starting headless client (seed {})", seed);
    info!(
        "Simulating at {}Hz, sending at most every {}ms, interpolation {}",
        args.tick_rate, args.send_interval, args.interpolation
    );

    let settings = ClientSettings {
        send_interval: Duration::from_millis(args.send_interval),
        interpolation: args.interpolation,
        ..ClientSettings::default()
    };
    let client = Client::connect(&args.server, settings).await?;

    let (intent_tx, intent_rx) = mpsc::channel(64);
    let (view_tx, mut view_rx) = watch::channel(View::new());

    let tick = Duration::from_secs_f64(1.0 / args.tick_rate as f64);
    let run_for = args.duration.map(Duration::from_secs);
    tokio::spawn(async move {
        let mut walker = RandomWalker::new(Position::new(DEFAULT_SPAWN_X, DEFAULT_SPAWN_Y), seed);
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let deadline = async {
            match run_for {
                Some(limit) => sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let intent = walker.step(tick.as_secs_f32());
                    if intent_tx.send(intent).await.is_err() {
                        break;
                    }
                }
                _ = &mut deadline => {
                    info!("Run time elapsed");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, disconnecting");
                    break;
                }
            }
        }
    });

    tokio::spawn(async move {
        let mut last_count = None;
        loop {
            sleep(Duration::from_secs(5)).await;
            if view_rx.has_changed().is_err() {
                break;
            }
            let count = view_rx.borrow_and_update().len();
            if last_count != Some(count) {
                info!("{} other actors in view", count);
                last_count = Some(count);
            }
        }
    });

    match client.run(intent_rx, view_tx).await {
        Ok(shadows) => info!("Session ended with {} actors in view", shadows.len()),
        Err(e) => warn!("Session ended with error: {}", e),
    }

    Ok(())
}
