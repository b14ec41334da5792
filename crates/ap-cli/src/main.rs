//! Multiworld console client
//!
//! Connects to a multiworld server and drives the session the way a game
//! would: the main thread ticks `poll` and drains deferred tasks, while a
//! second thread reads commands from stdin and issues them concurrently.

mod command;
mod game;

use anyhow::{Context, Result};
use ap_bridge::WsSessionFactory;
use ap_client::{ClientConfig, ConnectionController};
use ap_core::ConnectionState;
use clap::Parser;
use command::Command;
use game::ConsoleGame;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const TICK: Duration = Duration::from_millis(16);

#[derive(Parser, Debug)]
#[command(name = "ap-client", about = "Console client for a multiworld server", version)]
struct Args {
    /// Server address: host, host:port or ws[s]://host:port
    #[arg(short, long, env = "AP_SERVER", default_value = "localhost")]
    server: String,

    /// Slot name to connect as
    #[arg(long, env = "AP_SLOT")]
    slot: String,

    #[arg(long, env = "AP_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// JSON client configuration
    #[arg(short, long, env = "AP_CONFIG")]
    config: Option<PathBuf>,

    /// Override the game name from the configuration
    #[arg(long, env = "AP_GAME")]
    game: Option<String>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

type Controller = ConnectionController<ConsoleGame>;

fn load_config(args: &Args) -> Result<ClientConfig> {
    let Some(path) = &args.config else {
        return Ok(match &args.game {
            Some(game) => ClientConfig::for_game(game.as_str()),
            None => ClientConfig::default(),
        });
    };
    let mut config = ClientConfig::from_json_file(path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    if let Some(game) = &args.game {
        config.game = game.clone();
    }
    Ok(config)
}

fn run_command(controller: &Controller, args: &Args, command: Command) {
    match command {
        Command::Check(locations) => controller.send_locations(&locations),
        Command::Scout { locations, hint } => {
            if !controller.scout_locations(&locations, hint) {
                warn!("Scout not sent: {}", controller.get_status());
            }
        }
        Command::Goal => controller.game_finished(),
        Command::Status => println!("{}", controller.get_connection_info()),
        Command::Connect => controller.connect(&args.server, &args.slot, &args.password),
        Command::Disconnect => controller.disconnect(),
        Command::Quit => {}
    }
}

/// Read commands until EOF or `!quit`, then raise `stop`
fn spawn_console(
    controller: Arc<Controller>,
    args: Arc<Args>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("stdin: {}", e);
                    break;
                }
            };
            match command::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => run_command(&controller, &args, command),
                Ok(None) => {}
                Err(e) => println!("{}", e),
            }
        }
        stop.store(true, Ordering::SeqCst);
    })
}

fn main() -> Result<()> {
    let args = Arc::new(Args::parse());

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log filter")?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args)?;
    info!(
        "Multiworld client starting for {} v{}.{}.{}",
        config.game, config.version.0, config.version.1, config.version.2
    );

    // Network I/O lives on the runtime; this thread plays the game
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("starting tokio runtime")?;
    let factory = WsSessionFactory::new(runtime.handle().clone());
    let controller = Arc::new(Controller::new(factory, config));

    controller.connect(&args.server, &args.slot, &args.password);
    info!("{}", controller.get_status());

    let stop = Arc::new(AtomicBool::new(false));
    let console = spawn_console(Arc::clone(&controller), Arc::clone(&args), Arc::clone(&stop));

    let mut game = ConsoleGame::default();
    let mut last_status = controller.status_snapshot().revision;
    while !stop.load(Ordering::SeqCst) {
        let started = Instant::now();
        controller.poll();
        let report = controller.process_main_thread_tasks(&mut game);
        if report.failed > 0 {
            warn!("{} of {} tasks failed this tick", report.failed, report.executed);
        }

        let status = controller.status_snapshot();
        let changed = status.revision != last_status;
        if changed {
            last_status = status.revision;
            println!("[{}] {}", controller.state(), status.status);
        }
        if changed && controller.state() == ConnectionState::FailedPermanently {
            println!("Type !connect to try again");
        }
        if let Some(rest) = TICK.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    controller.disconnect();
    controller.process_main_thread_tasks(&mut game);
    info!("Received {} items this session", game.received().len());

    // A console thread blocked on stdin is left behind on exit
    if console.is_finished() {
        let _ = console.join();
    }
    runtime.shutdown_timeout(Duration::from_secs(1));
    Ok(())
}
