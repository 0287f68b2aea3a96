//! # Dispense Rig Binary
//!
//! Interactive controller for the micro-dispensing rig. Reads one command
//! per line from stdin and runs it against the configured backend.
//!
//! # Usage
//!
//! ```bash
//! # Simulation backend with the shipped configuration
//! dispense --config config/rig.toml --simulate
//!
//! # Raspberry Pi GPIO (built with --features rpi)
//! dispense --config /etc/dispense/rig.toml --driver rpi
//!
//! # Verbose JSON logs, skip the pin self-test
//! dispense -s -v --json --skip-diagnostics
//! ```

#![deny(warnings)]

use clap::Parser;
use dispense_common::config::{ConfigLoader, LogLevel, RigConfig};
use dispense_common::hal::consts::DEFAULT_CONFIG_PATH;
use dispense_control::command::{Command, discard_until_abort};
use dispense_control::display::LogDisplay;
use dispense_control::experiment::Orchestrator;
use dispense_control::{ActuationContext, CancelToken, ControlError};
use dispense_hal::DriverRegistry;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Dispense rig controller
#[derive(Parser, Debug)]
#[command(name = "dispense")]
#[command(version)]
#[command(about = "Stepper, trigger and servo control for the micro-dispensing rig")]
#[command(long_about = None)]
struct Args {
    /// Path to the rig configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Force the simulation backend
    #[arg(short = 's', long)]
    simulate: bool,

    /// Backend to load (`simulation`, `rpi`)
    #[arg(short, long)]
    driver: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Start without the pin self-test
    #[arg(long)]
    skip_diagnostics: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("Rig startup failed: {}", e);
        eprintln!("dispense: {e}");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = RigConfig::load(&args.config)?;
    setup_tracing(&args, config.shared.log_level);
    config.validate()?;

    info!(
        "Dispense rig v{} starting ('{}')",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );
    if detect_rt_mode() {
        info!("Running under a real-time scheduler");
    } else {
        info!("Running under the default scheduler");
    }

    let driver_name = if args.simulate {
        info!("Simulation mode enabled");
        "simulation".to_string()
    } else {
        args.driver.clone().unwrap_or_else(|| "simulation".to_string())
    };

    let registry = DriverRegistry::with_builtin();
    let drivers = registry.create(&driver_name, &config)?;

    let cancel = CancelToken::new();
    let mut ctx = ActuationContext::from_drivers(drivers, cancel.clone());
    let mut orchestrator = Orchestrator::new(&config, Box::new(LogDisplay::new(&config.display)))?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            cancel.cancel();
            running.store(false, Ordering::SeqCst);
        })?;
    }

    if let Err(e) = orchestrator.startup(&mut ctx, !args.skip_diagnostics) {
        if let Err(release) = ctx.port.release() {
            error!("Line release failed: {}", release);
        }
        return Err(e.into());
    }

    let (tx, rx) = mpsc::channel();
    spawn_input_thread(tx, cancel.clone())?;

    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(Command::Quit) => break,
            Ok(command) => {
                let result = orchestrator.execute(&mut ctx, &command);
                let interrupted = matches!(result, Err(ControlError::Cancelled));
                report(result);
                if interrupted && discard_until_abort(&rx) == Some(Command::Quit) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    orchestrator.shutdown(&mut ctx)?;
    info!("Dispense rig shutdown complete");
    Ok(())
}

fn report(result: Result<(), ControlError>) {
    match result {
        Ok(()) => {}
        Err(ControlError::Cancelled) => info!("Command aborted"),
        Err(e @ (ControlError::Rejected(_) | ControlError::InvalidCommand(_))) => warn!("{}", e),
        Err(e) => error!("{}", e),
    }
}

/// Read stdin line by line; `abort` also trips the token directly so it
/// interrupts the command currently running.
fn spawn_input_thread(tx: Sender<Command>, cancel: CancelToken) -> std::io::Result<()> {
    thread::Builder::new()
        .name("dispense-input".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        if command == Command::Abort {
                            cancel.cancel();
                        }
                        let quit = command == Command::Quit;
                        if tx.send(command).is_err() || quit {
                            return;
                        }
                    }
                    Err(e) => warn!("{}", e),
                }
            }
            let _ = tx.send(Command::Quit);
        })?;
    Ok(())
}

/// Detect if running in real-time mode by checking scheduler policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{SCHED_FIFO, SCHED_RR, sched_getscheduler};
        unsafe {
            let policy = sched_getscheduler(0);
            policy == SCHED_FIFO || policy == SCHED_RR
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

/// Setup tracing subscriber; `-v` overrides the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(configured.as_directive()))
    };

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
