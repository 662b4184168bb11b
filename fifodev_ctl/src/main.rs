//! # fifodev Control Client
//!
//! Thin command-line client for the fifodev channel. Constructs an
//! in-process device and issues control-protocol commands against it, or
//! runs a producer/consumer pipe demonstration over the data path.
//!
//! # Usage
//!
//! ```bash
//! # Query the quantum register
//! fifodev_ctl query
//!
//! # Exchange the quantum, printing the old value
//! fifodev_ctl exchange 77
//!
//! # Snapshot the caller from four threads
//! fifodev_ctl info --threads 4
//!
//! # Stream 64 elements through a 4-slot buffer
//! fifodev_ctl --slots 4 pipe --count 64
//!
//! # Verbose logging
//! fifodev_ctl -v query
//! ```

#![deny(warnings)]

use std::path::PathBuf;
use std::thread;

use clap::{Parser, Subcommand};
use fifodev::config::{ConfigLoader, DeviceConfig};
use fifodev_channel::{
    ArgCell, CancelToken, CommandCode, ControlArg, FifoDevice, TaskCell,
};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// fifodev control client
#[derive(Parser, Debug)]
#[command(name = "fifodev_ctl")]
#[command(version)]
#[command(about = "Issue control commands against an in-process fifodev channel")]
#[command(long_about = None)]
struct Args {
    /// Path to a device configuration file (device.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the slot count from the config
    #[arg(long)]
    slots: Option<usize>,

    /// Override the maximum element size from the config
    #[arg(long)]
    elem_size: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reset the quantum register to its default
    Reset,
    /// Set the quantum through an argument cell
    Set { value: i64 },
    /// Tell the quantum by value
    Tell { value: i64 },
    /// Get the quantum through an argument cell
    Get,
    /// Query the quantum as the call result
    Query,
    /// Exchange the quantum, printing the old value
    Exchange { value: i64 },
    /// Shift the quantum, printing the old value
    Shift { value: i64 },
    /// Snapshot caller scheduling state and register it in the ledger
    Info {
        /// Issue the snapshot from this many concurrent threads
        #[arg(long, default_value_t = 1)]
        threads: usize,
    },
    /// Stream elements through the channel with a producer thread
    Pipe {
        /// Number of elements to stream
        #[arg(long, default_value_t = 32)]
        count: usize,
        /// Payload prefix for each element
        #[arg(long, default_value = "message")]
        payload: String,
    },
}

fn main() {
    if let Err(e) = run() {
        error!("fifodev_ctl failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_tracing(&args);

    let config = load_config(&args)?;
    let device = FifoDevice::new(&config)?;
    let handle = device.open();

    info!(
        "device ready: slots={}, max_element_size={}",
        handle.capacity(),
        handle.max_element_size()
    );

    match args.command {
        Command::Reset => {
            handle.dispatch(CommandCode::Reset as u32, &mut ControlArg::None)?;
            println!("Quantum reset");
        }
        Command::Set { value } => {
            let mut cell = ArgCell::read_only(value);
            handle.dispatch(CommandCode::Set as u32, &mut ControlArg::Cell(&mut cell))?;
            println!("Quantum set");
        }
        Command::Tell { value } => {
            handle.dispatch(CommandCode::Tell as u32, &mut ControlArg::Value(value))?;
            println!("Quantum set");
        }
        Command::Get => {
            let mut cell = ArgCell::write_only();
            handle.dispatch(CommandCode::Get as u32, &mut ControlArg::Cell(&mut cell))?;
            println!("Quantum: {}", cell.value());
        }
        Command::Query => {
            let quantum = handle.dispatch(CommandCode::Query as u32, &mut ControlArg::None)?;
            println!("Quantum: {quantum}");
        }
        Command::Exchange { value } => {
            let mut cell = ArgCell::new(value);
            handle.dispatch(CommandCode::Exchange as u32, &mut ControlArg::Cell(&mut cell))?;
            println!("Quantum exchanged, old quantum: {}", cell.value());
        }
        Command::Shift { value } => {
            let old =
                handle.dispatch(CommandCode::Shift as u32, &mut ControlArg::Value(value))?;
            println!("Quantum shifted, old quantum: {old}");
        }
        Command::Info { threads } => run_info(&device, threads)?,
        Command::Pipe { count, payload } => run_pipe(&device, count, &payload)?,
    }

    drop(handle);
    device.teardown();
    Ok(())
}

/// Snapshot the caller from `threads` concurrent threads, printing each
/// snapshot and the resulting ledger.
fn run_info(device: &FifoDevice, threads: usize) -> Result<(), Box<dyn std::error::Error>> {
    if threads <= 1 {
        let mut task = TaskCell::new();
        device.dispatch(CommandCode::Info as u32, &mut ControlArg::Task(&mut task))?;
        println!("{}", task.snapshot().expect("snapshot delivered"));
    } else {
        thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| {
                    let mut task = TaskCell::new();
                    // Two calls per thread: the second exercises the
                    // ledger's idempotence.
                    for _ in 0..2 {
                        match device
                            .dispatch(CommandCode::Info as u32, &mut ControlArg::Task(&mut task))
                        {
                            Ok(_) => println!("{}", task.snapshot().expect("snapshot delivered")),
                            Err(e) => error!("info dispatch failed: {e}"),
                        }
                    }
                });
            }
        });
    }

    for (idx, entry) in device.ledger().snapshot().iter().enumerate() {
        println!("Task {}: PID {}, TGID {}", idx + 1, entry.pid, entry.tgid);
    }
    Ok(())
}

/// Stream `count` elements through the channel from a producer thread,
/// reading them back on the main thread.
fn run_pipe(
    device: &FifoDevice,
    count: usize,
    payload: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancelToken::new();
    let elem_size = device.max_element_size();

    thread::scope(|scope| -> Result<(), Box<dyn std::error::Error>> {
        let producer_cancel = cancel.clone();
        let producer = scope.spawn(move || {
            for i in 0..count {
                let element = format!("{payload}-{i}");
                if let Err(e) = device.write(element.as_bytes(), &producer_cancel) {
                    error!("write failed: {e}");
                    return;
                }
            }
        });

        let mut out = vec![0u8; elem_size];
        for _ in 0..count {
            let n = device.read(&mut out, &cancel)?;
            println!("{}", String::from_utf8_lossy(&out[..n]));
        }

        producer.join().expect("producer thread panicked");
        Ok(())
    })?;

    info!("pipe complete: {count} elements");
    Ok(())
}

/// Load the device configuration, applying CLI overrides.
fn load_config(args: &Args) -> Result<DeviceConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading device config from {:?}", path);
            DeviceConfig::load(path)?
        }
        None => DeviceConfig::default(),
    };
    if let Some(slots) = args.slots {
        config.slots = slots;
    }
    if let Some(elem_size) = args.elem_size {
        config.max_element_size = elem_size;
    }
    config.validate()?;
    Ok(config)
}

fn setup_tracing(args: &Args) {
    let filter = if args.verbose {
        EnvFilter::default().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env()
    };

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
