//! # fifodev Channel
//!
//! A bounded, blocking producer/consumer channel of framed byte elements
//! plus a small runtime control protocol, packaged as an explicit
//! device-state object.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐      ┌───────────────────────────┐      ┌──────────────┐
//! │   Producer   │      │        FifoDevice         │      │   Consumer   │
//! │              │      │                           │      │              │
//! │  write(buf)  ├─────►│  free ─► [ring] ─► full   ├─────►│  read(buf)   │
//! │              │      │        Mutex<Ring>        │      │              │
//! └──────────────┘      │                           │      └──────────────┘
//!                       │  quantum register         │
//!      dispatch(cmd) ──►│  ProcessLedger (own lock) │
//!                       └───────────────────────────┘
//! ```
//!
//! The data path is the classical bounded-buffer solution: a `free`
//! permit count bounds outstanding producers, a `full` permit count
//! bounds outstanding consumers, and one mutex makes cursor and frame
//! updates atomic. The control path is a validated numeric command
//! dispatcher over a scalar register, with an append-only ledger of
//! caller (pid, tgid) pairs populated by the `Info` command.
//!
//! ## Basic Producer-Consumer
//!
//! ```rust
//! use fifodev_channel::{CancelToken, FifoDevice};
//! use fifodev::config::DeviceConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let device = FifoDevice::new(&DeviceConfig::with_sizing(4, 64))?;
//! let cancel = CancelToken::new();
//!
//! let stored = device.write(b"sensor reading", &cancel)?;
//! assert_eq!(stored, 14);
//!
//! let mut out = [0u8; 64];
//! let delivered = device.read(&mut out, &cancel)?;
//! assert_eq!(&out[..delivered], b"sensor reading");
//! # Ok(())
//! # }
//! ```
//!
//! ## Control Protocol
//!
//! ```rust
//! use fifodev_channel::{CommandCode, ControlArg, FifoDevice};
//! use fifodev::config::DeviceConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let device = FifoDevice::new(&DeviceConfig::default())?;
//!
//! device.dispatch(CommandCode::Tell as u32, &mut ControlArg::Value(77))?;
//! let current = device.dispatch(CommandCode::Query as u32, &mut ControlArg::None)?;
//! assert_eq!(current, 77);
//! # Ok(())
//! # }
//! ```
//!
//! ## Blocking and Cancellation
//!
//! `write` blocks while the buffer is full and `read` blocks while it is
//! empty. Both waits are interruptible: firing the call's
//! [`CancelToken`] aborts the wait with `ChannelError::Interrupted`,
//! leaving every permit count and the buffer contents exactly as before
//! the call.
//!
//! ## Ordering Contract
//!
//! End-to-end FIFO ordering is guaranteed for a single producer and a
//! single consumer. Multiple concurrent producers or consumers are safe
//! (nothing is lost or duplicated) but their interleaving is
//! unspecified.
//!
//! ## Thread Safety
//!
//! - **FifoDevice**: thread-safe; share one instance by reference
//! - **CancelToken**: thread-safe; clones share the same flag
//! - **ArgCell / TaskCell**: caller-local, passed by `&mut` per call

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod control;
pub mod device;
pub mod error;
pub mod flow;
pub mod ledger;
pub mod ring;
pub mod task;

pub use control::{ArgCell, CommandCode, ControlArg, MAX_COMMAND_CODE, TaskCell};
pub use device::{DeviceHandle, FifoDevice};
pub use error::{ChannelError, ChannelResult};
pub use flow::{CANCEL_POLL, CancelToken, Semaphore};
pub use ledger::{LedgerEntry, ProcessLedger};
pub use ring::RingBuffer;
pub use task::TaskSnapshot;

/// Initialize tracing for channel diagnostics
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
