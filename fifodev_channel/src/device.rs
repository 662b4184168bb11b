//! Device state object: buffer, permits, registers, ledger
//!
//! [`FifoDevice`] owns every piece of shared state the channel needs -
//! ring storage, the two flow-control semaphores, the quantum register,
//! and the process ledger - so callers inject one handle instead of
//! reaching for globals. Ring state and ledger state are guarded by
//! independent locks; serializing one never serializes the other.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};
use tracing::info;

use fifodev::config::DeviceConfig;

use crate::control::{CommandCode, ControlArg};
use crate::error::{ChannelError, ChannelResult};
use crate::flow::{CANCEL_POLL, CancelToken, Semaphore};
use crate::ledger::ProcessLedger;
use crate::ring::RingBuffer;
use crate::task::TaskSnapshot;

/// Bounded blocking FIFO channel with a runtime control protocol.
///
/// # Ordering contract
///
/// FIFO ordering end-to-end is guaranteed only for a single producer and
/// a single consumer. With several concurrent producers (or consumers)
/// every element is still delivered exactly once, but the interleaving
/// among the competing callers is unspecified.
#[derive(Debug)]
pub struct FifoDevice {
    /// Ring cursors and slot storage; the lock is scoped strictly to
    /// cursor/slot mutation.
    ring: Mutex<RingBuffer>,
    /// Permits for slots a producer may fill. Initialized to N.
    free: Semaphore,
    /// Permits for elements a consumer may drain. Initialized to 0.
    full: Semaphore,
    /// The quantum control register.
    quantum: Mutex<i64>,
    /// Value restored by the Reset command.
    default_quantum: i64,
    /// Observed (pid, tgid) pairs; independent lock from `ring`.
    ledger: ProcessLedger,
    torn_down: AtomicBool,
}

impl FifoDevice {
    /// Construct a device from validated configuration.
    ///
    /// Buffer storage and both permit counts are allocated here, once;
    /// sizing is fixed for the lifetime of the device.
    pub fn new(config: &DeviceConfig) -> ChannelResult<Self> {
        config
            .validate()
            .map_err(|e| ChannelError::InvalidConfig {
                reason: e.to_string(),
            })?;

        info!(
            "fifodev: FIFO SIZE={}, ELEMSZ={}",
            config.slots, config.max_element_size
        );

        Ok(Self {
            ring: Mutex::new(RingBuffer::new(config.slots, config.max_element_size)),
            free: Semaphore::new(config.slots),
            full: Semaphore::new(0),
            quantum: Mutex::new(config.quantum),
            default_quantum: config.quantum,
            ledger: ProcessLedger::new(),
            torn_down: AtomicBool::new(false),
        })
    }

    /// Number of slots (N).
    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    /// Maximum element payload size in bytes.
    pub fn max_element_size(&self) -> usize {
        self.ring.lock().max_element_size()
    }

    /// Slots currently available to a producer. Advisory under
    /// concurrency.
    pub fn free_slots(&self) -> usize {
        self.free.available()
    }

    /// Elements currently available to a consumer. Advisory under
    /// concurrency.
    pub fn queued_elements(&self) -> usize {
        self.full.available()
    }

    /// The process ledger populated by the `Info` command.
    pub fn ledger(&self) -> &ProcessLedger {
        &self.ledger
    }

    /// Open the device. Always succeeds; no exclusivity is enforced.
    pub fn open(&self) -> DeviceHandle<'_> {
        info!("fifodev: open");
        DeviceHandle { device: self }
    }

    /// Produce one element.
    ///
    /// Blocks, interruptibly, until a free slot is available, then stores
    /// `min(payload.len(), max_element_size)` bytes (silently truncating
    /// any excess) and returns the count stored. On
    /// [`ChannelError::Interrupted`] nothing has been produced and no
    /// permit is leaked.
    pub fn write(&self, payload: &[u8], cancel: &CancelToken) -> ChannelResult<usize> {
        self.free.acquire(cancel)?;
        let mut ring = match self.lock_ring(cancel) {
            Ok(guard) => guard,
            Err(e) => {
                // The free permit was already won; hand it back before
                // propagating, or the slot would be lost forever.
                self.free.release();
                return Err(e);
            }
        };
        let stored = ring.push_frame(payload);
        drop(ring);
        self.full.release();
        Ok(stored)
    }

    /// Consume one element.
    ///
    /// Blocks, interruptibly, until an element is available, then copies
    /// `min(out.len(), stored_len)` bytes into `out` and returns the
    /// count delivered. A caller buffer smaller than the element receives
    /// a truncated prefix; a larger one receives only the element's true
    /// length. On [`ChannelError::Interrupted`] nothing has been consumed
    /// and no permit is leaked.
    pub fn read(&self, out: &mut [u8], cancel: &CancelToken) -> ChannelResult<usize> {
        self.full.acquire(cancel)?;
        let mut ring = match self.lock_ring(cancel) {
            Ok(guard) => guard,
            Err(e) => {
                self.full.release();
                return Err(e);
            }
        };
        let delivered = ring.pop_frame(out);
        drop(ring);
        self.free.release();
        Ok(delivered)
    }

    /// Acquire the ring lock, aborting if `cancel` fires while queued
    /// behind another locker.
    fn lock_ring(&self, cancel: &CancelToken) -> ChannelResult<MutexGuard<'_, RingBuffer>> {
        loop {
            if let Some(guard) = self.ring.try_lock_for(CANCEL_POLL) {
                return Ok(guard);
            }
            if cancel.is_cancelled() {
                return Err(ChannelError::Interrupted);
            }
        }
    }

    /// Validate and execute one control command.
    ///
    /// Unknown codes fail with [`ChannelError::InvalidCommand`] before
    /// anything else. Commands touching caller memory have their access
    /// window validated before any transfer, so a fault never leaves a
    /// partial register mutation. Control calls are synchronous and
    /// non-blocking.
    pub fn dispatch(&self, code: u32, arg: &mut ControlArg<'_>) -> ChannelResult<i64> {
        let command =
            CommandCode::from_u32(code).ok_or(ChannelError::InvalidCommand { code })?;
        Self::check_access(command, arg)?;

        match (command, arg) {
            (CommandCode::Reset, _) => {
                *self.quantum.lock() = self.default_quantum;
                Ok(0)
            }
            (CommandCode::Set, ControlArg::Cell(cell)) => {
                let value = cell.load()?;
                *self.quantum.lock() = value;
                Ok(0)
            }
            (CommandCode::Tell, ControlArg::Value(value)) => {
                *self.quantum.lock() = *value;
                Ok(0)
            }
            (CommandCode::Get, ControlArg::Cell(cell)) => {
                let value = *self.quantum.lock();
                cell.store(value)?;
                Ok(0)
            }
            (CommandCode::Query, _) => Ok(*self.quantum.lock()),
            (CommandCode::Exchange, ControlArg::Cell(cell)) => {
                let incoming = cell.load()?;
                let mut quantum = self.quantum.lock();
                let old = *quantum;
                cell.store(old)?;
                *quantum = incoming;
                Ok(old)
            }
            (CommandCode::Shift, ControlArg::Value(value)) => {
                let mut quantum = self.quantum.lock();
                let old = *quantum;
                *quantum = *value;
                Ok(old)
            }
            (CommandCode::Info, ControlArg::Task(task)) => {
                let snapshot = TaskSnapshot::capture()?;
                self.ledger.insert_if_absent(snapshot.pid, snapshot.tgid);
                task.store(snapshot)?;
                Ok(0)
            }
            // check_access has already rejected every other pairing.
            _ => Err(ChannelError::AccessFault {
                reason: "argument kind does not match command",
            }),
        }
    }

    /// Reject argument kinds and access windows the command cannot use,
    /// before any transfer happens.
    fn check_access(command: CommandCode, arg: &ControlArg<'_>) -> ChannelResult<()> {
        let fault = |reason| Err(ChannelError::AccessFault { reason });
        match command {
            CommandCode::Reset | CommandCode::Query => Ok(()),
            CommandCode::Tell | CommandCode::Shift => match arg {
                ControlArg::Value(_) => Ok(()),
                _ => fault("command takes its argument by value"),
            },
            CommandCode::Set => match arg {
                ControlArg::Cell(cell) if cell.is_readable() => Ok(()),
                ControlArg::Cell(_) => fault("argument cell is not readable"),
                _ => fault("command requires an argument cell"),
            },
            CommandCode::Get => match arg {
                ControlArg::Cell(cell) if cell.is_writable() => Ok(()),
                ControlArg::Cell(_) => fault("argument cell is not writable"),
                _ => fault("command requires an argument cell"),
            },
            CommandCode::Exchange => match arg {
                ControlArg::Cell(cell) if cell.is_readable() && cell.is_writable() => Ok(()),
                ControlArg::Cell(_) => fault("exchange requires a readable and writable cell"),
                _ => fault("command requires an argument cell"),
            },
            CommandCode::Info => match arg {
                ControlArg::Task(task) if task.is_writable() => Ok(()),
                ControlArg::Task(_) => fault("task cell is not writable"),
                _ => fault("command requires a task cell"),
            },
        }
    }

    /// Release ledger entries, logging one record per entry.
    ///
    /// Idempotent: runs at most once even if called explicitly and then
    /// again from `Drop`, and completes without fault on a device that
    /// was never used.
    pub fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("fifodev: teardown");
        self.ledger.teardown();
    }
}

impl Drop for FifoDevice {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Open handle to a [`FifoDevice`].
///
/// Handles enforce nothing: any number may exist concurrently, and
/// closing one (dropping it) never blocks on operations in flight for
/// other callers.
#[derive(Debug)]
pub struct DeviceHandle<'a> {
    device: &'a FifoDevice,
}

impl std::ops::Deref for DeviceHandle<'_> {
    type Target = FifoDevice;

    fn deref(&self) -> &Self::Target {
        self.device
    }
}

impl Drop for DeviceHandle<'_> {
    fn drop(&mut self) {
        info!("fifodev: close");
    }
}

/// Convenience helpers for callers that do not model caller memory and
/// just want the scalar protocol.
impl FifoDevice {
    /// `Query` without constructing an argument.
    pub fn quantum(&self) -> i64 {
        *self.quantum.lock()
    }
}
