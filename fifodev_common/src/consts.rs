//! Channel sizing constants and control-register defaults.
//!
//! These constants define the fundamental parameters for the fifodev
//! channel. They are the single source of truth - all other crates should
//! import from here.

use static_assertions::const_assert;

/// Default number of slots in the ring buffer.
///
/// Each slot holds at most one framed element. Chosen small enough that a
/// stalled consumer backpressures the producer quickly.
pub const DEFAULT_SLOT_COUNT: usize = 16;

/// Default maximum element payload size in bytes.
pub const DEFAULT_ELEM_SIZE: usize = 256;

/// Upper bound on the slot count accepted at construction time.
///
/// Prevents a mistyped configuration from pinning gigabytes of slot
/// storage. The channel is a coordination buffer, not a storage engine.
pub const MAX_SLOT_COUNT: usize = 65_536;

/// Upper bound on the per-element payload size in bytes (16 MiB).
pub const MAX_ELEM_SIZE: usize = 16 * 1024 * 1024;

/// Default value of the quantum control register.
///
/// Restored by the `Reset` control command.
pub const DEFAULT_QUANTUM: i64 = 4000;

const_assert!(DEFAULT_SLOT_COUNT <= MAX_SLOT_COUNT);
const_assert!(DEFAULT_ELEM_SIZE <= MAX_ELEM_SIZE);
