//! Control-protocol command codes and caller-memory modeling
//!
//! The control channel accepts a closed set of numeric command codes.
//! Codes are range-checked before dispatch; an unknown code is rejected
//! with no side effect. Commands that touch caller-supplied memory do so
//! through an [`ArgCell`] (scalar register transfers) or a [`TaskCell`]
//! (task snapshot transfer), each carrying explicit readable/writable
//! permissions. The dispatcher validates the required direction against
//! the cell before any transfer, so a failed validation never leaves a
//! partial register mutation behind.

use crate::error::{ChannelError, ChannelResult};
use crate::task::TaskSnapshot;

/// Control command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CommandCode {
    /// quantum := default
    Reset = 0,
    /// quantum := *cell (cell supplies the value)
    Set = 1,
    /// quantum := value (value supplied directly)
    Tell = 2,
    /// *cell := quantum
    Get = 3,
    /// return quantum as the call's result
    Query = 4,
    /// swap: *cell := old quantum, quantum := *cell
    Exchange = 5,
    /// quantum := value; return the old quantum as the result
    Shift = 6,
    /// register caller (pid, tgid) in the ledger; *cell := task snapshot
    Info = 7,
}

/// Highest valid command code.
pub const MAX_COMMAND_CODE: u32 = CommandCode::Info as u32;

impl CommandCode {
    /// Convert from raw `u32` value. Returns `None` for out-of-range
    /// codes.
    #[inline]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Reset),
            1 => Some(Self::Set),
            2 => Some(Self::Tell),
            3 => Some(Self::Get),
            4 => Some(Self::Query),
            5 => Some(Self::Exchange),
            6 => Some(Self::Shift),
            7 => Some(Self::Info),
            _ => None,
        }
    }

    /// Whether the command reads from caller-supplied memory.
    #[inline]
    pub const fn reads_caller_memory(self) -> bool {
        matches!(self, Self::Set | Self::Exchange)
    }

    /// Whether the command writes to caller-supplied memory.
    #[inline]
    pub const fn writes_caller_memory(self) -> bool {
        matches!(self, Self::Get | Self::Exchange | Self::Info)
    }
}

/// Caller-supplied scalar cell with an explicit access window.
///
/// Stands in for the user-space pointer of the original interface: the
/// dispatcher may only load from a readable cell and store to a writable
/// one, and checks both before transferring anything.
#[derive(Debug)]
pub struct ArgCell {
    value: i64,
    readable: bool,
    writable: bool,
}

impl ArgCell {
    /// A cell the dispatcher may both read and write.
    pub fn new(value: i64) -> Self {
        Self {
            value,
            readable: true,
            writable: true,
        }
    }

    /// A cell the dispatcher may only read.
    pub fn read_only(value: i64) -> Self {
        Self {
            value,
            readable: true,
            writable: false,
        }
    }

    /// A cell the dispatcher may only write.
    pub fn write_only() -> Self {
        Self {
            value: 0,
            readable: false,
            writable: true,
        }
    }

    /// A cell the dispatcher may not touch at all.
    pub fn inaccessible() -> Self {
        Self {
            value: 0,
            readable: false,
            writable: false,
        }
    }

    /// The caller's own view of the cell. Not permission-gated: the
    /// caller always sees its own memory.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Whether the dispatcher may load from this cell.
    pub fn is_readable(&self) -> bool {
        self.readable
    }

    /// Whether the dispatcher may store to this cell.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub(crate) fn load(&self) -> ChannelResult<i64> {
        if !self.readable {
            return Err(ChannelError::AccessFault {
                reason: "argument cell is not readable",
            });
        }
        Ok(self.value)
    }

    pub(crate) fn store(&mut self, value: i64) -> ChannelResult<()> {
        if !self.writable {
            return Err(ChannelError::AccessFault {
                reason: "argument cell is not writable",
            });
        }
        self.value = value;
        Ok(())
    }
}

/// Caller-supplied destination for a task snapshot.
#[derive(Debug)]
pub struct TaskCell {
    snapshot: Option<TaskSnapshot>,
    writable: bool,
}

impl TaskCell {
    /// A writable snapshot destination.
    pub fn new() -> Self {
        Self {
            snapshot: None,
            writable: true,
        }
    }

    /// A destination the dispatcher may not write to.
    pub fn inaccessible() -> Self {
        Self {
            snapshot: None,
            writable: false,
        }
    }

    /// The snapshot delivered by the last successful `Info` call.
    pub fn snapshot(&self) -> Option<&TaskSnapshot> {
        self.snapshot.as_ref()
    }

    /// Whether the dispatcher may store to this cell.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub(crate) fn store(&mut self, snapshot: TaskSnapshot) -> ChannelResult<()> {
        if !self.writable {
            return Err(ChannelError::AccessFault {
                reason: "task cell is not writable",
            });
        }
        self.snapshot = Some(snapshot);
        Ok(())
    }
}

impl Default for TaskCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Argument to a control dispatch call.
///
/// Which variant a command requires is fixed per command; a mismatched
/// argument is an access fault, mirroring a bad user pointer.
#[derive(Debug)]
pub enum ControlArg<'a> {
    /// No argument (Reset, Query).
    None,
    /// Scalar passed by value (Tell, Shift).
    Value(i64),
    /// Scalar cell passed by reference (Set, Get, Exchange).
    Cell(&'a mut ArgCell),
    /// Task snapshot destination (Info).
    Task(&'a mut TaskCell),
}
