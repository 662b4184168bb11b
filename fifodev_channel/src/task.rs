//! Caller scheduling-state snapshot for the `Info` control command

use std::fmt;

use crate::error::{ChannelError, ChannelResult};

/// Nice-to-priority offset used by the kernel: static priority of a
/// normal task is `120 + nice`.
const NICE_PRIO_BASE: i32 = 120;

/// Snapshot of the calling thread's scheduling state.
///
/// Field set follows the `task_info` record of the original interface:
/// run state, stack pointer, CPU id, the three priority views, the
/// identifying (pid, tgid) pair, and the voluntary / involuntary
/// context-switch counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// Run state character as reported by procfs (`R`, `S`, `D`, ...).
    pub state: char,
    /// Approximate stack pointer of the calling thread.
    pub stack_pointer: usize,
    /// CPU the caller was last scheduled on.
    pub cpu: u32,
    /// Effective (dynamic) priority.
    pub prio: i32,
    /// Static priority derived from the nice value.
    pub static_prio: i32,
    /// Normal priority (equals static priority for non-RT tasks).
    pub normal_prio: i32,
    /// Real-time priority; 0 for normal tasks.
    pub rt_priority: u32,
    /// Thread id.
    pub pid: i32,
    /// Thread-group (process) id.
    pub tgid: i32,
    /// Voluntary context switches.
    pub nvcsw: u64,
    /// Involuntary context switches.
    pub nivcsw: u64,
}

impl TaskSnapshot {
    /// Capture the calling thread's current scheduling state.
    ///
    /// Identity and CPU come from the thread itself, the context-switch
    /// counters and run state from `/proc/thread-self/status`.
    pub fn capture() -> ChannelResult<Self> {
        let pid = nix::unistd::gettid().as_raw();
        let tgid = nix::unistd::getpid().as_raw();

        let cpu = nix::sched::sched_getcpu()
            .map_err(|e| ChannelError::Io {
                source: std::io::Error::from_raw_os_error(e as i32),
            })? as u32;

        let nice = unsafe { libc::getpriority(libc::PRIO_PROCESS, 0) } as i32;
        let static_prio = NICE_PRIO_BASE + nice;

        let rt_priority = {
            let mut param = libc::sched_param { sched_priority: 0 };
            let rc = unsafe { libc::sched_getparam(0, &mut param) };
            if rc == 0 { param.sched_priority as u32 } else { 0 }
        };

        let proc_state = ProcState::read()?;

        // Stack pointer is approximated by the address of a local; good
        // enough for a diagnostic record.
        let marker = 0u8;
        let stack_pointer = &marker as *const u8 as usize;

        Ok(Self {
            state: proc_state.state,
            stack_pointer,
            cpu,
            prio: static_prio,
            static_prio,
            normal_prio: static_prio,
            rt_priority,
            pid,
            tgid,
            nvcsw: proc_state.nvcsw,
            nivcsw: proc_state.nivcsw,
        })
    }
}

impl fmt::Display for TaskSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "state {}, stack {:#x}, cpu {}, prio {}, sprio {}, nprio {}, rtprio {}, \
             pid {}, tgid {}, nv {}, niv {}",
            self.state,
            self.stack_pointer,
            self.cpu,
            self.prio,
            self.static_prio,
            self.normal_prio,
            self.rt_priority,
            self.pid,
            self.tgid,
            self.nvcsw,
            self.nivcsw
        )
    }
}

/// Fields parsed from `/proc/thread-self/status`.
struct ProcState {
    state: char,
    nvcsw: u64,
    nivcsw: u64,
}

impl ProcState {
    fn read() -> ChannelResult<Self> {
        let status = std::fs::read_to_string("/proc/thread-self/status")?;
        Ok(Self::parse(&status))
    }

    fn parse(status: &str) -> Self {
        let mut state = '?';
        let mut nvcsw = 0;
        let mut nivcsw = 0;
        for line in status.lines() {
            if let Some(rest) = line.strip_prefix("State:") {
                state = rest.trim().chars().next().unwrap_or('?');
            } else if let Some(rest) = line.strip_prefix("voluntary_ctxt_switches:") {
                nvcsw = rest.trim().parse().unwrap_or(0);
            } else if let Some(rest) = line.strip_prefix("nonvoluntary_ctxt_switches:") {
                nivcsw = rest.trim().parse().unwrap_or(0);
            }
        }
        Self { state, nvcsw, nivcsw }
    }
}
