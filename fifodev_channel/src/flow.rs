//! Counting-permit flow control with interruptible blocking
//!
//! Maps the kernel counting semaphores of the original design onto
//! `parking_lot` Mutex + Condvar. A [`Semaphore`] counts available
//! permits; `acquire` blocks until one is available or the caller's
//! [`CancelToken`] fires, `release` restores one permit.
//!
//! Cancellation is observed by bounded-duration condvar waits: a blocked
//! `acquire` re-checks its token at least every [`CANCEL_POLL`], so an
//! external `cancel()` aborts the wait within that bound. A cancelled
//! acquire consumes nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::error::{ChannelError, ChannelResult};

/// Upper bound on how long a blocked waiter goes without re-checking its
/// cancellation token.
pub const CANCEL_POLL: Duration = Duration::from_millis(10);

/// External cancellation signal for blocking channel calls.
///
/// Clones share the same flag; cancelling any clone aborts every wait
/// that was given one of them. The token is sticky: once cancelled it
/// stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, un-fired token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the token. Every blocked call holding a clone returns
    /// `ChannelError::Interrupted` within [`CANCEL_POLL`].
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Counting semaphore with interruptible acquisition.
#[derive(Debug)]
pub struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Create a semaphore holding `permits` permits.
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Block until one permit is available, then take it.
    ///
    /// Returns `ChannelError::Interrupted` if `cancel` fires while
    /// waiting; in that case no permit has been consumed. A permit that
    /// is already available is taken even if the token has fired, the
    /// same way a kernel `down_interruptible` succeeds without sleeping.
    pub fn acquire(&self, cancel: &CancelToken) -> ChannelResult<()> {
        let mut permits = self.permits.lock();
        loop {
            if *permits > 0 {
                *permits -= 1;
                return Ok(());
            }
            if cancel.is_cancelled() {
                return Err(ChannelError::Interrupted);
            }
            let _ = self.available.wait_for(&mut permits, CANCEL_POLL);
        }
    }

    /// Take a permit only if one is immediately available.
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits > 0 {
            *permits -= 1;
            true
        } else {
            false
        }
    }

    /// Restore one permit and wake one waiter.
    pub fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        self.available.notify_one();
    }

    /// Current permit count. Advisory only under concurrency.
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn acquire_decrements_release_restores() {
        let sem = Semaphore::new(2);
        let cancel = CancelToken::new();

        sem.acquire(&cancel).unwrap();
        assert_eq!(sem.available(), 1);
        sem.acquire(&cancel).unwrap();
        assert_eq!(sem.available(), 0);

        sem.release();
        sem.release();
        assert_eq!(sem.available(), 2);
    }

    #[test]
    fn try_acquire_never_blocks() {
        let sem = Semaphore::new(1);
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());
    }

    #[test]
    fn blocked_acquire_wakes_on_release() {
        let sem = Arc::new(Semaphore::new(0));
        let cancel = CancelToken::new();

        let waiter = {
            let sem = Arc::clone(&sem);
            let cancel = cancel.clone();
            thread::spawn(move || sem.acquire(&cancel))
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        sem.release();
        waiter.join().unwrap().unwrap();
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn cancelled_wait_consumes_nothing() {
        let sem = Arc::new(Semaphore::new(0));
        let cancel = CancelToken::new();

        let waiter = {
            let sem = Arc::clone(&sem);
            let cancel = cancel.clone();
            thread::spawn(move || sem.acquire(&cancel))
        };

        thread::sleep(Duration::from_millis(50));
        cancel.cancel();

        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(ChannelError::Interrupted)));
        assert_eq!(sem.available(), 0);

        // A later release is still observable: nothing leaked.
        sem.release();
        assert_eq!(sem.available(), 1);
    }

    #[test]
    fn available_permit_wins_over_fired_token() {
        let sem = Semaphore::new(1);
        let cancel = CancelToken::new();
        cancel.cancel();

        sem.acquire(&cancel).unwrap();
        assert_eq!(sem.available(), 0);
    }
}
