//! Cancellation and shutdown signals.
//!
//! A [`Signal`] is a cheap, cloneable handle that becomes ready once its
//! [`Trigger`] fires (or is dropped), or once its optional deadline passes.
//! Blocking operations take a `&Signal` and return promptly when it fires.
//!
//! ```ignore
//! let (trigger, signal) = Trigger::new();
//! let worker = std::thread::spawn(move || conn.next(&signal));
//! trigger.fire();
//! assert!(worker.join().unwrap().unwrap_err().is_stop());
//! ```

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Fires the signals created together with it.
///
/// Firing is idempotent. Dropping the trigger fires it as well.
#[derive(Debug)]
pub struct Trigger {
    sender: Mutex<Option<Sender<()>>>,
}

impl Trigger {
    /// Create a trigger and its signal.
    pub fn new() -> (Trigger, Signal) {
        // Nothing is ever sent; receivers wake when the sender is dropped.
        let (sender, receiver) = crossbeam_channel::bounded(0);
        let trigger = Trigger {
            sender: Mutex::new(Some(sender)),
        };
        let signal = Signal {
            receiver,
            deadline: None,
        };
        (trigger, signal)
    }

    /// Fire the signal, waking every waiter.
    pub fn fire(&self) {
        self.sender.lock().take();
    }

    /// Whether `fire` was already called.
    pub fn is_fired(&self) -> bool {
        self.sender.lock().is_none()
    }
}

/// Handle observed by blocking operations.
#[derive(Clone, Debug)]
pub struct Signal {
    receiver: Receiver<()>,
    deadline: Option<Instant>,
}

impl Signal {
    /// A signal that never fires.
    pub fn never() -> Signal {
        Signal {
            receiver: crossbeam_channel::never(),
            deadline: None,
        }
    }

    /// Also fire at `deadline`. An earlier existing deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Signal {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Also fire after `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Signal {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Whether the signal fired or its deadline passed.
    pub fn is_fired(&self) -> bool {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        matches!(self.receiver.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Block until the signal fires.
    pub fn wait(&self) {
        let deadline = self.deadline_channel();
        crossbeam_channel::select! {
            recv(self.receiver) -> _ => {},
            recv(deadline) -> _ => {},
        }
    }

    /// Channel that disconnects when the trigger fires.
    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }

    /// Channel that delivers once the deadline passes, or never.
    pub(crate) fn deadline_channel(&self) -> Receiver<Instant> {
        match self.deadline {
            Some(deadline) => crossbeam_channel::at(deadline),
            None => crossbeam_channel::never(),
        }
    }
}

impl Default for Signal {
    fn default() -> Self {
        Signal::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fire_wakes_waiter() {
        let (trigger, signal) = Trigger::new();
        assert!(!signal.is_fired());

        let waiter = {
            let signal = signal.clone();
            thread::spawn(move || signal.wait())
        };

        thread::sleep(Duration::from_millis(20));
        trigger.fire();
        waiter.join().unwrap();

        assert!(signal.is_fired());
        assert!(trigger.is_fired());
    }

    #[test]
    fn test_drop_fires() {
        let (trigger, signal) = Trigger::new();
        drop(trigger);
        assert!(signal.is_fired());
    }

    #[test]
    fn test_never_does_not_fire() {
        let signal = Signal::never();
        assert!(!signal.is_fired());
    }

    #[test]
    fn test_deadline() {
        let signal = Signal::never().with_timeout(Duration::from_millis(10));
        assert!(!signal.is_fired());
        signal.wait();
        assert!(signal.is_fired());
    }

    #[test]
    fn test_earliest_deadline_wins() {
        let now = Instant::now();
        let signal = Signal::never()
            .with_deadline(now + Duration::from_secs(60))
            .with_deadline(now);
        assert!(signal.is_fired());
    }
}
