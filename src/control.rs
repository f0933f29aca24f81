use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

/* The control channel never carries data; stop is the channel closing,
 * which every present and future receiver observes. */
enum Stop {}

/// Coordinator's side of the stop broadcast. Signalling closes the
/// channel, so the number of listening workers never has to be known.
pub struct ShutdownController {
    sender: Mutex<Option<Sender<Stop>>>,
}

/// Worker's side of the stop broadcast. Cheap to clone, one per worker.
#[derive(Clone)]
pub struct ShutdownReceiver {
    receiver: Receiver<Stop>,
}

pub fn shutdown_channel() -> (ShutdownController, ShutdownReceiver) {
    let (sender, receiver) = bounded(0);
    (
        ShutdownController {
            sender: Mutex::new(Some(sender)),
        },
        ShutdownReceiver { receiver },
    )
}

impl ShutdownController {
    /// Broadcast stop to every listening worker.
    pub fn signal(&self) {
        self.sender.lock().unwrap().take();
    }

    pub fn is_signalled(&self) -> bool {
        self.sender.lock().unwrap().is_none()
    }
}

impl ShutdownReceiver {
    /// Non-blocking check, used at the top of each worker iteration.
    pub fn stop_requested(&self) -> bool {
        match self.receiver.try_recv() {
            Ok(stop) => match stop {},
            Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }

    /// Timed wait that returns true as soon as stop is broadcast. Used
    /// in place of plain sleeps so idle workers wake immediately on
    /// shutdown instead of finishing their nap first.
    pub fn wait(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(stop) => match stop {},
            Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Instant;

    use itertools::Itertools;

    use super::*;

    #[test]
    fn not_signalled_initially() {
        let (controller, receiver) = shutdown_channel();
        assert!(!controller.is_signalled());
        assert!(!receiver.stop_requested());
        assert!(!receiver.wait(Duration::from_millis(1)));
    }

    #[test]
    fn signal_reaches_every_clone() {
        let (controller, receiver) = shutdown_channel();
        let receivers = (0..16).map(|_| receiver.clone()).collect_vec();
        controller.signal();
        assert!(controller.is_signalled());
        for r in &receivers {
            assert!(r.stop_requested());
            /* still observable on a repeated check */
            assert!(r.stop_requested());
        }
    }

    #[test]
    fn wait_wakes_early_on_signal() {
        let (controller, receiver) = shutdown_channel();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let stopped = receiver.wait(Duration::from_secs(30));
            (stopped, start.elapsed())
        });
        thread::sleep(Duration::from_millis(20));
        controller.signal();
        let (stopped, elapsed) = handle.join().unwrap();
        assert!(stopped);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn all_loops_terminate_after_signal() {
        let (controller, receiver) = shutdown_channel();
        let workers = (0..8)
            .map(|_| {
                let receiver = receiver.clone();
                thread::spawn(move || {
                    let mut iterations = 0u64;
                    while !receiver.stop_requested() {
                        iterations += 1;
                        thread::sleep(Duration::from_millis(1));
                    }
                    iterations
                })
            })
            .collect_vec();
        thread::sleep(Duration::from_millis(10));
        controller.signal();
        for w in workers {
            w.join().unwrap();
        }
    }
}
