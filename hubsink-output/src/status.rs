use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Makes sure a connection is established at most once, however many threads ask
#[derive(Debug)]
pub struct ConnectGuard {
    status: Mutex<ConnectionStatus>,
    changed: Condvar,
}

impl Default for ConnectGuard {
    fn default() -> Self {
        ConnectGuard::new()
    }
}

impl ConnectGuard {
    pub fn new() -> ConnectGuard {
        ConnectGuard {
            status: Mutex::new(ConnectionStatus::Disconnected),
            changed: Condvar::new(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.lock()
    }

    /// Runs `connect` unless already connected. Callers arriving while an attempt
    /// is in flight wait for its outcome. Only success moves the status to
    /// `Connected`; a failure leaves it `Disconnected`.
    pub fn connect_once<E, F>(&self, connect: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<(), E>,
    {
        let mut status = self.lock();
        loop {
            match *status {
                ConnectionStatus::Connected => return Ok(()),
                ConnectionStatus::Connecting => {
                    status = self
                        .changed
                        .wait(status)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                ConnectionStatus::Disconnected => break,
            }
        }
        *status = ConnectionStatus::Connecting;
        drop(status);

        // settles the status even if `connect` unwinds
        let mut attempt = Attempt {
            guard: self,
            outcome: ConnectionStatus::Disconnected,
        };
        let result = connect();
        if result.is_ok() {
            attempt.outcome = ConnectionStatus::Connected;
        }
        result
    }

    /// Forgets the connection, so the next `connect_once` connects again
    pub fn reset(&self) {
        self.set(ConnectionStatus::Disconnected);
    }

    fn set(&self, new_status: ConnectionStatus) {
        *self.lock() = new_status;
        self.changed.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Attempt<'a> {
    guard: &'a ConnectGuard,
    outcome: ConnectionStatus,
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        self.guard.set(self.outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_connects_once() {
        let sut = ConnectGuard::new();
        let mut calls = 0;
        for _ in 0..3 {
            sut.connect_once(|| -> Result<(), ()> {
                calls += 1;
                Ok(())
            })
            .unwrap();
        }
        assert_eq!(calls, 1);
        assert_eq!(sut.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_failure_stays_disconnected() {
        let sut = ConnectGuard::new();
        assert_eq!(sut.connect_once(|| Err("refused")), Err("refused"));
        assert_eq!(sut.status(), ConnectionStatus::Disconnected);

        // the next attempt really tries again
        let mut attempted = false;
        sut.connect_once(|| -> Result<(), &str> {
            attempted = true;
            Ok(())
        })
        .unwrap();
        assert!(attempted);
    }

    #[test]
    fn test_reset_allows_reconnect() {
        let sut = ConnectGuard::new();
        sut.connect_once(|| -> Result<(), ()> { Ok(()) }).unwrap();
        sut.reset();
        assert_eq!(sut.status(), ConnectionStatus::Disconnected);
        let mut reconnected = false;
        sut.connect_once(|| -> Result<(), ()> {
            reconnected = true;
            Ok(())
        })
        .unwrap();
        assert!(reconnected);
    }

    #[test]
    fn test_concurrent_callers_connect_once() {
        let sut = Arc::new(ConnectGuard::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sut = sut.clone();
                let calls = calls.clone();
                thread::spawn(move || {
                    sut.connect_once(|| -> Result<(), ()> {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        Ok(())
                    })
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_connect_releases_waiters() {
        let sut = Arc::new(ConnectGuard::new());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            sut.connect_once(|| -> Result<(), ()> { panic!("transport blew up") })
        }));
        assert!(outcome.is_err());
        assert_eq!(sut.status(), ConnectionStatus::Disconnected);

        let (done, finished) = mpsc::channel();
        let guard = sut.clone();
        thread::spawn(move || {
            let result = guard.connect_once(|| -> Result<(), ()> { Ok(()) });
            done.send(result).unwrap();
        });
        let result = finished.recv_timeout(Duration::from_secs(2));
        assert_eq!(result, Ok(Ok(())));
        assert_eq!(sut.status(), ConnectionStatus::Connected);
    }
}
