//! Single-slot synchronous channel.
//!
//! A [`Sender::send`] completes only by handing its value directly to a
//! concurrently waiting [`Receiver::recv`]; nothing is buffered. Senders are
//! serialized among themselves, as are receivers, so at most one handshake is
//! in progress at a time.
//!
//! Closing is sticky. Once closed, every blocked and every future call returns
//! [`Closed`]. A handshake whose value already reached the slot is not undone
//! by a concurrent close.

use crate::state::{State, Status};
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Upper bound on how long a waiter sleeps before re-checking the close flag.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::default(),
        changed: Condvar::new(),
        closed: AtomicBool::new(false),
        send_lock: Mutex::new(()),
        recv_lock: Mutex::new(()),
        senders: AtomicUsize::new(1),
        receivers: AtomicUsize::new(1),
    });
    (
        Sender {
            shared: shared.clone(),
        },
        Receiver { shared },
    )
}

/// The channel has been closed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Closed;

impl fmt::Display for Closed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("channel closed")
    }
}

impl std::error::Error for Closed {}

impl From<Closed> for io::Error {
    fn from(e: Closed) -> Self {
        io::Error::new(io::ErrorKind::BrokenPipe, e)
    }
}

struct Shared<T> {
    state: Mutex<State<T>>,
    changed: Condvar,
    closed: AtomicBool,
    send_lock: Mutex<()>,
    recv_lock: Mutex<()>,
    senders: AtomicUsize,
    receivers: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> Shared<T> {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            // Taking the lock orders the flag before any waiter's next check.
            let _state = lock(&self.state);
            self.changed.notify_all();
        }
    }

    fn wait<'a>(&self, state: MutexGuard<'a, State<T>>) -> MutexGuard<'a, State<T>> {
        let (state, _) = self
            .changed
            .wait_timeout(state, POLL_INTERVAL)
            .unwrap_or_else(PoisonError::into_inner);
        state
    }

    fn send(&self, value: T) -> Result<(), Closed> {
        if self.is_closed() {
            return Err(Closed);
        }
        let _serial = lock(&self.send_lock);
        let mut state = lock(&self.state);
        loop {
            if self.is_closed() {
                return Err(Closed);
            }
            if state.status == Status::AwaitingReceive {
                state.deliver(value);
                self.changed.notify_all();
                return Ok(());
            }
            state = self.wait(state);
        }
    }

    fn recv(&self) -> Result<T, Closed> {
        if self.is_closed() {
            return Err(Closed);
        }
        let _serial = lock(&self.recv_lock);
        let mut state = lock(&self.state);
        if self.is_closed() {
            return Err(Closed);
        }
        state.status = Status::AwaitingReceive;
        self.changed.notify_all();
        loop {
            if state.status == Status::Delivered {
                let value = state.take();
                return Ok(value.expect("handshake delivered without a value"));
            }
            if self.is_closed() {
                state.take();
                return Err(Closed);
            }
            state = self.wait(state);
        }
    }
}

/// Sending half of a [`channel`].
///
/// Dropping the last `Sender` closes the channel.
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Sender<T> {
    /// Blocks until a receiver takes `value`, or the channel is closed.
    pub fn send(&self, value: T) -> Result<(), Closed> {
        self.shared.send(value)
    }

    pub fn close(&self) {
        self.shared.close()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.close();
        }
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Receiving half of a [`channel`].
///
/// Dropping the last `Receiver` closes the channel.
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Receiver<T> {
    /// Blocks until a sender hands over a value, or the channel is closed.
    pub fn recv(&self) -> Result<T, Closed> {
        self.shared.recv()
    }

    pub fn close(&self) {
        self.shared.close()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        self.shared.receivers.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        if self.shared.receivers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.close();
        }
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{channel, Closed, POLL_INTERVAL};
    use std::collections::HashSet;
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};

    const BOUND: Duration = Duration::from_secs(5);

    #[test]
    fn test_handshake() {
        let (tx, rx) = channel();
        let recv = thread::spawn(move || (rx.recv(), rx.recv()));
        tx.send("hello").unwrap();
        tx.send("world").unwrap();
        assert_eq!(recv.join().unwrap(), (Ok("hello"), Ok("world")));
    }

    #[test]
    fn test_send_blocks_until_receiver() {
        let (tx, rx) = channel();
        let (done_tx, done_rx) = mpsc::channel();
        let send = thread::spawn(move || {
            tx.send(1).unwrap();
            done_tx.send(()).unwrap();
        });
        assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert_eq!(rx.recv(), Ok(1));
        done_rx.recv_timeout(BOUND).unwrap();
        send.join().unwrap();
    }

    #[test]
    fn test_send_after_close() {
        let (tx, rx) = channel::<u8>();
        rx.close();
        let start = Instant::now();
        assert_eq!(tx.send(0), Err(Closed));
        assert!(start.elapsed() < POLL_INTERVAL);
        assert!(tx.is_closed());
    }

    #[test]
    fn test_recv_after_close() {
        let (tx, rx) = channel::<u8>();
        tx.close();
        tx.close();
        assert_eq!(rx.recv(), Err(Closed));
    }

    #[test]
    fn test_close_wakes_receiver() {
        let (tx, rx) = channel::<u8>();
        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || done_tx.send(rx.recv()).unwrap());
        thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        tx.close();
        assert_eq!(done_rx.recv_timeout(BOUND).unwrap(), Err(Closed));
        assert!(start.elapsed() <= POLL_INTERVAL * 2);
    }

    #[test]
    fn test_close_wakes_sender() {
        let (tx, rx) = channel::<u8>();
        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || done_tx.send(tx.send(7)).unwrap());
        thread::sleep(Duration::from_millis(20));
        rx.close();
        assert_eq!(done_rx.recv_timeout(BOUND).unwrap(), Err(Closed));
    }

    #[test]
    fn test_drop_last_sender_closes() {
        let (tx, rx) = channel::<u8>();
        let tx2 = tx.clone();
        drop(tx);
        assert!(!rx.is_closed());
        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || done_tx.send(rx.recv()).unwrap());
        drop(tx2);
        assert_eq!(done_rx.recv_timeout(BOUND).unwrap(), Err(Closed));
    }

    #[test]
    fn test_many_senders() {
        let (tx, rx) = channel();
        let senders = (0..16)
            .map(|i| {
                let tx = tx.clone();
                thread::spawn(move || {
                    for j in 0..100 {
                        tx.send(i * 100 + j).unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();
        drop(tx);

        let mut seen = HashSet::new();
        for _ in 0..1600 {
            assert!(seen.insert(rx.recv().unwrap()));
        }
        for sender in senders {
            sender.join().unwrap();
        }
        assert_eq!(seen, (0..1600).collect());
        assert_eq!(rx.recv(), Err(Closed));
    }

    #[test]
    fn test_many_receivers() {
        let (tx, rx) = channel();
        let receivers = (0..8)
            .map(|_| {
                let rx = rx.clone();
                thread::spawn(move || {
                    let mut sum = 0u64;
                    while let Ok(v) = rx.recv() {
                        sum += v;
                    }
                    sum
                })
            })
            .collect::<Vec<_>>();
        drop(rx);

        for v in 1..=1000u64 {
            tx.send(v).unwrap();
        }
        tx.close();
        let sum: u64 = receivers.into_iter().map(|r| r.join().unwrap()).sum();
        assert_eq!(sum, 500_500);
    }
}
