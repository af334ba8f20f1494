use std::num::NonZeroUsize;
use std::thread;

/// Size of each worker's read buffer unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 1 << 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    workers: NonZeroUsize,
    capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Config {
    /// One worker per available CPU, each with a [`DEFAULT_CAPACITY`] buffer.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    /// A capacity of zero is rejected when the engine starts.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
