//! Byte-value frequency counting across all cores.
//!
//! The calling thread owns the input and acts as dispatcher: each worker
//! thread hands it an empty buffer over a [`rendezvous`] channel, gets the
//! buffer back filled with the next chunk, and tallies it locally. Tallies are
//! merged once every worker has been told the input is exhausted.

mod config;
mod dispatcher;
mod fs;
pub mod rendezvous;
mod runtime;
mod state;
mod tally;
mod worker;

pub use config::{Config, DEFAULT_CAPACITY};
pub use fs::FileSource;
pub use runtime::{Join, Runtime, Threads};
pub use tally::{merge, CharCount, Tally};

use dispatcher::Dispatcher;
use futures::TryFutureExt;
use slab::Slab;
use std::io::{self, Read};
use std::{panic, thread};
use worker::Worker;

/// Result of a [`count`] run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Census {
    pub tally: Tally,
    /// Bytes read from the source.
    pub total: u64,
}

/// Counts every byte of `source` using `config.workers()` threads from
/// `runtime`.
///
/// Returns only after all workers have been joined. Any read error, or the
/// loss of a worker, fails the whole run; no partial tally is returned.
pub fn count<R, S>(runtime: R, source: S, config: &Config) -> io::Result<Census>
where
    R: Runtime,
    S: Read,
{
    if config.capacity() == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "buffer capacity must be nonzero",
        ));
    }
    let n = config.workers().get();
    log::debug!(
        "starting {} workers with {} byte buffers",
        n,
        config.capacity()
    );

    let (requests_tx, requests_rx) = rendezvous::channel();
    let (results_tx, results_rx) = rendezvous::channel();

    let mut workers = Slab::with_capacity(n);
    for _ in 0..n {
        let entry = workers.vacant_entry();
        let worker = Worker::new(
            entry.key(),
            config.capacity(),
            requests_tx.clone(),
            results_tx.clone(),
        );
        entry.insert(runtime.spawn_blocking(move || worker.run()));
    }
    drop(requests_tx);
    drop(results_tx);

    // Tallies are taken as they arrive so a finished worker never holds its
    // thread while another is still waiting for one.
    let (dispatched, collected) = thread::scope(|s| {
        let collector = s.spawn(|| {
            (0..n)
                .map(|_| results_rx.recv())
                .collect::<Result<Vec<_>, _>>()
        });
        let dispatched = Dispatcher::new(source, requests_rx, n).run();
        let collected = collector
            .join()
            .unwrap_or_else(|payload| panic::resume_unwind(payload));
        (dispatched, collected)
    });
    results_rx.close();

    let joined = futures::executor::block_on(futures::future::try_join_all(
        workers.into_iter().map(|(id, join)| {
            join.map_err(move |e| io::Error::new(e.kind(), format!("worker {id}: {e}")))
        }),
    ));
    log::debug!("worker pool shut down");

    joined?;
    let total = dispatched?;
    let tally = merge(collected?);
    assert_eq!(
        tally.total(),
        total,
        "tallied bytes disagree with bytes dispatched"
    );
    Ok(Census { tally, total })
}
