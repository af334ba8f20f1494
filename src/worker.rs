use crate::rendezvous::{self, Receiver, Sender};
use crate::tally::Tally;
use std::mem;
use std::thread;

/// A worker asking for its buffer to be filled.
///
/// The buffer travels to the dispatcher and back inside the response, so
/// file data is read straight into worker-owned memory.
pub(crate) struct WorkRequest {
    pub(crate) buf: Box<[u8]>,
    pub(crate) reply: Sender<WorkResponse>,
}

pub(crate) enum WorkResponse {
    /// `buf[..n]` holds fresh input, `n > 0`.
    BytesRead { buf: Box<[u8]>, n: usize },
    EndOfInput,
}

pub(crate) struct Worker {
    id: usize,
    buf: Box<[u8]>,
    tally: Tally,
    requests: Sender<WorkRequest>,
    results: Sender<Tally>,
    reply: (Sender<WorkResponse>, Receiver<WorkResponse>),
    delivered: bool,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        capacity: usize,
        requests: Sender<WorkRequest>,
        results: Sender<Tally>,
    ) -> Self {
        Self {
            id,
            buf: vec![0; capacity].into_boxed_slice(),
            tally: Tally::new(),
            requests,
            results,
            reply: rendezvous::channel(),
            delivered: false,
        }
    }

    pub(crate) fn run(mut self) {
        loop {
            let request = WorkRequest {
                buf: mem::take(&mut self.buf),
                reply: self.reply.0.clone(),
            };
            if self.requests.send(request).is_err() {
                log::debug!("worker {}: request channel closed", self.id);
                break;
            }
            match self.reply.1.recv() {
                Ok(WorkResponse::BytesRead { buf, n }) => {
                    log::trace!("worker {}: counting {} bytes", self.id, n);
                    self.tally.add(&buf[..n]);
                    self.buf = buf;
                }
                Ok(WorkResponse::EndOfInput) => break,
                Err(e) => panic!("worker {}: reply channel failed: {}", self.id, e),
            }
        }
        self.finish();
    }

    fn finish(&mut self) {
        let tally = mem::take(&mut self.tally);
        log::trace!("worker {}: delivering {} bytes", self.id, tally.total());
        if let Err(e) = self.results.send(tally) {
            panic!("worker {}: tally lost: {}", self.id, e);
        }
        self.delivered = true;
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Panicked, or dropped by a runtime that never ran it. Either way the
        // dispatcher and the collector are short one worker and must be released.
        if !self.delivered {
            if !thread::panicking() {
                log::warn!("worker {}: dropped before delivering its tally", self.id);
            }
            self.requests.close();
            self.results.close();
        }
    }
}
