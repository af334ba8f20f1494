use crate::rendezvous::Receiver;
use crate::worker::{WorkRequest, WorkResponse};
use std::io::{self, Read};

/// Owns the input and fills worker buffers on request.
///
/// Once input runs out every request is answered with
/// [`WorkResponse::EndOfInput`]; the loop ends after each worker has been told
/// exactly once. The request channel is never closed from this side, so no
/// worker can miss its end-of-input reply.
pub(crate) struct Dispatcher<S> {
    source: S,
    requests: Receiver<WorkRequest>,
    workers: usize,
}

impl<S> Dispatcher<S>
where
    S: Read,
{
    pub(crate) fn new(source: S, requests: Receiver<WorkRequest>, workers: usize) -> Self {
        Self {
            source,
            requests,
            workers,
        }
    }

    /// Returns the number of bytes handed out.
    ///
    /// A read error stops reading but keeps answering until every worker has
    /// been released, then is returned.
    pub(crate) fn run(mut self) -> io::Result<u64> {
        let mut total = 0;
        let mut finished = 0;
        let mut error = None;
        let mut exhausted = false;

        while finished < self.workers {
            let WorkRequest { mut buf, reply } = self.requests.recv().map_err(|_| {
                log::warn!("request channel closed with {} workers pending", self.workers - finished);
                io::Error::other("worker pool shut down before end of input")
            })?;

            let n = if exhausted {
                0
            } else {
                match read(&mut self.source, &mut buf) {
                    Ok(n) => n,
                    Err(e) => {
                        log::warn!("read failed after {} bytes: {}", total, e);
                        error = Some(e);
                        0
                    }
                }
            };

            let response = if n > 0 {
                log::trace!("dispatching {} bytes", n);
                total += n as u64;
                WorkResponse::BytesRead { buf, n }
            } else {
                if !exhausted {
                    log::debug!("input exhausted after {} bytes", total);
                    exhausted = true;
                }
                finished += 1;
                WorkResponse::EndOfInput
            };

            if reply.send(response).is_err() {
                log::warn!("worker went away before its reply");
                return Err(io::Error::other("worker exited while awaiting input"));
            }
        }

        match error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }
}

fn read<S>(source: &mut S, buf: &mut [u8]) -> io::Result<usize>
where
    S: Read,
{
    loop {
        match source.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            output => break output,
        }
    }
}
