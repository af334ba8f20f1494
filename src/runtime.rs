use futures::channel::oneshot;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::thread;

/// Something that can run a blocking closure on a thread of its own.
///
/// Workers park inside rendezvous handshakes, so every call must get a
/// dedicated OS thread rather than a slot on a shared async executor.
pub trait Runtime {
    type Future<T>: Future<Output = io::Result<T>> + Send + 'static
    where
        T: Send + 'static;
    fn spawn_blocking<F, T>(&self, f: F) -> Self::Future<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static;
}

impl<P> Runtime for &P
where
    P: Runtime,
{
    type Future<T>
        = P::Future<T>
    where
        T: Send + 'static;
    fn spawn_blocking<F, T>(&self, f: F) -> Self::Future<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        (*self).spawn_blocking(f)
    }
}

impl<P> Runtime for Arc<P>
where
    P: Runtime,
{
    type Future<T>
        = P::Future<T>
    where
        T: Send + 'static;
    fn spawn_blocking<F, T>(&self, f: F) -> Self::Future<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        P::spawn_blocking(self, f)
    }
}

/// Spawns one named OS thread per call.
#[derive(Clone, Copy, Debug, Default)]
pub struct Threads;

impl Runtime for Threads {
    type Future<T>
        = Join<T>
    where
        T: Send + 'static;

    fn spawn_blocking<F, T>(&self, f: F) -> Self::Future<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let spawned = thread::Builder::new()
            .name("byte-tally-worker".to_owned())
            .spawn(move || {
                // A panic in `f` drops `tx`, which the join observes as cancellation.
                let _ = tx.send(f());
            });
        match spawned {
            Ok(_) => Join::Running(rx),
            Err(e) => Join::Failed(Some(e)),
        }
    }
}

/// Completion of a closure handed to [`Threads`].
#[pin_project::pin_project(project = JoinProj)]
pub enum Join<T> {
    Running(#[pin] oneshot::Receiver<T>),
    Failed(Option<io::Error>),
}

impl<T> Future for Join<T> {
    type Output = io::Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            JoinProj::Running(rx) => {
                let output = ready!(rx.poll(cx));
                Poll::Ready(output.map_err(|_| io::Error::other("worker thread panicked")))
            }
            JoinProj::Failed(e) => Poll::Ready(Err(e
                .take()
                .unwrap_or_else(|| io::Error::other("join polled after completion")))),
        }
    }
}

#[cfg(feature = "tokio-rt")]
const _: () = {
    use futures::TryFutureExt;

    type Future<T> = futures::future::MapErr<
        tokio::task::JoinHandle<T>,
        fn(tokio::task::JoinError) -> io::Error,
    >;
    impl Runtime for tokio::runtime::Runtime {
        type Future<T>
            = Future<T>
        where
            T: Send + 'static;

        fn spawn_blocking<F, T>(&self, f: F) -> Self::Future<T>
        where
            F: FnOnce() -> T + Send + 'static,
            T: Send + 'static,
        {
            self.spawn_blocking(f).map_err(|e| io::Error::other(e))
        }
    }

    impl Runtime for tokio::runtime::Handle {
        type Future<T>
            = Future<T>
        where
            T: Send + 'static;

        fn spawn_blocking<F, T>(&self, f: F) -> Self::Future<T>
        where
            F: FnOnce() -> T + Send + 'static,
            T: Send + 'static,
        {
            self.spawn_blocking(f).map_err(|e| io::Error::other(e))
        }
    }
};
