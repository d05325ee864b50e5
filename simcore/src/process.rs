//! Cooperative process abstraction on top of the local executor.
//!
//! A "process" is just a future spawned onto a
//! [`LocalSpawner`](futures::executor::LocalSpawner). `spawn` returns a
//! [`ProcessHandle`] backed by `futures::future::RemoteHandle`: dropping the
//! handle drops the remote future, which synchronously runs the `Drop` impl
//! of whatever the process was suspended on (a timer, a resource acquire).
//! That is the entirety of "interrupt" — there is no separate cancellation
//! signal to plumb through. This is distinct from a detached, fire-and-forget
//! spawn (see [`crate::engine::Simulation::spawn_detached`]), whose lifetime
//! is governed entirely by its own body rather than by a handle an external
//! caller might drop early; the server model uses each primitive where it
//! fits — a process's own per-request service step is spawned here so it can
//! be raced against a timeout and interrupted on loss, while the outer
//! request task (whose lifetime must survive regardless of who's watching)
//! is spawned detached.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::executor::LocalSpawner;
use futures::future::{self, Either, RemoteHandle};
use futures::task::LocalSpawnExt;
use futures::FutureExt;

/// A handle to a spawned process. Awaiting it yields `Some(output)` if the
/// process ran to completion, or `None` if the handle was dropped (or
/// explicitly [`interrupt`](ProcessHandle::interrupt)ed) before that.
pub struct ProcessHandle<T> {
    remote: Option<RemoteHandle<T>>,
}

impl<T> ProcessHandle<T> {
    /// Interrupt the process: drop its remote future right now. Any
    /// suspension it was parked on is torn down synchronously, releasing
    /// whatever RAII guards it held.
    pub fn interrupt(mut self) {
        self.remote.take();
    }
}

impl<T: Unpin> Future for ProcessHandle<T> {
    type Output = Option<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        match this.remote.as_mut() {
            Some(remote) => Pin::new(remote).poll(cx).map(Some),
            None => Poll::Ready(None),
        }
    }
}

/// Spawn `future` as a process on `spawner`'s executor, returning a handle
/// that can be awaited for its result or dropped to interrupt it.
pub fn spawn<T>(spawner: &LocalSpawner, future: impl Future<Output = T> + 'static) -> ProcessHandle<T>
where
    T: 'static,
{
    let (remote, handle) = future.remote_handle();
    spawner
        .spawn_local(remote)
        .expect("executor dropped while spawning");
    ProcessHandle {
        remote: Some(handle),
    }
}

/// Race two futures; the one that does *not* finish first is dropped as
/// soon as this function returns, deregistering it from whatever it was
/// suspended on (a timer cancels, a resource acquire un-queues).
pub async fn race<A, B>(a: A, b: B) -> Either<A::Output, B::Output>
where
    A: Future + Unpin,
    B: Future + Unpin,
{
    match future::select(a, b).await {
        Either::Left((out, _loser)) => Either::Left(out),
        Either::Right((out, _loser)) => Either::Right(out),
    }
}
