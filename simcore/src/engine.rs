//! Drives the virtual-time scheduler together with a single-threaded local
//! executor. This is the only place that knows both exist: the scheduler
//! fires callbacks that wake futures, and after every fired event the
//! executor is run until it stalls again before the scheduler is allowed to
//! advance further. No OS thread, no wall-clock wait, ever.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;

use crate::scheduler::{CancelToken, Clock, EventScheduler, VirtualTime};

/// Owns the scheduler and the executor that polls processes in lockstep
/// with it.
pub struct Simulation {
    clock: Clock,
    pool: LocalPool,
    spawner: LocalSpawner,
}

impl Simulation {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            clock: Rc::new(RefCell::new(EventScheduler::new())),
            pool,
            spawner,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn spawner(&self) -> &LocalSpawner {
        &self.spawner
    }

    /// Spawn a detached, fire-and-forget task. Used for processes whose
    /// lifetime is governed entirely by their own body (the arrival loop,
    /// and the request process it spawns per arrival) rather than by an
    /// external awaiter.
    pub fn spawn_detached<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        self.spawner
            .spawn_local(future)
            .expect("executor dropped while spawning");
    }

    /// Run the simulation until the virtual clock reaches `until`. No event
    /// scheduled beyond `until` ever fires, matching the scheduler's
    /// contract. Any process still suspended at that point is simply left
    /// behind — its futures (and their RAII guards) are cleaned up when
    /// `Simulation` itself is dropped.
    pub fn run_until(&mut self, until: VirtualTime) {
        self.pool.run_until_stalled();
        loop {
            let dispatched = self.clock.borrow_mut().step(until);
            if !dispatched {
                break;
            }
            self.pool.run_until_stalled();
        }
        self.clock.borrow_mut().set_now(until);
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

struct TimerShared {
    fired: bool,
    waker: Option<Waker>,
}

/// A future that resolves once the scheduler's clock reaches `now + delay`
/// at the moment it was created. The only suspension primitive more
/// primitive than this one is the scheduler itself.
pub struct Timer {
    shared: Rc<RefCell<TimerShared>>,
    cancel: CancelToken,
}

impl Future for Timer {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut shared = self.shared.borrow_mut();
        if shared.fired {
            Poll::Ready(())
        } else {
            shared.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        // If this timer lost a race (the service completed first), the
        // pending event must not spuriously affect later logic.
        self.cancel.cancel();
    }
}

/// Suspend the calling process for `delay` virtual milliseconds.
pub fn sleep(clock: &Clock, delay: VirtualTime) -> Timer {
    let shared = Rc::new(RefCell::new(TimerShared {
        fired: false,
        waker: None,
    }));
    let fire = shared.clone();
    let cancel = clock.borrow_mut().schedule(delay, move || {
        let waker = {
            let mut s = fire.borrow_mut();
            s.fired = true;
            s.waker.take()
        };
        if let Some(w) = waker {
            w.wake();
        }
    });
    Timer { shared, cancel }
}

/// Number of processes still live in the executor's run queue — exposed
/// for tests that want to assert the simulation drains cleanly.
pub struct LiveCount(Rc<Cell<u64>>);

impl LiveCount {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(0)))
    }
    pub fn get(&self) -> u64 {
        self.0.get()
    }
    pub fn guard(&self) -> LiveGuard {
        self.0.set(self.0.get() + 1);
        LiveGuard(self.0.clone())
    }
}

impl Default for LiveCount {
    fn default() -> Self {
        Self::new()
    }
}

pub struct LiveGuard(Rc<Cell<u64>>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_resolves_at_scheduled_time() {
        let mut sim = Simulation::new();
        let clock = sim.clock().clone();
        let observed = Rc::new(RefCell::new(None));
        let o = observed.clone();
        let clock2 = clock.clone();
        sim.spawn_detached(async move {
            sleep(&clock2, 42.0).await;
            *o.borrow_mut() = Some(clock2.borrow().now());
        });
        sim.run_until(1000.0);
        assert_eq!(*observed.borrow(), Some(42.0));
    }

    #[test]
    fn dropped_timer_future_does_not_fire_callback_observably() {
        let mut sim = Simulation::new();
        let clock = sim.clock().clone();
        let ran_after_drop = Rc::new(RefCell::new(false));
        let flag = ran_after_drop.clone();
        let clock2 = clock.clone();
        sim.spawn_detached(async move {
            let timer = sleep(&clock2, 500.0);
            drop(timer);
            *flag.borrow_mut() = true;
        });
        sim.run_until(1000.0);
        assert!(*ran_after_drop.borrow());
    }
}
