//! Bounded FIFO resource — the model for a worker pool or an I/O limiter.
//!
//! `capacity` slots are handed out strictly in the order `acquire()` was
//! called, not the order the returned futures happen to be polled. A waiter
//! that is interrupted before it ever receives a slot is simply removed
//! from the queue. A waiter that is interrupted *after* being granted a
//! slot but before it turned that grant into a [`ResourceGuard`] still
//! holds that slot from the resource's point of view and must release it
//! on drop, or `in_use` drifts forever.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::EngineError;

struct Waiter {
    granted: bool,
    waker: Option<Waker>,
}

struct ResourceInner {
    capacity: u64,
    in_use: u64,
    // FIFO order of all waiters that have not yet consumed (via poll) or
    // abandoned (via drop) their place. Entries may already be `granted`
    // while still sitting here, waiting to be consumed.
    queue: VecDeque<Rc<RefCell<Waiter>>>,
}

impl ResourceInner {
    /// Grant slots, in order, to every not-yet-granted waiter the
    /// remaining capacity allows. Granted-but-not-consumed waiters in
    /// front do not block waiters behind them from being granted too.
    fn try_admit(&mut self) {
        for w in self.queue.iter() {
            if self.in_use >= self.capacity {
                break;
            }
            let mut w = w.borrow_mut();
            if w.granted {
                continue;
            }
            w.granted = true;
            self.in_use += 1;
            debug_assert!(
                self.in_use <= self.capacity,
                "{}",
                EngineError::Invariant(format!(
                    "in_use {} exceeded capacity {}",
                    self.in_use, self.capacity
                ))
            );
            if let Some(waker) = w.waker.take() {
                waker.wake();
            }
        }
    }

    fn remove(&mut self, waiter: &Rc<RefCell<Waiter>>) {
        self.queue.retain(|w| !Rc::ptr_eq(w, waiter));
    }
}

/// A bounded pool of `capacity` identical slots, granted FIFO.
#[derive(Clone)]
pub struct Resource {
    inner: Rc<RefCell<ResourceInner>>,
}

impl Resource {
    pub fn new(capacity: u64) -> Self {
        assert!(capacity > 0, "resource capacity must be positive");
        Self {
            inner: Rc::new(RefCell::new(ResourceInner {
                capacity,
                in_use: 0,
                queue: VecDeque::new(),
            })),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.inner.borrow().capacity
    }

    pub fn in_use(&self) -> u64 {
        self.inner.borrow().in_use
    }

    /// Number of waiters not yet granted a slot.
    pub fn queue_len(&self) -> usize {
        self.inner
            .borrow()
            .queue
            .iter()
            .filter(|w| !w.borrow().granted)
            .count()
    }

    /// Request a slot, immediately taking a place in line. Awaiting the
    /// returned future resolves to a [`ResourceGuard`] once a slot is
    /// granted; dropping it before that releases the place fairly (see
    /// module docs).
    pub fn acquire(&self) -> Acquire {
        let waiter = Rc::new(RefCell::new(Waiter {
            granted: false,
            waker: None,
        }));
        {
            let mut inner = self.inner.borrow_mut();
            inner.queue.push_back(waiter.clone());
            inner.try_admit();
        }
        Acquire {
            resource: self.clone(),
            waiter: Some(waiter),
        }
    }
}

pub struct Acquire {
    resource: Resource,
    waiter: Option<Rc<RefCell<Waiter>>>,
}

impl Future for Acquire {
    type Output = ResourceGuard;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<ResourceGuard> {
        let this = self.get_mut();
        let waiter = this.waiter.as_ref().expect("polled after completion");
        let granted = waiter.borrow().granted;
        if granted {
            let waiter = this.waiter.take().expect("checked above");
            this.resource.inner.borrow_mut().remove(&waiter);
            return Poll::Ready(ResourceGuard {
                resource: this.resource.clone(),
            });
        }
        waiter.borrow_mut().waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for Acquire {
    fn drop(&mut self) {
        let Some(waiter) = self.waiter.take() else {
            return;
        };
        let granted = waiter.borrow().granted;
        let mut inner = self.resource.inner.borrow_mut();
        inner.remove(&waiter);
        if granted {
            // Counted in in_use when admitted; this future is being
            // dropped before turning that grant into a guard, so the slot
            // must be released exactly as a guard drop would.
            inner.in_use -= 1;
            inner.try_admit();
        }
    }
}

/// RAII handle to a granted slot. Releases on drop and hands the slot to
/// the next FIFO waiter, if any.
pub struct ResourceGuard {
    resource: Resource,
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        let mut inner = self.resource.inner.borrow_mut();
        debug_assert!(
            inner.in_use > 0,
            "{}",
            EngineError::Invariant("release on resource with in_use == 0".into())
        );
        inner.in_use -= 1;
        inner.try_admit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Simulation;

    #[test]
    fn grants_up_to_capacity_immediately() {
        let mut sim = Simulation::new();
        let res = Resource::new(2);
        let log = Rc::new(RefCell::new(Vec::new()));

        for id in 0..2 {
            let res = res.clone();
            let log = log.clone();
            sim.spawn_detached(async move {
                let _g = res.acquire().await;
                log.borrow_mut().push(id);
            });
        }
        sim.run_until(1.0);
        assert_eq!(res.in_use(), 0);
        let mut got = log.borrow().clone();
        got.sort_unstable();
        assert_eq!(got, vec![0, 1]);
    }

    #[test]
    fn fifo_order_no_barging() {
        let mut sim = Simulation::new();
        let clock = sim.clock().clone();
        let res = Resource::new(1);
        let order = Rc::new(RefCell::new(Vec::new()));

        // Holder takes the only slot for 10 units.
        {
            let res = res.clone();
            let clock = clock.clone();
            sim.spawn_detached(async move {
                let _g = res.acquire().await;
                crate::engine::sleep(&clock, 10.0).await;
            });
        }
        // Two more processes queue up in order 1, then 2, both before the
        // holder has released.
        for id in [1, 2] {
            let res = res.clone();
            let order = order.clone();
            sim.spawn_detached(async move {
                let _g = res.acquire().await;
                order.borrow_mut().push(id);
            });
        }
        sim.run_until(100.0);
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn capacity_above_one_admits_behind_unconsumed_grant() {
        let res = Resource::new(2);
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);

        // First waiter is granted but never polled again (unconsumed).
        let first = res.acquire();
        let mut first = Box::pin(first);
        assert!(matches!(first.as_mut().poll(&mut cx), Poll::Ready(_)));

        // A second waiter should still be admitted immediately: capacity
        // is 2, and only one slot is accounted for so far.
        let second = res.acquire();
        let mut second = Box::pin(second);
        assert!(matches!(second.as_mut().poll(&mut cx), Poll::Ready(_)));
        assert_eq!(res.in_use(), 2);
    }

    #[test]
    fn interrupt_while_still_queued_does_not_change_in_use() {
        let res = Resource::new(1);

        let holder = res.acquire();
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut holder = Box::pin(holder);
        let _guard = match holder.as_mut().poll(&mut cx) {
            Poll::Ready(g) => g,
            Poll::Pending => panic!("capacity is free, should grant immediately"),
        };
        assert_eq!(res.in_use(), 1);

        // A second acquire joins the queue, then is interrupted before
        // ever being granted.
        let acq = res.acquire();
        assert_eq!(res.queue_len(), 1);
        drop(acq);
        assert_eq!(res.queue_len(), 0);
        assert_eq!(res.in_use(), 1);
    }

    #[test]
    fn interrupt_after_grant_but_before_guard_releases_slot() {
        let res = Resource::new(1);
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);

        let holder = res.acquire();
        let mut holder = Box::pin(holder);
        let guard = match holder.as_mut().poll(&mut cx) {
            Poll::Ready(g) => g,
            Poll::Pending => panic!("capacity is free, should grant immediately"),
        };

        // Second waiter queues behind the holder.
        let second = res.acquire();
        let mut second = Box::pin(second);
        assert!(matches!(second.as_mut().poll(&mut cx), Poll::Pending));

        // Releasing the holder grants the second waiter its slot without
        // it having been polled again yet.
        drop(guard);
        assert_eq!(res.in_use(), 1);

        // The second waiter is interrupted before consuming its grant.
        drop(second);
        assert_eq!(res.in_use(), 0);
        assert_eq!(res.queue_len(), 0);
    }
}
