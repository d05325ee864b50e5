//! Invariant checks against the public scheduler/resource/process API,
//! independent of the server model built on top of them.

use simcore::{race, spawn, sleep, Resource, Simulation};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn resource_in_use_never_exceeds_capacity_under_contention() {
    let mut sim = Simulation::new();
    let clock = sim.clock().clone();
    let res = Resource::new(3);
    let max_seen = Rc::new(RefCell::new(0u64));

    for i in 0..50 {
        let res = res.clone();
        let clock = clock.clone();
        let max_seen = max_seen.clone();
        sim.spawn_detached(async move {
            let _guard = res.acquire().await;
            {
                let mut m = max_seen.borrow_mut();
                *m = (*m).max(res.in_use());
            }
            sleep(&clock, (i % 7) as f64).await;
        });
    }
    sim.run_until(1000.0);
    assert!(*max_seen.borrow() <= 3);
}

#[test]
fn resource_waiters_are_granted_in_arrival_order() {
    let mut sim = Simulation::new();
    let clock = sim.clock().clone();
    let res = Resource::new(1);
    let order = Rc::new(RefCell::new(Vec::new()));

    {
        let res = res.clone();
        let clock = clock.clone();
        sim.spawn_detached(async move {
            let _g = res.acquire().await;
            sleep(&clock, 5.0).await;
        });
    }
    for id in 0..5 {
        let res = res.clone();
        let order = order.clone();
        sim.spawn_detached(async move {
            let _g = res.acquire().await;
            order.borrow_mut().push(id);
        });
    }
    sim.run_until(1000.0);
    assert_eq!(*order.borrow(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn scheduler_never_advances_clock_backwards() {
    let mut sim = Simulation::new();
    let clock = sim.clock().clone();
    let seen = Rc::new(RefCell::new(Vec::new()));

    for delay in [30.0, 10.0, 20.0, 10.0, 5.0] {
        let clock = clock.clone();
        let seen = seen.clone();
        sim.spawn_detached(async move {
            sleep(&clock, delay).await;
            seen.borrow_mut().push(clock.borrow().now());
        });
    }
    sim.run_until(1000.0);
    let times = seen.borrow().clone();
    for pair in times.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
}

#[test]
fn interrupting_a_process_prevents_its_remaining_effects() {
    let mut sim = Simulation::new();
    let clock = sim.clock().clone();
    let reached_tail = Rc::new(RefCell::new(false));
    let flag = reached_tail.clone();
    let clock2 = clock.clone();
    let handle = spawn(sim.spawner(), async move {
        sleep(&clock2, 50.0).await;
        *flag.borrow_mut() = true;
    });
    handle.interrupt();
    sim.run_until(200.0);
    assert!(!*reached_tail.borrow());
}

#[test]
fn select_deregisters_the_losing_branch_immediately() {
    let mut sim = Simulation::new();
    let clock = sim.clock().clone();
    let loser_ran = Rc::new(RefCell::new(false));
    let flag = loser_ran.clone();
    let a = clock.clone();
    let b = clock.clone();
    sim.spawn_detached(async move {
        let fast = Box::pin(sleep(&a, 1.0));
        let slow = Box::pin(async move {
            sleep(&b, 500.0).await;
            *flag.borrow_mut() = true;
        });
        let _ = race(fast, slow).await;
    });
    sim.run_until(1000.0);
    assert!(!*loser_ran.borrow());
}
