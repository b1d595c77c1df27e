use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use wordindex::queue::{Spawner, TaskQueue};

fn fan_out(spawner: Spawner, depth: usize, id: usize, seen: Arc<Mutex<HashSet<usize>>>) {
    let next = spawner.clone();
    spawner.submit(move || {
        assert!(seen.lock().insert(id), "task {id} ran twice");
        if depth > 0 {
            fan_out(next.clone(), depth - 1, id * 2, Arc::clone(&seen));
            fan_out(next, depth - 1, id * 2 + 1, seen);
        }
        Ok(())
    });
}

#[test]
fn await_idle_covers_tasks_submitted_by_tasks() {
    let queue = TaskQueue::new(4);
    let seen = Arc::new(Mutex::new(HashSet::new()));
    fan_out(queue.spawner(), 6, 1, Arc::clone(&seen));
    queue.await_idle();

    assert_eq!(queue.pending(), 0);
    // a full binary tree of depth 6
    assert_eq!(seen.lock().len(), 127);
}

#[test]
fn await_idle_is_reusable() {
    let queue = TaskQueue::new(2);
    let runs = Arc::new(AtomicUsize::new(0));
    for round in 1..=3 {
        for _ in 0..10 {
            let runs = Arc::clone(&runs);
            queue.submit(move || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        queue.await_idle();
        assert_eq!(runs.load(Ordering::SeqCst), round * 10);
    }
}

#[test]
fn await_idle_on_an_unused_queue_returns() {
    let queue = TaskQueue::default();
    queue.await_idle();
    assert_eq!(queue.size(), 5);
}

#[test]
fn submissions_after_shutdown_are_dropped() {
    let queue = TaskQueue::new(1);
    queue.stop_and_wait();
    queue.submit(|| panic!("must not run"));
    assert_eq!(queue.pending(), 0);
    queue.await_idle();
}
