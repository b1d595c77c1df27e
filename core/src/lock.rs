//! Many-readers / one-writer lock that owns the value it guards.
//!
//! Readers are admitted while no writer holds or waits for the lock. Once a
//! writer starts waiting, new readers queue behind it, so a steady stream of
//! readers cannot starve writers.
//!
//! [`RawSharedLock`] only tracks who holds the lock; `lock_api` wraps it into
//! [`SharedLock`] with owned data and RAII guards.

use lock_api::{GuardSend, RawRwLock};
use parking_lot::{const_mutex, Condvar, Mutex};

#[derive(Debug, Default)]
struct LockState {
    readers: usize,
    writer: bool,
    waiting_writers: usize,
}

pub struct RawSharedLock {
    state: Mutex<LockState>,
    readable: Condvar,
    writable: Condvar,
}

pub type SharedLock<T> = lock_api::RwLock<RawSharedLock, T>;
pub type ReadGuard<'a, T> = lock_api::RwLockReadGuard<'a, RawSharedLock, T>;
pub type WriteGuard<'a, T> = lock_api::RwLockWriteGuard<'a, RawSharedLock, T>;

impl RawSharedLock {
    fn release_read(&self) {
        let mut state = self.state.lock();
        state.readers -= 1;
        if state.readers == 0 {
            self.writable.notify_one();
        }
    }

    fn release_write(&self) {
        let mut state = self.state.lock();
        state.writer = false;
        if state.waiting_writers > 0 {
            self.writable.notify_one();
        } else {
            self.readable.notify_all();
        }
    }
}

// Holder bookkeeping lives entirely under `state`, so a lock held on one
// thread may be released on another.
unsafe impl RawRwLock for RawSharedLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self {
        state: const_mutex(LockState { readers: 0, writer: false, waiting_writers: 0 }),
        readable: Condvar::new(),
        writable: Condvar::new(),
    };

    type GuardMarker = GuardSend;

    /// Blocks until no writer holds or is waiting for the lock.
    fn lock_shared(&self) {
        let mut state = self.state.lock();
        while state.writer || state.waiting_writers > 0 {
            self.readable.wait(&mut state);
        }
        state.readers += 1;
    }

    fn try_lock_shared(&self) -> bool {
        let mut state = self.state.lock();
        if state.writer || state.waiting_writers > 0 {
            return false;
        }
        state.readers += 1;
        true
    }

    unsafe fn unlock_shared(&self) {
        self.release_read();
    }

    /// Blocks until there are no active readers and no other writer.
    fn lock_exclusive(&self) {
        let mut state = self.state.lock();
        state.waiting_writers += 1;
        while state.writer || state.readers > 0 {
            self.writable.wait(&mut state);
        }
        state.waiting_writers -= 1;
        state.writer = true;
    }

    fn try_lock_exclusive(&self) -> bool {
        let mut state = self.state.lock();
        if state.writer || state.readers > 0 {
            return false;
        }
        state.writer = true;
        true
    }

    unsafe fn unlock_exclusive(&self) {
        self.release_write();
    }

    fn is_locked(&self) -> bool {
        let state = self.state.lock();
        state.writer || state.readers > 0
    }

    fn is_locked_exclusive(&self) -> bool {
        self.state.lock().writer
    }
}
