use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::Ordering;

use crate::collections::linked_list::LinkedList;

cfg_if::cfg_if! {
    if #[cfg(all(not(feature = "no-std"), all(test, feature = "loom")))] {
        use loom::sync::atomic::AtomicBool;
    } else {
        use core::sync::atomic::AtomicBool;
    }
}

const LOCKED: bool = true;
const UNLOCKED: bool = false;

/// a `LinkedList` behind a spin lock, so one list can be shared between
/// threads without std's `Mutex`. every operation holds the lock for its whole
/// duration
pub struct SharedLinkedList<T> {
    is_locked: AtomicBool,
    list: UnsafeCell<LinkedList<T>>,
}

unsafe impl<T: Send> Send for SharedLinkedList<T> {}
unsafe impl<T: Send> Sync for SharedLinkedList<T> {}

impl<T> SharedLinkedList<T> {
    pub fn new() -> Self {
        Self::from_list(LinkedList::new())
    }

    pub fn from_list(list: LinkedList<T>) -> Self {
        Self {
            is_locked: AtomicBool::new(UNLOCKED),
            list: UnsafeCell::new(list),
        }
    }

    /// spin until the lock is free, then hand out exclusive access to the
    /// list. the lock is released when the guard is dropped
    pub fn lock(&self) -> SharedLinkedListGuard<'_, T> {
        while self
            .is_locked
            .compare_exchange_weak(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.is_locked.load(Ordering::Relaxed) == LOCKED {
                spin();
            }
        }

        SharedLinkedListGuard { shared: self }
    }

    /// take the lock only if nobody else holds it
    pub fn try_lock(&self) -> Option<SharedLinkedListGuard<'_, T>> {
        self.is_locked
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SharedLinkedListGuard { shared: self })
    }

    pub fn into_inner(self) -> LinkedList<T> {
        self.list.into_inner()
    }

    pub fn push(&self, value: T) {
        self.lock().push(value);
    }

    pub fn append(&self, value: T) {
        self.lock().append(value);
    }

    pub fn pop(&self) -> Option<T> {
        self.lock().pop()
    }

    pub fn remove_last(&self) -> Option<T> {
        self.lock().remove_last()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn unlock(&self) {
        self.is_locked.store(UNLOCKED, Ordering::Release);
    }
}

impl<T> Default for SharedLinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<LinkedList<T>> for SharedLinkedList<T> {
    fn from(list: LinkedList<T>) -> Self {
        Self::from_list(list)
    }
}

fn spin() {
    cfg_if::cfg_if! {
        if #[cfg(all(not(feature = "no-std"), all(test, feature = "loom")))] {
            loom::sync::atomic::spin_loop_hint();
        } else {
            core::hint::spin_loop();
        }
    }
}

/// exclusive access to the list inside a `SharedLinkedList`. unlocks on drop
pub struct SharedLinkedListGuard<'a, T> {
    shared: &'a SharedLinkedList<T>,
}

impl<'a, T> Deref for SharedLinkedListGuard<'a, T> {
    type Target = LinkedList<T>;

    fn deref(&self) -> &LinkedList<T> {
        // SAFETY: holding the guard means we hold the lock
        unsafe { &*self.shared.list.get() }
    }
}

impl<'a, T> DerefMut for SharedLinkedListGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut LinkedList<T> {
        // SAFETY: holding the guard means we hold the lock
        unsafe { &mut *self.shared.list.get() }
    }
}

impl<'a, T> Drop for SharedLinkedListGuard<'a, T> {
    fn drop(&mut self) {
        self.shared.unlock();
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod test {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn shared_lists_are_send_and_sync() {
        fn send_sync<S: Send + Sync>(_: S) {}
        send_sync(SharedLinkedList::<u32>::new());
    }

    #[test]
    fn guard_gives_access_to_the_list() {
        let shared = SharedLinkedList::new();
        {
            let mut ll = shared.lock();
            ll.append(1);
            ll.append(2);
            let head = ll.head().expect("list should have a head");
            ll.try_insert_after(3, head).expect("head belongs to the list");
        }
        assert_eq!(shared.len(), 3);
        assert_eq!(shared.into_inner().to_string(), "1 -> 3 -> 2 ");
    }

    #[test]
    fn try_lock_fails_while_locked() {
        let shared = SharedLinkedList::<u32>::new();
        let guard = shared.lock();
        assert!(shared.try_lock().is_none());
        drop(guard);
        assert!(shared.try_lock().is_some());
    }

    #[test]
    fn delegating_operations() {
        let shared: SharedLinkedList<u32> = [2, 3].into_iter().collect::<LinkedList<_>>().into();
        shared.push(1);
        shared.append(4);
        assert!(!shared.is_empty());
        assert_eq!(shared.pop(), Some(1));
        assert_eq!(shared.remove_last(), Some(4));
        assert_eq!(shared.len(), 2);
    }

    #[test]
    fn concurrent_appends_are_all_kept() {
        let shared = Arc::new(SharedLinkedList::new());

        let num_threads = 4;
        let num_ops = 100;

        let mut threads = Vec::with_capacity(num_threads);
        for thread_num in 0..num_threads {
            let shared = shared.clone();
            threads.push(std::thread::spawn(move || {
                for op_num in 0..num_ops {
                    shared.append(thread_num * num_ops + op_num);
                }
            }));
        }

        for thread in threads {
            thread.join().expect("failed to join thread");
        }

        let ll = shared.lock();
        assert_eq!(ll.len(), num_threads * num_ops);
        let mut values: Vec<usize> = ll.iter().copied().collect();
        values.sort_unstable();
        assert!(values.into_iter().eq(0..num_threads * num_ops));
    }
}

#[cfg(all(not(feature = "no-std"), all(test, feature = "loom")))]
mod loom_tests {
    use loom::sync::Arc;

    use super::*;

    #[test]
    fn concurrent_appends_are_all_kept() {
        loom::model(|| {
            let shared = Arc::new(SharedLinkedList::new());

            let handles: Vec<_> = (0..2u32)
                .map(|i| {
                    let shared = shared.clone();
                    loom::thread::spawn(move || shared.append(i))
                })
                .collect();

            for handle in handles {
                handle.join().expect("failed to join loom thread");
            }

            let mut values: Vec<u32> = shared.lock().iter().copied().collect();
            values.sort_unstable();
            assert_eq!(values, [0, 1]);
        });
    }

    #[test]
    fn push_and_pop_race() {
        loom::model(|| {
            let shared = Arc::new(SharedLinkedList::new());
            shared.append(1u32);

            let popper = {
                let shared = shared.clone();
                loom::thread::spawn(move || shared.pop())
            };
            shared.push(0);

            let popped = popper.join().expect("failed to join loom thread");
            let remaining: Vec<u32> = shared.lock().iter().copied().collect();
            match popped {
                Some(1) => assert_eq!(remaining, [0]),
                Some(0) => assert_eq!(remaining, [1]),
                other => panic!("unexpected pop result {:?}", other),
            }
        });
    }
}
