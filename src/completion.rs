//! The completion signal shared by a [`Future`](crate::Future) and its
//! [`Promise`](crate::Promise)s.
use std::{
    mem,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Condvar, Mutex, MutexGuard, PoisonError,
    },
    task::Waker,
};

use crate::Error;

#[derive(Debug, Default)]
struct Signal {
    failure: Option<Error>,
    // At most one waker per waiter id.
    wakers: Vec<(usize, Waker)>,
}

/// Announces the single terminal outcome of a task.
///
/// One thread writes (the task), any number of threads wait. `done` only ever
/// goes from `false` to `true`, and it is only stored while `signal` is held.
#[derive(Debug, Default)]
pub(crate) struct Completion {
    done: AtomicBool,
    next_waiter: AtomicUsize,
    signal: Mutex<Signal>,
    condvar: Condvar,
}

impl Completion {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // Every critical section is a single assignment, so a poisoned lock still
    // guards consistent data.
    fn lock(&self) -> MutexGuard<'_, Signal> {
        self.signal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a captured failure. Must happen before [`mark_done`](Self::mark_done).
    pub(crate) fn mark_exception(&self, err: Error) -> Result<(), Error> {
        let mut signal = self.lock();
        if signal.failure.is_some() || self.done.load(Ordering::Relaxed) {
            return Err(Error::AlreadyRecorded);
        }
        signal.failure = Some(err);
        Ok(())
    }

    /// Flips the completion flag and wakes every waiter, blocking or async.
    pub(crate) fn mark_done(&self) {
        let wakers = {
            let mut signal = self.lock();
            if self.done.swap(true, Ordering::AcqRel) {
                return;
            }
            mem::take(&mut signal.wakers)
        };
        self.condvar.notify_all();
        for (_, waker) in wakers {
            waker.wake();
        }
    }

    /// Blocks until the flag is set. Returns immediately if it already is.
    pub(crate) fn wait_until_done(&self) {
        let signal = self.lock();
        let _signal = self
            .condvar
            .wait_while(signal, |_| !self.done.load(Ordering::Acquire))
            .unwrap_or_else(PoisonError::into_inner);
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub(crate) fn failure(&self) -> Option<Error> {
        self.lock().failure.clone()
    }

    /// Hands out an id that [`register_waker`](Self::register_waker) keys
    /// wakers by. Each consumer handle takes its own.
    pub(crate) fn waiter_id(&self) -> usize {
        self.next_waiter.fetch_add(1, Ordering::Relaxed)
    }

    /// Registers `waker` for waiter `id`, replacing the one it registered
    /// before, to be woken by [`mark_done`](Self::mark_done).
    ///
    /// Returns `false` without registering when the task is already done.
    pub(crate) fn register_waker(&self, id: usize, waker: &Waker) -> bool {
        let mut signal = self.lock();
        if self.done.load(Ordering::Acquire) {
            return false;
        }
        match signal.wakers.iter_mut().find(|(waiter, _)| *waiter == id) {
            Some((_, known)) => {
                if !known.will_wake(waker) {
                    *known = waker.clone();
                }
            }
            None => signal.wakers.push((id, waker.clone())),
        }
        true
    }

    /// Drops the waker of waiter `id`, if any.
    pub(crate) fn forget_waker(&self, id: usize) {
        self.lock().wakers.retain(|(waiter, _)| *waiter != id);
    }

    #[cfg(test)]
    pub(crate) fn waker_count(&self) -> usize {
        self.lock().wakers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Completion;
    use crate::Error;
    use std::{sync::Arc, thread, time::Duration};

    #[test]
    fn test_wait_after_done_returns() {
        let completion = Completion::new();
        completion.mark_done();
        completion.wait_until_done();
        assert!(completion.is_done());
        assert!(completion.failure().is_none());
    }

    #[test]
    fn test_wait_wakes_every_waiter() {
        let completion = Arc::new(Completion::new());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let completion = completion.clone();
                thread::spawn(move || {
                    completion.wait_until_done();
                    completion.is_done()
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        assert!(!completion.is_done());
        completion.mark_done();

        for waiter in waiters {
            assert!(waiter.join().expect("The waiter thread has panicked"));
        }
    }

    #[test]
    fn test_exception_recorded_once() {
        let completion = Completion::new();
        completion.mark_exception(Error::Panicked("first".into())).unwrap();
        assert!(matches!(
            completion.mark_exception(Error::Panicked("second".into())),
            Err(Error::AlreadyRecorded)
        ));
        completion.mark_done();
        assert_eq!(completion.failure().unwrap().to_string(), "first");
    }

    #[test]
    fn test_no_exception_after_done() {
        let completion = Completion::new();
        completion.mark_done();
        assert!(completion.mark_exception(Error::ProducerDropped).is_err());
        assert!(completion.failure().is_none());
    }

    #[test]
    fn test_mark_done_twice_is_harmless() {
        let completion = Completion::new();
        completion.mark_done();
        completion.mark_done();
        assert!(completion.is_done());
    }
}
