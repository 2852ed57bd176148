//! The producer side of a task.
use std::sync::{Arc, OnceLock};

use crate::{completion::Completion, Error, Promise};

/// State shared by one [`Future`] and all of its [`Promise`]s.
#[derive(Debug)]
pub(crate) struct Shared<T> {
    pub(crate) completion: Completion,
    pub(crate) slot: OnceLock<T>,
}

/// The producer handle of a task.
///
/// A `Future` is owned by the thread running the task. It records exactly one
/// outcome, a value through [`set_value`](Future::set_value) or a failure
/// through [`set_exception`](Future::set_exception), and then publishes it
/// with [`finish`](Future::finish). Void tasks record `()`.
///
/// # Examples
///
/// ```
/// use promise_task::Future;
/// use std::thread;
///
/// let mut future = Future::<String>::new();
/// let promise = future.as_promise();
///
/// let task = thread::spawn(move || {
///     future.set_value(String::from("🍓")).unwrap();
///     future.finish();
/// });
/// assert_eq!(promise.get().unwrap(), "🍓");
/// task.join().expect("The task thread has panicked");
/// ```
///
/// Dropping a `Future` that was never finished fails every consumer instead
/// of leaving them blocked:
///
/// ```
/// use promise_task::{Error, Future};
///
/// let future = Future::<i32>::new();
/// let promise = future.as_promise();
/// drop(future);
/// assert!(matches!(promise.get(), Err(Error::ProducerDropped)));
/// ```
#[derive(Debug)]
pub struct Future<T> {
    shared: Arc<Shared<T>>,
    recorded: bool,
    finished: bool,
}

impl<T> Future<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                completion: Completion::new(),
                slot: OnceLock::new(),
            }),
            recorded: false,
            finished: false,
        }
    }

    /// Stores the task's value. Fails if an outcome was already recorded.
    pub fn set_value(&mut self, value: T) -> Result<(), Error> {
        if self.recorded {
            return Err(Error::AlreadyRecorded);
        }
        self.shared
            .slot
            .set(value)
            .map_err(|_| Error::AlreadyRecorded)?;
        self.recorded = true;
        Ok(())
    }

    /// Stores the task's failure. Fails if an outcome was already recorded.
    pub fn set_exception(&mut self, err: Error) -> Result<(), Error> {
        if self.recorded {
            return Err(Error::AlreadyRecorded);
        }
        self.shared.completion.mark_exception(err)?;
        self.recorded = true;
        Ok(())
    }

    /// Publishes the recorded outcome and wakes every consumer.
    ///
    /// Finishing without recording anything fails the task with
    /// [`Error::Unfulfilled`].
    pub fn finish(mut self) {
        if !self.recorded {
            self.record_failure(Error::Unfulfilled);
        }
        self.shared.completion.mark_done();
        self.finished = true;
    }

    /// Returns a consumer handle. Every promise sees the same outcome.
    pub fn as_promise(&self) -> Promise<T> {
        Promise::new(self.shared.clone())
    }

    /// Fails the task with [`Error::ProducerDropped`] without the warning an
    /// unfinished drop logs. For producers whose task never started.
    pub(crate) fn discard(mut self) {
        if !self.recorded {
            self.record_failure(Error::ProducerDropped);
        }
        self.shared.completion.mark_done();
        self.finished = true;
    }

    fn record_failure(&mut self, err: Error) {
        // Only reachable with nothing recorded yet, so this cannot be rejected.
        let _ = self.shared.completion.mark_exception(err);
        self.recorded = true;
    }
}

impl<T> Default for Future<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Future<T> {
    /// If this is an unfinished producer, wake every consumer with an error.
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if !self.recorded {
            log::warn!("task producer dropped without an outcome");
            self.record_failure(Error::ProducerDropped);
        }
        self.shared.completion.mark_done();
    }
}

#[cfg(test)]
mod tests {
    use super::Future;
    use crate::Error;
    use std::thread;

    #[test]
    fn test_future_set_value() {
        let mut future = Future::<String>::new();
        let promise = future.as_promise();
        let task = thread::spawn(move || {
            future.set_value(String::from("🍓")).unwrap();
            future.finish();
        });
        assert_eq!(promise.get().unwrap(), "🍓");
        task.join().expect("The task thread has panicked");
    }

    #[test]
    fn test_future_set_exception() {
        let mut future = Future::<String>::new();
        let promise = future.as_promise();
        future
            .set_exception(Error::Panicked("reject!!".into()))
            .unwrap();
        future.finish();
        assert_eq!(promise.get().unwrap_err().to_string(), "reject!!");
        assert!(promise.is_finished());
    }

    #[test]
    fn test_future_outcome_recorded_once() {
        let mut future = Future::<i32>::new();
        future.set_value(1).unwrap();
        assert!(matches!(future.set_value(2), Err(Error::AlreadyRecorded)));
        assert!(matches!(
            future.set_exception(Error::ProducerDropped),
            Err(Error::AlreadyRecorded)
        ));
        let promise = future.as_promise();
        future.finish();
        assert_eq!(promise.get().unwrap(), &1);
    }

    #[test]
    fn test_future_void_task() {
        let mut future = Future::<()>::new();
        let promise = future.as_promise();
        future.set_value(()).unwrap();
        future.finish();
        assert!(promise.get().is_ok());
    }

    #[test]
    fn test_future_finish_without_outcome() {
        let future = Future::<i32>::new();
        let promise = future.as_promise();
        future.finish();
        assert!(matches!(promise.get(), Err(Error::Unfulfilled)));
    }

    #[test]
    fn test_future_unresolved() {
        let future = Future::<String>::new();
        let promise = future.as_promise();
        let task = thread::spawn(move || {
            // Move the producer into this thread but never finish it.
            drop(future);
        });
        task.join().expect("The task thread has panicked");
        assert!(matches!(promise.get(), Err(Error::ProducerDropped)));
    }

    #[test]
    fn test_future_dropped_after_value() {
        let mut future = Future::<i32>::new();
        let promise = future.as_promise();
        future.set_value(7).unwrap();
        drop(future);
        assert_eq!(promise.get().unwrap(), &7);
    }

    #[test]
    fn test_future_discard() {
        let future = Future::<i32>::new();
        let promise = future.as_promise();
        future.discard();
        assert!(promise.is_finished());
        assert!(matches!(promise.get(), Err(Error::ProducerDropped)));
    }

    #[test]
    fn test_future_no_consumer() {
        let mut future = Future::<String>::new();
        let task = thread::spawn(move || {
            future.set_value(String::from("🍓")).unwrap();
            future.finish();
        });
        task.join().expect("The task thread has panicked");
    }
}
