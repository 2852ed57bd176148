//! The consumer side of a task.
use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use crate::{future::Shared, Error};

/// A consumer handle to the outcome of a task.
///
/// Promises may be cloned freely; every copy refers to the same task and
/// observes the same outcome. Reading never consumes the stored value.
///
/// When awaited, each copy keeps at most one waker registered: polling it
/// again from another task replaces the previous waker.
///
/// # Examples
///
/// ```
/// use promise_task::spawn;
/// use futures::executor::block_on;
/// use std::thread;
///
/// let promise = spawn(|| String::from("Hi"));
/// let promise2 = promise.clone();
/// let task1 = thread::spawn(move || promise.value());
/// let task2 = thread::spawn(move || block_on(promise2));
/// assert_eq!(task1.join().expect("The task1 thread has panicked.").unwrap(), "Hi");
/// assert_eq!(task2.join().expect("The task2 thread has panicked.").unwrap(), "Hi");
/// ```
#[derive(Debug)]
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
    waiter: usize,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self::new(self.shared.clone())
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        self.shared.completion.forget_waker(self.waiter);
    }
}

impl<T> Promise<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        let waiter = shared.completion.waiter_id();
        Self { shared, waiter }
    }

    /// Returns `true` once the task has finished, successfully or not.
    ///
    /// Never blocks. Once `true`, stays `true`.
    pub fn is_finished(&self) -> bool {
        self.shared.completion.is_done()
    }

    /// Blocks until the task finishes and returns its value.
    ///
    /// A captured failure is returned as an error with the original kind and
    /// message. May be called any number of times, from any thread.
    pub fn get(&self) -> Result<&T, Error> {
        self.shared.completion.wait_until_done();
        self.outcome()
    }

    /// Like [`get`](Promise::get), but returns `None` instead of blocking
    /// while the task is still running.
    pub fn try_get(&self) -> Option<Result<&T, Error>> {
        if self.is_finished() {
            Some(self.outcome())
        } else {
            None
        }
    }

    fn outcome(&self) -> Result<&T, Error> {
        if let Some(err) = self.shared.completion.failure() {
            return Err(err);
        }
        self.shared.slot.get().ok_or(Error::Unfulfilled)
    }
}

impl<T: Clone> Promise<T> {
    /// Blocks until the task finishes and returns a copy of its value.
    pub fn value(&self) -> Result<T, Error> {
        self.get().cloned()
    }
}

impl<T: Clone> From<&Promise<T>> for Result<T, Error> {
    fn from(promise: &Promise<T>) -> Self {
        promise.value()
    }
}

impl<T: Clone> std::future::Future for Promise<T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.shared.completion.register_waker(self.waiter, cx.waker()) {
            Poll::Pending
        } else {
            Poll::Ready(self.outcome().cloned())
        }
    }
}
