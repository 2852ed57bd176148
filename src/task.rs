//! Spawning tasks on their own threads.
//!
//! Every task runs on a fresh, detached OS thread. There is no pool and no
//! scheduling: when the task is done is observed purely through its
//! [`Promise`].
use std::{
    any::Any,
    convert::Infallible,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
};

use crate::{BoxError, Error, Future, Promise};

/// Runs `f` on a new thread and returns a promise of its result.
///
/// A panic inside `f` is captured and re-raised by the promise as
/// [`Error::Panicked`].
///
/// # Panics
///
/// Panics if the OS fails to create a thread, like [`std::thread::spawn`].
/// Use [`Builder::spawn`] to handle that case.
///
/// # Examples
///
/// ```
/// use promise_task::spawn;
/// use std::{thread, time::Duration};
///
/// let promise = spawn(|| {
///     thread::sleep(Duration::from_millis(100));
///     1
/// });
/// assert!(!promise.is_finished());
/// assert_eq!(promise.get().unwrap(), &1);
/// ```
pub fn spawn<T, F>(f: F) -> Promise<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + Sync + 'static,
{
    match Builder::new().spawn(f) {
        Ok(promise) => promise,
        Err(err) => panic!("failed to spawn task thread: {err}"),
    }
}

/// Runs the fallible `f` on a new thread and returns a promise of its result.
///
/// An `Err` returned by `f` becomes the captured failure of the task.
///
/// # Panics
///
/// Panics if the OS fails to create a thread, like [`std::thread::spawn`].
pub fn try_spawn<T, E, F>(f: F) -> Promise<T>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + Sync + 'static,
    E: Into<BoxError>,
{
    match Builder::new().try_spawn(f) {
        Ok(promise) => promise,
        Err(err) => panic!("failed to spawn task thread: {err}"),
    }
}

/// Configures the thread a task runs on.
///
/// # Examples
///
/// ```
/// use promise_task::Builder;
/// use std::thread;
///
/// let promise = Builder::new()
///     .name("reader")
///     .spawn(|| thread::current().name().map(String::from))
///     .unwrap();
/// assert_eq!(promise.value().unwrap().as_deref(), Some("reader"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    name: Option<String>,
    stack_size: Option<usize>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name of the task thread.
    pub fn name<N: Into<String>>(self, name: N) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Sets the stack size of the task thread, in bytes.
    pub fn stack_size(self, stack_size: usize) -> Self {
        Self {
            stack_size: Some(stack_size),
            ..self
        }
    }

    /// Spawns `f`, returning [`Error::Spawn`] if no thread could be created.
    pub fn spawn<T, F>(self, f: F) -> Result<Promise<T>, Error>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        self.try_spawn(move || Ok::<T, Infallible>(f()))
    }

    /// Spawns the fallible `f`, returning [`Error::Spawn`] if no thread could
    /// be created.
    pub fn try_spawn<T, E, F>(self, f: F) -> Result<Promise<T>, Error>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let future = Future::new();
        let promise = future.as_promise();
        let launch = Launch::new(future);

        let mut builder = thread::Builder::new();
        if let Some(name) = self.name {
            builder = builder.name(name);
        }
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }
        // Dropping the join handle detaches the thread.
        builder
            .spawn(move || launch.run(f))
            .map_err(|err| {
                log::debug!("could not spawn task thread: {err}");
                Error::Spawn(Arc::new(err))
            })?;
        Ok(promise)
    }
}

/// Carries a task's producer onto its thread.
///
/// If the thread never starts, the closure holding this is dropped by the
/// spawning thread and the producer is discarded quietly.
struct Launch<T> {
    future: Option<Future<T>>,
}

impl<T> Launch<T> {
    fn new(future: Future<T>) -> Self {
        Self {
            future: Some(future),
        }
    }

    fn run<E, F>(mut self, f: F)
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<BoxError>,
    {
        if let Some(future) = self.future.take() {
            run(future, f);
        }
    }
}

impl<T> Drop for Launch<T> {
    fn drop(&mut self) {
        if let Some(future) = self.future.take() {
            future.discard();
        }
    }
}

/// Runs `f` to completion and publishes its outcome through `future`.
///
/// Nothing `f` does, panicking included, escapes this function.
fn run<T, E, F>(mut future: Future<T>, f: F)
where
    F: FnOnce() -> Result<T, E>,
    E: Into<BoxError>,
{
    let current = thread::current();
    let name = current.name().unwrap_or("<unnamed>");
    log::trace!("task '{name}' starting");

    let recorded = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => future.set_value(value),
        Ok(Err(err)) => {
            let err: BoxError = err.into();
            let err = Error::from(err);
            log::debug!("task '{name}' failed: {err}");
            future.set_exception(err)
        }
        Err(payload) => {
            let err = Error::Panicked(panic_message(payload.as_ref()));
            log::debug!("task '{name}' panicked: {err}");
            future.set_exception(err)
        }
    };
    debug_assert!(recorded.is_ok(), "fresh future rejected an outcome");

    future.finish();
    log::trace!("task '{name}' finished");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("task panicked")
    }
}
