//! Run a unit of work on its own thread and collect the outcome later through
//! a [`Promise`].
//!
//! Every task gets a [`Future`] (the producer side, owned by the task thread)
//! and any number of [`Promise`]s (the consumer side). The task thread records
//! exactly one outcome, either a value or a failure, then finishes; consumers
//! block on [`Promise::get`], poll [`Promise::is_finished`] or `.await` the
//! promise.
//!
//! # Examples
//!
//! ```
//! use promise_task::try_spawn;
//!
//! let promise = try_spawn(|| "42".parse::<i32>());
//! let copy = promise.clone();
//!
//! assert_eq!(promise.get().unwrap(), &42);
//! assert_eq!(copy.value().unwrap(), 42);
//! assert!(copy.is_finished());
//! ```
//!
//! A failure is captured on the task thread and re-raised by every consumer:
//!
//! ```
//! use promise_task::spawn;
//!
//! let promise = spawn(|| -> i32 { panic!("Test exception!") });
//! let err = promise.get().unwrap_err();
//! assert_eq!(err.to_string(), "Test exception!");
//! ```
use std::{error::Error as StdError, io, sync::Arc};
use thiserror::Error;

mod completion;
pub mod fs;
pub mod future;
pub mod promise;
pub mod task;
pub mod wrap;

pub use future::Future;
pub use promise::Promise;
pub use task::{spawn, try_spawn, Builder};
pub use wrap::{asynchronous, try_asynchronous, Asynchronous, Invoke};

/// The boxed error a fallible task may return.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// The captured failure of a task, or a misuse of its handles.
///
/// Errors are cheap to clone so that every [`Promise`] copy can re-raise the
/// same failure.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The task returned an error. Formats exactly like the original.
    #[error(transparent)]
    Task(Arc<dyn StdError + Send + Sync>),
    /// The task panicked; holds the panic message.
    #[error("{0}")]
    Panicked(String),
    #[error("producer dropped without publishing an outcome")]
    ProducerDropped,
    #[error("task finished without recording a value")]
    Unfulfilled,
    #[error("an outcome was already recorded for this task")]
    AlreadyRecorded,
    #[error("could not spawn task thread")]
    Spawn(#[source] Arc<io::Error>),
}

impl Error {
    /// Returns the original error a task failed with, if it is an `E`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Error::Task(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<BoxError> for Error {
    fn from(err: BoxError) -> Self {
        // Keep the kind of failures coming out of nested promises.
        match err.downcast::<Error>() {
            Ok(err) => *err,
            Err(err) => Error::Task(Arc::from(err)),
        }
    }
}
