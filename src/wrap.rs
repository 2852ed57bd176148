//! Exposing synchronous operations as promise-returning ones.
//!
//! Write the real operation once, as an ordinary function with its real
//! return type, then derive the public asynchronous entry point from it with
//! [`asynchronous`] or [`try_asynchronous`]. The trait bounds check at compile
//! time that the operation accepts the given arguments and produces the
//! declared result.
//!
//! # Examples
//!
//! ```
//! use promise_task::{asynchronous, Asynchronous, Promise};
//!
//! fn sum(a: u32, b: u32) -> u32 {
//!     a + b
//! }
//!
//! pub fn sum_async(a: u32, b: u32) -> Promise<u32> {
//!     asynchronous(sum, (a, b))
//! }
//!
//! assert_eq!(sum_async(1, 2).value().unwrap(), 3);
//! assert_eq!(sum.call_async((1, 2)).value().unwrap(), 3);
//! ```
use crate::{task, BoxError, Promise};

/// A synchronous operation invocable with the argument tuple `Args`.
///
/// Implemented for every `FnOnce` taking up to four arguments.
pub trait Invoke<Args> {
    type Output;

    fn invoke(self, args: Args) -> Self::Output;
}

macro_rules! impl_invoke {
    ($($arg:ident: $ty:ident),*) => {
        impl<Func, Ret, $($ty),*> Invoke<($($ty,)*)> for Func
        where
            Func: FnOnce($($ty),*) -> Ret,
        {
            type Output = Ret;

            fn invoke(self, ($($arg,)*): ($($ty,)*)) -> Ret {
                self($($arg),*)
            }
        }
    };
}

impl_invoke!();
impl_invoke!(a: A);
impl_invoke!(a: A, b: B);
impl_invoke!(a: A, b: B, c: C);
impl_invoke!(a: A, b: B, c: C, d: D);

/// The capability of running a synchronous operation on its own thread.
///
/// Blanket-implemented for every [`Invoke`] that can be sent to a thread.
pub trait Asynchronous<Args>: Invoke<Args> + Sized + Send + 'static {
    /// Runs the operation on a new thread, see [`task::spawn`].
    fn call_async(self, args: Args) -> Promise<Self::Output>
    where
        Args: Send + 'static,
        Self::Output: Send + Sync + 'static,
    {
        task::spawn(move || self.invoke(args))
    }

    /// Runs the fallible operation on a new thread, see [`task::try_spawn`].
    fn try_call_async<T, E>(self, args: Args) -> Promise<T>
    where
        Self: Invoke<Args, Output = Result<T, E>>,
        Args: Send + 'static,
        T: Send + Sync + 'static,
        E: Into<BoxError>,
    {
        task::try_spawn(move || self.invoke(args))
    }
}

impl<F, Args> Asynchronous<Args> for F where F: Invoke<Args> + Send + 'static {}

/// Runs `f(args...)` on a new thread and returns a promise of its result.
pub fn asynchronous<F, Args>(f: F, args: Args) -> Promise<F::Output>
where
    F: Asynchronous<Args>,
    Args: Send + 'static,
    F::Output: Send + Sync + 'static,
{
    f.call_async(args)
}

/// Runs the fallible `f(args...)` on a new thread; an `Err` becomes the
/// captured failure of the task.
pub fn try_asynchronous<F, Args, T, E>(f: F, args: Args) -> Promise<T>
where
    F: Asynchronous<Args> + Invoke<Args, Output = Result<T, E>>,
    Args: Send + 'static,
    T: Send + Sync + 'static,
    E: Into<BoxError>,
{
    f.try_call_async(args)
}

#[cfg(test)]
mod tests {
    use super::{asynchronous, try_asynchronous, Asynchronous, Invoke};
    use crate::{spawn, Promise};
    use std::{thread, time::Duration};

    fn sum(a: u64, b: u64) -> u64 {
        thread::sleep(Duration::from_millis(10 * (a + b)));
        a + b
    }

    fn sum_async(a: u64, b: u64) -> Promise<u64> {
        asynchronous(sum, (a, b))
    }

    fn checked_div(a: i32, b: i32) -> Result<i32, String> {
        if b == 0 {
            return Err(format!("cannot divide {a} by zero"));
        }
        Ok(a / b)
    }

    fn checked_div_async(a: i32, b: i32) -> Promise<i32> {
        try_asynchronous(checked_div, (a, b))
    }

    #[test]
    fn test_invoke_arities() {
        assert_eq!((|| 1).invoke(()), 1);
        assert_eq!((|a: i32| a + 1).invoke((1,)), 2);
        assert_eq!(sum.invoke((1, 2)), 3);
        assert_eq!((|a: i32, b: i32, c: i32| a + b + c).invoke((1, 2, 3)), 6);
        assert_eq!(
            (|a: &str, b: &str, c: &str, d: &str| [a, b, c, d].concat()).invoke(("a", "b", "c", "d")),
            "abcd"
        );
    }

    #[test]
    fn test_wrapped_matches_direct_spawn() {
        let wrapped = sum_async(1, 2);
        let direct = spawn(|| sum(1, 2));
        assert_eq!(wrapped.value().unwrap(), 3);
        assert_eq!(wrapped.value().unwrap(), direct.value().unwrap());
        assert_eq!(sum.call_async((1, 2)).value().unwrap(), 3);
    }

    #[test]
    fn test_wrapped_failure() {
        assert_eq!(checked_div_async(6, 3).value().unwrap(), 2);
        let err = checked_div_async(6, 0).get().unwrap_err();
        assert_eq!(err.to_string(), "cannot divide 6 by zero");
        assert!(checked_div.try_call_async((1, 0)).get().is_err());
    }

    #[test]
    fn test_wrapped_void() {
        let promise = asynchronous(|millis: u64| thread::sleep(Duration::from_millis(millis)), (20,));
        assert!(promise.get().is_ok());
    }

    #[test]
    fn test_wrapped_takes_ownership_of_args() {
        let words = vec![String::from("a"), String::from("b")];
        let promise = asynchronous(|words: Vec<String>, sep: &'static str| words.join(sep), (words, "-"));
        assert_eq!(promise.value().unwrap(), "a-b");
    }
}
