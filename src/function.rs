use std::future::Future;

use crate::{Concurrency, LimitError, Limiter, Submission};

/// Function whose calls run through a [`Limiter`]
///
/// Every call is submitted as a separate task, so no more than the configured
/// number of calls run at the same time.
///
/// # Examples
///
/// ```
/// use task_gate::LimitedFunction;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let fetch = LimitedFunction::new(|id: u32| async move { format!("resource/{id}") }, 2).unwrap();
///
///     assert_eq!(fetch.call(7).await.unwrap(), "resource/7");
///     assert_eq!(fetch.limiter().concurrency().get(), Some(2));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LimitedFunction<F> {
    limiter: Limiter,
    task: F,
}

impl<F> LimitedFunction<F> {
    /// Creates a limited function with its own [`Limiter`]
    ///
    /// # Arguments
    ///
    /// * `task`: function to wrap
    /// * `concurrency`: maximum number of calls running at once
    pub fn new<C>(task: F, concurrency: C) -> Result<Self, LimitError>
    where
        C: TryInto<Concurrency>,
        LimitError: From<C::Error>,
    {
        Ok(Self::with_limiter(Limiter::new(concurrency)?, task))
    }

    pub(crate) fn with_limiter(limiter: Limiter, task: F) -> Self {
        Self { limiter, task }
    }

    /// Limiter shared by all calls
    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }

    /// Submits one call of the wrapped function
    pub fn call<A, Fut>(&self, args: A) -> Submission<Fut::Output>
    where
        F: Fn(A) -> Fut + Clone + Send + 'static,
        A: Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        self.limiter.submit_with(self.task.clone(), args)
    }
}
