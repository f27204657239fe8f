use std::{fmt, future::Future, pin::pin, sync::PoisonError};

use tokio::sync::{oneshot, Notify};
use tracing::{debug, trace};

use crate::{
    future::{Admission, Submission},
    state::State,
    sync::{Arc, Mutex, MutexGuard},
    Concurrency, LimitError, LimitedFunction, LimiterSettings,
};

/// Queued request for a slot, answered with a [`Permit`] on admission
pub(crate) type Ticket = oneshot::Sender<Permit>;

/// Limits the number of concurrently running tasks.
///
/// Tasks are submitted with [`submit`] or [`submit_with`] and spawned onto the current tokio runtime.
/// At most [`concurrency`] of them run at once, the rest wait in a FIFO queue and start as soon
/// as running ones settle. The ceiling can be changed at any time with [`set_concurrency`].
///
/// A task is admitted on the first scheduler tick after its submission, so
/// [`active_count`] does not include it right after [`submit`] returns.
///
/// The limiter is a cheap handle, clones share the same queue and counters.
///
/// # Examples
///
/// ```
/// use task_gate::Limiter;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let limiter = Limiter::new(2).unwrap();
///
///     let doubled = limiter
///         .map(1..=4, |value: u32| async move { value * 2 })
///         .await
///         .unwrap();
///
///     assert_eq!(doubled, vec![2, 4, 6, 8]);
/// }
/// ```
///
/// [`submit`]: Limiter::submit
/// [`submit_with`]: Limiter::submit_with
/// [`concurrency`]: Limiter::concurrency
/// [`set_concurrency`]: Limiter::set_concurrency
/// [`active_count`]: Limiter::active_count
#[derive(Clone)]
pub struct Limiter {
    shared: Arc<Shared>,
}

struct Shared {
    name: &'static str,
    state: Mutex<State<Ticket>>,
    idle: Notify,
}

/// Occupied slot of a [`Limiter`]
///
/// Dropping it frees the slot and admits the next queued task.
#[derive(Debug)]
pub(crate) struct Permit {
    limiter: Option<Limiter>,
}

impl Limiter {
    /// Creates a limiter that runs at most `concurrency` tasks at once
    ///
    /// # Arguments
    ///
    /// * `concurrency`: positive integer or unbounded ceiling, anything convertible into [`Concurrency`]
    ///
    /// # Errors
    ///
    /// [`LimitError::InvalidConcurrency`] when the value is zero, negative, fractional or missing.
    ///
    /// # Examples
    ///
    /// ```
    /// use task_gate::{Limiter, LimitError};
    ///
    /// assert!(Limiter::new(4).is_ok());
    /// assert!(Limiter::new(f64::INFINITY).is_ok());
    /// assert!(matches!(Limiter::new(0), Err(LimitError::InvalidConcurrency(_))));
    /// assert!(matches!(Limiter::new(2.5), Err(LimitError::InvalidConcurrency(_))));
    /// ```
    pub fn new<C>(concurrency: C) -> Result<Self, LimitError>
    where
        C: TryInto<Concurrency>,
        LimitError: From<C::Error>,
    {
        Ok(Self::with_settings(
            LimiterSettings::default().with_concurrency(concurrency.try_into()?),
        ))
    }

    /// Creates a limiter without a ceiling
    pub fn unbounded() -> Self {
        Self::with_settings(LimiterSettings::default())
    }

    /// Creates a limiter from [`LimiterSettings`]
    pub fn with_settings(settings: LimiterSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: settings.name(),
                state: Mutex::new(State::new(settings.concurrency())),
                idle: Notify::new(),
            }),
        }
    }

    /// Submits a task to run once a slot is free
    ///
    /// The returned [`Submission`] resolves with the output of the future produced by `task`.
    /// Dropping it does not cancel the task.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn submit<F, Fut>(&self, task: F) -> Submission<Fut::Output>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        self.submit_with(move |()| task(), ())
    }

    /// Submits a task together with the arguments it is invoked with
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn submit_with<F, A, Fut>(&self, task: F, args: A) -> Submission<Fut::Output>
    where
        F: FnOnce(A) -> Fut + Send + 'static,
        A: Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        Submission::new(tokio::spawn(Admission::new(
            self.clone(),
            self.enqueue(),
            task,
            args,
        )))
    }

    /// Runs `task` for every item and collects outputs in input order
    ///
    /// All items are submitted when the returned future is first polled.
    /// Fails with the first error in input order, the remaining tasks keep running.
    pub async fn map<I, F, Fut>(&self, items: I, task: F) -> Result<Vec<Fut::Output>, LimitError>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: FnOnce(I::Item) -> Fut + Clone + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let submissions: Vec<_> = items
            .into_iter()
            .map(|item| self.submit_with(task.clone(), item))
            .collect();

        let mut outputs = Vec::with_capacity(submissions.len());
        for submission in submissions {
            outputs.push(submission.await?);
        }

        Ok(outputs)
    }

    /// Wraps `task` so that every call goes through this limiter
    pub fn limit_function<F>(&self, task: F) -> LimitedFunction<F> {
        LimitedFunction::with_limiter(self.clone(), task)
    }

    /// Number of tasks currently running
    pub fn active_count(&self) -> usize {
        self.lock().active()
    }

    /// Number of tasks waiting for a slot
    pub fn pending_count(&self) -> usize {
        self.lock().pending()
    }

    /// Current ceiling
    pub fn concurrency(&self) -> Concurrency {
        self.lock().concurrency()
    }

    /// Name used in log events
    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    /// Replaces the ceiling and admits queued tasks that fit under the new one
    ///
    /// Lowering the ceiling does not interrupt running tasks, it only holds back
    /// admissions until enough of them finish.
    ///
    /// # Errors
    ///
    /// [`LimitError::InvalidConcurrency`] with the previous ceiling left in place.
    pub fn set_concurrency<C>(&self, concurrency: C) -> Result<(), LimitError>
    where
        C: TryInto<Concurrency>,
        LimitError: From<C::Error>,
    {
        let concurrency = concurrency.try_into()?;

        let mut state = self.lock();
        let previous = state.set_concurrency(concurrency);

        debug!(
            limiter = self.shared.name,
            %previous,
            %concurrency,
            active = state.active(),
            pending = state.pending(),
            "changed concurrency"
        );

        self.admit(state);

        Ok(())
    }

    /// Discards every queued task
    ///
    /// Discarded tasks never run and their submissions resolve with [`LimitError::Discarded`].
    /// Running tasks are not affected.
    pub fn clear_queue(&self) {
        let mut state = self.lock();
        let discarded = state.clear();
        let idle = state.is_idle();
        drop(state);

        debug!(
            limiter = self.shared.name,
            discarded = discarded.len(),
            "cleared queue"
        );

        drop(discarded);

        if idle {
            self.shared.idle.notify_waiters();
        }
    }

    /// Waits until no task is running or queued
    pub async fn on_idle(&self) {
        loop {
            let mut notified = pin!(self.shared.idle.notified());
            notified.as_mut().enable();

            if self.lock().is_idle() {
                return;
            }

            notified.await;
        }
    }

    /// Appends a ticket to the queue, the receiver gets a [`Permit`] once it is admitted
    pub(crate) fn enqueue(&self) -> oneshot::Receiver<Permit> {
        let (ticket, admission) = oneshot::channel();
        self.lock().enqueue(ticket);
        admission
    }

    /// Admits queued tasks if there is room for them
    pub(crate) fn dispatch(&self) {
        self.admit(self.lock());
    }

    fn release(&self) {
        let mut state = self.lock();
        state.finish();

        trace!(
            limiter = self.shared.name,
            active = state.active(),
            pending = state.pending(),
            "released slot"
        );

        self.admit(state);
    }

    fn admit<'a>(&'a self, mut state: MutexGuard<'a, State<Ticket>>) {
        loop {
            let admitted = state.admit();

            if admitted.is_empty() {
                let idle = state.is_idle();
                drop(state);

                if idle {
                    self.shared.idle.notify_waiters();
                }
                return;
            }

            trace!(
                limiter = self.shared.name,
                admitted = admitted.len(),
                active = state.active(),
                pending = state.pending(),
                "admitted queued tasks"
            );
            drop(state);

            // Tickets of submissions that went away without waiting for a slot
            let abandoned = admitted
                .into_iter()
                .filter_map(|ticket| ticket.send(Permit::new(self.clone())).err())
                .map(Permit::forget)
                .count();

            if abandoned == 0 {
                return;
            }

            state = self.lock();
            state.refund(abandoned);
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<Ticket>> {
        // no user code runs under the lock, so the state is consistent even when poisoned
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Limiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();

        f.debug_struct("Limiter")
            .field("name", &self.shared.name)
            .field("concurrency", &state.concurrency())
            .field("active", &state.active())
            .field("pending", &state.pending())
            .finish()
    }
}

impl Permit {
    fn new(limiter: Limiter) -> Self {
        Self {
            limiter: Some(limiter),
        }
    }

    /// Drops the permit without releasing its slot
    fn forget(mut self) {
        self.limiter = None;
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if let Some(limiter) = self.limiter.take() {
            limiter.release();
        }
    }
}
