use std::{
    future::Future,
    pin::Pin,
    task::{ready, Context, Poll},
};

use tokio::task::JoinHandle;
use tracing::warn;

use crate::LimitError;

/// Handle to a task submitted to a [`Limiter`](crate::Limiter)
///
/// Resolves with the task output once the task was admitted and has run to completion.
/// The task is already scheduled when the handle is created, dropping the handle detaches it.
///
/// # Errors
///
/// * [`LimitError::Discarded`] when the task was removed by [`clear_queue`](crate::Limiter::clear_queue)
/// * [`LimitError::Panicked`] when the task panicked
/// * [`LimitError::Cancelled`] when the runtime shut down before the task completed
#[derive(Debug)]
pub struct Submission<T> {
    handle: JoinHandle<Result<T, LimitError>>,
}

impl<T> Submission<T> {
    pub(crate) fn new(handle: JoinHandle<Result<T, LimitError>>) -> Self {
        Self { handle }
    }

    /// Whether the task has settled or was discarded
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Future for Submission<T> {
    type Output = Result<T, LimitError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(Pin::new(&mut self.handle).poll(cx)) {
            Ok(result) => Poll::Ready(result),
            Err(error) => {
                let error = LimitError::from(error);
                warn!(%error, "submitted task did not complete");
                Poll::Ready(Err(error))
            }
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use std::time::Duration;

    use tokio::{task::yield_now, time::sleep};

    use super::*;
    use crate::Limiter;

    #[tokio::test]
    async fn resolves_with_task_output() {
        let limiter = Limiter::new(1).unwrap();

        assert_eq!(limiter.submit(|| async { 40 + 2 }).await, Ok(42));
    }

    #[tokio::test]
    async fn reports_panic_message_of_task() {
        let limiter = Limiter::new(1).unwrap();

        let result = limiter
            .submit(|| async { panic!("broken task") })
            .await;

        assert_eq!(result, Err(LimitError::Panicked(String::from("broken task"))));
    }

    #[tokio::test(start_paused = true)]
    async fn reports_finished_only_after_task_settles() {
        let limiter = Limiter::new(1).unwrap();

        let submission = limiter.submit(|| sleep(Duration::from_millis(10)));
        yield_now().await;

        assert!(!submission.is_finished());

        sleep(Duration::from_millis(20)).await;

        assert!(submission.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_running_task_after_handle_is_dropped() {
        let limiter = Limiter::new(1).unwrap();
        let (sender, receiver) = tokio::sync::oneshot::channel();

        drop(limiter.submit(move || async move {
            sleep(Duration::from_millis(5)).await;
            sender.send("done").ok();
        }));

        assert_eq!(receiver.await, Ok("done"));
    }
}
