use std::{
    future::Future,
    mem,
    pin::Pin,
    task::{ready, Context, Poll},
};

use pin_project_lite::pin_project;
use tokio::sync::oneshot;

use crate::{limiter::Permit, LimitError, Limiter};

enum Stage<F, A> {
    Queued {
        ticket: oneshot::Receiver<Permit>,
        task: F,
        args: A,
    },
    Running(Permit),
    Complete,
}

pin_project! {
    /// Waits for its ticket to be admitted, then runs the task while holding the permit.
    ///
    /// The first poll lets the limiter admit queued tickets, so a submission
    /// becomes active one scheduler tick after it was made.
    /// Dropping it at any stage gives the slot back.
    pub(crate) struct Admission<F, A, Fut> {
        #[pin]
        running: Option<Fut>,
        stage: Stage<F, A>,
        limiter: Limiter,
        dispatched: bool,
    }
}

impl<F, A, Fut> Admission<F, A, Fut>
where
    F: FnOnce(A) -> Fut,
    Fut: Future,
{
    pub(crate) fn new(
        limiter: Limiter,
        ticket: oneshot::Receiver<Permit>,
        task: F,
        args: A,
    ) -> Self {
        Self {
            running: None,
            stage: Stage::Queued { ticket, task, args },
            limiter,
            dispatched: false,
        }
    }
}

impl<F, A, Fut> Future for Admission<F, A, Fut>
where
    F: FnOnce(A) -> Fut,
    Fut: Future,
{
    type Output = Result<Fut::Output, LimitError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        if !*this.dispatched {
            *this.dispatched = true;
            this.limiter.dispatch();
        }

        loop {
            match &mut *this.stage {
                Stage::Queued { ticket, .. } => {
                    let permit = match ready!(Pin::new(ticket).poll(cx)) {
                        Ok(permit) => permit,
                        Err(_) => {
                            *this.stage = Stage::Complete;
                            return Poll::Ready(Err(LimitError::Discarded));
                        }
                    };

                    // permit is stored before the task is invoked, so a panicking task still frees it
                    match mem::replace(&mut *this.stage, Stage::Running(permit)) {
                        Stage::Queued { task, args, .. } => this.running.set(Some(task(args))),
                        _ => unreachable!(),
                    }
                }
                Stage::Running(_) => {
                    let output = match this.running.as_mut().as_pin_mut() {
                        Some(running) => ready!(running.poll(cx)),
                        None => unreachable!(),
                    };

                    this.running.set(None);
                    *this.stage = Stage::Complete;

                    return Poll::Ready(Ok(output));
                }
                Stage::Complete => panic!("`Admission` polled after completion"),
            }
        }
    }
}
