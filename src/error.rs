use std::{any::Any, convert::Infallible};

use thiserror::Error;
use tokio::task::JoinError;

/// Errors of a [`Limiter`](crate::Limiter) and of tasks submitted to it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LimitError {
    /// Ceiling is not a positive integer nor unbounded, carries the rejected value
    #[error("Expected `concurrency` to be a number from 1 and up, got {0}")]
    InvalidConcurrency(String),

    /// Task was removed from the queue by `clear_queue` and never ran
    #[error("Task was discarded from the queue before it started")]
    Discarded,

    /// Task panicked, carries the panic message
    #[error("Task panicked: {0}")]
    Panicked(String),

    /// Runtime shut down before the task completed
    #[error("Task was cancelled before it completed")]
    Cancelled,
}

impl LimitError {
    pub(crate) fn invalid(value: impl std::fmt::Display) -> Self {
        Self::InvalidConcurrency(value.to_string())
    }
}

impl From<JoinError> for LimitError {
    fn from(error: JoinError) -> Self {
        match error.try_into_panic() {
            Ok(payload) => Self::Panicked(panic_message(payload.as_ref())),
            Err(_) => Self::Cancelled,
        }
    }
}

// Lets `Concurrency` be passed wherever `TryInto<Concurrency>` is accepted
impl From<Infallible> for LimitError {
    fn from(value: Infallible) -> Self {
        match value {}
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }

    match payload.downcast_ref::<String>() {
        Some(message) => message.clone(),
        None => String::from("Box<dyn Any>"),
    }
}
