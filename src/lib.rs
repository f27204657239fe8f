//! Concurrency limiter for async tasks.
//!
//! A [`Limiter`] admits at most a configured number of submitted tasks to run at the
//! same time and queues the rest in submission order. The ceiling can be raised or
//! lowered while tasks are running.
//!
//! ```
//! use std::time::Duration;
//! use task_gate::Limiter;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let limiter = Limiter::new(1).unwrap();
//!
//!     let slow = limiter.submit(|| async {
//!         tokio::time::sleep(Duration::from_millis(20)).await;
//!         "slow"
//!     });
//!     let fast = limiter.submit(|| async { "fast" });
//!
//!     assert_eq!(limiter.pending_count(), 2);
//!     assert_eq!(slow.await.unwrap(), "slow");
//!     assert_eq!(fast.await.unwrap(), "fast");
//! }
//! ```
#![warn(missing_debug_implementations, missing_docs, unreachable_pub)]

pub use concurrency::Concurrency;
pub use error::LimitError;
pub use function::LimitedFunction;
pub use future::Submission;
pub use limiter::Limiter;
pub use settings::LimiterSettings;

mod concurrency;
mod error;
mod function;
mod future;
mod limiter;
mod settings;
mod state;
mod sync;
