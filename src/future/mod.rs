//! Futures driving submitted tasks through a limiter

pub(crate) use admission::Admission;
pub use submission::Submission;

mod admission;
mod submission;
