use crate::Concurrency;

/// Configuration of a [`Limiter`](crate::Limiter)
///
/// # Examples
///
/// ```
/// use task_gate::{Concurrency, LimiterSettings};
///
/// let settings = LimiterSettings::default()
///     .with_concurrency("8".parse().unwrap())
///     .with_name("uploads");
///
/// assert_eq!(settings.concurrency(), Concurrency::new(8).unwrap());
/// assert_eq!(settings.name(), "uploads");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimiterSettings {
    concurrency: Concurrency,
    name: &'static str,
}

impl LimiterSettings {
    /// Changes maximum number of concurrently running tasks
    ///
    /// # Arguments
    ///
    /// * `concurrency`: validated ceiling, see [`Concurrency`]
    pub fn with_concurrency(self, concurrency: Concurrency) -> Self {
        Self {
            concurrency,
            ..self
        }
    }

    /// Changes name recorded in log events of the limiter
    ///
    /// # Arguments
    ///
    /// * `name`: label to tell limiters apart in traces
    pub fn with_name(self, name: &'static str) -> Self {
        Self { name, ..self }
    }

    /// Returns configured ceiling
    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Returns configured name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            concurrency: Concurrency::Unbounded,
            name: "limiter",
        }
    }
}
