use std::{fmt, num::NonZeroUsize, str::FromStr};

use crate::LimitError;

/// Maximum number of tasks a [`Limiter`](crate::Limiter) runs at once
///
/// Either a positive number of slots or no ceiling at all.
///
/// # Examples
///
/// ```
/// use task_gate::Concurrency;
///
/// assert_eq!(Concurrency::try_from(4usize).unwrap().get(), Some(4));
/// assert_eq!(Concurrency::try_from(f64::INFINITY).unwrap(), Concurrency::Unbounded);
/// assert!(Concurrency::try_from(0usize).is_err());
/// assert!("1.5".parse::<Concurrency>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Concurrency {
    /// At most this many tasks run at the same time
    Limited(NonZeroUsize),
    /// Every submitted task is admitted right away
    #[default]
    Unbounded,
}

impl Concurrency {
    /// Creates a limited ceiling, rejecting zero
    pub fn new(value: usize) -> Result<Self, LimitError> {
        NonZeroUsize::new(value)
            .map(Self::Limited)
            .ok_or_else(|| LimitError::invalid(value))
    }

    /// Returns the ceiling, `None` when unbounded
    pub fn get(&self) -> Option<usize> {
        match self {
            Self::Limited(value) => Some(value.get()),
            Self::Unbounded => None,
        }
    }

    /// Whether one more task fits next to `active` running ones
    #[inline]
    pub fn allows(&self, active: usize) -> bool {
        match self {
            Self::Limited(value) => active < value.get(),
            Self::Unbounded => true,
        }
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(value) => write!(f, "{value}"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

impl From<NonZeroUsize> for Concurrency {
    fn from(value: NonZeroUsize) -> Self {
        Self::Limited(value)
    }
}

impl TryFrom<usize> for Concurrency {
    type Error = LimitError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

macro_rules! concurrency_from_integer {
    ($($integer:ty),*) => {
        $(
            impl TryFrom<$integer> for Concurrency {
                type Error = LimitError;

                fn try_from(value: $integer) -> Result<Self, Self::Error> {
                    usize::try_from(value)
                        .map_err(|_| LimitError::invalid(value))
                        .and_then(Self::new)
                }
            }
        )*
    };
}

concurrency_from_integer!(u32, u64, i32, i64);

impl TryFrom<f64> for Concurrency {
    type Error = LimitError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value == f64::INFINITY {
            return Ok(Self::Unbounded);
        }

        // NaN and negative infinity fail the fract check
        if value.fract() != 0.0 || value < 1.0 || value > usize::MAX as f64 {
            return Err(LimitError::invalid(value));
        }

        Self::new(value as usize)
    }
}

impl TryFrom<Option<usize>> for Concurrency {
    type Error = LimitError;

    fn try_from(value: Option<usize>) -> Result<Self, Self::Error> {
        match value {
            Some(value) => Self::new(value),
            None => Err(LimitError::invalid("nothing")),
        }
    }
}

impl TryFrom<&str> for Concurrency {
    type Error = LimitError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Concurrency {
    type Err = LimitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();

        if ["unbounded", "infinity", "inf"]
            .iter()
            .any(|keyword| trimmed.eq_ignore_ascii_case(keyword))
        {
            return Ok(Self::Unbounded);
        }

        trimmed
            .parse::<usize>()
            .map_err(|_| LimitError::invalid(format!("{value:?}")))
            .and_then(Self::new)
    }
}
