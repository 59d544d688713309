//! Single reporting point for failing systems.

use std::fmt;
use std::sync::Arc;

use super::group::SystemGroup;

/// One failed system run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemFailure {
    /// Name of the failing system.
    pub system: &'static str,
    /// Group it was running in.
    pub group: SystemGroup,
    /// Rendered error.
    pub message: String,
}

impl fmt::Display for SystemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}: {}", self.system, self.group, self.message)
    }
}

type FailureCallback = dyn Fn(&SystemFailure) + Send + Sync;

/// Logs system failures and forwards them to an optional callback.
///
/// Owned by one scheduler; nothing here is global.
#[derive(Clone, Default)]
pub struct FailureReporter {
    callback: Option<Arc<FailureCallback>>,
}

impl FailureReporter {
    /// A reporter that only logs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A reporter that logs and then calls `callback`.
    #[must_use]
    pub fn with_callback<F>(callback: F) -> Self
    where
        F: Fn(&SystemFailure) + Send + Sync + 'static,
    {
        Self {
            callback: Some(Arc::new(callback)),
        }
    }

    /// Reports one failure.
    pub fn report(&self, failure: &SystemFailure) {
        tracing::error!(
            system = failure.system,
            group = %failure.group,
            error = %failure.message,
            "system failed"
        );
        if let Some(callback) = &self.callback {
            callback(failure);
        }
    }
}

impl fmt::Debug for FailureReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureReporter")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
