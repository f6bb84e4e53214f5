use crate::{Error, Result};

/// Number of workers used when none is configured.
pub const DEFAULT_NUM_WORKERS: usize = 4;

/// Upper bound on the pool size. Every worker is a dedicated OS thread.
pub const MAX_WORKERS: usize = 256;

/// Prefix for worker thread names; the worker index is appended.
pub const DEFAULT_THREAD_NAME: &str = "antiprime-worker";

/// Runtime configuration for an [`Engine`].
///
/// # Example
///
/// ```
/// use antiprime::EngineConfig;
///
/// let config = EngineConfig::default().with_num_workers(8);
/// assert!(config.validate().is_ok());
/// assert!(EngineConfig::default().with_num_workers(0).validate().is_err());
/// ```
///
/// [`Engine`]: crate::Engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of worker threads evaluating candidates concurrently.
    pub num_workers: usize,
    /// Prefix used to name worker threads.
    pub thread_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_workers: DEFAULT_NUM_WORKERS,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }
}

impl EngineConfig {
    /// Sets the number of worker threads.
    #[must_use]
    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Sets the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Checks the configuration before any thread is spawned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the pool would be empty, larger
    /// than [`MAX_WORKERS`], or the thread name contains a NUL byte.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(Error::InvalidConfig {
                reason: "num_workers must be greater than 0".to_owned(),
            });
        }
        if self.num_workers > MAX_WORKERS {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "num_workers ({}) exceeds the maximum of {MAX_WORKERS}",
                    self.num_workers
                ),
            });
        }
        if self.thread_name.contains('\0') {
            return Err(Error::InvalidConfig {
                reason: "thread_name must not contain NUL bytes".to_owned(),
            });
        }
        Ok(())
    }
}
