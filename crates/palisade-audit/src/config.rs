//! Configuration types for the publisher.

/// Environment variable enabling debug logging of published envelopes.
pub const DEBUG_ENV: &str = "PALISADE_DEBUG";

/// Environment variable silencing all publishing.
pub const SILENCE_ENV: &str = "PALISADE_SILENCE";

/// Configuration for a [`Publisher`](crate::Publisher).
///
/// Passed explicitly to the publisher's constructor; there is no process-wide
/// publisher or endpoint registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Log the sensitive path list of every published envelope at debug level.
    pub debug: bool,

    /// Drop events instead of publishing them.
    pub silence: bool,
}

impl PublisherConfig {
    /// Creates a configuration with everything disabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            debug: false,
            silence: false,
        }
    }

    /// Reads `PALISADE_DEBUG` and `PALISADE_SILENCE` from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// # Examples
    ///
    /// ```
    /// use palisade_audit::PublisherConfig;
    ///
    /// let config = PublisherConfig::from_lookup(|key| {
    ///     (key == "PALISADE_SILENCE").then(|| "true".to_string())
    /// });
    /// assert!(config.silence);
    /// assert!(!config.debug);
    /// ```
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).is_some_and(|v| is_truthy(&v));

        Self {
            debug: flag(DEBUG_ENV),
            silence: flag(SILENCE_ENV),
        }
    }

    /// Sets debug logging.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets silencing.
    #[must_use]
    pub const fn with_silence(mut self, silence: bool) -> Self {
        self.silence = silence;
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
