//! Per-list settings.

use std::time::Duration;

/// Settings a list is created with. There is nothing to load from disk or the
/// environment; callers build one in code and pass it to
/// [`SnapList::with_config`](crate::list::SnapList::with_config).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Name attached to every log event the list emits.
    pub label: &'static str,
    /// How long a writer waits for the write lock. `None` waits forever.
    pub lock_timeout: Option<Duration>,
}

impl Config {
    pub const fn new() -> Config {
        return Config {
            label: "snaplist",
            lock_timeout: None,
        };
    }

    pub const fn with_label(mut self, label: &'static str) -> Config {
        self.label = label;
        return self;
    }

    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Config {
        self.lock_timeout = Some(timeout);
        return self;
    }
}

impl Default for Config {
    fn default() -> Self {
        return Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_blocks_forever() {
        let config = Config::default();
        assert_eq!(config.label, "snaplist");
        assert_eq!(config.lock_timeout, None);
    }

    #[test]
    fn builders_chain() {
        let config = Config::new()
            .with_label("jobs")
            .with_lock_timeout(Duration::from_millis(10));
        assert_eq!(config.label, "jobs");
        assert_eq!(config.lock_timeout, Some(Duration::from_millis(10)));
    }
}
