//! Configuration for a pool of voting participants.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VotingError};

/// Default prefix for lock and state file names.
pub const DEFAULT_PREFIX: &str = "ballot";

/// Tunables shared by every participant of a run.
///
/// Durations are stored as milliseconds so the struct reads naturally from TOML:
///
/// ```toml
/// prefix = "ballot"
/// base_dir = "/tmp"
/// poll_interval_ms = 1
/// round_pause_ms = 250
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// Prefix for the run directory name
    pub prefix: String,
    /// Directory the run directory is created in
    pub base_dir: PathBuf,
    /// Sleep between completion checks and barrier checks
    pub poll_interval_ms: u64,
    /// Pause the candidate takes after reporting a round
    pub round_pause_ms: u64,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            base_dir: std::env::temp_dir(),
            poll_interval_ms: 1,
            round_pause_ms: 250,
        }
    }
}

impl ElectionConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| VotingError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the run directory prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the base directory
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Set the polling interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the pause between rounds
    pub fn with_round_pause(mut self, pause: Duration) -> Self {
        self.round_pause_ms = pause.as_millis() as u64;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn round_pause(&self) -> Duration {
        Duration::from_millis(self.round_pause_ms)
    }

    /// Reject values that would make the protocol spin or collide on paths
    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(VotingError::Config("prefix cannot be empty".to_string()));
        }
        if self.prefix.contains(std::path::MAIN_SEPARATOR) {
            return Err(VotingError::Config(format!(
                "prefix '{}' cannot contain a path separator",
                self.prefix
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(VotingError::Config(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Paths of the run identified by `session`
    pub fn run_paths(&self, session: u32) -> RunPaths {
        RunPaths::new(self.base_dir.join(format!("{}-{}", self.prefix, session)))
    }
}

/// File locations of one run: two lock files and the shared state region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    dir: PathBuf,
}

impl RunPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn election_lock(&self) -> PathBuf {
        self.dir.join("election.lock")
    }

    pub fn write_lock(&self) -> PathBuf {
        self.dir.join("write.lock")
    }

    pub fn state(&self) -> PathBuf {
        self.dir.join("round.state")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ElectionConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
        assert_eq!(config.round_pause(), Duration::from_millis(250));
    }

    #[test]
    fn test_builder_setters() {
        let config = ElectionConfig::new()
            .with_prefix("vote")
            .with_base_dir("/var/run/vote")
            .with_poll_interval(Duration::from_millis(5))
            .with_round_pause(Duration::ZERO);

        assert_eq!(config.prefix, "vote");
        assert_eq!(config.base_dir, PathBuf::from("/var/run/vote"));
        assert_eq!(config.poll_interval_ms, 5);
        assert_eq!(config.round_pause_ms, 0);
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = ElectionConfig::new().with_poll_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(VotingError::Config(_))));
    }

    #[test]
    fn test_prefix_with_separator_rejected() {
        let config = ElectionConfig::new().with_prefix("a/b");
        assert!(matches!(config.validate(), Err(VotingError::Config(_))));

        let config = ElectionConfig::new().with_prefix("");
        assert!(matches!(config.validate(), Err(VotingError::Config(_))));
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ElectionConfig::from_toml_str("round_pause_ms = 10\n").unwrap();
        assert_eq!(config.round_pause_ms, 10);
        assert_eq!(config.prefix, DEFAULT_PREFIX);
        assert_eq!(config.poll_interval_ms, 1);
    }

    #[test]
    fn test_from_toml_invalid() {
        assert!(ElectionConfig::from_toml_str("poll_interval_ms = \"fast\"").is_err());
        assert!(ElectionConfig::from_toml_str("poll_interval_ms = 0").is_err());
    }

    #[test]
    fn test_run_paths() {
        let config = ElectionConfig::new().with_base_dir("/tmp/x");
        let paths = config.run_paths(42);

        assert_eq!(paths.dir(), Path::new("/tmp/x/ballot-42"));
        assert_eq!(paths.election_lock(), PathBuf::from("/tmp/x/ballot-42/election.lock"));
        assert_eq!(paths.write_lock(), PathBuf::from("/tmp/x/ballot-42/write.lock"));
        assert_eq!(paths.state(), PathBuf::from("/tmp/x/ballot-42/round.state"));
    }
}
