//! Configuration loader
//!
//! Pipeline:
//! 1. Read the YAML file (a missing file and an unreadable one are distinct
//!    errors; an empty file is defaults)
//! 2. Deserialize to [`TrackerConfig`]
//! 3. Apply `PHASEKEEPER_*` environment overrides
//! 4. Validate

use std::path::Path;

use tracing::{debug, warn};

use crate::error::ConfigError;

use super::TrackerConfig;

/// Overrides `ordering.seed`.
pub const ENV_SEED_ORDER: &str = "PHASEKEEPER_SEED_ORDER";

/// Overrides `ordering.tail_gap`.
pub const ENV_TAIL_GAP: &str = "PHASEKEEPER_TAIL_GAP";

/// Overrides `reset_on_round_advance`.
pub const ENV_RESET_ON_ROUND: &str = "PHASEKEEPER_RESET_ON_ROUND";

/// Loads [`TrackerConfig`] from files and the environment.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    skip_env: bool,
}

impl ConfigLoader {
    /// Creates a loader that honours environment overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader that ignores the environment.
    #[must_use]
    pub const fn without_env() -> Self {
        Self { skip_env: true }
    }

    /// Loads the configuration at `path`, or defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or
    /// fails validation.
    pub fn load(&self, path: Option<&Path>) -> Result<TrackerConfig, ConfigError> {
        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None => TrackerConfig::default(),
        };

        if !self.skip_env {
            apply_overrides(&mut config, |name| std::env::var(name).ok());
        }

        let issues = config.validate();
        if !issues.is_empty() {
            return Err(ConfigError::ValidationFailed {
                path: path.map_or_else(|| "<defaults>".to_string(), |p| p.display().to_string()),
                issues,
            });
        }

        debug!(?config, "tracker configuration loaded");
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<TrackerConfig, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::MissingFile {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);

        if raw.trim().is_empty() {
            return Ok(TrackerConfig::default());
        }

        serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Applies environment overrides read through `lookup`.
///
/// Unparseable values are logged and ignored.
pub fn apply_overrides(config: &mut TrackerConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(seed) = parse_var(&lookup, ENV_SEED_ORDER) {
        config.ordering.seed = seed;
    }
    if let Some(gap) = parse_var(&lookup, ENV_TAIL_GAP) {
        config.ordering.tail_gap = gap;
    }
    if let Some(reset) = parse_var(&lookup, ENV_RESET_ON_ROUND) {
        config.reset_on_round_advance = reset;
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    raw.trim().parse().map_or_else(
        |_| {
            warn!(var = name, value = %raw, "ignoring unparseable environment override");
            None
        },
        Some,
    )
}
