//! Runtime configuration for the `opsdash` binary.

use std::path::PathBuf;

const DEFAULT_LOG_FILTER: &str = "opsdash=info";
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `tracing-subscriber` env-filter directive.
    pub log_filter: String,
    /// Directory holding one CSV extract per dashboard, used by `run-all`.
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl AppConfig {
    /// Create configuration from environment variables
    pub fn from_environment() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_filter: lookup("OPSDASH_LOG")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.log_filter),
            data_dir: lookup("OPSDASH_DATA_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        }
    }

    /// CLI flags take precedence over the environment.
    pub fn with_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.data_dir = dir;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn environment_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([("OPSDASH_LOG", "debug"), ("OPSDASH_DATA_DIR", "/srv/extracts")]);
        let config = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.data_dir, PathBuf::from("/srv/extracts"));
    }

    #[test]
    fn cli_flag_beats_environment() {
        let config = AppConfig::default().with_data_dir(Some(PathBuf::from("here")));
        assert_eq!(config.data_dir, PathBuf::from("here"));
        let config = AppConfig::default().with_data_dir(None);
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
    }
}
