use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod group;
pub mod log;

pub use group::{GroupConfig, TopicConfig};
pub use log::LogConfig;

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub group: GroupConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.group.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::assignment::AssignmentStrategy;
    use std::io::Write;
    use std::time::Duration;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_yaml_with_humantime_durations() {
        let file = write_config(
            r#"
group:
  group_id: demo
  session_timeout: 10s
  tick_interval: 500ms
  strategy: sticky
  topics:
    - name: user-actions
      partitions: 6
log:
  level: debug
"#,
        );

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.group.group_id, "demo");
        assert_eq!(config.group.session_timeout, Duration::from_secs(10));
        assert_eq!(config.group.tick_interval, Some(Duration::from_millis(500)));
        assert_eq!(config.group.strategy, AssignmentStrategy::Sticky);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn missing_optional_sections_use_defaults() {
        let file = write_config(
            r#"
group:
  topics:
    - name: user-actions
      partitions: 3
"#,
        );

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.group.group_id, "visual-demo-group");
        assert_eq!(config.group.strategy, AssignmentStrategy::Range);
        assert_eq!(config.group.session_timeout, Duration::from_secs(10));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn invalid_group_is_rejected_on_load() {
        let file = write_config(
            r#"
group:
  session_timeout: 0s
  topics:
    - name: user-actions
      partitions: 3
"#,
        );

        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration(_)));
    }

    #[test]
    fn unknown_strategy_is_a_parse_error() {
        let file = write_config(
            r#"
group:
  strategy: cooperative
  topics:
    - name: user-actions
      partitions: 3
"#,
        );

        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from_file(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
