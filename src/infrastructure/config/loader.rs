use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid target_score: {0}. Must be between 0 and 10")]
    InvalidTargetScore(f64),

    #[error("Invalid max_cycles: {0}. Must be between 1 and 100")]
    InvalidMaxCycles(u32),

    #[error("Invalid min_roi_ratio: {0}. Must be positive")]
    InvalidRoiRatio(f64),

    #[error("Invalid plateau_threshold: {0}. Must be positive")]
    InvalidPlateauThreshold(f64),

    #[error("Invalid avoid_after_failures: {0}. Cannot be 0")]
    InvalidAvoidThreshold(u32),

    #[error("Invalid max_changes_per_plan: {0}. Must be at least 1")]
    InvalidMaxChanges(usize),

    #[error("Invalid build timeout: {0}. Must be at least 1 second")]
    InvalidBuildTimeout(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Run directory cannot be empty")]
    EmptyRunDir,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .burnish/config.yaml (project config)
    /// 3. .burnish/local.yaml (project local overrides, optional)
    /// 4. Environment variables (BURNISH_* prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.burnish/) so multiple
    /// projects on one machine keep independent settings.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".burnish/config.yaml"))
            .merge(Yaml::file(".burnish/local.yaml"))
            .merge(Env::prefixed("BURNISH_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if !(0.0..=10.0).contains(&config.cycle.target_score) {
            return Err(ConfigError::InvalidTargetScore(config.cycle.target_score));
        }

        if config.cycle.max_cycles == 0 || config.cycle.max_cycles > 100 {
            return Err(ConfigError::InvalidMaxCycles(config.cycle.max_cycles));
        }

        if config.cycle.plateau_threshold <= 0.0 {
            return Err(ConfigError::InvalidPlateauThreshold(
                config.cycle.plateau_threshold,
            ));
        }

        if config.filter.min_roi_ratio <= 0.0 {
            return Err(ConfigError::InvalidRoiRatio(config.filter.min_roi_ratio));
        }

        if config.filter.avoid_after_failures == 0 {
            return Err(ConfigError::InvalidAvoidThreshold(
                config.filter.avoid_after_failures,
            ));
        }

        if config.planner.max_changes_per_plan == 0 {
            return Err(ConfigError::InvalidMaxChanges(
                config.planner.max_changes_per_plan,
            ));
        }

        if config.build.timeout_secs == 0 {
            return Err(ConfigError::InvalidBuildTimeout(config.build.timeout_secs));
        }

        if config.run_dir.is_empty() {
            return Err(ConfigError::EmptyRunDir);
        }

        // Size-policy ceilings must be ordered so a higher effort tier never
        // allows fewer changed lines than a lower one.
        let policy = &config.size_policy;
        if policy.low_effort_max_lines == 0
            || policy.low_effort_max_lines > policy.medium_effort_max_lines
            || policy.medium_effort_max_lines > policy.high_effort_max_lines
        {
            return Err(ConfigError::ValidationFailed(format!(
                "size_policy line ceilings must be ascending and non-zero, got {}/{}/{}",
                policy.low_effort_max_lines,
                policy.medium_effort_max_lines,
                policy.high_effort_max_lines
            )));
        }

        if policy.growth_tiers.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "size_policy.growth_tiers cannot be empty".to_string(),
            ));
        }
        if !policy
            .growth_tiers
            .windows(2)
            .all(|w| w[0].max_lines < w[1].max_lines)
        {
            return Err(ConfigError::ValidationFailed(
                "size_policy.growth_tiers must be ordered by ascending max_lines".to_string(),
            ));
        }

        if config.planner.watch_extensions.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "planner.watch_extensions cannot be empty".to_string(),
            ));
        }

        if config.build.program.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "build.program cannot be empty".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!((config.cycle.target_score - 8.5).abs() < f64::EPSILON);
        assert_eq!(config.cycle.max_cycles, 5);
        assert_eq!(config.run_dir, ".burnish/runs");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
project_path: web-ui
cycle:
  target_score: 9.0
  max_cycles: 8
filter:
  min_roi_ratio: 2.0
build:
  program: pnpm
  args: [build]
logging:
  level: debug
  format: pretty
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.project_path, "web-ui");
        assert!((config.cycle.target_score - 9.0).abs() < f64::EPSILON);
        assert_eq!(config.cycle.max_cycles, 8);
        assert!((config.filter.min_roi_ratio - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.build.program, "pnpm");
        assert_eq!(config.build.args, vec!["build".to_string()]);
        assert_eq!(config.logging.level, "debug");
        // untouched sections keep their defaults
        assert_eq!(config.filter.avoid_after_failures, 5);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_target_score_out_of_range() {
        let mut config = Config::default();
        config.cycle.target_score = 11.0;

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidTargetScore(_)
        ));
    }

    #[test]
    fn test_validate_zero_max_cycles() {
        let mut config = Config::default();
        config.cycle.max_cycles = 0;

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidMaxCycles(0)));
    }

    #[test]
    fn test_validate_negative_roi_ratio() {
        let mut config = Config::default();
        config.filter.min_roi_ratio = -1.0;

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidRoiRatio(_)));
    }

    #[test]
    fn test_validate_zero_avoid_threshold() {
        let mut config = Config::default();
        config.filter.avoid_after_failures = 0;

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidAvoidThreshold(0)
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        match result.unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            _ => panic!("Expected InvalidLogLevel error"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        match result.unwrap_err() {
            ConfigError::InvalidLogFormat(format) => assert_eq!(format, "xml"),
            _ => panic!("Expected InvalidLogFormat error"),
        }
    }

    #[test]
    fn test_validate_unordered_size_ceilings() {
        let mut config = Config::default();
        config.size_policy.medium_effort_max_lines = 5;

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));
    }

    #[test]
    fn test_validate_empty_growth_tiers() {
        let mut config = Config::default();
        config.size_policy.growth_tiers.clear();

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_empty_run_dir() {
        let mut config = Config::default();
        config.run_dir = String::new();

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::EmptyRunDir));
    }

    #[test]
    fn test_env_override() {
        temp_env::with_vars(
            [
                ("BURNISH_CYCLE__MAX_CYCLES", Some("9")),
                ("BURNISH_FILTER__MIN_ROI_RATIO", Some("2.5")),
                ("BURNISH_LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let config: Config = Figment::new()
                    .merge(Serialized::defaults(Config::default()))
                    .merge(Env::prefixed("BURNISH_").split("__"))
                    .extract()
                    .unwrap();

                assert_eq!(config.cycle.max_cycles, 9);
                assert!((config.filter.min_roi_ratio - 2.5).abs() < f64::EPSILON);
                assert_eq!(config.logging.level, "debug");
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "cycle:\n  max_cycles: 4\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "cycle:\n  max_cycles: 7\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.cycle.max_cycles, 7, "Override should win");
        assert_eq!(
            config.logging.level, "debug",
            "Override should win for nested fields"
        );
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }
}
