//! Configuration model for a refinement run.
//!
//! Loaded hierarchically by the infrastructure config loader (defaults, then
//! `.burnish/config.yaml`, then `.burnish/local.yaml`, then `BURNISH_*`
//! environment variables). Every policy constant the loop uses lives here so
//! thresholds are tunable rather than hardcoded.

use serde::{Deserialize, Serialize};

use super::recommendation::EffortTier;

/// Main configuration structure for Burnish.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Project directory to refine.
    #[serde(default = "default_project_path")]
    pub project_path: String,

    /// Directory run artifacts and memory are persisted under.
    #[serde(default = "default_run_dir")]
    pub run_dir: String,

    /// Control-loop termination and trend thresholds.
    #[serde(default)]
    pub cycle: CycleConfig,

    /// Recommendation filter policy.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Edit-size policy enforced by the executor.
    #[serde(default)]
    pub size_policy: SizePolicy,

    /// Planner constraints and file discovery.
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Build verification command.
    #[serde(default)]
    pub build: BuildConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_project_path() -> String {
    ".".to_string()
}

fn default_run_dir() -> String {
    ".burnish/runs".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_path: default_project_path(),
            run_dir: default_run_dir(),
            cycle: CycleConfig::default(),
            filter: FilterConfig::default(),
            size_policy: SizePolicy::default(),
            planner: PlannerConfig::default(),
            build: BuildConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Control-loop termination and trend thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CycleConfig {
    /// Composite score at which the run terminates successfully.
    #[serde(default = "default_target_score")]
    pub target_score: f64,

    /// Maximum number of cycles before the budget is exhausted.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u32,

    /// |delta| below this counts as a plateau cycle.
    #[serde(default = "default_plateau_threshold")]
    pub plateau_threshold: f64,

    /// Consecutive plateau cycles after which reflection recommends stopping
    /// when no unexplored targets remain.
    #[serde(default = "default_plateau_limit")]
    pub plateau_limit: u32,

    /// Score regression beyond this tolerance triggers a rollback
    /// recommendation.
    #[serde(default = "default_regression_tolerance")]
    pub regression_tolerance: f64,

    /// Number of recent cycles the trend classification averages over.
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
}

const fn default_max_cycles() -> u32 {
    5
}

fn default_target_score() -> f64 {
    8.5
}

fn default_plateau_threshold() -> f64 {
    0.2
}

const fn default_plateau_limit() -> u32 {
    3
}

fn default_regression_tolerance() -> f64 {
    0.2
}

const fn default_trend_window() -> usize {
    3
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            target_score: default_target_score(),
            max_cycles: default_max_cycles(),
            plateau_threshold: default_plateau_threshold(),
            plateau_limit: default_plateau_limit(),
            regression_tolerance: default_regression_tolerance(),
            trend_window: default_trend_window(),
        }
    }
}

/// Recommendation filter policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FilterConfig {
    /// Minimum impact/effort ratio a recommendation must clear.
    #[serde(default = "default_min_roi_ratio")]
    pub min_roi_ratio: f64,

    /// Failures against one target before it is promoted to the avoided set.
    #[serde(default = "default_avoid_after_failures")]
    pub avoid_after_failures: u32,
}

fn default_min_roi_ratio() -> f64 {
    1.5
}

const fn default_avoid_after_failures() -> u32 {
    5
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_roi_ratio: default_min_roi_ratio(),
            avoid_after_failures: default_avoid_after_failures(),
        }
    }
}

/// One file-growth tier: files up to `max_lines` long may grow by up to
/// `max_growth_percent`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GrowthTier {
    /// Upper bound (inclusive) on the file's pre-change line count for this
    /// tier to apply. `usize::MAX` in the last tier catches everything else.
    pub max_lines: usize,
    /// Maximum allowed growth, as a percentage of the pre-change line count.
    pub max_growth_percent: f64,
}

/// Edit-size policy: effort-scaled changed-line ceilings plus size-tiered
/// growth limits. Smaller files tolerate proportionally larger growth, so a
/// 20-line stylesheet can double while a 800-line component cannot be
/// rubber-stamped into a rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SizePolicy {
    /// Changed-line ceiling for low-effort recommendations.
    #[serde(default = "default_low_effort_max_lines")]
    pub low_effort_max_lines: usize,

    /// Changed-line ceiling for medium-effort recommendations.
    #[serde(default = "default_medium_effort_max_lines")]
    pub medium_effort_max_lines: usize,

    /// Changed-line ceiling for high-effort recommendations.
    #[serde(default = "default_high_effort_max_lines")]
    pub high_effort_max_lines: usize,

    /// Growth tiers, ordered by ascending `max_lines`.
    #[serde(default = "default_growth_tiers")]
    pub growth_tiers: Vec<GrowthTier>,
}

const fn default_low_effort_max_lines() -> usize {
    10
}

const fn default_medium_effort_max_lines() -> usize {
    25
}

const fn default_high_effort_max_lines() -> usize {
    50
}

fn default_growth_tiers() -> Vec<GrowthTier> {
    vec![
        GrowthTier {
            max_lines: 50,
            max_growth_percent: 100.0,
        },
        GrowthTier {
            max_lines: 200,
            max_growth_percent: 50.0,
        },
        GrowthTier {
            max_lines: 1000,
            max_growth_percent: 25.0,
        },
        GrowthTier {
            max_lines: usize::MAX,
            max_growth_percent: 10.0,
        },
    ]
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self {
            low_effort_max_lines: default_low_effort_max_lines(),
            medium_effort_max_lines: default_medium_effort_max_lines(),
            high_effort_max_lines: default_high_effort_max_lines(),
            growth_tiers: default_growth_tiers(),
        }
    }
}

impl SizePolicy {
    /// The changed-line ceiling for a given effort tier.
    pub fn max_changed_lines(&self, tier: EffortTier) -> usize {
        match tier {
            EffortTier::Low => self.low_effort_max_lines,
            EffortTier::Medium => self.medium_effort_max_lines,
            EffortTier::High => self.high_effort_max_lines,
        }
    }

    /// The maximum growth percentage for a file of `old_lines` lines.
    pub fn max_growth_percent(&self, old_lines: usize) -> f64 {
        self.growth_tiers
            .iter()
            .find(|t| old_lines <= t.max_lines)
            .map(|t| t.max_growth_percent)
            .unwrap_or(10.0)
    }

    /// Check a plan's aggregate effect against the policy.
    ///
    /// `changed` is the total changed-line count across all touched files;
    /// `file_growth` lists each touched file's pre-change line count and its
    /// observed growth percentage. Returns the violation description on
    /// failure so the executor can log and report it.
    pub fn check(
        &self,
        tier: EffortTier,
        changed: usize,
        file_growth: &[(usize, f64)],
    ) -> Result<(), String> {
        let ceiling = self.max_changed_lines(tier);
        if changed > ceiling {
            return Err(format!(
                "changed {changed} lines, limit for {tier:?} effort is {ceiling}"
            ));
        }
        for (old_lines, growth) in file_growth {
            let allowed = self.max_growth_percent(*old_lines);
            if *growth > allowed {
                return Err(format!(
                    "file of {old_lines} lines grew {growth:.1}%, limit is {allowed:.1}%"
                ));
            }
        }
        Ok(())
    }
}

/// Planner constraints and file discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlannerConfig {
    /// Maximum planned changes per recommendation.
    #[serde(default = "default_max_changes_per_plan")]
    pub max_changes_per_plan: usize,

    /// File extensions included in the planning snapshot.
    #[serde(default = "default_watch_extensions")]
    pub watch_extensions: Vec<String>,

    /// Files larger than this are excluded from the snapshot.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

const fn default_max_changes_per_plan() -> usize {
    5
}

fn default_watch_extensions() -> Vec<String> {
    ["tsx", "ts", "jsx", "js", "css", "scss", "html", "vue", "svelte"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

const fn default_max_file_bytes() -> u64 {
    512 * 1024
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_changes_per_plan: default_max_changes_per_plan(),
            watch_extensions: default_watch_extensions(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

/// Build verification command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BuildConfig {
    /// Program to execute (e.g. `npm`).
    #[serde(default = "default_build_program")]
    pub program: String,

    /// Arguments to pass (e.g. `["run", "build"]`).
    #[serde(default = "default_build_args")]
    pub args: Vec<String>,

    /// Seconds after which the build is treated as failed.
    #[serde(default = "default_build_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_build_program() -> String {
    "npm".to_string()
}

fn default_build_args() -> Vec<String> {
    vec!["run".to_string(), "build".to_string()]
}

const fn default_build_timeout_secs() -> u64 {
    120
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: default_build_program(),
            args: default_build_args(),
            timeout_secs: default_build_timeout_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty.
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Whether to also write a log file into the run directory.
    #[serde(default = "default_log_to_run_dir")]
    pub log_to_run_dir: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

const fn default_log_to_run_dir() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_to_run_dir: default_log_to_run_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_policy_boundary_low_effort() {
        let policy = SizePolicy::default();
        // effort 2 is the Low tier: 10 lines is accepted, 11 rejected
        assert!(policy.check(EffortTier::Low, 10, &[]).is_ok());
        assert!(policy.check(EffortTier::Low, 11, &[]).is_err());
    }

    #[test]
    fn size_policy_growth_tiers_favor_small_files() {
        let policy = SizePolicy::default();
        assert!((policy.max_growth_percent(20) - 100.0).abs() < f64::EPSILON);
        assert!((policy.max_growth_percent(150) - 50.0).abs() < f64::EPSILON);
        assert!((policy.max_growth_percent(5000) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn size_policy_rejects_oversized_growth() {
        let policy = SizePolicy::default();
        // a 500-line file growing 30% exceeds its 25% tier
        assert!(policy.check(EffortTier::High, 5, &[(500, 30.0)]).is_err());
        // a 30-line file doubling is allowed
        assert!(policy.check(EffortTier::High, 5, &[(30, 100.0)]).is_ok());
    }

    #[test]
    fn defaults_match_policy_constants() {
        let config = Config::default();
        assert!((config.filter.min_roi_ratio - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.filter.avoid_after_failures, 5);
        assert!((config.cycle.plateau_threshold - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.planner.max_changes_per_plan, 5);
    }

    #[test]
    fn config_yaml_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.cycle.max_cycles, config.cycle.max_cycles);
        assert_eq!(back.build.program, config.build.program);
    }
}
