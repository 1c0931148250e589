//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use ts_core::{ExcludePolicy, Hours, TimesheetConfig};

/// Status id the tracker uses for "In Progress".
const IN_PROGRESS_STATUS: &str = "3";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Calendar days to look back, today included.
    pub compute_days: u32,

    /// Working day length and allowances.
    pub hours: Hours,

    /// How interruption hours are deducted.
    pub exclude_policy: ExcludePolicy,

    /// Tracker account whose assignments count as work.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    /// Issue status ids that count as active work.
    pub in_progress_statuses: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compute_days: 10,
            hours: Hours::default(),
            exclude_policy: ExcludePolicy::default(),
            account_id: None,
            in_progress_statuses: vec![IN_PROGRESS_STATUS.to_string()],
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TIMESHEET_*, nested keys split on __)
        figment = figment.merge(Env::prefixed("TIMESHEET_").split("__"));

        figment.extract()
    }

    /// The parameters handed to the timesheet computation.
    pub const fn timesheet(&self) -> TimesheetConfig {
        TimesheetConfig {
            hours: self.hours,
            exclude_policy: self.exclude_policy,
        }
    }
}

/// Returns the platform-specific config directory for timesheet.
///
/// On Linux: `~/.config/timesheet`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("timesheet"))
}

#[cfg(test)]
#[expect(
    clippy::float_cmp,
    reason = "configured hours are exact decimal quarters"
)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_config_path_ends_with_timesheet() {
        let path = dirs_config_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "timesheet");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.compute_days, 10);
        assert_eq!(config.hours.working, 8.0);
        assert_eq!(config.hours.lunch, 1.0);
        assert_eq!(config.hours.interrupts, 2.0);
        assert_eq!(config.exclude_policy, ExcludePolicy::InterruptBudget);
        assert_eq!(config.in_progress_statuses, vec!["3".to_string()]);
        assert!(config.account_id.is_none());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
compute_days = 5
exclude_policy = "none"
account_id = "acc-1"

[hours]
working = 7.5
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.compute_days, 5);
        assert_eq!(config.exclude_policy, ExcludePolicy::None);
        assert_eq!(config.account_id.as_deref(), Some("acc-1"));
        assert_eq!(config.hours.working, 7.5);
        // untouched nested keys keep their defaults
        assert_eq!(config.hours.lunch, 1.0);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.compute_days, Config::default().compute_days);
    }

    #[test]
    fn test_timesheet_config_carries_hours_and_policy() {
        let config = Config {
            exclude_policy: ExcludePolicy::None,
            ..Config::default()
        };
        let timesheet = config.timesheet();
        assert_eq!(timesheet.hours, config.hours);
        assert_eq!(timesheet.exclude_policy, ExcludePolicy::None);
    }
}
