//! Application-level configuration loading, including the automation roster and schedule.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::state::{toss::TossRule, workflow::DEFAULT_PLACEHOLDER_BASE};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TEAM_TOSS_BACK_CONFIG_PATH";
/// Default location of the persisted automation schedule.
const DEFAULT_SCHEDULE_PATH: &str = "config/schedule.json";
/// Environment variable that overrides the schedule file location.
const SCHEDULE_PATH_ENV: &str = "TEAM_TOSS_BACK_SCHEDULE_PATH";
const DEFAULT_PHASE_PAUSE_MS: u64 = 1_000;
const DEFAULT_RESULT_PAUSE_MS: u64 = 1_500;

/// Player definition used to seed the pool during automated runs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RosterEntry {
    /// Display name.
    pub name: String,
    /// Optional avatar URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Weight used by the balancing pass.
    pub weight: f64,
}

/// Pauses inserted between automation phases so observers can follow along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutomationPauses {
    /// Pause after seeding, balancing and captain selection.
    pub phase: Duration,
    /// Pause after the toss before the result is shown.
    pub result: Duration,
}

impl AutomationPauses {
    /// No pauses at all, used by tests and immediate replays.
    pub const NONE: Self = Self {
        phase: Duration::ZERO,
        result: Duration::ZERO,
    };
}

impl Default for AutomationPauses {
    fn default() -> Self {
        Self {
            phase: Duration::from_millis(DEFAULT_PHASE_PAUSE_MS),
            result: Duration::from_millis(DEFAULT_RESULT_PAUSE_MS),
        }
    }
}

/// Daily time at which the automation driver fires, persisted between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
pub struct ScheduleConfig {
    /// Local hour (0-23).
    #[validate(range(max = 23))]
    pub hour: u32,
    /// Local minute (0-59).
    #[validate(range(max = 59))]
    pub minute: u32,
    /// Whether the scheduled run is active.
    pub enabled: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hour: 12,
            minute: 0,
            enabled: false,
        }
    }
}

impl ScheduleConfig {
    /// Return the schedule when every field is in range.
    pub fn validated(self) -> Result<Self, ValidationErrors> {
        self.validate()?;
        Ok(self)
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_roster: Vec<RosterEntry>,
    pauses: AutomationPauses,
    schedule_path: PathBuf,
    toss_rule: TossRule,
    placeholder_image_base: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_path(CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH);
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        roster = app_config.default_roster.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document. Absent fields take their default value.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Players seeded into the pool by automated runs.
    pub fn default_roster(&self) -> &[RosterEntry] {
        &self.default_roster
    }

    /// Pauses between automation phases.
    pub fn pauses(&self) -> AutomationPauses {
        self.pauses
    }

    /// File backing the persisted automation schedule.
    pub fn schedule_path(&self) -> &PathBuf {
        &self.schedule_path
    }

    /// Rule deciding who wins the toss.
    pub fn toss_rule(&self) -> TossRule {
        self.toss_rule
    }

    /// Base URL for generated placeholder avatars.
    pub fn placeholder_image_base(&self) -> &str {
        &self.placeholder_image_base
    }

    /// Same configuration with different automation pauses.
    pub fn with_pauses(mut self, pauses: AutomationPauses) -> Self {
        self.pauses = pauses;
        self
    }

    /// Same configuration with a different automation roster.
    pub fn with_default_roster(mut self, roster: Vec<RosterEntry>) -> Self {
        self.default_roster = roster;
        self
    }

    /// Same configuration with a different toss rule.
    pub fn with_toss_rule(mut self, rule: TossRule) -> Self {
        self.toss_rule = rule;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_roster: default_roster(),
            pauses: AutomationPauses::default(),
            schedule_path: resolve_path(SCHEDULE_PATH_ENV, DEFAULT_SCHEDULE_PATH),
            toss_rule: TossRule::default(),
            placeholder_image_base: DEFAULT_PLACEHOLDER_BASE.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    default_roster: Option<Vec<RosterEntry>>,
    #[serde(default)]
    automation: Option<RawAutomation>,
    #[serde(default)]
    schedule_path: Option<PathBuf>,
    #[serde(default)]
    toss_rule: Option<TossRule>,
    #[serde(default)]
    placeholder_image_base: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAutomation {
    phase_pause_ms: Option<u64>,
    result_pause_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let pauses = value
            .automation
            .map(|raw| AutomationPauses {
                phase: Duration::from_millis(raw.phase_pause_ms.unwrap_or(DEFAULT_PHASE_PAUSE_MS)),
                result: Duration::from_millis(
                    raw.result_pause_ms.unwrap_or(DEFAULT_RESULT_PAUSE_MS),
                ),
            })
            .unwrap_or(defaults.pauses);

        Self {
            default_roster: value.default_roster.unwrap_or(defaults.default_roster),
            pauses,
            schedule_path: value.schedule_path.unwrap_or(defaults.schedule_path),
            toss_rule: value.toss_rule.unwrap_or(defaults.toss_rule),
            placeholder_image_base: value
                .placeholder_image_base
                .unwrap_or(defaults.placeholder_image_base),
        }
    }
}

/// Resolve a path taking the environment override into account.
fn resolve_path(env_key: &str, default: &str) -> PathBuf {
    env::var_os(env_key)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Built-in roster shipped with the binary.
fn default_roster() -> Vec<RosterEntry> {
    const PORTRAIT_BASE: &str = "https://resources.pulse.icc-cricket.com/players/284";
    [
        ("Virat Kohli", 164, 72.0),
        ("Rohit Sharma", 107, 78.0),
        ("Joe Root", 303, 70.0),
        ("Steve Smith", 311, 74.0),
        ("Kane Williamson", 440, 71.0),
        ("Babar Azam", 2713, 68.0),
        ("Ben Stokes", 308, 85.0),
        ("Jasprit Bumrah", 1124, 75.0),
        ("Pat Cummins", 488, 83.0),
        ("Kagiso Rabada", 1085, 80.0),
        ("Trent Boult", 969, 76.0),
        ("Rashid Khan", 2245, 65.0),
        ("Jos Buttler", 498, 77.0),
        ("Rishabh Pant", 2972, 74.0),
        ("Shakib Al Hasan", 201, 72.0),
        ("David Warner", 219, 75.0),
    ]
    .into_iter()
    .map(|(name, portrait, weight)| RosterEntry {
        name: name.to_string(),
        image_url: Some(format!("{PORTRAIT_BASE}/{portrait}.png")),
        weight,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.default_roster().len(), 16);
        assert_eq!(config.pauses(), AutomationPauses::default());
        assert_eq!(config.toss_rule(), TossRule::CaptainCall);
        assert_eq!(config.placeholder_image_base(), DEFAULT_PLACEHOLDER_BASE);
    }

    #[test]
    fn document_overrides_fields() {
        let config = AppConfig::from_json(
            r#"{
                "default_roster": [{ "name": "Solo", "weight": 60 }],
                "automation": { "phase_pause_ms": 10 },
                "toss_rule": "fixed_mapping",
                "schedule_path": "/tmp/schedule.json"
            }"#,
        )
        .unwrap();

        assert_eq!(config.default_roster().len(), 1);
        assert_eq!(config.default_roster()[0].image_url, None);
        assert_eq!(config.pauses().phase, Duration::from_millis(10));
        assert_eq!(
            config.pauses().result,
            Duration::from_millis(DEFAULT_RESULT_PAUSE_MS)
        );
        assert_eq!(config.toss_rule(), TossRule::FixedMapping);
        assert_eq!(config.schedule_path(), &PathBuf::from("/tmp/schedule.json"));
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(AppConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn schedule_validation_rejects_out_of_range_values() {
        assert!(ScheduleConfig { hour: 24, minute: 0, enabled: true }.validated().is_err());
        assert!(ScheduleConfig { hour: 7, minute: 60, enabled: true }.validated().is_err());
        assert!(ScheduleConfig { hour: 23, minute: 59, enabled: false }.validated().is_ok());
    }
}
