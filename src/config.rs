//! Multi-cycle run configuration.
//!
//! ```toml
//! [general]
//! conference_name = "IEEE S&P 2025"
//!
//! [[cycles]]
//! cycle_number = 1
//! log_file = "sp2025c1-log.csv"
//! reviewers_file = "sp2025c1-users.csv"
//!
//! [cycles.timestamps] # "%Y-%m-%d %H:%M:%S %z"
//! submission = "2024-06-06 23:59:59 -1100"
//! round1_deadline = "2024-07-10 23:59:59 -1100"
//! # ...
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde::Deserialize;
use thiserror::Error;

use crate::diagnostics::{Diagnostics, Warning};
use crate::models::{Round, Timestamp};

/// Shared by the configuration file and the action log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Syntax(#[from] toml::de::Error),
    #[error("configuration lists no cycles")]
    NoCycles,
    #[error("cycle number {0} appears more than once")]
    DuplicateCycle(u32),
    #[error("cycle {cycle}: {field} = \"{value}\" does not match \"%Y-%m-%d %H:%M:%S %z\"")]
    Timestamp {
        cycle: u32,
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("cycle {cycle}: {window} window starts after it ends")]
    InvertedWindow { cycle: u32, window: &'static str },
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    general: RawGeneral,
    #[serde(default)]
    cycles: Vec<RawCycle>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGeneral {
    conference_name: Option<String>,
    include_inactive: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawCycle {
    cycle_number: u32,
    log_file: PathBuf,
    reviewers_file: PathBuf,
    timestamps: RawTimestamps,
}

#[derive(Debug, Deserialize)]
struct RawTimestamps {
    submission: String,
    round1_deadline: String,
    round1_discussion_start: String,
    round1_discussion_end: String,
    round2_deadline: String,
    round2_discussion_start: String,
    round2_discussion_end: String,
    rebuttal_discussion_start: String,
    rebuttal_discussion_end: String,
    acceptance: String,
    camera_ready: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub conference_name: Option<String>,
    pub include_inactive: bool,
    pub cycles: Vec<CycleConfig>,
}

#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub cycle_number: u32,
    pub log_file: PathBuf,
    pub reviewers_file: PathBuf,
    pub timestamps: CycleTimestamps,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleTimestamps {
    pub submission: Timestamp,
    pub round1_deadline: Timestamp,
    pub round1_discussion_start: Timestamp,
    pub round1_discussion_end: Timestamp,
    pub round2_deadline: Timestamp,
    pub round2_discussion_start: Timestamp,
    pub round2_discussion_end: Timestamp,
    pub rebuttal_discussion_start: Timestamp,
    pub rebuttal_discussion_end: Timestamp,
    pub acceptance: Timestamp,
    pub camera_ready: Timestamp,
}

pub fn parse_timestamp(value: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
}

impl Config {
    /// Loads the configuration file, resolving cycle file references
    /// against the configuration's own directory.
    pub fn load(path: &Path, diagnostics: &mut Diagnostics) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&contents, base, diagnostics)
    }

    pub fn parse(
        contents: &str,
        base: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents)?;
        if raw.cycles.is_empty() {
            return Err(ConfigError::NoCycles);
        }

        let mut seen = BTreeSet::new();
        let mut cycles = Vec::with_capacity(raw.cycles.len());
        for cycle in raw.cycles {
            if !seen.insert(cycle.cycle_number) {
                return Err(ConfigError::DuplicateCycle(cycle.cycle_number));
            }
            let timestamps = CycleTimestamps::from_raw(cycle.cycle_number, &cycle.timestamps)?;
            timestamps.validate(cycle.cycle_number, diagnostics)?;
            cycles.push(CycleConfig {
                cycle_number: cycle.cycle_number,
                log_file: base.join(cycle.log_file),
                reviewers_file: base.join(cycle.reviewers_file),
                timestamps,
            });
        }

        Ok(Config {
            conference_name: raw.general.conference_name,
            include_inactive: raw.general.include_inactive.unwrap_or(true),
            cycles,
        })
    }
}

impl CycleTimestamps {
    pub fn deadline(&self, round: Round) -> Timestamp {
        match round {
            Round::R1 => self.round1_deadline,
            Round::R2 => self.round2_deadline,
        }
    }

    fn from_raw(cycle: u32, raw: &RawTimestamps) -> Result<Self, ConfigError> {
        let field = |field: &'static str, value: &str| {
            parse_timestamp(value).map_err(|source| ConfigError::Timestamp {
                cycle,
                field,
                value: value.to_string(),
                source,
            })
        };

        Ok(CycleTimestamps {
            submission: field("submission", &raw.submission)?,
            round1_deadline: field("round1_deadline", &raw.round1_deadline)?,
            round1_discussion_start: field("round1_discussion_start", &raw.round1_discussion_start)?,
            round1_discussion_end: field("round1_discussion_end", &raw.round1_discussion_end)?,
            round2_deadline: field("round2_deadline", &raw.round2_deadline)?,
            round2_discussion_start: field("round2_discussion_start", &raw.round2_discussion_start)?,
            round2_discussion_end: field("round2_discussion_end", &raw.round2_discussion_end)?,
            rebuttal_discussion_start: field(
                "rebuttal_discussion_start",
                &raw.rebuttal_discussion_start,
            )?,
            rebuttal_discussion_end: field("rebuttal_discussion_end", &raw.rebuttal_discussion_end)?,
            acceptance: field("acceptance", &raw.acceptance)?,
            camera_ready: field("camera_ready", &raw.camera_ready)?,
        })
    }

    /// Inverted windows are fatal. An out-of-order deadline chain is only
    /// warned: deadlines are usually given in UTC-11 while discussions use
    /// local time, so a deadline can land after the discussion opens.
    fn validate(&self, cycle: u32, diagnostics: &mut Diagnostics) -> Result<(), ConfigError> {
        let windows = [
            (
                "round 1 discussion",
                self.round1_discussion_start,
                self.round1_discussion_end,
            ),
            (
                "round 2 discussion",
                self.round2_discussion_start,
                self.round2_discussion_end,
            ),
            (
                "rebuttal discussion",
                self.rebuttal_discussion_start,
                self.rebuttal_discussion_end,
            ),
        ];
        for (window, start, end) in windows {
            if start > end {
                return Err(ConfigError::InvertedWindow { cycle, window });
            }
        }

        let chain = [
            ("round1_deadline", self.round1_deadline),
            ("round1_discussion_start", self.round1_discussion_start),
            ("round1_discussion_end", self.round1_discussion_end),
            ("round2_deadline", self.round2_deadline),
        ];
        for pair in chain.windows(2) {
            let (earlier, earlier_at) = pair[0];
            let (later, later_at) = pair[1];
            if earlier_at > later_at {
                diagnostics.push(Warning::SuspiciousConfig {
                    cycle,
                    detail: format!("{earlier} ({earlier_at}) is after {later} ({later_at})"),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"
[general]
conference_name = "IEEE S&P 2025"

[[cycles]]
cycle_number = 1
log_file = "sp2025c1-log.csv"
reviewers_file = "sp2025c1-users.csv"

[cycles.timestamps]
submission = "2024-06-06 23:59:59 -1100"
round1_deadline = "2024-07-10 23:59:59 -1100"
round1_discussion_start = "2024-07-11 00:00:00 -0400"
round1_discussion_end = "2024-07-19 23:59:59 -0400"
round2_deadline = "2024-08-09 23:59:59 -1100"
round2_discussion_start = "2024-08-12 00:00:00 -0400"
round2_discussion_end = "2024-09-08 23:59:59 -0400"
rebuttal_discussion_start = "2024-08-19 00:00:00 -0400"
rebuttal_discussion_end = "2024-08-30 23:59:59 -0400"
acceptance = "2024-09-09 12:00:00 -0400"
camera_ready = "2024-10-18 23:59:59 -1100"

[[cycles]]
cycle_number = 2
log_file = "sp2025c2-log.csv"
reviewers_file = "sp2025c2-users.csv"

[cycles.timestamps]
submission = "2024-11-14 23:59:59 -1100"
round1_deadline = "2025-01-10 23:59:59 -1100"
round1_discussion_start = "2025-01-11 00:00:00 -0500"
round1_discussion_end = "2025-01-17 23:59:59 -0500"
round2_deadline = "2025-02-07 23:59:59 -1100"
round2_discussion_start = "2025-02-10 00:00:00 -0500"
round2_discussion_end = "2025-03-09 23:59:59 -0500"
rebuttal_discussion_start = "2025-02-17 00:00:00 -0400"
rebuttal_discussion_end = "2025-02-28 23:59:59 -0400"
acceptance = "2025-03-10 12:00:00 -0400"
camera_ready = "2025-04-18 23:59:59 -1100"
"#;

    pub(crate) fn ts(value: &str) -> Timestamp {
        parse_timestamp(value).unwrap()
    }

    /// Cycle 1 of the sample configuration, with every instant in one offset.
    pub(crate) fn sample_timestamps() -> CycleTimestamps {
        CycleTimestamps {
            submission: ts("2024-06-06 23:59:59 -0400"),
            round1_deadline: ts("2024-07-10 23:59:59 -0400"),
            round1_discussion_start: ts("2024-07-11 00:00:00 -0400"),
            round1_discussion_end: ts("2024-07-19 23:59:59 -0400"),
            round2_deadline: ts("2024-08-09 23:59:59 -0400"),
            round2_discussion_start: ts("2024-08-12 00:00:00 -0400"),
            round2_discussion_end: ts("2024-09-08 23:59:59 -0400"),
            rebuttal_discussion_start: ts("2024-08-19 00:00:00 -0400"),
            rebuttal_discussion_end: ts("2024-08-30 23:59:59 -0400"),
            acceptance: ts("2024-09-09 12:00:00 -0400"),
            camera_ready: ts("2024-10-18 23:59:59 -0400"),
        }
    }

    pub(crate) fn sample_cycle(cycle_number: u32) -> CycleConfig {
        CycleConfig {
            cycle_number,
            log_file: PathBuf::from("log.csv"),
            reviewers_file: PathBuf::from("users.csv"),
            timestamps: sample_timestamps(),
        }
    }

    #[test]
    fn parses_sample_configuration() {
        let mut diagnostics = Diagnostics::new();
        let config = Config::parse(SAMPLE, Path::new("/data"), &mut diagnostics).unwrap();
        assert_eq!(config.conference_name.as_deref(), Some("IEEE S&P 2025"));
        assert!(config.include_inactive);
        assert_eq!(config.cycles.len(), 2);
        assert_eq!(config.cycles[1].cycle_number, 2);
        assert_eq!(
            config.cycles[0].log_file,
            PathBuf::from("/data/sp2025c1-log.csv")
        );
        assert_eq!(
            config.cycles[0].timestamps.acceptance,
            ts("2024-09-09 12:00:00 -0400")
        );
    }

    #[test]
    fn deadline_in_other_offset_is_only_a_warning() {
        // 23:59:59 -1100 on 07-10 is 10:59:59 UTC on 07-11, after the
        // 04:00 UTC discussion start.
        let mut diagnostics = Diagnostics::new();
        Config::parse(SAMPLE, Path::new(""), &mut diagnostics).unwrap();
        assert_eq!(diagnostics.count("suspicious configuration"), 2);
    }

    #[test]
    fn malformed_timestamp_is_fatal() {
        let broken = SAMPLE.replace("2024-07-19 23:59:59 -0400", "2024-07-19 23:59");
        let err = Config::parse(&broken, Path::new(""), &mut Diagnostics::new()).unwrap_err();
        match err {
            ConfigError::Timestamp { cycle, field, .. } => {
                assert_eq!(cycle, 1);
                assert_eq!(field, "round1_discussion_end");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_field_is_fatal() {
        let broken = SAMPLE.replacen("camera_ready = \"2024-10-18 23:59:59 -1100\"", "", 1);
        let err = Config::parse(&broken, Path::new(""), &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Syntax(_)));
    }

    #[test]
    fn duplicate_cycle_numbers_are_rejected() {
        let broken = SAMPLE.replace("cycle_number = 2", "cycle_number = 1");
        let err = Config::parse(&broken, Path::new(""), &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateCycle(1)));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let broken = SAMPLE.replace(
            "rebuttal_discussion_end = \"2024-08-30 23:59:59 -0400\"",
            "rebuttal_discussion_end = \"2024-08-01 23:59:59 -0400\"",
        );
        let err = Config::parse(&broken, Path::new(""), &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvertedWindow {
                cycle: 1,
                window: "rebuttal discussion"
            }
        ));
    }

    #[test]
    fn empty_cycle_list_is_rejected() {
        let err = Config::parse("[general]\n", Path::new(""), &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, ConfigError::NoCycles));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(Path::new("/nonexistent/config.toml"), &mut Diagnostics::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
