//! HotCRP action log: `date,ipaddr,email,name,affected_email,affected_name,paper,action`,
//! newest row first.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexSet};
use serde::Deserialize;
use thiserror::Error;

use crate::config::parse_timestamp;
use crate::models::{Action, ActorText, LogEvent, Round};

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to open log {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
}

#[derive(Debug, Deserialize)]
struct LogRow {
    date: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
    affected_email: String,
    #[serde(default)]
    affected_name: Option<String>,
    paper: String,
    action: String,
}

/// Maps free-text log actions onto [`Action`].
#[derive(Debug)]
pub struct ActionParser {
    assignment: Regex,
    review_submitted: Regex,
    comment_submitted: Regex,
    shepherd: Regex,
    decision: Regex,
    ignored: RegexSet,
}

impl ActionParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(ActionParser {
            assignment: Regex::new(r"^(Assigned|Removed) primary review \(round (R1|R2)\)")?,
            review_submitted: Regex::new(r"^Review \d+ submitted: ")?,
            comment_submitted: Regex::new(r"^Comment \d+ (on submission )?submitted")?,
            shepherd: Regex::new(r"^Set shepherd")?,
            decision: Regex::new(r"^Set decision")?,
            ignored: RegexSet::new([
                r"^Review \d+ edited draft: ",
                r"^Review \d+ edited: ",
                r"^Review \d+ deleted",
                r"^Unsubmitted primary review",
                r"^Response",
                r"^Comment \d+ (on submission )?edited draft",
                r"^Comment \d+ (on submission )?deleted",
                r"^(Assigned|Removed|Changed|Unsubmitted) meta review",
                r"^Download",
                r"^Password",
                r"^Account",
                r"^Paper",
                r"^Sent mail",
                r"^Sending mail",
                r"^Tag",
                r"^Settings edited:",
                r"^(Set|Clear) lead",
            ])?,
        })
    }

    pub fn parse(&self, text: &str) -> Action {
        let text = text.trim();
        if let Some(caps) = self.assignment.captures(text) {
            let round = if &caps[2] == "R1" { Round::R1 } else { Round::R2 };
            return if &caps[1] == "Assigned" {
                Action::ReviewAssigned { round }
            } else {
                Action::ReviewRemoved { round }
            };
        }

        if self.review_submitted.is_match(text) {
            Action::ReviewSubmitted
        } else if self.comment_submitted.is_match(text) {
            Action::CommentPosted
        } else if self.shepherd.is_match(text) {
            Action::ShepherdAssigned
        } else if self.decision.is_match(text) {
            Action::DecisionNotified
        } else if self.ignored.is_match(text) {
            Action::Ignored
        } else {
            Action::Unrecognized(text.to_string())
        }
    }
}

fn actor(email: String, name: Option<String>) -> ActorText {
    ActorText {
        email,
        name: name.filter(|n| !n.trim().is_empty()),
    }
}

fn csv_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.flexible(true);
    builder
}

pub fn read_log(path: &Path, parser: &ActionParser) -> Result<Vec<LogEvent>, LogError> {
    let file = File::open(path).map_err(|source| LogError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_log_from(file, parser)
}

pub fn read_log_from<R: Read>(reader: R, parser: &ActionParser) -> Result<Vec<LogEvent>, LogError> {
    collect(csv_builder().from_reader(reader), parser)
}

fn malformed(line: u64, err: csv::Error) -> LogError {
    LogError::MalformedRow {
        line: err.position().map(|p| p.line()).unwrap_or(line),
        reason: err.to_string(),
    }
}

/// Any row that cannot be read faithfully aborts the whole log.
fn collect<R: Read>(
    mut reader: csv::Reader<R>,
    parser: &ActionParser,
) -> Result<Vec<LogEvent>, LogError> {
    let headers = reader.headers().map_err(|e| malformed(1, e))?.clone();
    let mut record = csv::StringRecord::new();
    let mut events = Vec::new();

    loop {
        let line = reader.position().line();
        if !reader.read_record(&mut record).map_err(|e| malformed(line, e))? {
            break;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(line);
        let row: LogRow = record
            .deserialize(Some(&headers))
            .map_err(|e| malformed(line, e))?;

        let timestamp = parse_timestamp(&row.date).map_err(|e| LogError::MalformedRow {
            line,
            reason: format!("date \"{}\": {e}", row.date),
        })?;

        let action = parser.parse(&row.action);
        let paper = match row.paper.trim() {
            "" => None,
            number => Some(number.parse::<u32>().map_err(|_| LogError::MalformedRow {
                line,
                reason: format!("paper \"{number}\" is not a paper number"),
            })?),
        };
        if paper.is_none() && action.needs_paper() {
            return Err(LogError::MalformedRow {
                line,
                reason: format!("{} has no paper number", action.label()),
            });
        }

        events.push(LogEvent {
            line,
            timestamp,
            actor: actor(row.email, row.name),
            affected: actor(row.affected_email, row.affected_name),
            paper,
            action,
        });
    }

    Ok(events)
}
