use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::diagnostics::{Diagnostics, Warning};
use crate::models::{normalize_email, normalize_name, ActorText, Identity};

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to open roster {}", path.display())]
    Open {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed roster row: {0}")]
    Row(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub identity: Identity,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Resolution<'a> {
    Resolved(&'a Member),
    Unresolved(String),
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    first: String,
    last: String,
    email: String,
}

fn csv_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.flexible(true).trim(csv::Trim::All);
    builder
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameMatch {
    Unique(usize),
    Ambiguous,
}

/// Committee members for one cycle, keyed by email with name as fallback.
#[derive(Debug, Default)]
pub struct Roster {
    members: Vec<Member>,
    by_email: BTreeMap<Identity, usize>,
    by_name: HashMap<String, NameMatch>,
}

impl Roster {
    pub fn load(path: &Path, cycle: u32, diagnostics: &mut Diagnostics) -> Result<Self, RosterError> {
        let file = File::open(path).map_err(|source| RosterError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, cycle, diagnostics)
    }

    /// Reads a HotCRP user export (`first,last,email,...` with a header row).
    pub fn from_reader<R: Read>(
        reader: R,
        cycle: u32,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, RosterError> {
        Self::collect(csv_builder().from_reader(reader), cycle, diagnostics)
    }

    fn collect<R: Read>(
        mut reader: csv::Reader<R>,
        cycle: u32,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, RosterError> {
        let mut roster = Roster::default();

        for result in reader.deserialize::<RosterRow>() {
            let row = result?;
            let full_name = format!("{} {}", row.first, row.last).trim().to_string();
            if !roster.insert(&full_name, &row.email) {
                diagnostics.push(Warning::DuplicateRosterEntry {
                    cycle,
                    email: row.email.clone(),
                });
            }
        }

        Ok(roster)
    }

    /// Returns false when the email is already on the roster; the first row wins.
    pub fn insert(&mut self, full_name: &str, email: &str) -> bool {
        let identity = Identity::from_email(email);
        let index = self.members.len();
        match self.by_email.entry(identity.clone()) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(slot) => {
                slot.insert(index);
            }
        }

        self.by_name
            .entry(normalize_name(full_name))
            .and_modify(|existing| *existing = NameMatch::Ambiguous)
            .or_insert(NameMatch::Unique(index));
        self.members.push(Member {
            identity,
            full_name: full_name.to_string(),
            email: email.trim().to_string(),
        });
        true
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn resolve(&self, actor: &ActorText) -> Resolution<'_> {
        let email = normalize_email(&actor.email);
        if !email.is_empty() {
            if let Some(&index) = self.by_email.get(&Identity::from_email(&email)) {
                return Resolution::Resolved(&self.members[index]);
            }
        }

        if let Some(name) = actor.name.as_deref() {
            if let Some(NameMatch::Unique(index)) = self.by_name.get(&normalize_name(name)) {
                return Resolution::Resolved(&self.members[*index]);
            }
        }

        Resolution::Unresolved(actor.to_string())
    }
}
