use thiserror::Error;
use tracing::info;

use crate::config::{Config, CycleConfig};
use crate::diagnostics::Diagnostics;
use crate::engine::{reduce_cycle, CycleTally};
use crate::log::{read_log, ActionParser, LogError};
use crate::roster::{Roster, RosterError};
use crate::store::AccumulatorStore;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("cycle {cycle}: could not load roster")]
    Roster {
        cycle: u32,
        #[source]
        source: RosterError,
    },
    #[error("cycle {cycle}: could not read action log")]
    Log {
        cycle: u32,
        #[source]
        source: LogError,
    },
}

/// Loads one cycle's roster and log and reduces it.
pub fn process_cycle(
    cycle: &CycleConfig,
    parser: &ActionParser,
    store: &mut AccumulatorStore,
    include_inactive: bool,
    diagnostics: &mut Diagnostics,
) -> Result<CycleTally, CycleError> {
    let number = cycle.cycle_number;
    let roster = Roster::load(&cycle.reviewers_file, number, diagnostics)
        .map_err(|source| CycleError::Roster { cycle: number, source })?;
    let events = read_log(&cycle.log_file, parser)
        .map_err(|source| CycleError::Log { cycle: number, source })?;

    info!(
        cycle = number,
        members = roster.len(),
        events = events.len(),
        "reducing {} .. {}",
        cycle.timestamps.submission,
        cycle.timestamps.camera_ready
    );

    let tally = reduce_cycle(cycle, &roster, &events, diagnostics);
    if include_inactive {
        store.enroll(&roster);
    }
    store.merge_cycle(&tally);
    Ok(tally)
}

/// Runs every configured cycle in order against one shared store.
pub fn run(
    config: &Config,
    include_inactive: bool,
    diagnostics: &mut Diagnostics,
) -> anyhow::Result<AccumulatorStore> {
    let parser = ActionParser::new()?;
    let mut store = AccumulatorStore::new();

    for cycle in &config.cycles {
        let tally = process_cycle(cycle, &parser, &mut store, include_inactive, diagnostics)?;
        info!(
            cycle = tally.cycle,
            reviewers = tally.records.len(),
            ignored = tally.stats.ignored,
            unrecognized = tally.stats.unrecognized,
            unresolved = tally.stats.unresolved,
            decisions = tally.stats.decisions,
            comments = ?tally.stats.comments_by_period,
            "cycle reduced"
        );
    }

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::SAMPLE;
    use crate::models::Identity;
    use std::path::Path;

    const USERS_C1: &str = "\
first,last,email
Avery,Lee,avery@example.com
Jules,Moreno,jules@example.com
Kiara,Patel,kiara@example.com
";

    const USERS_C2: &str = "\
first,last,email
Avery,Lee,avery@example.com
Jules,Moreno,jules@example.com
Rin,Okada,rin@example.com
";

    // Deadlines are 23:59:59 -1100, i.e. 10:59:59 UTC the next day.
    const LOG_C1: &str = "\
date,ipaddr,email,name,affected_email,affected_name,paper,action
2024-07-12 10:00:00 -0400,1.1.1.1,avery@example.com,Avery Lee,,,12,Review 31 submitted: Reviewer A
2024-07-11 10:00:00 -0400,1.1.1.1,jules@example.com,Jules Moreno,,,12,Comment 2 submitted
2024-07-09 10:00:00 -0400,1.1.1.1,jules@example.com,Jules Moreno,,,12,Review 32 submitted: Reviewer B
2024-06-10 09:00:00 -0400,1.1.1.2,chair@example.com,Pat Chair,avery@example.com,Avery Lee,12,Assigned primary review (round R1)
2024-06-10 09:00:00 -0400,1.1.1.2,chair@example.com,Pat Chair,jules@example.com,Jules Moreno,12,Assigned primary review (round R1)
";

    const LOG_C2: &str = "\
date,ipaddr,email,name,affected_email,affected_name,paper,action
2025-03-12 10:00:00 -0400,1.1.1.2,chair@example.com,Pat Chair,jules@example.com,Jules Moreno,5,Set shepherd
2025-01-09 10:00:00 -0500,1.1.1.1,avery@example.com,Avery Lee,,,5,Review 40 submitted: Reviewer A
2025-01-02 09:00:00 -0500,1.1.1.2,chair@example.com,Pat Chair,avery@example.com,Avery Lee,5,Assigned primary review (round R1)
2025-01-02 09:00:00 -0500,1.1.1.2,chair@example.com,Pat Chair,gone@example.com,Gone Member,5,Assigned primary review (round R1)
";

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let files = [
            ("config.toml", SAMPLE),
            ("sp2025c1-users.csv", USERS_C1),
            ("sp2025c2-users.csv", USERS_C2),
            ("sp2025c1-log.csv", LOG_C1),
            ("sp2025c2-log.csv", LOG_C2),
        ];
        for (name, contents) in files {
            std::fs::write(dir.path().join(name), contents).unwrap();
        }
        dir
    }

    fn run_in(dir: &Path, include_inactive: bool) -> (AccumulatorStore, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let config = Config::load(&dir.join("config.toml"), &mut diagnostics).unwrap();
        let store = run(&config, include_inactive, &mut diagnostics).unwrap();
        (store, diagnostics)
    }

    #[test]
    fn aggregates_across_cycles() {
        let dir = workspace();
        let (store, diagnostics) = run_in(dir.path(), true);

        let avery = store.get(&Identity::from_email("avery@example.com")).unwrap();
        assert_eq!(avery.num_assigned_reviews, 2);
        assert_eq!(avery.num_completed_reviews, 2);
        // 2024-07-12 14:00 UTC against 2024-07-11 10:59:59 UTC.
        assert_eq!(avery.sum_days_late, 2);
        assert!(!avery.all_on_time);

        let jules = store.get(&Identity::from_email("jules@example.com")).unwrap();
        assert_eq!(jules.num_completed_reviews, 1);
        assert!(jules.all_on_time);
        assert_eq!(jules.num_comments, 1);
        assert_eq!(jules.num_comments_r1_disc, 1);
        assert_eq!(jules.num_shepherd, 1);

        assert_eq!(diagnostics.count("unresolved actor"), 1);
        assert!(store.get(&Identity::from_email("gone@example.com")).is_none());
    }

    #[test]
    fn inactive_members_are_listed_when_enabled() {
        let dir = workspace();
        let (store, _) = run_in(dir.path(), true);
        assert_eq!(store.len(), 4);
        let (store, _) = run_in(dir.path(), false);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn malformed_log_aborts_the_run() {
        let dir = workspace();
        std::fs::write(
            dir.path().join("sp2025c2-log.csv"),
            LOG_C2.replace("2025-01-09 10:00:00 -0500", "2025-01-09"),
        )
        .unwrap();
        let mut diagnostics = Diagnostics::new();
        let config = Config::load(&dir.path().join("config.toml"), &mut diagnostics).unwrap();
        let err = run(&config, true, &mut diagnostics).unwrap_err();
        match err.downcast_ref::<CycleError>() {
            Some(CycleError::Log { cycle, .. }) => assert_eq!(*cycle, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_roster_is_fatal() {
        let dir = workspace();
        std::fs::remove_file(dir.path().join("sp2025c1-users.csv")).unwrap();
        let mut diagnostics = Diagnostics::new();
        let config = Config::load(&dir.path().join("config.toml"), &mut diagnostics).unwrap();
        let err = run(&config, true, &mut diagnostics).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CycleError>(),
            Some(CycleError::Roster { cycle: 1, .. })
        ));
    }
}
