use std::cell::RefCell;
use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::NaiveDate;

use rivals_tracker::context::{GameContext, MatchContext};
use rivals_tracker::pipeline::{MatchStore, RunOutcome, process};
use rivals_tracker::record::MatchRecord;

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

#[derive(Default)]
struct FakeStore {
    unreachable: bool,
    fail_submits: bool,
    fail_exists_for: Option<i64>,
    known: RefCell<HashSet<i64>>,
    submitted: RefCell<Vec<MatchRecord>>,
}

impl MatchStore for FakeStore {
    fn probe(&self) -> Result<()> {
        if self.unreachable {
            bail!("connection refused");
        }
        Ok(())
    }

    fn exists(&self, ranked_game_number: i64, _: Option<chrono::NaiveDateTime>) -> Result<bool> {
        if self.fail_exists_for == Some(ranked_game_number) {
            bail!("lookup timeout");
        }
        Ok(self.known.borrow().contains(&ranked_game_number))
    }

    fn submit(&self, record: &MatchRecord) -> Result<()> {
        if self.fail_submits {
            bail!("insert rejected");
        }
        self.known.borrow_mut().insert(record.ranked_game_number);
        self.submitted.borrow_mut().push(record.clone());
        Ok(())
    }
}

fn completed(outcome: RunOutcome) -> rivals_tracker::pipeline::ScanReport {
    match outcome {
        RunOutcome::Completed(report) => report,
        RunOutcome::BackendUnavailable => panic!("expected a completed run"),
    }
}

fn sample_context() -> MatchContext {
    MatchContext {
        opponent_elo: 1050,
        opponent_name: "Rook".to_string(),
        games: [
            GameContext {
                char_pick: 2,
                opponent_pick: 7,
                stage: 3,
                winner: 1,
                final_move_id: 21,
                duration: 182,
            },
            GameContext {
                char_pick: 2,
                opponent_pick: 7,
                stage: 5,
                winner: 2,
                final_move_id: 9,
                duration: 240,
            },
            GameContext::default(),
        ],
    }
}

#[test]
fn session_scan_submits_both_matches_with_durations() {
    let store = FakeStore::default();
    let report = completed(
        process(&[fixture("ranked_session.log")], &store, None).expect("scan should run"),
    );

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.submitted, 2);
    assert_eq!(report.records[0].ranked_game_number, 12346);
    assert_eq!(report.records[1].ranked_game_number, 12347);
    // Duplicate 184 report collapses, trailing 142 belongs to the first set.
    assert_eq!(report.records[0].durations, vec![184, 95, 142]);
    assert_eq!(report.records[1].durations, vec![203]);
    assert_eq!(report.rating_summary(), "1020(11),1008(-12)");
}

#[test]
fn second_run_over_the_same_logs_adds_nothing() {
    let store = FakeStore::default();
    let files = [fixture("ranked_session.log")];

    let first = completed(process(&files, &store, None).expect("first run"));
    assert_eq!(first.submitted, 2);

    let second = completed(process(&files, &store, None).expect("second run"));
    assert!(second.records.is_empty());
    assert_eq!(second.submitted, 0);
    assert_eq!(second.skipped_existing, 2);
    assert_eq!(store.submitted.borrow().len(), 2);
}

#[test]
fn dead_store_aborts_before_scanning() {
    let store = FakeStore {
        unreachable: true,
        ..FakeStore::default()
    };
    let outcome = process(&[fixture("ranked_session.log")], &store, None).expect("probe only");
    assert!(matches!(outcome, RunOutcome::BackendUnavailable));
    assert!(store.submitted.borrow().is_empty());
}

#[test]
fn loss_log_end_to_end() {
    let store = FakeStore::default();
    let report =
        completed(process(&[fixture("loss_only.log")], &store, None).expect("loss scan"));

    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.elo_change, -30);
    assert_eq!(record.ranked_game_number, 12345);
    assert!(record.durations.is_empty());
    assert!(!record.is_win());
    // Loss branch estimation: giving up the full K clamps the expected score,
    // so the inferred opponent lands far below our rating.
    assert!(record.opponent_estimated_elo < record.elo_rank_new);
    assert_eq!(
        record.match_date,
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .and_then(|d| d.and_hms_opt(10, 42, 17))
    );
}

#[test]
fn single_new_match_takes_the_player_context() {
    let store = FakeStore::default();
    let report = completed(
        process(&[fixture("loss_only.log")], &store, Some(&sample_context()))
            .expect("context scan"),
    );

    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.opponent_elo, 1050);
    assert_eq!(record.opponent_name, "Rook");
    assert_eq!(record.games[1].stage, 5);
    assert_eq!(record.games[2].char_pick, -1);
    // The submitted copy carries the enrichment too.
    assert_eq!(store.submitted.borrow()[0].opponent_name, "Rook");
}

#[test]
fn two_new_matches_leave_the_context_unapplied() {
    let store = FakeStore::default();
    let report = completed(
        process(
            &[fixture("ranked_session.log")],
            &store,
            Some(&sample_context()),
        )
        .expect("ambiguous scan"),
    );

    assert_eq!(report.records.len(), 2);
    for record in &report.records {
        assert_eq!(record.opponent_elo, -1);
        assert!(record.opponent_name.is_empty());
        assert_eq!(record.games[0].stage, -1);
    }
}

#[test]
fn failed_submits_do_not_block_the_rest() {
    let store = FakeStore {
        fail_submits: true,
        ..FakeStore::default()
    };
    let report = completed(
        process(&[fixture("ranked_session.log")], &store, None).expect("failing submits"),
    );

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.submitted, 0);
    assert_eq!(report.failed_submits, 2);
}

#[test]
fn per_record_lookup_failure_only_skips_that_record() {
    let store = FakeStore {
        fail_exists_for: Some(12346),
        ..FakeStore::default()
    };
    let report = completed(
        process(&[fixture("ranked_session.log")], &store, None).expect("partial lookups"),
    );

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].ranked_game_number, 12347);
    assert_eq!(report.skipped_existing, 1);
}

#[test]
fn sentinel_records_are_never_submitted() {
    let store = FakeStore::default();
    let report = completed(
        process(&[fixture("mixed_quality.log")], &store, None).expect("mixed scan"),
    );

    assert_eq!(report.skipped_unparsed, 1);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].ranked_game_number, 12348);
    // Bad date token on the surviving line: record kept, date null.
    assert!(report.records[0].match_date.is_none());
}

#[test]
fn overlapping_logs_emit_each_counter_once() {
    let store = FakeStore::default();
    let report = completed(
        process(
            &[fixture("ranked_session.log"), fixture("rotated_backup.log")],
            &store,
            None,
        )
        .expect("overlap scan"),
    );

    let numbers: Vec<i64> = report
        .records
        .iter()
        .map(|r| r.ranked_game_number)
        .collect();
    assert_eq!(numbers, vec![12346, 12347, 12300]);
    assert_eq!(report.submitted, 3);
}

#[test]
fn missing_log_file_fails_the_run() {
    let store = FakeStore::default();
    assert!(process(&[fixture("not_there.log")], &store, None).is_err());
}
