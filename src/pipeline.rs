use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::context::MatchContext;
use crate::correlate::{self, MatchTiming};
use crate::record::{self, MatchRecord};
use crate::scanner::{self, MatchEvent};

/// Collaborator seam: connectivity probe, season-scoped existence check,
/// record submission. Network-backed in production, in-memory in tests.
pub trait MatchStore {
    fn probe(&self) -> Result<()>;
    fn exists(&self, ranked_game_number: i64, match_date: Option<NaiveDateTime>) -> Result<bool>;
    fn submit(&self, record: &MatchRecord) -> Result<()>;
}

/// Distinguishes "the run never happened" from "the run found nothing new".
#[derive(Debug)]
pub enum RunOutcome {
    BackendUnavailable,
    Completed(ScanReport),
}

#[derive(Debug, Default)]
pub struct ScanReport {
    /// New records in discovery order, whether or not their submit succeeded.
    pub records: Vec<MatchRecord>,
    pub submitted: usize,
    pub failed_submits: usize,
    pub skipped_existing: usize,
    pub skipped_unparsed: usize,
}

impl ScanReport {
    /// Compact `new_elo(delta)` listing for the user-facing summary.
    pub fn rating_summary(&self) -> String {
        self.records
            .iter()
            .map(|r| format!("{}({})", r.elo_rank_new, r.elo_change))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Scans the given logs, deduplicates against the store, applies player
/// context when attribution is unambiguous, and submits what is left.
///
/// A dead store aborts the run up front. After that, a store failure only
/// costs its own record: a failed existence check skips the candidate (the
/// next scan of these immutable logs retries it, so skipping cannot lose
/// data, while submitting blind could duplicate it), and a failed submit
/// never blocks the remaining submissions.
pub fn process(
    log_files: &[PathBuf],
    store: &dyn MatchStore,
    context: Option<&MatchContext>,
) -> Result<RunOutcome> {
    if let Err(err) = store.probe() {
        log::warn!("match store unreachable, aborting run: {err}");
        return Ok(RunOutcome::BackendUnavailable);
    }

    let mut report = ScanReport::default();
    let candidates = collect_candidates(log_files)?;
    log::debug!("scan produced {} candidate records", candidates.len());

    let mut fresh: Vec<MatchRecord> = Vec::new();
    let mut seen: HashSet<i64> = HashSet::new();
    for candidate in candidates {
        if candidate.is_parse_failure() {
            log::warn!("dropping unparseable rank-update record");
            report.skipped_unparsed += 1;
            continue;
        }
        // Overlapping live and rotated logs surface the same counter twice;
        // one record per counter, first discovery wins.
        if !seen.insert(candidate.ranked_game_number) {
            report.skipped_existing += 1;
            continue;
        }
        match store.exists(candidate.ranked_game_number, candidate.match_date) {
            Ok(true) => {
                log::debug!("match {} already recorded", candidate.ranked_game_number);
                report.skipped_existing += 1;
            }
            Ok(false) => fresh.push(candidate),
            Err(err) => {
                log::error!(
                    "existence check failed for match {}, skipping it this run: {err}",
                    candidate.ranked_game_number
                );
                report.skipped_existing += 1;
            }
        }
    }

    if let Some(ctx) = context {
        if let [only] = fresh.as_mut_slice() {
            ctx.apply_to(only);
        } else if fresh.len() > 1 {
            log::info!(
                "{} new matches found, player context not applied (ambiguous attribution)",
                fresh.len()
            );
        }
    }

    for record in &fresh {
        match store.submit(record) {
            Ok(()) => {
                log::info!(
                    "submitted match {} rank {} ({:+})",
                    record.ranked_game_number,
                    record.elo_rank_new,
                    record.elo_change
                );
                report.submitted += 1;
            }
            Err(err) => {
                log::error!(
                    "submit failed for match {}: {err}",
                    record.ranked_game_number
                );
                report.failed_submits += 1;
            }
        }
    }

    report.records = fresh;
    Ok(RunOutcome::Completed(report))
}

/// Runs scanner, parser and correlator over every file, preserving file and
/// line discovery order, and attaches correlated durations by game counter.
fn collect_candidates(log_files: &[PathBuf]) -> Result<Vec<MatchRecord>> {
    let mut timings: HashMap<i64, MatchTiming> = HashMap::new();
    let mut candidates = Vec::new();

    for path in log_files {
        let events = scanner::scan_file(path)?;
        timings.extend(correlate::correlate(&events));
        for event in &events {
            if let MatchEvent::RankUpdate(rank) = event {
                candidates.push(record::parse(rank));
            }
        }
    }

    for candidate in &mut candidates {
        if let Some(timing) = timings.get(&candidate.ranked_game_number) {
            candidate.durations = timing.durations.clone();
        }
    }
    Ok(candidates)
}
