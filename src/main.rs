use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;

use rivals_tracker::backend::Backend;
use rivals_tracker::pipeline::{self, RunOutcome};
use rivals_tracker::{config, correlate};

fn main() -> ExitCode {
    config::load_dotenv();
    env_logger::init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let log_dir = match parse_value_arg(&args, "--log-dir") {
        Some(dir) => PathBuf::from(dir),
        None => config::log_dir()?,
    };

    if args.iter().any(|arg| arg == "--durations") {
        return print_durations(&log_dir);
    }

    let backend = match parse_value_arg(&args, "--backend") {
        Some(base) => Backend::new(base),
        None => Backend::from_env(),
    };

    if args.iter().any(|arg| arg == "--opponents") {
        for name in backend.opponent_names()? {
            println!("{name}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    match backend.fetch_catalog() {
        Ok(catalog) => log::info!(
            "backend catalogs: {} characters, {} stages, {} moves",
            catalog.character_count(),
            catalog.stage_count(),
            catalog.move_count()
        ),
        Err(err) => log::warn!("catalog fetch failed: {err}"),
    }

    let files = config::discover_log_files(&log_dir)?;
    log::debug!(
        "scanning {} log files under {}",
        files.len(),
        log_dir.display()
    );

    // The CLI collects no per-game picks; context enrichment is for callers
    // that do.
    match pipeline::process(&files, &backend, None)? {
        RunOutcome::BackendUnavailable => {
            println!("Could not connect to the match backend.");
            Ok(ExitCode::FAILURE)
        }
        RunOutcome::Completed(report) => {
            if report.records.is_empty() {
                println!("No matches found or no new matches to add.");
            } else {
                let added = report.records.len();
                println!(
                    "Added {added} match{}: {}",
                    if added == 1 { "" } else { "es" },
                    report.rating_summary()
                );
            }
            if report.failed_submits > 0 {
                println!("{} submission(s) failed, see log.", report.failed_submits);
            }
            if let Ok(tier) = backend.current_tier() {
                println!(
                    "Current: {} ({}), game #{}",
                    tier.current_elo, tier.tier_short, tier.last_game_number
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Correlated per-game durations from the live log only; rotated logs have
/// already made it into the backend.
fn print_durations(log_dir: &std::path::Path) -> Result<ExitCode> {
    let live = log_dir.join(config::live_log_name());
    let timings = correlate::correlate_files(&[live])?;

    let mut game_numbers = timings.keys().copied().collect::<Vec<_>>();
    game_numbers.sort_unstable();
    for game_number in game_numbers {
        let Some(timing) = timings.get(&game_number) else {
            continue;
        };
        println!(
            "match {game_number}: rank {} ({:+}) durations {:?}",
            timing.elo_rank_new, timing.elo_change, timing.durations
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn parse_value_arg(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
