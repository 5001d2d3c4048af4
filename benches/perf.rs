use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use rivals_tracker::correlate::correlate;
use rivals_tracker::rating::{ESTABLISHED_K, OPPONENT_UNKNOWN, estimate_opponent_elo};
use rivals_tracker::scanner::scan_lines;

fn synthetic_session(matches: usize) -> String {
    let mut log = String::new();
    for m in 0..matches {
        let game_number = 12000 + m as i64;
        for g in 0..3 {
            log.push_str(&format!(
                "[2025.01.11-20.31.55:100][412]LogRivalsXp: RivalsCharacterXpEndMatchReportMessage::OnReceivedFromServer LocalPlayerIndex 0, matchDuration {}\n",
                90 + (m * 7 + g * 13) % 180
            ));
            log.push_str("[2025.01.11-20.32.00:000][413]LogRivalsNet: Returning to character select.\n");
        }
        log.push_str(&format!(
            "[2025.01.11-20.35.12:001][511]LogRivalsRankMessages: URivalsRankUpdateMessage::OnReceivedFromServer LocalPlayerIndex 0: {}, {}, {}, {}, {}, {}\n",
            1000 + m as i64 % 60,
            995 + m as i64 % 60,
            if m % 2 == 0 { 11 } else { -9 },
            game_number,
            40 + m / 2,
            m % 6
        ));
    }
    log
}

fn bench_scan_and_correlate(c: &mut Criterion) {
    let log = synthetic_session(500);
    c.bench_function("scan_lines_500_matches", |b| {
        b.iter(|| {
            let events = scan_lines(black_box(log.as_str()).lines());
            black_box(events.len());
        })
    });

    let events = scan_lines(log.lines());
    c.bench_function("correlate_500_matches", |b| {
        b.iter(|| {
            let timings = correlate(black_box(&events));
            black_box(timings.len());
        })
    });
}

fn bench_rating_estimate(c: &mut Criterion) {
    c.bench_function("estimate_opponent_elo", |b| {
        b.iter(|| {
            let est = estimate_opponent_elo(
                black_box(1009),
                black_box(11),
                true,
                OPPONENT_UNKNOWN,
                3,
                ESTABLISHED_K,
            )
            .expect("valid inputs");
            black_box(est);
        })
    });
}

criterion_group!(benches, bench_scan_and_correlate, bench_rating_estimate);
criterion_main!(benches);
