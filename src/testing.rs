//! Test fixtures for item states, response histories and replayable randomness.
//!
//! Compiled for unit tests and behind the `testing` feature for downstream crates.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::ability::ResponseRecord;
use crate::domain::ItemState;
use crate::srs::SessionItem;

/// Seed shared by all fixture RNGs.
pub const FIXTURE_SEED: u64 = 42;

/// Reference instant used by fixtures that need a clock.
pub fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Deterministic RNG so fuzzed intervals replay exactly.
pub fn fixed_rng() -> StdRng {
    StdRng::seed_from_u64(FIXTURE_SEED)
}

/// State of an item reviewed once at `fixture_now() - 1 day` with the given counters.
pub fn reviewed_state(ease_factor: f64, interval: f64, repetitions: u32) -> ItemState {
    ItemState {
        ease_factor,
        interval,
        repetitions,
        streak: repetitions,
        last_review: Some(fixture_now() - Duration::days(1)),
        ..ItemState::default()
    }
}

/// Item whose review came due `overdue_days` days (plus one hour) before `fixture_now()`.
pub fn overdue_state(overdue_days: i64) -> ItemState {
    let due = fixture_now() - Duration::days(overdue_days) - Duration::hours(1);
    ItemState {
        repetitions: 3,
        streak: 3,
        interval: 10.0,
        last_review: Some(due - Duration::days(10)),
        next_review: Some(due),
        ..ItemState::default()
    }
}

/// Item scheduled in the future with perfect retention.
pub fn scheduled_state(days_ahead: i64) -> ItemState {
    ItemState {
        repetitions: 3,
        streak: 3,
        interval: 10.0,
        last_review: Some(fixture_now() - Duration::days(1)),
        next_review: Some(fixture_now() + Duration::days(days_ahead)),
        ..ItemState::default()
    }
}

/// Session candidate with default timing and no difficulty.
pub fn session_item(id: &str, state: ItemState) -> SessionItem {
    SessionItem {
        id: id.to_string(),
        state,
        estimated_minutes: None,
        difficulty: None,
    }
}

/// Response answered `minutes_ago` minutes before `fixture_now()`.
pub fn response(correct: bool, difficulty: f64, discrimination: f64, minutes_ago: i64) -> ResponseRecord {
    ResponseRecord {
        correct,
        question_difficulty: difficulty,
        question_discrimination: discrimination,
        answered_at: fixture_now() - Duration::minutes(minutes_ago),
        subject_id: None,
    }
}

/// Chronological history (oldest first) following `pattern`, one minute apart.
pub fn history(pattern: &[bool], difficulty: f64, discrimination: f64) -> Vec<ResponseRecord> {
    let len = pattern.len() as i64;
    pattern
        .iter()
        .enumerate()
        .map(|(i, &correct)| response(correct, difficulty, discrimination, len - i as i64))
        .collect()
}
