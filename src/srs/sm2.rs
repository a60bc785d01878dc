//! SM-2+ item scheduling.
//!
//! Classic SM-2 ease/interval updates extended with a quality-scaled interval,
//! context modifiers and fuzz for mature items, plus sticky leech and
//! graduation flags.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ContextModifiers, SchedulerConfig};
use crate::domain::{
  ItemState, ItemStatus, PreviousResult, Quality, ReviewContext, ReviewError, TimeOfDay,
};
use crate::srs::forgetting::{compute_stats_with, ItemStats};

/// New state together with the metrics derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
  pub state: ItemState,
  pub stats: ItemStats,
  pub status: ItemStatus,
}

/// Fresh state for an item that has never been reviewed.
pub fn initial_state(config: &SchedulerConfig) -> ItemState {
  ItemState {
    ease_factor: config.initial_ease_factor,
    interval: config.min_interval_days,
    ..ItemState::default()
  }
}

/// Apply one review to `state`.
///
/// Quality below `success_threshold` is a lapse: the item restarts at a one
/// day interval. Otherwise the interval grows 1 → 6 → previous × ease, each
/// scaled by the quality factor. Randomness is only drawn for the fuzz of
/// mature intervals, and not at all when fuzz is disabled.
pub fn schedule_review<R: Rng>(
  state: &ItemState,
  quality: Quality,
  context: &ReviewContext,
  reviewed_at: DateTime<Utc>,
  config: &SchedulerConfig,
  rng: &mut R,
) -> ItemState {
  let q = quality.value();
  let mut next = state.clone();
  next.last_review = Some(reviewed_at);

  if q < config.success_threshold {
    let penalty = 0.2 + 0.04 * (2.0 - f64::from(q));
    next.ease_factor =
      (state.ease_factor - penalty).clamp(config.min_ease_factor, config.max_ease_factor);
    next.repetitions = 0;
    next.interval = config.min_interval_days;
    next.lapses = state.lapses.saturating_add(1);
    next.streak = 0;

    if next.lapses >= config.leech_threshold && !next.is_leech {
      next.is_leech = true;
      next.leech_since = Some(reviewed_at);
      tracing::info!(lapses = next.lapses, "Item flagged as leech");
      crate::profile_log!(crate::profiling::EventType::LeechFlagged { lapses: next.lapses });
    }

    next.next_review = Some(add_days(reviewed_at, next.interval));
    log_outcome(state, &next, q);
    return next;
  }

  // EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))
  let miss = 5.0 - f64::from(q);
  let ease_delta = 0.1 - miss * (0.08 + miss * 0.02);
  next.ease_factor =
    (state.ease_factor + ease_delta).clamp(config.min_ease_factor, config.max_ease_factor);
  next.repetitions = state.repetitions.saturating_add(1);
  next.streak = state.streak.saturating_add(1);

  let quality_factor = config.quality_factor(q);
  let interval = match next.repetitions {
    1 => 1.0 * quality_factor,
    2 => 6.0 * quality_factor,
    _ => {
      let base = state.interval * next.ease_factor * quality_factor;
      let modified = base * context_multiplier(context, &config.modifiers);
      (modified * fuzz_factor(config, rng)).round()
    }
  };
  next.interval = if interval.is_finite() {
    interval.clamp(config.min_interval_days, config.max_interval_days)
  } else {
    config.min_interval_days
  };
  next.next_review = Some(add_days(reviewed_at, next.interval));

  if next.interval >= config.graduation_interval_days && !next.graduated {
    next.graduated = true;
    tracing::debug!(interval = next.interval, "Item graduated");
  }

  log_outcome(state, &next, q);
  next
}

/// Validate raw input, default a missing state and schedule the review.
pub fn review<R: Rng>(
  state: Option<&ItemState>,
  quality: i64,
  context: &ReviewContext,
  reviewed_at: DateTime<Utc>,
  config: &SchedulerConfig,
  rng: &mut R,
) -> Result<ReviewOutcome, ReviewError> {
  let quality = Quality::new(quality)?;
  let current = match state {
    Some(s) => s.clone(),
    None => initial_state(config),
  };

  let state = crate::profile_scope!("schedule_review", {
    schedule_review(&current, quality, context, reviewed_at, config, rng)
  });
  let stats = compute_stats_with(&state, config);
  let status = state.status();

  Ok(ReviewOutcome { state, stats, status })
}

/// Product of all context multipliers that apply.
pub fn context_multiplier(context: &ReviewContext, modifiers: &ContextModifiers) -> f64 {
  let mut multiplier = 1.0;

  multiplier *= match context.time_of_day {
    Some(TimeOfDay::Morning) => modifiers.morning,
    Some(TimeOfDay::Night) => modifiers.night,
    _ => 1.0,
  };

  if let Some(streak) = context.study_streak {
    if streak >= modifiers.long_streak_days {
      multiplier *= modifiers.long_streak_bonus;
    } else if streak >= modifiers.short_streak_days {
      multiplier *= modifiers.short_streak_bonus;
    }
  }

  multiplier *= match context.previous_result {
    Some(PreviousResult::Correct) => modifiers.previous_correct,
    Some(PreviousResult::Wrong) => modifiers.previous_wrong,
    None => 1.0,
  };

  if let Some(difficulty) = context.subject_difficulty.filter(|d| d.is_finite()) {
    let difficulty = difficulty.clamp(0.0, modifiers.max_subject_difficulty);
    multiplier *= modifiers.difficulty_base - difficulty * modifiers.difficulty_slope;
  }

  multiplier
}

fn fuzz_factor<R: Rng>(config: &SchedulerConfig, rng: &mut R) -> f64 {
  let [low, high] = config.fuzz_range;
  if low >= high {
    return low;
  }
  rng.random_range(low..=high)
}

fn add_days(from: DateTime<Utc>, days: f64) -> DateTime<Utc> {
  from + Duration::seconds((days * 86_400.0).round() as i64)
}

fn log_outcome(before: &ItemState, after: &ItemState, quality: u8) {
  tracing::debug!(
    quality,
    ease_factor = after.ease_factor,
    interval = after.interval,
    repetitions = after.repetitions,
    lapses = after.lapses,
    "Review scheduled"
  );
  crate::profile_log!(crate::profiling::EventType::ReviewScheduled {
    quality,
    interval_before: before.interval,
    interval_after: after.interval,
    ease_factor: after.ease_factor,
  });
}
