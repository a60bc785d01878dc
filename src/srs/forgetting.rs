//! Forgetting-curve metrics derived from an item's scheduling state.
//!
//! Nothing here is stored: stats and forecasts are recomputed from the state
//! that produced them whenever a caller asks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::domain::ItemState;

/// Retention and mastery metrics for one item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemStats {
  /// Share of successful reviews net of lapses, 0-1
  pub retention: f64,
  /// 0 (easiest ease factor) to 1 (hardest)
  pub difficulty: f64,
  /// Days the memory is expected to hold
  pub stability: f64,
  /// Recall probability one day after review
  pub retrievability: f64,
  /// 0-100
  pub mastery: f64,
}

/// Stats using the default ease bounds.
pub fn compute_stats(state: &ItemState) -> ItemStats {
  compute_stats_with(state, &SchedulerConfig::default())
}

/// Stats normalized against the ease bounds of `config`.
pub fn compute_stats_with(state: &ItemState, config: &SchedulerConfig) -> ItemStats {
  let retention = if state.repetitions > 0 {
    let net = f64::from(state.repetitions) - f64::from(state.lapses);
    (net / f64::from(state.repetitions)).clamp(0.0, 1.0)
  } else {
    0.0
  };

  let ease_span = config.max_ease_factor - config.min_ease_factor;
  let ease_norm = if ease_span > 0.0 {
    ((state.ease_factor - config.min_ease_factor) / ease_span).clamp(0.0, 1.0)
  } else {
    1.0
  };

  let interval = state.interval.max(1.0);

  // Weights: ease 40, interval 30, streak 20, retention 10
  let mastery = 40.0 * ease_norm
    + 30.0 * (interval / 30.0).min(1.0)
    + 20.0 * (f64::from(state.streak) / 10.0).min(1.0)
    + 10.0 * retention;

  ItemStats {
    retention,
    difficulty: 1.0 - ease_norm,
    stability: state.interval * 1.5,
    retrievability: (-1.0 / interval).exp(),
    mastery: mastery.clamp(0.0, 100.0),
  }
}

/// Recall probability at `now` given the time elapsed since the last review.
pub fn retrievability_at(state: &ItemState, now: DateTime<Utc>) -> f64 {
  match state.last_review {
    Some(last) => {
      let elapsed_days = ((now - last).num_seconds().max(0) as f64) / 86_400.0;
      (-elapsed_days / state.interval.max(1.0)).exp()
    }
    None => 1.0,
  }
}

/// One day of a retention forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
  pub day: u32,
  pub retention: f64,
  /// `retention` as a percentage
  pub probability: f64,
  /// The day the scheduler would bring the item back
  pub recommended: bool,
}

/// Day-by-day retention forecast. Clone it to replay from day 1.
#[derive(Debug, Clone)]
pub struct Forecast {
  interval: f64,
  day: u32,
  days_ahead: u32,
}

impl Iterator for Forecast {
  type Item = ForecastPoint;

  fn next(&mut self) -> Option<ForecastPoint> {
    if self.day >= self.days_ahead {
      return None;
    }
    self.day += 1;

    let retention = (-f64::from(self.day) / self.interval).exp();
    Some(ForecastPoint {
      day: self.day,
      retention,
      probability: retention * 100.0,
      recommended: f64::from(self.day) == self.interval.round(),
    })
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let remaining = (self.days_ahead - self.day) as usize;
    (remaining, Some(remaining))
  }
}

impl ExactSizeIterator for Forecast {}

/// Forecast retention for each of the next `days_ahead` days.
pub fn predict_performance(state: &ItemState, days_ahead: u32) -> Forecast {
  Forecast {
    interval: state.interval.max(1.0),
    day: 0,
    days_ahead,
  }
}
