//! Per-learner ability estimation.
//!
//! A learner's recent responses are reduced to a 2PL IRT ability, then mapped
//! onto an instructional zone, a short-term trend and a Bloom taxonomy level.
//! Profiles are recomputed from scratch on every call.

pub mod irt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AbilityConfig;

pub use irt::{estimate_theta, probability_correct};

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
  pub correct: bool,
  /// IRT difficulty on the theta scale
  pub question_difficulty: f64,
  /// IRT discrimination (slope)
  pub question_discrimination: f64,
  pub answered_at: DateTime<Utc>,
  #[serde(default)]
  pub subject_id: Option<String>,
}

/// How well current material matches the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Zone {
  Comfort,
  Learning,
  Challenge,
  Frustration,
}

impl Zone {
  pub fn classify(ability: f64, config: &AbilityConfig) -> Self {
    if ability < config.comfort_ceiling {
      Zone::Comfort
    } else if ability < config.learning_ceiling {
      Zone::Learning
    } else if ability < config.challenge_ceiling {
      Zone::Challenge
    } else {
      Zone::Frustration
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
  Improving,
  Declining,
  Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BloomLevel {
  Remember,
  Understand,
  Apply,
  Analyze,
  Evaluate,
  Create,
}

/// Bloom levels from lowest to highest cognitive demand.
pub const BLOOM_LEVELS: [BloomLevel; 6] = [
  BloomLevel::Remember,
  BloomLevel::Understand,
  BloomLevel::Apply,
  BloomLevel::Analyze,
  BloomLevel::Evaluate,
  BloomLevel::Create,
];

impl BloomLevel {
  /// Sixths of the ability range, top level includes 1.0.
  pub fn from_ability(ability: f64) -> Self {
    let index = (ability.clamp(0.0, 1.0) * 6.0).floor() as usize;
    BLOOM_LEVELS[index.min(BLOOM_LEVELS.len() - 1)]
  }
}

/// Ability snapshot for one learner and subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityProfile {
  /// Theta normalized to 0-1
  pub ability: f64,
  pub confidence: f64,
  pub zone: Zone,
  pub trend: Trend,
  pub bloom_level: BloomLevel,
  /// Raw IRT estimate
  pub theta: f64,
  /// Responses the estimate is based on
  pub sample_size: usize,
}

impl AbilityProfile {
  /// Profile used when there is no usable history.
  pub fn default_for(config: &AbilityConfig) -> Self {
    Self {
      ability: config.default_ability,
      confidence: config.default_confidence,
      zone: Zone::Learning,
      trend: Trend::Stable,
      bloom_level: BloomLevel::from_ability(config.default_ability),
      theta: config.theta_min + config.default_ability * (config.theta_max - config.theta_min),
      sample_size: 0,
    }
  }

  /// Theta-scale difficulty a unit-discrimination item should have for this
  /// learner to answer it correctly with probability `target_success`.
  pub fn target_difficulty(&self, target_success: f64) -> f64 {
    let p = target_success.clamp(0.01, 0.99);
    self.theta - (p / (1.0 - p)).ln()
  }
}

impl Default for AbilityProfile {
  fn default() -> Self {
    Self::default_for(&AbilityConfig::default())
  }
}

/// Estimate a learner's ability from their response history.
///
/// Only responses from the last `window_days` before `now` count, restricted
/// to `subject_id` when one is given, and at most the `max_records` most
/// recent of those. No usable responses yields the default profile.
pub fn estimate_ability(
  responses: &[ResponseRecord],
  subject_id: Option<&str>,
  now: DateTime<Utc>,
  config: &AbilityConfig,
) -> AbilityProfile {
  let window = recent_window(responses, subject_id, now, config);
  if window.is_empty() {
    tracing::debug!(subject = ?subject_id, "No responses in window, using default ability");
    return AbilityProfile::default_for(config);
  }

  let theta = estimate_theta(&window, config);
  let span = config.theta_max - config.theta_min;
  let ability = ((theta - config.theta_min) / span).clamp(0.0, 1.0);
  let confidence = (window.len() as f64 / config.confidence_saturation).min(1.0);

  let profile = AbilityProfile {
    ability,
    confidence,
    zone: Zone::classify(ability, config),
    trend: detect_trend(&window, config),
    bloom_level: BloomLevel::from_ability(ability),
    theta,
    sample_size: window.len(),
  };

  tracing::debug!(
    subject = ?subject_id,
    ability = profile.ability,
    confidence = profile.confidence,
    zone = ?profile.zone,
    trend = ?profile.trend,
    "Ability estimated"
  );
  crate::profile_log!(crate::profiling::EventType::AbilityEstimated {
    sample_size: profile.sample_size,
    ability: profile.ability,
  });

  profile
}

/// Responses inside the time window, oldest first, capped to the most recent `max_records`.
fn recent_window<'a>(
  responses: &'a [ResponseRecord],
  subject_id: Option<&str>,
  now: DateTime<Utc>,
  config: &AbilityConfig,
) -> Vec<&'a ResponseRecord> {
  // Windows too long to represent have no lower bound
  let since = Duration::try_days(config.window_days).and_then(|window| now.checked_sub_signed(window));

  let mut window: Vec<&ResponseRecord> = responses
    .iter()
    .filter(|r| since.is_none_or(|since| r.answered_at >= since) && r.answered_at <= now)
    .filter(|r| match subject_id {
      Some(subject) => r.subject_id.as_deref() == Some(subject),
      None => true,
    })
    .collect();

  window.sort_by_key(|r| r.answered_at);
  if window.len() > config.max_records {
    window.drain(..window.len() - config.max_records);
  }
  window
}

/// Compare accuracy of the latest `trend_window` responses with the ones before them.
fn detect_trend(window: &[&ResponseRecord], config: &AbilityConfig) -> Trend {
  let size = config.trend_window;
  if size == 0 || window.len() < size * 2 {
    return Trend::Stable;
  }

  let accuracy = |slice: &[&ResponseRecord]| {
    slice.iter().filter(|r| r.correct).count() as f64 / slice.len() as f64
  };

  let end = window.len();
  let recent = accuracy(&window[end - size..]);
  let previous = accuracy(&window[end - 2 * size..end - size]);

  if recent - previous > config.trend_threshold {
    Trend::Improving
  } else if previous - recent > config.trend_threshold {
    Trend::Declining
  } else {
    Trend::Stable
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{fixture_now, history, response};

  fn estimate(responses: &[ResponseRecord]) -> AbilityProfile {
    estimate_ability(responses, None, fixture_now(), &AbilityConfig::default())
  }

  #[test]
  fn test_empty_history_default_profile() {
    let profile = estimate(&[]);
    assert_eq!(profile.ability, 0.5);
    assert_eq!(profile.confidence, 0.1);
    assert_eq!(profile.zone, Zone::Learning);
    assert_eq!(profile.trend, Trend::Stable);
    assert_eq!(profile.bloom_level, BloomLevel::Analyze);
    assert_eq!(profile.sample_size, 0);
    assert_eq!(profile, AbilityProfile::default());
  }

  #[test]
  fn test_all_correct_high_discrimination() {
    let profile = estimate(&history(&[true; 100], 0.5, 2.0));
    assert!(profile.ability > (0.5 + 3.0) / 6.0);
    assert!((profile.ability - 0.67282).abs() < 1e-3, "ability = {}", profile.ability);
    assert_eq!(profile.confidence, 1.0);
    assert_eq!(profile.zone, Zone::Learning);
    assert_eq!(profile.sample_size, 100);
  }

  #[test]
  fn test_all_wrong_is_comfort_zone() {
    let profile = estimate(&history(&[false; 30], 0.5, 1.0));
    assert!(profile.ability < 0.5);
    assert_eq!(profile.zone, Zone::Comfort);
    assert_eq!(profile.bloom_level, BloomLevel::Understand);
  }

  #[test]
  fn test_confidence_scales_with_count() {
    let profile = estimate(&history(&[true, false, true, true, false], 0.0, 1.0));
    assert!((profile.confidence - 0.5).abs() < 1e-12);
    assert_eq!(profile.trend, Trend::Stable);
  }

  #[test]
  fn test_extreme_discrimination_keeps_ability_bounded() {
    let profile = estimate(&[response(true, 0.5, 1e160, 5)]);
    assert!((0.0..=1.0).contains(&profile.ability), "ability = {}", profile.ability);
    assert_eq!(profile.ability, 0.5);
    assert_eq!(profile.sample_size, 1);
  }

  #[test]
  fn test_huge_window_has_no_lower_bound() {
    let config = AbilityConfig {
      window_days: i64::MAX,
      ..AbilityConfig::default()
    };
    let records = vec![response(true, 0.0, 1.0, 60 * 24 * 365 * 50)];
    let profile = estimate_ability(&records, None, fixture_now(), &config);
    assert_eq!(profile.sample_size, 1);
    assert!(estimate_ability(&[], None, fixture_now(), &config).confidence > 0.0);
  }

  #[test]
  fn test_window_drops_old_and_future_responses() {
    let mut records = history(&[true; 5], 0.0, 1.0);
    records.push(response(false, 0.0, 1.0, 60 * 24 * 31));
    records.push(response(false, 0.0, 1.0, -60));

    let profile = estimate(&records);
    assert_eq!(profile.sample_size, 5);
  }

  #[test]
  fn test_window_keeps_most_recent_records() {
    // 50 old wrong answers followed by 100 recent correct ones
    let mut pattern = vec![false; 50];
    pattern.extend(vec![true; 100]);
    let profile = estimate(&history(&pattern, 0.5, 2.0));

    assert_eq!(profile.sample_size, 100);
    assert!((profile.ability - 0.67282).abs() < 1e-3);
  }

  #[test]
  fn test_unsorted_input_is_ordered_for_trend() {
    let mut records = history(&[false, false, false, false, false, true, true, true, true, true], 0.0, 1.0);
    records.reverse();
    assert_eq!(estimate(&records).trend, Trend::Improving);
  }

  #[test]
  fn test_trend_declining() {
    let records = history(&[true, true, true, true, true, false, false, true, false, false], 0.0, 1.0);
    assert_eq!(estimate(&records).trend, Trend::Declining);
  }

  #[test]
  fn test_trend_stable_within_threshold() {
    let records = history(&[true, false, true, false, true, false, true, false, true, true], 0.0, 1.0);
    // 0.6 vs 0.6
    assert_eq!(estimate(&records).trend, Trend::Stable);
  }

  #[test]
  fn test_subject_filter() {
    let mut records = history(&[true; 6], 0.0, 1.0);
    for r in records.iter_mut().take(4) {
      r.subject_id = Some("algebra".to_string());
    }

    let algebra = estimate_ability(&records, Some("algebra"), fixture_now(), &AbilityConfig::default());
    assert_eq!(algebra.sample_size, 4);

    let geometry = estimate_ability(&records, Some("geometry"), fixture_now(), &AbilityConfig::default());
    assert_eq!(geometry, AbilityProfile::default());

    assert_eq!(estimate(&records).sample_size, 6);
  }

  #[test]
  fn test_zone_buckets() {
    let config = AbilityConfig::default();
    assert_eq!(Zone::classify(0.0, &config), Zone::Comfort);
    assert_eq!(Zone::classify(0.59, &config), Zone::Comfort);
    assert_eq!(Zone::classify(0.6, &config), Zone::Learning);
    assert_eq!(Zone::classify(0.849, &config), Zone::Learning);
    assert_eq!(Zone::classify(0.85, &config), Zone::Challenge);
    assert_eq!(Zone::classify(0.95, &config), Zone::Frustration);
    assert_eq!(Zone::classify(1.0, &config), Zone::Frustration);
  }

  #[test]
  fn test_bloom_levels() {
    assert_eq!(BloomLevel::from_ability(0.0), BloomLevel::Remember);
    assert_eq!(BloomLevel::from_ability(0.2), BloomLevel::Understand);
    assert_eq!(BloomLevel::from_ability(0.45), BloomLevel::Apply);
    assert_eq!(BloomLevel::from_ability(0.5), BloomLevel::Analyze);
    assert_eq!(BloomLevel::from_ability(0.7), BloomLevel::Evaluate);
    assert_eq!(BloomLevel::from_ability(1.0), BloomLevel::Create);
  }

  #[test]
  fn test_target_difficulty() {
    let profile = AbilityProfile {
      theta: 1.0,
      ..AbilityProfile::default()
    };
    assert!((profile.target_difficulty(0.5) - 1.0).abs() < 1e-12);
    assert!((profile.target_difficulty(0.75) - (1.0 - 3f64.ln())).abs() < 1e-12);
  }

  #[test]
  fn test_profile_json_labels() {
    let json = serde_json::to_value(AbilityProfile::default()).unwrap();
    assert_eq!(json["zone"], "LEARNING");
    assert_eq!(json["trend"], "stable");
    assert_eq!(json["bloom_level"], "ANALYZE");
  }
}
