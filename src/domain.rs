//! Plain data records exchanged with the scheduling core.
//!
//! Persistence, validation of request payloads and identity all live with the
//! caller. These types only carry the state the algorithms read and write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Review quality
// ============================================================================

/// Errors raised while turning raw review input into scheduler input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
  /// Quality outside 0..=5
  InvalidQuality(i64),
}

impl std::fmt::Display for ReviewError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ReviewError::InvalidQuality(q) => write!(f, "Review quality {} is outside 0..=5", q),
    }
  }
}

impl std::error::Error for ReviewError {}

/// SM-2 recall quality, 0 (blackout) through 5 (perfect recall).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
  pub const MAX: u8 = 5;

  pub fn new(value: i64) -> Result<Self, ReviewError> {
    if (0..=i64::from(Self::MAX)).contains(&value) {
      Ok(Self(value as u8))
    } else {
      Err(ReviewError::InvalidQuality(value))
    }
  }

  pub fn value(self) -> u8 {
    self.0
  }
}

impl TryFrom<u8> for Quality {
  type Error = ReviewError;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Self::new(i64::from(value))
  }
}

impl TryFrom<i32> for Quality {
  type Error = ReviewError;

  fn try_from(value: i32) -> Result<Self, Self::Error> {
    Self::new(i64::from(value))
  }
}

impl TryFrom<i64> for Quality {
  type Error = ReviewError;

  fn try_from(value: i64) -> Result<Self, Self::Error> {
    Self::new(value)
  }
}

impl From<Quality> for u8 {
  fn from(q: Quality) -> u8 {
    q.0
  }
}

// ============================================================================
// Review context
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
  Morning,
  Afternoon,
  Evening,
  Night,
}

impl TimeOfDay {
  /// Bucket a local hour (0-23): 5-11 morning, 12-16 afternoon, 17-21 evening, else night.
  pub fn from_hour(hour: u32) -> Self {
    match hour {
      5..=11 => TimeOfDay::Morning,
      12..=16 => TimeOfDay::Afternoon,
      17..=21 => TimeOfDay::Evening,
      _ => TimeOfDay::Night,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviousResult {
  Correct,
  Wrong,
}

/// Optional signals that stretch or shrink a mature item's next interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewContext {
  pub time_of_day: Option<TimeOfDay>,
  /// Consecutive days the learner has studied
  pub study_streak: Option<u32>,
  pub previous_result: Option<PreviousResult>,
  /// Subject difficulty on a 0-10 scale
  pub subject_difficulty: Option<f64>,
}

// ============================================================================
// Item state
// ============================================================================

/// Lifecycle stage of an item, derived from its counters and flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
  New,
  Learning,
  Review,
  Graduated,
  Leech,
}

/// Scheduling state of one item for one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemState {
  pub ease_factor: f64,
  /// Days until the next review, within [1, 365]
  pub interval: f64,
  /// Consecutive successes since the last failure
  pub repetitions: u32,
  /// Total failures; only a manual reset lowers it
  pub lapses: u32,
  pub streak: u32,
  pub last_review: Option<DateTime<Utc>>,
  pub next_review: Option<DateTime<Utc>>,
  pub is_leech: bool,
  /// When the item became a leech
  pub leech_since: Option<DateTime<Utc>>,
  pub graduated: bool,
}

impl Default for ItemState {
  fn default() -> Self {
    Self {
      ease_factor: 2.5,
      interval: 1.0,
      repetitions: 0,
      lapses: 0,
      streak: 0,
      last_review: None,
      next_review: None,
      is_leech: false,
      leech_since: None,
      graduated: false,
    }
  }
}

impl ItemState {
  pub fn new() -> Self {
    Self::default()
  }

  /// Lifecycle stage. The stored flags stay authoritative; this is a read-only view.
  pub fn status(&self) -> ItemStatus {
    if self.is_leech {
      ItemStatus::Leech
    } else if self.is_new() {
      ItemStatus::New
    } else if self.repetitions < 3 {
      ItemStatus::Learning
    } else if self.graduated {
      ItemStatus::Graduated
    } else {
      ItemStatus::Review
    }
  }

  /// Never reviewed.
  pub fn is_new(&self) -> bool {
    self.last_review.is_none() && self.repetitions == 0 && self.lapses == 0
  }

  /// Due when no review is scheduled or the scheduled time has passed.
  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    self.next_review.is_none_or(|next| next <= now)
  }

  /// Whole days past `next_review`; 0 when not overdue or unscheduled.
  pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
    match self.next_review {
      Some(next) if now > next => (now - next).num_days(),
      _ => 0,
    }
  }

  /// Manual leech reset: clears the flag and the lapse count, keeps the schedule.
  pub fn reset_leech(&mut self) {
    if self.is_leech {
      tracing::info!(lapses = self.lapses, "Leech manually reset");
    }
    self.is_leech = false;
    self.leech_since = None;
    self.lapses = 0;
  }

  /// Full manual reset back to a fresh item.
  pub fn reset(&mut self) {
    *self = Self::default();
  }
}
