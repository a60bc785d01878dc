//! Learning-scheduling core: when an item should be seen next, and how hard
//! the next new item should be.
//!
//! Every entry point is a pure function over plain records. Callers own
//! persistence and pass in the clock and the random source.

pub mod ability;
pub mod config;
pub mod domain;
pub mod logging;
pub mod profiling;
pub mod srs;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use ability::{estimate_ability, AbilityProfile, BloomLevel, ResponseRecord, Trend, Zone};
pub use config::{AbilityConfig, ConfigError, CoreConfig, SchedulerConfig, SessionConfig};
pub use domain::{
  ItemState, ItemStatus, PreviousResult, Quality, ReviewContext, ReviewError, TimeOfDay,
};
pub use srs::{
  compose_session, compute_stats, predict_performance, review, schedule_review, ForecastPoint,
  ItemStats, ReviewOutcome, SessionItem, SessionPlan,
};
