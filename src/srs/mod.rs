pub mod card_selector;
pub mod forgetting;
pub mod sm2;

pub use card_selector::{compose_session, priority_of, SelectedItem, SessionItem, SessionPlan};
pub use forgetting::{
  compute_stats, compute_stats_with, predict_performance, retrievability_at, Forecast,
  ForecastPoint, ItemStats,
};
pub use sm2::{context_multiplier, initial_state, review, schedule_review, ReviewOutcome};
