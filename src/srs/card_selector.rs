//! Priority-ordered session composition under a time budget.
//!
//! Each candidate gets an additive priority:
//! - Overdue reviews (more so the longer they are overdue)
//! - Leeches
//! - Items with weak retention
//! - New items
//!
//! Candidates are then taken greedily, highest priority first, until the next
//! one would overflow the budget.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ability::AbilityProfile;
use crate::config::SessionConfig;
use crate::domain::ItemState;
use crate::srs::forgetting::compute_stats;

/// A candidate item for the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionItem {
  pub id: String,
  pub state: ItemState,
  /// Minutes this item is expected to take; the session default applies when unknown
  #[serde(default)]
  pub estimated_minutes: Option<f64>,
  /// Theta-scale difficulty from the content catalog, used to place new items
  #[serde(default)]
  pub difficulty: Option<f64>,
}

/// An item accepted into the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedItem {
  pub id: String,
  pub priority: f64,
  pub estimated_minutes: f64,
}

/// Result of composing a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
  /// Accepted items in presentation order
  pub selected: Vec<SelectedItem>,
  /// Total minutes of the accepted items
  pub estimated_time: f64,
  /// Candidates left out of the session
  pub skipped_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct Scored {
  index: usize,
  priority: f64,
  /// Distance from the learner's target difficulty, for new items only
  fit: Option<f64>,
}

/// Additive review priority of an item at `now`.
pub fn priority_of(state: &ItemState, now: DateTime<Utc>, config: &SessionConfig) -> f64 {
  let mut priority = 0.0;

  if state.next_review.is_some_and(|next| now > next) {
    priority += config.overdue_base + state.days_overdue(now) as f64 * config.overdue_per_day;
  }

  if state.is_leech {
    priority += config.leech_bonus;
  }

  if compute_stats(state).retention < config.low_retention_threshold {
    priority += config.low_retention_bonus;
  }

  if state.repetitions == 0 {
    priority += config.new_item_bonus;
  }

  priority
}

/// Choose the items to present within `max_time_minutes`.
///
/// Ties keep their input order. With an ability profile, tied new items that
/// carry a difficulty are reordered so the best difficulty fit comes first.
pub fn compose_session(
  items: &[SessionItem],
  max_time_minutes: f64,
  now: DateTime<Utc>,
  config: &SessionConfig,
  ability: Option<&AbilityProfile>,
) -> SessionPlan {
  let target = ability.map(|profile| profile.target_difficulty(config.target_success));

  let mut scored: Vec<Scored> = items
    .iter()
    .enumerate()
    .map(|(index, item)| Scored {
      index,
      priority: priority_of(&item.state, now, config),
      fit: match (target, item.difficulty) {
        (Some(target), Some(difficulty)) if item.state.repetitions == 0 => {
          Some((difficulty - target).abs())
        }
        _ => None,
      },
    })
    .collect();

  // Stable: equal priorities keep input order
  scored.sort_by(|a, b| b.priority.total_cmp(&a.priority));
  if target.is_some() {
    order_by_fit(&mut scored);
  }

  let budget = if max_time_minutes.is_nan() {
    0.0
  } else {
    max_time_minutes.max(0.0)
  };

  let mut selected = Vec::new();
  let mut total = 0.0;

  for s in &scored {
    let item = &items[s.index];
    let minutes = item
      .estimated_minutes
      .filter(|m| m.is_finite() && *m >= 0.0)
      .unwrap_or(config.default_item_minutes);

    if total + minutes > budget {
      break;
    }
    total += minutes;
    selected.push(SelectedItem {
      id: item.id.clone(),
      priority: s.priority,
      estimated_minutes: minutes,
    });
  }

  let plan = SessionPlan {
    skipped_count: items.len() - selected.len(),
    selected,
    estimated_time: total,
  };

  tracing::debug!(
    candidates = items.len(),
    selected = plan.selected.len(),
    estimated_time = plan.estimated_time,
    budget,
    "Session composed"
  );
  crate::profile_log!(crate::profiling::EventType::SessionComposed {
    candidates: items.len(),
    selected: plan.selected.len(),
    estimated_time: plan.estimated_time,
  });

  plan
}

/// Within each run of equal priority, reorder the items that carry a fit
/// among the positions they already occupy. Other items do not move.
fn order_by_fit(scored: &mut [Scored]) {
  let mut start = 0;
  while start < scored.len() {
    let priority = scored[start].priority;
    let end = start + scored[start..].iter().take_while(|s| s.priority == priority).count();

    let slots: Vec<usize> = (start..end).filter(|&i| scored[i].fit.is_some()).collect();
    let mut fitted: Vec<Scored> = slots.iter().map(|&i| scored[i]).collect();
    fitted.sort_by(|a, b| {
      a.fit
        .unwrap_or(f64::INFINITY)
        .total_cmp(&b.fit.unwrap_or(f64::INFINITY))
    });
    for (slot, s) in slots.into_iter().zip(fitted) {
      scored[slot] = s;
    }

    start = end;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{fixture_now, overdue_state, scheduled_state, session_item};

  fn ids(plan: &SessionPlan) -> Vec<&str> {
    plan.selected.iter().map(|s| s.id.as_str()).collect()
  }

  fn compose(items: &[SessionItem], budget: f64) -> SessionPlan {
    compose_session(items, budget, fixture_now(), &SessionConfig::default(), None)
  }

  #[test]
  fn test_priority_new_item() {
    // New: +20, retention 0 < 0.8: +30
    let priority = priority_of(&ItemState::new(), fixture_now(), &SessionConfig::default());
    assert_eq!(priority, 50.0);
  }

  #[test]
  fn test_priority_scheduled_item_is_zero() {
    let priority = priority_of(&scheduled_state(3), fixture_now(), &SessionConfig::default());
    assert_eq!(priority, 0.0);
  }

  #[test]
  fn test_priority_overdue_days() {
    let config = SessionConfig::default();
    assert_eq!(priority_of(&overdue_state(0), fixture_now(), &config), 100.0);
    assert_eq!(priority_of(&overdue_state(3), fixture_now(), &config), 130.0);
  }

  #[test]
  fn test_priority_is_additive() {
    let mut state = overdue_state(2);
    state.is_leech = true;
    state.lapses = 9;
    state.repetitions = 10;
    // overdue 120 + leech 50 + retention 0.1: 30
    assert_eq!(priority_of(&state, fixture_now(), &SessionConfig::default()), 200.0);
  }

  #[test]
  fn test_overdue_leech_selected_first() {
    let mut leech = overdue_state(0);
    leech.is_leech = true;
    leech.lapses = 8;
    leech.repetitions = 40;
    assert_eq!(priority_of(&leech, fixture_now(), &SessionConfig::default()), 150.0);

    let mut items: Vec<SessionItem> = (0..9)
      .map(|i| session_item(&format!("new-{}", i), ItemState::new()))
      .collect();
    items.insert(4, session_item("leech", leech));

    let plan = compose(&items, 1.0);
    assert_eq!(ids(&plan), vec!["leech"]);
    assert_eq!(plan.selected[0].priority, 150.0);
    assert_eq!(plan.estimated_time, 1.0);
    assert_eq!(plan.skipped_count, 9);
  }

  #[test]
  fn test_greedy_stops_at_first_overflow() {
    let mut long = session_item("long", overdue_state(5));
    long.estimated_minutes = Some(4.0);
    let mut short = session_item("short", overdue_state(1));
    short.estimated_minutes = Some(1.0);
    let tiny = session_item("tiny", scheduled_state(2));

    // 'long' fits, 'short' would overflow; no skipping ahead to 'tiny'
    let plan = compose(&[tiny, short, long], 4.5);
    assert_eq!(ids(&plan), vec!["long"]);
    assert_eq!(plan.estimated_time, 4.0);
    assert_eq!(plan.skipped_count, 2);
  }

  #[test]
  fn test_ties_keep_input_order() {
    let items: Vec<SessionItem> = ["a", "b", "c", "d"]
      .iter()
      .map(|id| session_item(id, ItemState::new()))
      .collect();
    let plan = compose(&items, 10.0);
    assert_eq!(ids(&plan), vec!["a", "b", "c", "d"]);
    assert_eq!(plan.skipped_count, 0);
  }

  #[test]
  fn test_sorted_by_priority() {
    let items = vec![
      session_item("scheduled", scheduled_state(4)),
      session_item("new", ItemState::new()),
      session_item("overdue", overdue_state(2)),
    ];
    let plan = compose(&items, 10.0);
    assert_eq!(ids(&plan), vec!["overdue", "new", "scheduled"]);
  }

  #[test]
  fn test_never_exceeds_budget() {
    let items: Vec<SessionItem> = (0..20)
      .map(|i| {
        let mut item = session_item(&i.to_string(), ItemState::new());
        item.estimated_minutes = Some(0.7);
        item
      })
      .collect();
    let plan = compose(&items, 5.0);
    assert!(plan.estimated_time <= 5.0);
    assert_eq!(plan.selected.len(), 7);
    assert_eq!(plan.skipped_count, 13);
  }

  #[test]
  fn test_invalid_estimates_use_default() {
    let mut item = session_item("x", ItemState::new());
    item.estimated_minutes = Some(f64::NAN);
    let plan = compose(&[item], 2.0);
    assert_eq!(plan.selected[0].estimated_minutes, 1.0);
  }

  #[test]
  fn test_zero_or_invalid_budget() {
    let items = vec![session_item("a", ItemState::new())];
    assert!(compose(&items, 0.0).selected.is_empty());
    assert!(compose(&items, -5.0).selected.is_empty());
    assert!(compose(&items, f64::NAN).selected.is_empty());
    assert_eq!(compose(&items, 0.0).skipped_count, 1);
  }

  #[test]
  fn test_empty_candidates() {
    let plan = compose(&[], 30.0);
    assert_eq!(plan, SessionPlan::default());
  }

  #[test]
  fn test_ability_orders_new_items_by_fit() {
    let profile = AbilityProfile {
      theta: 1.0,
      ..AbilityProfile::default()
    };
    let target = profile.target_difficulty(SessionConfig::default().target_success);

    let mut far = session_item("far", ItemState::new());
    far.difficulty = Some(target + 2.5);
    let unknown = session_item("unknown", ItemState::new());
    let mut near = session_item("near", ItemState::new());
    near.difficulty = Some(target - 0.1);
    let mut mid = session_item("mid", ItemState::new());
    mid.difficulty = Some(target + 1.0);
    let overdue = session_item("overdue", overdue_state(1));

    let items = vec![far, unknown, near, overdue, mid];
    let plan = compose_session(&items, 10.0, fixture_now(), &SessionConfig::default(), Some(&profile));

    // 'unknown' keeps its slot; fitted items fill the others best-first
    assert_eq!(ids(&plan), vec!["overdue", "near", "unknown", "mid", "far"]);
  }

  #[test]
  fn test_ability_does_not_change_priorities() {
    let profile = AbilityProfile::default();
    let mut new_item = session_item("new", ItemState::new());
    new_item.difficulty = Some(0.0);
    let items = vec![new_item, session_item("overdue", overdue_state(0))];

    let plan = compose_session(&items, 10.0, fixture_now(), &SessionConfig::default(), Some(&profile));
    assert_eq!(ids(&plan), vec!["overdue", "new"]);
    assert_eq!(plan.selected[1].priority, 50.0);
  }
}
