//! Two-parameter logistic IRT ability estimate.

use crate::config::AbilityConfig;

use super::ResponseRecord;

/// P(correct) for a learner at `theta` on an item with the given parameters.
pub fn probability_correct(theta: f64, difficulty: f64, discrimination: f64) -> f64 {
  1.0 / (1.0 + (-discrimination * (theta - difficulty)).exp())
}

/// Damped Newton-Raphson estimate of theta starting from 0.
///
/// Runs `config.iterations` steps of `theta -= learning_rate * gradient / hessian`,
/// clamping after each. A zero Hessian, or any step that is not finite
/// (extreme discriminations overflow), is skipped. With `tolerance` set the
/// loop exits once a step moves theta less than the tolerance.
pub fn estimate_theta(responses: &[&ResponseRecord], config: &AbilityConfig) -> f64 {
  let mut theta = 0.0;

  for iteration in 0..config.iterations {
    let mut gradient = 0.0;
    let mut hessian = 0.0;

    for r in responses {
      let a = r.question_discrimination;
      let p = probability_correct(theta, r.question_difficulty, a);
      let observed = if r.correct { 1.0 } else { 0.0 };
      gradient += a * (observed - p);
      hessian -= a * a * p * (1.0 - p);
    }

    let step = config.learning_rate * (gradient / hessian);
    if hessian == 0.0 || !step.is_finite() {
      continue;
    }

    let before = theta;
    theta = (theta - step).clamp(config.theta_min, config.theta_max);

    if let Some(tolerance) = config.tolerance {
      if (theta - before).abs() < tolerance {
        tracing::trace!(iteration, theta, "Ability estimate converged");
        break;
      }
    }
  }

  theta
}
