//! Categorical draws from unnormalized log-probabilities.
//!
//! Every full-conditional draw in the samplers goes through
//! [`sample_categorical_log`]: subtract the max, exponentiate, and walk the
//! cumulative sum against a single uniform draw.

use rand::Rng;

/// Normalize log-probabilities into a probability vector.
///
/// Returns `None` if the input is empty or carries no finite mass.
pub fn softmax(log_probs: &[f64]) -> Option<Vec<f64>> {
    let max = log_probs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return None;
    }
    let weights: Vec<f64> = log_probs.iter().map(|lp| (lp - max).exp()).collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    Some(weights.into_iter().map(|w| w / total).collect())
}

/// Sample from a categorical distribution given log-probabilities.
///
/// Uses the log-sum-exp trick for numerical stability. The draw returns the
/// first index whose cumulative weight meets or exceeds `u * total`.
///
/// A single candidate is returned immediately without consuming randomness.
/// Returns `None` for an empty slice or when no candidate carries finite
/// mass (NaN or all `-inf`); callers treat that as a broken invariant.
pub fn sample_categorical_log<R: Rng>(log_probs: &[f64], rng: &mut R) -> Option<usize> {
    match log_probs.len() {
        0 => return None,
        1 => {
            let lp = log_probs[0];
            return if lp.is_nan() || lp == f64::NEG_INFINITY { None } else { Some(0) };
        }
        _ => {}
    }

    let max = log_probs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return None;
    }

    let mut total = 0.0;
    let mut weights = Vec::with_capacity(log_probs.len());
    for &lp in log_probs {
        let w = (lp - max).exp();
        if w.is_nan() {
            return None;
        }
        total += w;
        weights.push(w);
    }

    if total <= 0.0 || !total.is_finite() {
        return None;
    }

    let u: f64 = rng.random::<f64>() * total;
    let mut cum = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cum += w;
        if cum >= u {
            return Some(i);
        }
    }

    // rounding in the running sum
    Some(weights.len() - 1)
}
