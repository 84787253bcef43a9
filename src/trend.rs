//! Trend classification over short metric series.
//!
//! A series is split at its midpoint and the two half-means are compared.
//! What counts as "meaningfully different" is the call site's choice: channel
//! activity uses a threshold relative to the prior mean, activation percentage
//! uses a fixed point threshold (a 10% relative band around a near-zero prior
//! would flap on noise).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

/// How large a difference between the half-means must be before it counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdPolicy {
    /// Threshold = prior mean × factor.
    RelativeToPrior(f64),
    /// Threshold in absolute metric units.
    Absolute(f64),
}

/// Split `values` at floor(len/2) and compare half-means.
///
/// On odd lengths the second (recent) half gets the extra element. An empty
/// half classifies as `Stable`: no data is not a trend.
pub fn classify_series(values: &[f64], policy: ThresholdPolicy) -> Trend {
    let mid = values.len() / 2;
    let (first, second) = values.split_at(mid);
    if first.is_empty() || second.is_empty() {
        return Trend::Stable;
    }
    classify_windows(mean(first), mean(second), policy)
}

/// Compare two pre-computed window means under a threshold policy.
pub fn classify_windows(previous: f64, recent: f64, policy: ThresholdPolicy) -> Trend {
    if !previous.is_finite() || !recent.is_finite() {
        return Trend::Stable;
    }

    let threshold = match policy {
        ThresholdPolicy::RelativeToPrior(factor) => previous * factor,
        ThresholdPolicy::Absolute(points) => points,
    };

    let diff = recent - previous;
    if diff > threshold {
        Trend::Up
    } else if diff < -threshold {
        Trend::Down
    } else {
        Trend::Stable
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
