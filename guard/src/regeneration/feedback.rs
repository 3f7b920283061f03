//! Regeneration feedback built from a score breakdown.

use storyforge_quality::QualityBreakdown;

/// Dimensions named per feedback round.
const FEEDBACK_DIMENSIONS: usize = 2;

/// Feedback lines naming the weakest dimensions and the gain each needs.
///
/// Only dimensions under `threshold` are named; when every dimension already
/// reaches it the single weakest one is named instead.
pub fn build_feedback(breakdown: &QualityBreakdown, threshold: f64, adaptive: bool) -> Vec<String> {
    let weakest = breakdown.weakest(FEEDBACK_DIMENSIONS);
    let below: Vec<_> = weakest.iter().filter(|d| d.value < threshold).copied().collect();
    let named = if below.is_empty() {
        weakest.into_iter().take(1).collect()
    } else {
        below
    };

    named
        .into_iter()
        .map(|d| {
            let target = threshold.max(d.value);
            let mut line = format!(
                "Raise {} from {:.1} to at least {:.1} (+{:.1})",
                d.dimension.label(),
                d.value,
                target,
                target - d.value
            );
            if adaptive {
                line.push_str(": ");
                line.push_str(d.dimension.improvement_hint());
            }
            line
        })
        .collect()
}
