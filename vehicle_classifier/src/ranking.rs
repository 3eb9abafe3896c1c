use crate::labels::{VehicleLabel, LABEL_SET};
use crate::prediction::PredictionResult;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedLabel {
    pub label: VehicleLabel,
    pub confidence: f64,
    pub is_top: bool,
}

/// Orders every known label by descending confidence.
///
/// Labels missing from the distribution rank at zero, unknown keys are
/// ignored and ties keep declaration order. `is_top` follows the backend's
/// `top_label`, even when another label scores higher.
pub fn rank(result: &PredictionResult) -> Vec<RankedLabel> {
    let mut ranked: Vec<RankedLabel> = LABEL_SET
        .iter()
        .map(|&label| RankedLabel {
            label,
            confidence: result
                .distribution
                .get(label.as_str())
                // -0.0 would otherwise sort below the defaulted zeros.
                .map(|&v| v + 0.0)
                .unwrap_or(0.0),
            is_top: label.as_str() == result.top_label,
        })
        .collect();

    // `sort_by` is stable, so equal confidences stay in declaration order.
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked
}

pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}
