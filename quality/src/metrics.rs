//! Raw metric values as reported by a scoring oracle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dimension::QualityDimension;
use crate::error::{QualityError, Result};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Lowest valid metric value.
pub const MIN_SCORE: f64 = 0.0;
/// Highest valid metric value.
pub const MAX_SCORE: f64 = 10.0;
/// Value used for missing or non-numeric metrics.
pub const NEUTRAL_SCORE: f64 = 5.0;

/// How a raw value was adjusted before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Used as reported
    None,
    /// Outside [0, 10], clamped to the nearest bound
    Clamped,
    /// Missing or non-numeric, replaced by the neutral value
    Defaulted,
}

/// A metric value after the permissive validation policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SanitizedValue {
    pub value: f64,
    pub adjustment: Adjustment,
}

impl SanitizedValue {
    /// Apply the permissive policy to a raw reading.
    pub fn from_raw(raw: Option<f64>) -> Self {
        match raw {
            Some(v) if v.is_finite() => {
                let clamped = v.clamp(MIN_SCORE, MAX_SCORE);
                Self {
                    value: clamped,
                    adjustment: if clamped == v {
                        Adjustment::None
                    } else {
                        Adjustment::Clamped
                    },
                }
            }
            _ => Self {
                value: NEUTRAL_SCORE,
                adjustment: Adjustment::Defaulted,
            },
        }
    }
}

/// Named metric readings for one draft.
///
/// Readings are stored as reported; sanitizing happens on read so the
/// original oracle output stays inspectable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualityMetricSet {
    values: BTreeMap<QualityDimension, f64>,
}

impl QualityMetricSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reading.
    pub fn with(mut self, dimension: QualityDimension, value: f64) -> Self {
        self.values.insert(dimension, value);
        self
    }

    /// Insert or replace a reading.
    pub fn set(&mut self, dimension: QualityDimension, value: f64) {
        self.values.insert(dimension, value);
    }

    /// Reading exactly as reported.
    pub fn raw(&self, dimension: QualityDimension) -> Option<f64> {
        self.values.get(&dimension).copied()
    }

    /// Reading after clamping/defaulting.
    pub fn sanitized(&self, dimension: QualityDimension) -> SanitizedValue {
        SanitizedValue::from_raw(self.raw(dimension))
    }

    /// Sanitized value only.
    pub fn value(&self, dimension: QualityDimension) -> f64 {
        self.sanitized(dimension).value
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QualityDimension, f64)> + '_ {
        self.values.iter().map(|(d, v)| (*d, *v))
    }

    /// Build from an oracle JSON object such as
    /// `{"narrativeCoherence": 8.5, "characterDepth": "7.2"}`.
    ///
    /// Unknown keys are ignored. Numeric strings are accepted; any other
    /// non-numeric value is kept as NaN and therefore reads as neutral.
    pub fn from_json(payload: &serde_json::Value) -> Result<Self> {
        let object = payload.as_object().ok_or_else(|| {
            QualityError::NotAnObject(json_kind(payload).to_string())
        })?;

        let mut set = Self::new();
        for (key, value) in object {
            let Some(dimension) = QualityDimension::from_key(key) else {
                continue;
            };
            let reading = match value {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            set.set(dimension, reading.unwrap_or(f64::NAN));
        }
        Ok(set)
    }
}

impl FromIterator<(QualityDimension, f64)> for QualityMetricSet {
    fn from_iter<I: IntoIterator<Item = (QualityDimension, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_policy() {
        assert_eq!(
            SanitizedValue::from_raw(Some(7.5)),
            SanitizedValue { value: 7.5, adjustment: Adjustment::None }
        );
        assert_eq!(
            SanitizedValue::from_raw(Some(12.0)),
            SanitizedValue { value: 10.0, adjustment: Adjustment::Clamped }
        );
        assert_eq!(
            SanitizedValue::from_raw(Some(-3.0)),
            SanitizedValue { value: 0.0, adjustment: Adjustment::Clamped }
        );
        assert_eq!(SanitizedValue::from_raw(None).value, NEUTRAL_SCORE);
        assert_eq!(
            SanitizedValue::from_raw(Some(f64::NAN)).adjustment,
            Adjustment::Defaulted
        );
        assert_eq!(SanitizedValue::from_raw(Some(f64::INFINITY)).value, NEUTRAL_SCORE);
    }

    #[test]
    fn test_from_json() {
        let set = QualityMetricSet::from_json(&json!({
            "narrativeCoherence": 8.5,
            "characterDepth": "7.2",
            "plotComplexity": "excellent",
            "thematicConsistency": null,
            "wordCount": 1200
        }))
        .unwrap();

        assert_eq!(set.len(), 4);
        assert_eq!(set.value(QualityDimension::NarrativeCoherence), 8.5);
        assert_eq!(set.value(QualityDimension::CharacterDepth), 7.2);
        assert_eq!(set.value(QualityDimension::PlotComplexity), NEUTRAL_SCORE);
        assert_eq!(set.value(QualityDimension::ThematicConsistency), NEUTRAL_SCORE);
        assert!(set.raw(QualityDimension::PlotComplexity).unwrap().is_nan());
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = QualityMetricSet::from_json(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, QualityError::NotAnObject(kind) if kind == "array"));
    }

    #[test]
    fn test_missing_dimension_reads_neutral() {
        let set = QualityMetricSet::new().with(QualityDimension::ImageQuality, 9.0);
        assert_eq!(set.value(QualityDimension::VisualConsistency), NEUTRAL_SCORE);
        assert_eq!(set.value(QualityDimension::ImageQuality), 9.0);
    }
}
