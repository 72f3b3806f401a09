//! Rules for merging the effects of overlapping anomalies.
//!
//! Pairs combine according to a fixed rule table; larger groups fold pairwise
//! from left to right, carrying the accumulated result as the left operand.

use crate::anomaly::{AnomalyEffect, AnomalyType};
use crate::config::*;
use crate::types::{Point3, SYNTHETIC_SOURCE_ID};

/// Effective result of two or more overlapping anomalies
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedAnomalyEffect {
    pub result_type: AnomalyType,
    pub time_distortion: f64,
    pub source_types: Vec<AnomalyType>,
}

impl CombinedAnomalyEffect {
    fn single(anomaly_type: AnomalyType, time_distortion: f64) -> Self {
        CombinedAnomalyEffect {
            result_type: anomaly_type,
            time_distortion,
            source_types: vec![anomaly_type],
        }
    }

    /// Builds a synthetic full-strength effect carrying the combined result
    pub fn to_effect(&self, position: Point3, radius: f64, duration: f64) -> AnomalyEffect {
        let mut effect =
            AnomalyEffect::new(self.result_type, self.time_distortion, position, radius, duration);
        effect.source_id = SYNTHETIC_SOURCE_ID;
        effect
    }

    /// Folds one more (type, distortion) into this result
    fn absorb(&mut self, anomaly_type: AnomalyType, time_distortion: f64) {
        let (result_type, distortion) = combine_values(
            self.result_type,
            self.time_distortion,
            anomaly_type,
            time_distortion,
        );
        self.result_type = result_type;
        self.time_distortion = distortion;
        self.source_types.push(anomaly_type);
    }
}

fn is_opposing(a: AnomalyType, b: AnomalyType) -> bool {
    matches!(
        (a, b),
        (AnomalyType::Dilation, AnomalyType::Acceleration)
            | (AnomalyType::Acceleration, AnomalyType::Dilation)
    )
}

fn is_rate_change(kind: AnomalyType) -> bool {
    matches!(kind, AnomalyType::Dilation | AnomalyType::Acceleration)
}

/// Fallback type ranking: STASIS, then RIFT, then the later enum variant
fn dominant_type(a: AnomalyType, b: AnomalyType) -> AnomalyType {
    if a == AnomalyType::Stasis || b == AnomalyType::Stasis {
        AnomalyType::Stasis
    } else if a == AnomalyType::Rift || b == AnomalyType::Rift {
        AnomalyType::Rift
    } else {
        a.max(b)
    }
}

/// Core rule table for two (type, distortion) operands
pub fn combine_values(
    type1: AnomalyType,
    d1: f64,
    type2: AnomalyType,
    d2: f64,
) -> (AnomalyType, f64) {
    if type1 == AnomalyType::Rift || type2 == AnomalyType::Rift {
        return (AnomalyType::Rift, d1.max(d2) * RIFT_AMPLIFICATION);
    }

    if type1 == AnomalyType::Stasis || type2 == AnomalyType::Stasis {
        let stasis = if type1 == AnomalyType::Stasis { d1 } else { d2 };
        return (AnomalyType::Stasis, stasis * STASIS_DAMPING);
    }

    if is_opposing(type1, type2) {
        let net = (d1 - d2).abs();
        if net < INSTABILITY_THRESHOLD {
            return (AnomalyType::Instability, INSTABILITY_DISTORTION);
        }
        let stronger = if d1.abs() >= d2.abs() { type1 } else { type2 };
        return (stronger, net * OPPOSING_NET_FACTOR);
    }

    if (is_rate_change(type1) && type2 == AnomalyType::Reversal)
        || (type1 == AnomalyType::Reversal && is_rate_change(type2))
    {
        return (AnomalyType::Rift, d1.max(d2) * REVERSAL_RIFT_FACTOR);
    }

    if type1 == type2 {
        return match type1 {
            AnomalyType::Dilation => (AnomalyType::Dilation, d1 * d2),
            AnomalyType::Acceleration => (AnomalyType::Acceleration, d1 + d2),
            AnomalyType::Reversal => (AnomalyType::Acceleration, DOUBLE_REVERSAL_DISTORTION),
            other => (other, d1.max(d2) * SAME_TYPE_AMPLIFICATION),
        };
    }

    (dominant_type(type1, type2), (d1 + d2) / 2.0)
}

/// Combines two effects into one
pub fn combine_pair(first: &AnomalyEffect, second: &AnomalyEffect) -> CombinedAnomalyEffect {
    let mut combined = CombinedAnomalyEffect::single(first.anomaly_type, first.time_distortion);
    combined.absorb(second.anomaly_type, second.time_distortion);
    combined
}

/// Folds any number of effects left to right. A single effect passes through unchanged.
pub fn combine_all<'a, I>(effects: I) -> Option<CombinedAnomalyEffect>
where
    I: IntoIterator<Item = &'a AnomalyEffect>,
{
    let mut iter = effects.into_iter();
    let first = iter.next()?;
    let mut combined = CombinedAnomalyEffect::single(first.anomaly_type, first.time_distortion);
    for effect in iter {
        combined.absorb(effect.anomaly_type, effect.time_distortion);
    }
    Some(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn effect(anomaly_type: AnomalyType, time_distortion: f64) -> AnomalyEffect {
        AnomalyEffect::new(anomaly_type, time_distortion, Point3::zero(), 1.0, 1.0)
    }

    fn both_orders(a: AnomalyEffect, b: AnomalyEffect) -> [CombinedAnomalyEffect; 2] {
        [combine_pair(&a, &b), combine_pair(&b, &a)]
    }

    #[test]
    fn test_rift_amplifies_max() {
        for combined in both_orders(
            effect(AnomalyType::Rift, 0.8),
            effect(AnomalyType::Stasis, 2.0),
        ) {
            assert_eq!(combined.result_type, AnomalyType::Rift);
            assert_approx_eq!(combined.time_distortion, 2.4);
        }
    }

    #[test]
    fn test_stasis_dominates_acceleration() {
        for combined in both_orders(
            effect(AnomalyType::Stasis, 0.1),
            effect(AnomalyType::Acceleration, 2.0),
        ) {
            assert_eq!(combined.result_type, AnomalyType::Stasis);
            assert_approx_eq!(combined.time_distortion, 0.08);
        }
    }

    #[test]
    fn test_opposing_rates_cancel() {
        for combined in both_orders(
            effect(AnomalyType::Dilation, 0.5),
            effect(AnomalyType::Acceleration, 2.0),
        ) {
            assert_eq!(combined.result_type, AnomalyType::Acceleration);
            assert_approx_eq!(combined.time_distortion, 1.05);
        }
    }

    #[test]
    fn test_near_cancellation_is_unstable() {
        for combined in both_orders(
            effect(AnomalyType::Dilation, 1.0),
            effect(AnomalyType::Acceleration, 1.1),
        ) {
            assert_eq!(combined.result_type, AnomalyType::Instability);
            assert_approx_eq!(combined.time_distortion, 0.3);
        }
    }

    #[test]
    fn test_rate_change_with_reversal_tears_rift() {
        for combined in both_orders(
            effect(AnomalyType::Dilation, 0.5),
            effect(AnomalyType::Reversal, -1.0),
        ) {
            assert_eq!(combined.result_type, AnomalyType::Rift);
            assert_approx_eq!(combined.time_distortion, 0.65);
        }
    }

    #[test]
    fn test_equal_types() {
        let dilation = combine_pair(
            &effect(AnomalyType::Dilation, 0.5),
            &effect(AnomalyType::Dilation, 0.6),
        );
        assert_eq!(dilation.result_type, AnomalyType::Dilation);
        assert_approx_eq!(dilation.time_distortion, 0.3);

        let acceleration = combine_pair(
            &effect(AnomalyType::Acceleration, 1.5),
            &effect(AnomalyType::Acceleration, 2.0),
        );
        assert_eq!(acceleration.result_type, AnomalyType::Acceleration);
        assert_approx_eq!(acceleration.time_distortion, 3.5);

        let reversal = combine_pair(
            &effect(AnomalyType::Reversal, -1.0),
            &effect(AnomalyType::Reversal, -2.0),
        );
        assert_eq!(reversal.result_type, AnomalyType::Acceleration);
        assert_approx_eq!(reversal.time_distortion, 1.5);

        let instability = combine_pair(
            &effect(AnomalyType::Instability, 0.3),
            &effect(AnomalyType::Instability, 0.5),
        );
        assert_eq!(instability.result_type, AnomalyType::Instability);
        assert_approx_eq!(instability.time_distortion, 0.6);
    }

    #[test]
    fn test_default_averages_with_priority() {
        for combined in both_orders(
            effect(AnomalyType::Instability, 0.4),
            effect(AnomalyType::Dilation, 0.6),
        ) {
            assert_eq!(combined.result_type, AnomalyType::Instability);
            assert_approx_eq!(combined.time_distortion, 0.5);
        }
        assert_eq!(dominant_type(AnomalyType::Rift, AnomalyType::Stasis), AnomalyType::Stasis);
        assert_eq!(dominant_type(AnomalyType::Instability, AnomalyType::Rift), AnomalyType::Rift);
        assert_eq!(
            dominant_type(AnomalyType::Dilation, AnomalyType::Reversal),
            AnomalyType::Reversal
        );
    }

    #[test]
    fn test_combine_all_folds_left_to_right() {
        let effects = [
            effect(AnomalyType::Dilation, 0.5),
            effect(AnomalyType::Dilation, 0.6),
            effect(AnomalyType::Stasis, 0.2),
        ];
        let combined = combine_all(&effects).unwrap();
        assert_eq!(combined.result_type, AnomalyType::Stasis);
        assert_approx_eq!(combined.time_distortion, 0.16);
        assert_eq!(
            combined.source_types,
            vec![AnomalyType::Dilation, AnomalyType::Dilation, AnomalyType::Stasis]
        );
    }

    #[test]
    fn test_combine_all_edge_cases() {
        let empty: [AnomalyEffect; 0] = [];
        assert!(combine_all(&empty).is_none());

        let single = [effect(AnomalyType::Reversal, -0.7)];
        let combined = combine_all(&single).unwrap();
        assert_eq!(combined.result_type, AnomalyType::Reversal);
        assert_approx_eq!(combined.time_distortion, -0.7);
        assert_eq!(combined.source_types, vec![AnomalyType::Reversal]);
    }

    #[test]
    fn test_to_effect_is_synthetic() {
        let combined = combine_pair(
            &effect(AnomalyType::Dilation, 0.5),
            &effect(AnomalyType::Dilation, 0.5),
        );
        let synthetic = combined.to_effect(Point3::new(1.0, 0.0, 0.0), 2.0, 0.1);
        assert_eq!(synthetic.source_id, SYNTHETIC_SOURCE_ID);
        assert_eq!(synthetic.anomaly_type, AnomalyType::Dilation);
        assert_approx_eq!(synthetic.time_distortion, 0.25);
        assert_approx_eq!(synthetic.strength, 1.0);
    }
}
