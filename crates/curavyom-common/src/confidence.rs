/// Confidence radar data for the demo and dashboard views.
/// The backend reports a single confidence score; the radar spreads it over
/// six evidence axes with bounded jitter.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Upper bound of every radar axis.
pub const FULL_MARK: f64 = 150.0;

/// Base score used when the backend sends a non-numeric confidence.
pub const FALLBACK_BASE_SCORE: f64 = 85.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarAxis {
    pub subject: String,
    pub score: f64,
    pub full_mark: f64,
}

impl RadarAxis {
    fn new(subject: &str, score: f64) -> Self {
        Self { subject: subject.to_string(), score, full_mark: FULL_MARK }
    }
}

// (subject, jitter span, jitter offset): score = base + rand * span + offset
const AXES: [(&str, f64, f64); 6] = [
    ("Clinical", 20.0, 0.0),
    ("Patent",   20.0, -10.0),
    ("Market",   30.0, -15.0),
    ("Safety",   10.0, 0.0),
    ("Efficacy", 20.0, 0.0),
    ("Novelty",  40.0, -20.0),
];

/// Radar shown before any response has carried a confidence score.
pub fn canned_radar() -> Vec<RadarAxis> {
    [
        ("Clinical", 120.0),
        ("Patent", 98.0),
        ("Market", 86.0),
        ("Safety", 99.0),
        ("Efficacy", 85.0),
        ("Novelty", 65.0),
    ]
    .iter()
    .map(|(subject, score)| RadarAxis::new(subject, *score))
    .collect()
}

/// Derive radar axes from a response's `metadata.confidence_score`.
/// Returns `None` when the metadata carries no (truthy) score.
pub fn radar_from_metadata<R: Rng + ?Sized>(
    metadata: &serde_json::Value,
    rng: &mut R,
) -> Option<Vec<RadarAxis>> {
    let score = metadata.get("confidence_score")?;
    let base = match score {
        serde_json::Value::Null | serde_json::Value::Bool(false) => return None,
        serde_json::Value::Number(n) => {
            let v = n.as_f64().unwrap_or(FALLBACK_BASE_SCORE);
            if v == 0.0 {
                return None;
            }
            v
        }
        serde_json::Value::String(s) if s.is_empty() => return None,
        _ => FALLBACK_BASE_SCORE,
    };

    Some(
        AXES.iter()
            .map(|(subject, span, offset)| {
                let jitter = rng.gen::<f64>() * span + offset;
                RadarAxis::new(subject, (base + jitter).min(FULL_MARK))
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    #[test]
    fn test_no_score_no_radar() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(radar_from_metadata(&json!({}), &mut rng).is_none());
        assert!(radar_from_metadata(&json!({"confidence_score": null}), &mut rng).is_none());
        assert!(radar_from_metadata(&json!({"confidence_score": 0}), &mut rng).is_none());
    }

    #[test]
    fn test_numeric_score_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let radar = radar_from_metadata(&json!({"confidence_score": 90}), &mut rng).unwrap();
        assert_eq!(radar.len(), 6);
        let clinical = &radar[0];
        assert_eq!(clinical.subject, "Clinical");
        assert!(clinical.score >= 90.0 && clinical.score <= 110.0);
        let novelty = &radar[5];
        assert!(novelty.score >= 70.0 && novelty.score <= 110.0);
    }

    #[test]
    fn test_capped_at_full_mark() {
        let mut rng = StdRng::seed_from_u64(3);
        let radar = radar_from_metadata(&json!({"confidence_score": 149}), &mut rng).unwrap();
        assert!(radar.iter().all(|a| a.score <= FULL_MARK));
    }

    #[test]
    fn test_non_numeric_score_uses_fallback_base() {
        let mut rng = StdRng::seed_from_u64(11);
        let radar =
            radar_from_metadata(&json!({"confidence_score": {"clinical": 0.9}}), &mut rng).unwrap();
        let safety = radar.iter().find(|a| a.subject == "Safety").unwrap();
        assert!(safety.score >= FALLBACK_BASE_SCORE && safety.score <= FALLBACK_BASE_SCORE + 10.0);
    }

    #[test]
    fn test_canned_radar_matches_dashboard() {
        let radar = canned_radar();
        assert_eq!(radar[0].score, 120.0);
        assert_eq!(radar[5].subject, "Novelty");
    }
}
