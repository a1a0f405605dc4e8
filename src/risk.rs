//! Per-individual risk beliefs.
//!
//! Risk is a probability in [0, 1] kept per day in a [`RiskHistory`]. Only
//! discretized *levels* ([`RiskLevelMapper`]) ever leave the individual, in
//! update messages and in the change score used for budgeting.

use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

use crate::disease::{Symptom, SymptomSet};
use crate::error::{ensure, SimError};

/// Whole days since the start of the simulation.
pub type Day = i64;

/// Days before today that a fresh inference also applies to, since people
/// shed virus before they notice symptoms.
pub const SYMPTOM_LOOKBACK_DAYS: Day = 2;

/// Day-indexed risk, with the snapshot last disclosed to contacts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskHistory {
    previous: BTreeMap<Day, f64>,
    current: BTreeMap<Day, f64>,
}

impl RiskHistory {
    #[must_use]
    pub fn new() -> Self {
        RiskHistory::default()
    }

    /// What contacts were last told.
    #[must_use]
    pub fn previous(&self) -> &BTreeMap<Day, f64> {
        &self.previous
    }

    #[must_use]
    pub fn current(&self) -> &BTreeMap<Day, f64> {
        &self.current
    }

    /// Risk on `day`, or `default` if nothing was recorded.
    #[must_use]
    pub fn get(&self, day: Day, default: f64) -> f64 {
        self.current.get(&day).copied().unwrap_or(default)
    }

    /// # Panics
    ///
    /// Panics if `risk` is NaN.
    pub fn set(&mut self, day: Day, risk: f64) {
        assert!(!risk.is_nan(), "Risk for day {day} is NaN");
        self.current.insert(day, risk.clamp(0.0, 1.0));
    }

    /// Applies an inferred risk to `day` and the days just before it.
    pub fn record_inference(&mut self, day: Day, risk: f64) {
        for d in (day - SYMPTOM_LOOKBACK_DAYS)..=day {
            self.set(d, risk);
        }
    }

    /// Marks the last `n_days` days, ending today, as certain.
    pub fn override_recent(&mut self, day: Day, n_days: Day, risk: f64) {
        for offset in 0..n_days {
            self.set(day - offset, risk);
        }
    }

    /// Makes the current map the disclosed snapshot.
    pub fn commit(&mut self) {
        self.previous.clone_from(&self.current);
    }

    /// Forgets days before `first_day` in both snapshots.
    pub fn prune(&mut self, first_day: Day) {
        self.previous = self.previous.split_off(&first_day);
        self.current = self.current.split_off(&first_day);
    }
}

/// Maps a risk probability to one of `levels()` discrete levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLevelMapper {
    // Strictly ascending; level `i` covers [thresholds[i-1], thresholds[i]).
    thresholds: Vec<f64>,
}

impl RiskLevelMapper {
    /// # Errors
    ///
    /// Returns `SimError::InvalidParameter` unless the thresholds are strictly
    /// ascending and lie in (0, 1].
    pub fn new(thresholds: Vec<f64>) -> Result<Self, SimError> {
        ensure(thresholds.iter().all(|t| *t > 0.0 && *t <= 1.0), || {
            format!("risk level thresholds must lie in (0, 1], got {thresholds:?}")
        })?;
        ensure(thresholds.windows(2).all(|w| w[0] < w[1]), || {
            format!("risk level thresholds must be strictly ascending, got {thresholds:?}")
        })?;
        Ok(RiskLevelMapper { thresholds })
    }

    /// `levels` equal-width levels over [0, 1].
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvalidParameter` if `levels < 2`.
    pub fn uniform(levels: u32) -> Result<Self, SimError> {
        ensure(levels >= 2, || format!("need at least 2 risk levels, got {levels}"))?;
        Self::new(
            (1..levels)
                .map(|i| f64::from(i) / f64::from(levels))
                .collect(),
        )
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn levels(&self) -> u32 {
        self.thresholds.len() as u32 + 1
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn level(&self, risk: f64) -> u32 {
        self.thresholds.partition_point(|t| *t <= risk) as u32
    }

    /// The level everyone starts at.
    #[must_use]
    pub fn baseline_level(&self) -> u32 {
        self.level(0.0)
    }

    #[must_use]
    pub fn level_on(&self, history: &BTreeMap<Day, f64>, day: Day) -> u32 {
        history
            .get(&day)
            .map_or_else(|| self.baseline_level(), |risk| self.level(*risk))
    }
}

/// How far an individual's disclosed levels moved between two snapshots: the
/// largest per-day level difference. Days missing from `prev` count as baseline.
#[must_use]
pub fn get_risk_level_change_score(
    prev: &BTreeMap<Day, f64>,
    curr: &BTreeMap<Day, f64>,
    mapper: &RiskLevelMapper,
) -> u32 {
    curr.keys()
        .map(|day| mapper.level_on(curr, *day).abs_diff(mapper.level_on(prev, *day)))
        .max()
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestResult {
    Positive,
    Negative,
}

/// Observable signals available to an individual's app.
#[derive(Debug, Clone, Copy)]
pub struct InferenceInput<'a> {
    pub day: Day,
    pub symptoms: &'a SymptomSet,
    /// Highest level received in a message, keyed by encounter day.
    pub received_levels: &'a BTreeMap<Day, u32>,
    pub test_result: Option<TestResult>,
    pub levels: u32,
}

/// Estimates today's risk from what an individual can observe.
pub trait RiskInference {
    fn infer(&self, input: &InferenceInput) -> f64;
}

/// Combines symptom severity, the worst received level and the latest test
/// as independent sources of risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicRiskInference {
    pub baseline_risk: f64,
    /// Weight of a maximal received level.
    pub contact_weight: f64,
    /// Received levels older than this are ignored.
    pub contact_window_days: Day,
    pub negative_test_factor: f64,
}

impl Default for HeuristicRiskInference {
    fn default() -> Self {
        HeuristicRiskInference {
            baseline_risk: 0.01,
            contact_weight: 0.8,
            contact_window_days: 14,
            negative_test_factor: 0.5,
        }
    }
}

impl HeuristicRiskInference {
    /// # Errors
    ///
    /// Returns `SimError::InvalidParameter` for a negative window or a weight
    /// outside [0, 1].
    pub fn validate(&self) -> Result<(), SimError> {
        ensure(self.contact_window_days >= 0, || {
            format!(
                "contact_window_days must not be negative, got {}",
                self.contact_window_days
            )
        })?;
        for (name, value) in [
            ("baseline_risk", self.baseline_risk),
            ("contact_weight", self.contact_weight),
            ("negative_test_factor", self.negative_test_factor),
        ] {
            ensure((0.0..=1.0).contains(&value), || {
                format!("{name} must lie in [0, 1], got {value}")
            })?;
        }
        Ok(())
    }

    fn symptom_risk(symptoms: &SymptomSet) -> f64 {
        symptoms
            .iter()
            .map(|symptom| match symptom {
                Symptom::ExtremelySevere | Symptom::Severe => 0.75,
                Symptom::LossOfTaste => 0.6,
                Symptom::Moderate | Symptom::HeavyTroubleBreathing => 0.5,
                Symptom::Fever | Symptom::ModerateTroubleBreathing => 0.4,
                Symptom::Mild | Symptom::Cough | Symptom::LightTroubleBreathing => 0.2,
                _ => 0.05,
            })
            .fold(0.0, f64::max)
    }
}

impl RiskInference for HeuristicRiskInference {
    fn infer(&self, input: &InferenceInput) -> f64 {
        if input.test_result == Some(TestResult::Positive) {
            return 1.0;
        }
        let max_level = input
            .received_levels
            .range((input.day - self.contact_window_days)..=input.day)
            .map(|(_, level)| *level)
            .max()
            .unwrap_or(0);
        let contact_risk =
            self.contact_weight * f64::from(max_level) / f64::from(input.levels.saturating_sub(1).max(1));
        let symptom_risk = Self::symptom_risk(input.symptoms);

        let mut risk = 1.0 - (1.0 - self.baseline_risk) * (1.0 - symptom_risk) * (1.0 - contact_risk);
        if input.test_result == Some(TestResult::Negative) {
            risk *= self.negative_test_factor;
        }
        risk.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn uniform_mapper_levels() {
        let mapper = RiskLevelMapper::uniform(16).unwrap();
        assert_eq!(mapper.levels(), 16);
        assert_eq!(mapper.level(0.0), 0);
        assert_eq!(mapper.level(0.0624), 0);
        assert_eq!(mapper.level(0.0625), 1);
        assert_eq!(mapper.level(0.99), 15);
        assert_eq!(mapper.level(1.0), 15);
        assert_eq!(mapper.baseline_level(), 0);
    }

    #[test]
    fn mapper_rejects_bad_thresholds() {
        assert!(RiskLevelMapper::new(vec![0.5, 0.2]).is_err());
        assert!(RiskLevelMapper::new(vec![0.0, 0.2]).is_err());
        assert!(RiskLevelMapper::uniform(1).is_err());
    }

    #[test]
    fn change_score_is_largest_level_jump() {
        let mapper = RiskLevelMapper::uniform(4).unwrap();
        let prev = BTreeMap::from([(1, 0.1), (2, 0.3)]);
        let curr = BTreeMap::from([(1, 0.1), (2, 0.8), (3, 0.6)]);
        // Day 2 moves from level 1 to 3; day 3 from baseline to 2.
        assert_eq!(get_risk_level_change_score(&prev, &curr, &mapper), 2);
        assert_eq!(get_risk_level_change_score(&curr, &curr, &mapper), 0);
        assert_eq!(get_risk_level_change_score(&prev, &BTreeMap::new(), &mapper), 0);
    }

    #[test]
    fn history_snapshots() {
        let mut history = RiskHistory::new();
        history.record_inference(10, 0.4);
        assert_eq!(history.current().len(), 3);
        assert!(history.previous().is_empty());
        history.commit();
        assert_eq!(history.previous(), history.current());

        history.override_recent(10, 5, 1.0);
        assert_abs_diff_eq!(history.get(6, 0.0), 1.0);
        assert_abs_diff_eq!(history.get(5, 0.0), 0.0);
        assert_abs_diff_eq!(history.previous()[&10], 0.4);

        history.set(11, 3.0);
        assert_abs_diff_eq!(history.get(11, 0.0), 1.0);

        history.prune(9);
        assert_eq!(history.current().keys().next(), Some(&9));
        assert_eq!(history.previous().keys().next(), Some(&9));
    }

    #[test]
    fn heuristic_inference() {
        let inference = HeuristicRiskInference::default();
        let no_symptoms = SymptomSet::new();
        let no_messages = BTreeMap::new();
        let input = InferenceInput {
            day: 20,
            symptoms: &no_symptoms,
            received_levels: &no_messages,
            test_result: None,
            levels: 16,
        };
        assert_abs_diff_eq!(inference.infer(&input), 0.01, epsilon = 1e-12);

        let positive = InferenceInput {
            test_result: Some(TestResult::Positive),
            ..input
        };
        assert_abs_diff_eq!(inference.infer(&positive), 1.0);

        let severe = SymptomSet::from([Symptom::Severe, Symptom::Cough]);
        let with_symptoms = InferenceInput {
            symptoms: &severe,
            ..input
        };
        assert!(inference.infer(&with_symptoms) > 0.75);

        let messages = BTreeMap::from([(15, 15), (2, 15)]);
        let with_messages = InferenceInput {
            received_levels: &messages,
            ..input
        };
        let contact = inference.infer(&with_messages);
        assert_abs_diff_eq!(contact, 1.0 - 0.99 * 0.2, epsilon = 1e-12);

        let negative = InferenceInput {
            test_result: Some(TestResult::Negative),
            ..with_messages
        };
        assert_abs_diff_eq!(inference.infer(&negative), contact * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn heuristic_inference_validation() {
        assert!(HeuristicRiskInference::default().validate().is_ok());

        let negative_window = HeuristicRiskInference {
            contact_window_days: -1,
            ..HeuristicRiskInference::default()
        };
        assert!(matches!(negative_window.validate(), Err(SimError::InvalidParameter(_))));

        let baseline = HeuristicRiskInference {
            baseline_risk: 7.0,
            ..HeuristicRiskInference::default()
        };
        assert!(matches!(baseline.validate(), Err(SimError::InvalidParameter(_))));

        let weight = HeuristicRiskInference {
            contact_weight: -0.1,
            ..HeuristicRiskInference::default()
        };
        assert!(weight.validate().is_err());

        let factor = HeuristicRiskInference {
            negative_test_factor: f64::INFINITY,
            ..HeuristicRiskInference::default()
        };
        assert!(factor.validate().is_err());
    }
}
