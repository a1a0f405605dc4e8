//! Sampling of per-individual disease timelines.
//!
//! All days are offsets from exposure. [`DiseaseModel`] validates its
//! [`DiseaseParams`] once, at construction, and then only draws.

use log::trace;
use rand::Rng;
use rand_distr::{Distribution, Gamma};
use serde_derive::{Deserialize, Serialize};

use crate::disease::viral_load::ViralLoadCurve;
use crate::distributions::{gamma, uniform, unit_range, TruncatedNormal, TruncatedNormalParams};
use crate::error::{ensure, SimError};

/// Minimum days from exposure to symptom onset.
pub const MIN_INCUBATION_DAYS: f64 = 2.0;
/// Minimum days from exposure to the start of shedding.
pub const MIN_INFECTIOUSNESS_ONSET_DAYS: f64 = 1.0;
/// Minimum gap between onset and peak, and between peak and plateau start.
pub const MIN_RAMP_DAYS: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiseaseParams {
    pub incubation_days_gamma_shape: f64,
    pub incubation_days_gamma_scale: f64,
    /// How long before symptom onset shedding starts.
    pub infectiousness_onset_wrt_symptom_onset: TruncatedNormalParams,
    /// How long before symptom onset the viral load peaks.
    pub viral_load_peak_wrt_incubation: TruncatedNormalParams,
    pub plateau_duration: TruncatedNormalParams,
    /// `mean` is the average number of days from exposure to recovery. The
    /// sampled quantity is the time from plateau end, whose mean is derived
    /// by subtracting the plateau and onset means.
    pub recovery: TruncatedNormalParams,
    pub min_viral_load_peak_height: f64,
    pub max_viral_load_peak_height: f64,
    pub min_multiplier_plateau_height: f64,
    pub max_multiplier_plateau_height: f64,
    pub viral_load_to_infectiousness_multiplier: f64,
    /// Chance that an extremely sick individual dies instead of recovering.
    pub extremely_sick_fatality: f64,
    pub other_diseases: OtherDiseaseParams,
}

impl Default for DiseaseParams {
    fn default() -> Self {
        DiseaseParams {
            incubation_days_gamma_shape: 5.807,
            incubation_days_gamma_scale: 0.948,
            infectiousness_onset_wrt_symptom_onset: TruncatedNormalParams::new(2.5, 0.5, 1.0, 4.0),
            viral_load_peak_wrt_incubation: TruncatedNormalParams::new(0.7, 0.1, 0.2, 1.2),
            plateau_duration: TruncatedNormalParams::new(2.0, 0.5, 1.0, 3.0),
            recovery: TruncatedNormalParams::new(14.0, 3.0, 3.0, 30.0),
            min_viral_load_peak_height: 0.6,
            max_viral_load_peak_height: 1.0,
            min_multiplier_plateau_height: 0.5,
            max_multiplier_plateau_height: 1.0,
            viral_load_to_infectiousness_multiplier: 1.0,
            extremely_sick_fatality: 0.3,
            other_diseases: OtherDiseaseParams::default(),
        }
    }
}

/// Background illnesses that produce covid-like symptoms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OtherDiseaseParams {
    pub avg_cold_days: f64,
    pub avg_flu_days: f64,
    pub avg_allergy_days: f64,
    pub p_cold_today: f64,
    pub p_flu_today: f64,
    pub p_allergy_today: f64,
}

impl Default for OtherDiseaseParams {
    fn default() -> Self {
        OtherDiseaseParams {
            avg_cold_days: 4.0,
            avg_flu_days: 5.0,
            avg_allergy_days: 3.0,
            p_cold_today: 0.001,
            p_flu_today: 0.0005,
            p_allergy_today: 0.002,
        }
    }
}

impl OtherDiseaseParams {
    fn validate(&self) -> Result<(), SimError> {
        for (name, days) in [
            ("avg_cold_days", self.avg_cold_days),
            ("avg_flu_days", self.avg_flu_days),
            ("avg_allergy_days", self.avg_allergy_days),
        ] {
            ensure(days.is_finite() && days >= 1.0, || {
                format!("{name} must be at least 1, got {days}")
            })?;
        }
        for (name, p) in [
            ("p_cold_today", self.p_cold_today),
            ("p_flu_today", self.p_flu_today),
            ("p_allergy_today", self.p_allergy_today),
        ] {
            unit_range(name, p, p)?;
        }
        Ok(())
    }
}

/// Day offsets from exposure that shape an infection.
///
/// Always satisfies `0 < infectiousness_onset_day <= viral_load_peak_day <
/// plateau_start_day <= plateau_end_day <= recovery_day`, with
/// `incubation_day >= 2` and `infectiousness_onset_day >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineAnchors {
    pub incubation_day: f64,
    pub infectiousness_onset_day: f64,
    pub viral_load_peak_day: f64,
    pub plateau_start_day: f64,
    pub plateau_end_day: f64,
    pub recovery_day: f64,
}

impl TimelineAnchors {
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.incubation_day >= MIN_INCUBATION_DAYS
            && self.infectiousness_onset_day >= MIN_INFECTIOUSNESS_ONSET_DAYS
            && self.infectiousness_onset_day <= self.viral_load_peak_day
            && self.viral_load_peak_day < self.plateau_start_day
            && self.plateau_start_day <= self.plateau_end_day
            && self.plateau_end_day <= self.recovery_day
    }
}

/// Validated distributions for timeline sampling.
#[derive(Debug, Clone)]
pub struct DiseaseModel {
    params: DiseaseParams,
    incubation: Gamma<f64>,
    onset_offset: TruncatedNormal,
    peak_offset: TruncatedNormal,
    plateau_duration: TruncatedNormal,
    recovery_after_plateau: TruncatedNormal,
    peak_height: (f64, f64),
    plateau_multiplier: (f64, f64),
}

impl DiseaseModel {
    /// # Errors
    ///
    /// Returns `SimError::InvalidParameter` if any distribution parameter is out of range.
    pub fn new(params: DiseaseParams) -> Result<DiseaseModel, SimError> {
        let incubation = gamma(
            params.incubation_days_gamma_shape,
            params.incubation_days_gamma_scale,
        )?;
        let onset_offset = TruncatedNormal::from_params(&params.infectiousness_onset_wrt_symptom_onset)?;
        let peak_offset = TruncatedNormal::from_params(&params.viral_load_peak_wrt_incubation)?;

        ensure(params.plateau_duration.clip_low >= 0.0, || {
            format!(
                "plateau_duration.clip_low must not be negative, got {}",
                params.plateau_duration.clip_low
            )
        })?;
        let plateau_duration = TruncatedNormal::from_params(&params.plateau_duration)?;

        ensure(params.recovery.clip_low >= 0.0, || {
            format!(
                "recovery.clip_low must not be negative, got {}",
                params.recovery.clip_low
            )
        })?;
        let recovery_mean = params.recovery.mean
            - params.plateau_duration.mean
            - params.infectiousness_onset_wrt_symptom_onset.mean;
        let recovery_after_plateau = TruncatedNormal::with_mean(&params.recovery, recovery_mean)?;

        let peak_height = unit_range(
            "viral_load_peak_height",
            params.min_viral_load_peak_height,
            params.max_viral_load_peak_height,
        )?;
        let plateau_multiplier = unit_range(
            "multiplier_plateau_height",
            params.min_multiplier_plateau_height,
            params.max_multiplier_plateau_height,
        )?;
        ensure(
            params.viral_load_to_infectiousness_multiplier.is_finite()
                && params.viral_load_to_infectiousness_multiplier >= 0.0,
            || {
                format!(
                    "viral_load_to_infectiousness_multiplier must not be negative, got {}",
                    params.viral_load_to_infectiousness_multiplier
                )
            },
        )?;
        unit_range(
            "extremely_sick_fatality",
            params.extremely_sick_fatality,
            params.extremely_sick_fatality,
        )?;
        params.other_diseases.validate()?;

        Ok(DiseaseModel {
            params,
            incubation,
            onset_offset,
            peak_offset,
            plateau_duration,
            recovery_after_plateau,
            peak_height,
            plateau_multiplier,
        })
    }

    #[must_use]
    pub fn params(&self) -> &DiseaseParams {
        &self.params
    }

    /// Samples anchors and heights for a new infection.
    ///
    /// Heights do not yet depend on `inflammatory_level`; it is accepted so
    /// callers do not change when they do.
    ///
    /// # Errors
    ///
    /// Returns `SimError::ZeroPeakHeight` if the configured height range allows a
    /// peak of zero and one is drawn.
    pub fn sample_timeline<R: Rng + ?Sized>(
        &self,
        age: f64,
        inflammatory_level: usize,
        rng: &mut R,
    ) -> Result<ViralLoadCurve, SimError> {
        let anchors = self.sample_anchors(age, rng);

        let peak_height = uniform(rng, self.peak_height);
        let plateau_height = peak_height * uniform(rng, self.plateau_multiplier);
        if peak_height == 0.0 {
            return Err(SimError::ZeroPeakHeight { age });
        }

        trace!(
            "sampled timeline age={age} inflammatory_level={inflammatory_level} anchors={anchors:?} peak={peak_height:.3}"
        );
        Ok(ViralLoadCurve::new(anchors, peak_height, plateau_height))
    }

    fn sample_anchors<R: Rng + ?Sized>(&self, age: f64, rng: &mut R) -> TimelineAnchors {
        let incubation_day = self.incubation.sample(rng).max(MIN_INCUBATION_DAYS);

        let infectiousness_onset_day =
            (incubation_day - self.onset_offset.sample(rng)).max(MIN_INFECTIOUSNESS_ONSET_DAYS);

        let viral_load_peak_day = (incubation_day - self.peak_offset.sample(rng))
            .max(infectiousness_onset_day + MIN_RAMP_DAYS);

        // Mirror the peak around symptom onset. When the peak was pushed past
        // onset the mirror image would precede it.
        let plateau_start_day = (incubation_day + (incubation_day - viral_load_peak_day))
            .max(viral_load_peak_day + MIN_RAMP_DAYS);

        let plateau_end_day = plateau_start_day + self.plateau_duration.sample(rng);
        let recovery_day = plateau_end_day + self.recovery_after_plateau.sample(rng) + age / 40.0;

        TimelineAnchors {
            incubation_day,
            infectiousness_onset_day,
            viral_load_peak_day,
            plateau_start_day,
            plateau_end_day,
            recovery_day,
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn default_params_are_valid() {
        assert!(DiseaseModel::new(DiseaseParams::default()).is_ok());
    }

    #[test]
    fn invalid_params_fail_at_construction() {
        let mut params = DiseaseParams::default();
        params.incubation_days_gamma_scale = -1.0;
        assert!(matches!(
            DiseaseModel::new(params),
            Err(SimError::InvalidParameter(_))
        ));

        let mut params = DiseaseParams::default();
        params.plateau_duration.std = 0.0;
        assert!(DiseaseModel::new(params).is_err());

        let mut params = DiseaseParams::default();
        params.recovery.clip_low = 40.0;
        assert!(DiseaseModel::new(params).is_err());

        let mut params = DiseaseParams::default();
        params.max_viral_load_peak_height = 1.5;
        assert!(DiseaseModel::new(params).is_err());

        let mut params = DiseaseParams::default();
        params.min_multiplier_plateau_height = 0.9;
        params.max_multiplier_plateau_height = 0.1;
        assert!(DiseaseModel::new(params).is_err());

        let mut params = DiseaseParams::default();
        params.other_diseases.p_flu_today = 2.0;
        assert!(DiseaseModel::new(params).is_err());
    }

    #[test]
    fn zero_peak_height_is_fatal() {
        let params = DiseaseParams {
            min_viral_load_peak_height: 0.0,
            max_viral_load_peak_height: 0.0,
            ..DiseaseParams::default()
        };
        let model = DiseaseModel::new(params).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let error = model.sample_timeline(30.0, 0, &mut rng).unwrap_err();
        assert!(matches!(error, SimError::ZeroPeakHeight { age } if age == 30.0));
    }

    #[test]
    fn anchors_are_ordered() {
        let model = DiseaseModel::new(DiseaseParams::default()).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        for i in 0..10_000 {
            let age = f64::from(i % 100);
            let curve = model.sample_timeline(age, 0, &mut rng).unwrap();
            let anchors = curve.anchors();
            assert!(anchors.is_ordered(), "{anchors:?}");
            assert!(curve.plateau_height() <= curve.peak_height());
            assert!(curve.peak_height() <= 1.0);
        }
    }

    #[test]
    fn peak_pushed_past_incubation_keeps_plateau_after_peak() {
        // Onset offsets near zero put shedding right at symptom onset, which
        // forces the peak clamp.
        let params = DiseaseParams {
            incubation_days_gamma_shape: 1.0,
            incubation_days_gamma_scale: 0.1,
            infectiousness_onset_wrt_symptom_onset: TruncatedNormalParams::new(0.1, 0.05, 0.0, 0.2),
            ..DiseaseParams::default()
        };
        let model = DiseaseModel::new(params).unwrap();
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..1_000 {
            let anchors = *model.sample_timeline(40.0, 0, &mut rng).unwrap().anchors();
            assert_eq!(anchors.incubation_day, MIN_INCUBATION_DAYS);
            assert!(anchors.viral_load_peak_day >= anchors.infectiousness_onset_day + MIN_RAMP_DAYS);
            assert!(anchors.is_ordered(), "{anchors:?}");
        }
    }

    #[test]
    fn recovery_grows_with_age() {
        let model = DiseaseModel::new(DiseaseParams::default()).unwrap();
        let mean_recovery = |age: f64| {
            let mut rng = SmallRng::seed_from_u64(9);
            let total: f64 = (0..2_000)
                .map(|_| model.sample_timeline(age, 0, &mut rng).unwrap().anchors().recovery_day)
                .sum();
            total / 2_000.0
        };
        // Same seed, so only the age/40 term differs.
        assert!((mean_recovery(80.0) - mean_recovery(0.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: DiseaseParams =
            serde_json::from_str(r#"{"incubation_days_gamma_shape": 4.0}"#).unwrap();
        assert_eq!(params.incubation_days_gamma_shape, 4.0);
        assert_eq!(params.plateau_duration, DiseaseParams::default().plateau_duration);
        assert!(serde_json::from_str::<DiseaseParams>(r#"{"bogus": 1}"#).is_err());
    }
}
