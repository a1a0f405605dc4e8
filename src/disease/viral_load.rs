//! The piecewise-linear viral load curve and its mapping to infectiousness.

use serde_derive::{Deserialize, Serialize};

use crate::disease::timeline::TimelineAnchors;

/// Hourly samples averaged by [`ViralLoadCurve::average_infectiousness`].
const SAMPLES_PER_DAY: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViralLoadCurve {
    anchors: TimelineAnchors,
    peak_height: f64,
    plateau_height: f64,
}

impl ViralLoadCurve {
    #[must_use]
    pub fn new(anchors: TimelineAnchors, peak_height: f64, plateau_height: f64) -> Self {
        ViralLoadCurve {
            anchors,
            peak_height,
            plateau_height,
        }
    }

    #[must_use]
    pub fn anchors(&self) -> &TimelineAnchors {
        &self.anchors
    }

    #[must_use]
    pub fn peak_height(&self) -> f64 {
        self.peak_height
    }

    #[must_use]
    pub fn plateau_height(&self) -> f64 {
        self.plateau_height
    }

    /// Viral load `days` after exposure. Zero outside `[onset, recovery]`.
    #[must_use]
    pub fn viral_load(&self, days: f64) -> f64 {
        let a = &self.anchors;
        if days < a.infectiousness_onset_day || days > a.recovery_day {
            return 0.0;
        }
        if days < a.viral_load_peak_day {
            return lerp(
                (a.infectiousness_onset_day, 0.0),
                (a.viral_load_peak_day, self.peak_height),
                days,
            );
        }
        if days < a.plateau_start_day {
            return lerp(
                (a.viral_load_peak_day, self.peak_height),
                (a.plateau_start_day, self.plateau_height),
                days,
            );
        }
        if days <= a.plateau_end_day {
            return self.plateau_height;
        }
        lerp(
            (a.plateau_end_day, self.plateau_height),
            (a.recovery_day, 0.0),
            days,
        )
    }

    #[must_use]
    pub fn infectiousness(&self, days: f64, multiplier: f64) -> f64 {
        self.viral_load(days) * multiplier
    }

    /// Mean infectiousness over `[day_start, day_start + 1)`, taken from hourly samples.
    #[must_use]
    pub fn average_infectiousness(&self, day_start: f64, multiplier: f64) -> f64 {
        let total: f64 = (0..SAMPLES_PER_DAY)
            .map(|hour| self.infectiousness(day_start + f64::from(hour) / f64::from(SAMPLES_PER_DAY), multiplier))
            .sum();
        total / f64::from(SAMPLES_PER_DAY)
    }
}

// Degenerate segments (zero width) evaluate to the right endpoint.
fn lerp((x0, y0): (f64, f64), (x1, y1): (f64, f64), x: f64) -> f64 {
    if x1 <= x0 {
        return y1;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::disease::timeline::{DiseaseModel, DiseaseParams};
    use approx::assert_abs_diff_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn fixed_curve() -> ViralLoadCurve {
        ViralLoadCurve::new(
            TimelineAnchors {
                incubation_day: 5.0,
                infectiousness_onset_day: 2.5,
                viral_load_peak_day: 4.3,
                plateau_start_day: 5.7,
                plateau_end_day: 7.7,
                recovery_day: 17.2,
            },
            0.8,
            0.6,
        )
    }

    #[test]
    fn shape_of_fixed_curve() {
        let curve = fixed_curve();
        assert_eq!(curve.viral_load(0.0), 0.0);
        assert_eq!(curve.viral_load(2.4), 0.0);
        assert_abs_diff_eq!(curve.viral_load(4.3), 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.viral_load(5.0), 0.7, epsilon = 1e-12);
        assert_eq!(curve.viral_load(6.5), 0.6);
        assert_abs_diff_eq!(curve.viral_load(12.45), 0.3, epsilon = 1e-12);
        assert_eq!(curve.viral_load(17.3), 0.0);
        assert_eq!(curve.viral_load(100.0), 0.0);
    }

    #[test]
    fn continuous_at_breakpoints() {
        let model = DiseaseModel::new(DiseaseParams::default()).unwrap();
        let mut rng = SmallRng::seed_from_u64(17);
        let eps = 1e-9;
        for _ in 0..1_000 {
            let curve = model.sample_timeline(45.0, 1, &mut rng).unwrap();
            let a = *curve.anchors();
            for breakpoint in [
                a.infectiousness_onset_day,
                a.viral_load_peak_day,
                a.plateau_start_day,
                a.plateau_end_day,
                a.recovery_day,
            ] {
                let left = curve.viral_load(breakpoint - eps);
                let right = curve.viral_load(breakpoint + eps);
                assert_abs_diff_eq!(left, right, epsilon = 1e-6);
            }
            assert_eq!(curve.viral_load(a.infectiousness_onset_day - 1e-6), 0.0);
            assert_eq!(curve.viral_load(a.recovery_day + 1e-6), 0.0);
        }
    }

    #[test]
    fn infectiousness_scales_viral_load() {
        let curve = fixed_curve();
        assert_eq!(curve.infectiousness(6.0, 0.5), 0.3);
        let average = curve.average_infectiousness(6.0, 1.0);
        assert_abs_diff_eq!(average, 0.6, epsilon = 1e-12);
        assert_eq!(curve.average_infectiousness(30.0, 1.0), 0.0);
    }
}
