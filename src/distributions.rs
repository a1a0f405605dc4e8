//! Scalar distributions used to sample disease timelines.
//!
//! `rand_distr` covers the gamma and normal families; truncation is not
//! provided there, so `TruncatedNormal` implements Robert's (1995) mixed
//! rejection sampler on top of it. Every constructor validates its
//! parameters and fails with `SimError::InvalidParameter`, so a bad
//! configuration is rejected when the disease model is built rather than in
//! the middle of a run.

use rand::Rng;
use rand_distr::{Distribution, Exp1, Gamma, StandardNormal};
use serde_derive::{Deserialize, Serialize};

use crate::error::{ensure, SimError};

/// Configured parameters of a normal distribution clipped to `[clip_low, clip_high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruncatedNormalParams {
    pub mean: f64,
    pub std: f64,
    pub clip_low: f64,
    pub clip_high: f64,
}

impl TruncatedNormalParams {
    pub fn new(mean: f64, std: f64, clip_low: f64, clip_high: f64) -> Self {
        TruncatedNormalParams {
            mean,
            std,
            clip_low,
            clip_high,
        }
    }
}

/// A normal distribution conditioned on lying in `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedNormal {
    mean: f64,
    std: f64,
    // Bounds in standard units
    a: f64,
    b: f64,
}

impl TruncatedNormal {
    /// # Errors
    ///
    /// Returns `SimError::InvalidParameter` if any value is non-finite, if `std <= 0`, or if
    /// `low >= high`.
    pub fn new(mean: f64, std: f64, low: f64, high: f64) -> Result<Self, SimError> {
        ensure(
            mean.is_finite() && std.is_finite() && low.is_finite() && high.is_finite(),
            || format!("truncated normal parameters must be finite (mean={mean}, std={std}, clip=[{low}, {high}])"),
        )?;
        ensure(std > 0.0, || {
            format!("truncated normal std must be positive, got {std}")
        })?;
        ensure(low < high, || {
            format!("truncated normal clip_low ({low}) must be below clip_high ({high})")
        })?;
        Ok(TruncatedNormal {
            mean,
            std,
            a: (low - mean) / std,
            b: (high - mean) / std,
        })
    }

    /// # Errors
    ///
    /// See [`TruncatedNormal::new`].
    pub fn from_params(params: &TruncatedNormalParams) -> Result<Self, SimError> {
        Self::new(params.mean, params.std, params.clip_low, params.clip_high)
    }

    /// Same spread and clip window as `params`, centred on a different mean.
    ///
    /// # Errors
    ///
    /// See [`TruncatedNormal::new`].
    pub fn with_mean(params: &TruncatedNormalParams, mean: f64) -> Result<Self, SimError> {
        Self::new(mean, params.std, params.clip_low, params.clip_high)
    }

    #[must_use]
    pub fn low(&self) -> f64 {
        self.mean + self.a * self.std
    }

    #[must_use]
    pub fn high(&self) -> f64 {
        self.mean + self.b * self.std
    }
}

impl Distribution<f64> for TruncatedNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z = sample_standard_truncated(rng, self.a, self.b);
        // Guard against rounding pushing the value a hair outside the window.
        (self.mean + z * self.std).clamp(self.low(), self.high())
    }
}

/// Draws from N(0, 1) restricted to `[a, b]`.
fn sample_standard_truncated<R: Rng + ?Sized>(rng: &mut R, a: f64, b: f64) -> f64 {
    if b <= 0.0 {
        // Upper tail mirrored onto the positive axis.
        return -sample_standard_truncated(rng, -b, -a);
    }
    if a <= 0.0 {
        // The window contains the mode.
        if b - a >= (2.0 * std::f64::consts::PI).sqrt() {
            loop {
                let z: f64 = rng.sample(StandardNormal);
                if z >= a && z <= b {
                    return z;
                }
            }
        }
        return uniform_rejection(rng, a, b, 0.0);
    }

    // 0 < a < b: the window lies in the right tail.
    let root = (a * a + 4.0).sqrt();
    let alpha = (a + root) / 2.0;
    let exponential_is_tighter = b - a > 2.0 / (a + root) * ((a * a - a * root) / 4.0 + 0.5).exp();
    if exponential_is_tighter {
        loop {
            let e: f64 = rng.sample(Exp1);
            let z = a + e / alpha;
            if z > b {
                continue;
            }
            let u: f64 = rng.random();
            if u <= (-(z - alpha).powi(2) / 2.0).exp() {
                return z;
            }
        }
    }
    uniform_rejection(rng, a, b, a * a)
}

/// Uniform proposal over `[a, b]`, accepted with probability `exp((offset - z^2) / 2)`.
fn uniform_rejection<R: Rng + ?Sized>(rng: &mut R, a: f64, b: f64, offset: f64) -> f64 {
    loop {
        let z = rng.random_range(a..=b);
        let u: f64 = rng.random();
        if u <= ((offset - z * z) / 2.0).exp() {
            return z;
        }
    }
}

/// Builds a gamma distribution after checking shape and scale.
///
/// # Errors
///
/// Returns `SimError::InvalidParameter` unless both values are finite and positive.
pub fn gamma(shape: f64, scale: f64) -> Result<Gamma<f64>, SimError> {
    ensure(shape.is_finite() && shape > 0.0, || {
        format!("gamma shape must be positive, got {shape}")
    })?;
    ensure(scale.is_finite() && scale > 0.0, || {
        format!("gamma scale must be positive, got {scale}")
    })?;
    Gamma::new(shape, scale).map_err(|e| SimError::InvalidParameter(e.to_string()))
}

/// Checks a closed `[min, max]` range that must sit inside `[0, 1]`.
///
/// # Errors
///
/// Returns `SimError::InvalidParameter` when the bounds are reversed or outside the unit
/// interval.
pub fn unit_range(name: &str, min: f64, max: f64) -> Result<(f64, f64), SimError> {
    ensure((0.0..=1.0).contains(&min) && (0.0..=1.0).contains(&max), || {
        format!("{name} bounds must lie in [0, 1], got [{min}, {max}]")
    })?;
    ensure(min <= max, || format!("{name} min ({min}) exceeds max ({max})"))?;
    Ok((min, max))
}

/// Uniform draw from `[min, max]`, which may be a single point.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, (min, max): (f64, f64)) -> f64 {
    if min == max {
        min
    } else {
        rng.random_range(min..=max)
    }
}
