//! Run parameters, stored as the `Params` global property.
//!
//! Every field has a default, so a parameter file only needs the values it
//! changes:
//!
//! ```json
//! {
//!     "tracesim.Params": {
//!         "population": 5000,
//!         "tracing": { "message_budget_fraction": 0.02 }
//!     }
//! }
//! ```
use std::path::Path;

use log::info;
use serde_derive::{Deserialize, Serialize};

use crate::context::Context;
use crate::define_global_property;
use crate::disease::{DiseaseModel, DiseaseParams};
use crate::dispatch::TracingParams;
use crate::error::{ensure, SimError};
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::risk::HeuristicRiskInference;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParametersValues {
    pub population: usize,
    pub max_days: u32,
    pub seed: u64,
    pub initial_infections: usize,
    /// Share of the population running the tracing app.
    pub app_uptake: f64,
    pub contacts_per_day: usize,
    /// Scales a contact's average infectiousness into a per-contact transmission probability.
    pub transmission_scale: f64,
    /// Daily chance that someone showing symptoms gets tested.
    pub symptomatic_test_probability: f64,
    pub disease: DiseaseParams,
    pub tracing: TracingParams,
    pub risk_inference: HeuristicRiskInference,
}

impl Default for ParametersValues {
    fn default() -> Self {
        ParametersValues {
            population: 1000,
            max_days: 60,
            seed: 0,
            initial_infections: 10,
            app_uptake: 0.6,
            contacts_per_day: 5,
            transmission_scale: 0.3,
            symptomatic_test_probability: 0.1,
            disease: DiseaseParams::default(),
            tracing: TracingParams::default(),
            risk_inference: HeuristicRiskInference::default(),
        }
    }
}

impl ParametersValues {
    /// # Errors
    ///
    /// Returns `SimError::InvalidParameter` naming the first field out of range.
    pub fn validate(&self) -> Result<(), SimError> {
        ensure(self.population >= 2, || {
            format!("population must be at least 2, got {}", self.population)
        })?;
        ensure(self.max_days >= 1, || "max_days must be at least 1".to_string())?;
        ensure(self.initial_infections <= self.population, || {
            format!(
                "initial_infections ({}) exceeds population ({})",
                self.initial_infections, self.population
            )
        })?;
        for (name, p) in [
            ("app_uptake", self.app_uptake),
            ("symptomatic_test_probability", self.symptomatic_test_probability),
        ] {
            ensure((0.0..=1.0).contains(&p), || format!("{name} must lie in [0, 1], got {p}"))?;
        }
        ensure(self.transmission_scale.is_finite() && self.transmission_scale >= 0.0, || {
            format!(
                "transmission_scale must not be negative, got {}",
                self.transmission_scale
            )
        })?;
        ensure(self.contacts_per_day < self.population, || {
            format!(
                "contacts_per_day ({}) must be smaller than population ({})",
                self.contacts_per_day, self.population
            )
        })?;
        DiseaseModel::new(self.disease.clone())?;
        self.risk_inference.validate()?;
        self.tracing.validate()
    }
}

define_global_property!(Params, ParametersValues, ParametersValues::validate);

/// Stores `Params`, loading them from `file_path` if one is given and using
/// the defaults otherwise.
///
/// # Errors
///
/// Returns any read, parse or validation error.
pub fn init_parameters(context: &mut Context, file_path: Option<&Path>) -> Result<(), SimError> {
    context.register_global_property(Params);
    if let Some(path) = file_path {
        context.load_global_properties(path)?;
    }
    if context.get_global_property_value(Params).is_none() {
        context.set_global_property_value(Params, ParametersValues::default())?;
    }
    info!("parameters: {:?}", parameters(context));
    Ok(())
}

/// # Panics
///
/// Panics if `Params` was never set.
#[must_use]
pub fn parameters(context: &Context) -> &ParametersValues {
    context
        .get_global_property_value(Params)
        .expect("Params must be set before the simulation starts")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        ParametersValues::default().validate().unwrap();
    }

    #[test]
    fn defaults_without_file() {
        let mut context = Context::new();
        init_parameters(&mut context, None).unwrap();
        assert_eq!(*parameters(&context), ParametersValues::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"tracesim.Params": {{"population": 500, "tracing": {{"burn_in_days": 0}}}}}}"#
        )
        .unwrap();

        let mut context = Context::new();
        init_parameters(&mut context, Some(file.path())).unwrap();
        let params = parameters(&context);
        assert_eq!(params.population, 500);
        assert_eq!(params.tracing.burn_in_days, 0);
        assert_eq!(params.tracing.risk_levels, 16);
        assert_eq!(params.max_days, 60);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"tracesim.Params": {{"populaton": 500}}}}"#).unwrap();
        let mut context = Context::new();
        assert!(matches!(
            init_parameters(&mut context, Some(file.path())),
            Err(SimError::JsonError(_))
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut params = ParametersValues {
            initial_infections: 2000,
            ..ParametersValues::default()
        };
        assert!(matches!(params.validate(), Err(SimError::InvalidParameter(_))));

        params.initial_infections = 1;
        params.app_uptake = 1.5;
        assert!(matches!(params.validate(), Err(SimError::InvalidParameter(_))));

        params.app_uptake = 0.5;
        params.tracing.updates_per_day = 0;
        assert!(matches!(params.validate(), Err(SimError::InvalidParameter(_))));

        params.tracing.updates_per_day = 4;
        params.disease.min_viral_load_peak_height = 1.5;
        assert!(matches!(params.validate(), Err(SimError::InvalidParameter(_))));

        params.disease = DiseaseParams::default();
        params.risk_inference.contact_window_days = -1;
        assert!(matches!(params.validate(), Err(SimError::InvalidParameter(_))));

        params.risk_inference.contact_window_days = 14;
        params.risk_inference.baseline_risk = 7.0;
        assert!(matches!(params.validate(), Err(SimError::InvalidParameter(_))));

        params.risk_inference.baseline_risk = 0.01;
        params.risk_inference.negative_test_factor = f64::NAN;
        assert!(matches!(params.validate(), Err(SimError::InvalidParameter(_))));

        params.risk_inference.negative_test_factor = 0.5;
        params.validate().unwrap();
    }
}
