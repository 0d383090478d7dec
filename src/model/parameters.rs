//! Read and validate model parameters from `model.toml`.
//!
//! This module defines the `ModelParameters` struct and helpers for loading and
//! validating the `model.toml` configuration used by the model. These parameters
//! mostly control how the solver is run.
use crate::input::{input_err_msg, read_toml};
use crate::units::MoneyPerFlow;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_unit_param_default!(default_value_of_lost_load, MoneyPerFlow, 1e9);
define_param_default!(default_mip_rel_gap, f64, 1e-4);

/// Model parameters as defined in the `model.toml` file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelParameters {
    /// Wall-clock limit for the solver, in seconds. No limit if omitted.
    #[serde(default)]
    pub time_limit: Option<f64>,
    /// Relative gap at which the solver may stop and declare a solution optimal
    #[serde(default = "default_mip_rel_gap")]
    pub mip_rel_gap: f64,
    /// Whether to accept the best solution found so far if the time limit is reached.
    ///
    /// If false, reaching the time limit is an error.
    #[serde(default)]
    pub accept_incumbent_on_timeout: bool,
    /// The cost applied to unmet demand and surplus heat when diagnosing an infeasible model
    #[serde(default = "default_value_of_lost_load")]
    pub value_of_lost_load: MoneyPerFlow,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            time_limit: None,
            mip_rel_gap: default_mip_rel_gap(),
            accept_incumbent_on_timeout: false,
            value_of_lost_load: default_value_of_lost_load(),
        }
    }
}

/// Check that the `time_limit` parameter is valid
fn check_time_limit(value: Option<f64>) -> Result<()> {
    if let Some(value) = value {
        ensure!(
            value.is_finite() && value > 0.0,
            "time_limit must be a finite number greater than zero"
        );
    }

    Ok(())
}

/// Check that the `mip_rel_gap` parameter is valid
fn check_mip_rel_gap(value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "mip_rel_gap must be a finite number greater than or equal to zero"
    );

    Ok(())
}

/// Check that the `value_of_lost_load` parameter is valid
fn check_value_of_lost_load(value: MoneyPerFlow) -> Result<()> {
    ensure!(
        value.is_finite() && value > MoneyPerFlow(0.0),
        "value_of_lost_load must be a finite number greater than zero"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// If the file is not present, default parameters will be used.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        if !file_path.is_file() {
            return Ok(ModelParameters::default());
        }

        let model_params: ModelParameters = read_toml(&file_path)?;
        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    pub fn validate(&self) -> Result<()> {
        check_time_limit(self.time_limit)?;
        check_mip_rel_gap(self.mip_rel_gap)?;
        check_value_of_lost_load(self.value_of_lost_load)?;

        Ok(())
    }
}
