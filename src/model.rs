//! The model represents the static input data provided by the user.
use crate::storage::StorageMap;
use crate::time_index::{TimeIndex, TimeStep};
use crate::time_series::TimeSeries;
use crate::unit::{UnitID, UnitMap};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::ModelParameters;

/// Commitment states fixed by the user, keyed by unit and time step.
///
/// `true` forces the unit on (must-run) and `false` forces it off (outage).
pub type FixedCommitmentMap = IndexMap<(UnitID, TimeStep), bool>;

/// Model definition
#[derive(Debug, Clone)]
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// The time steps over which the model is optimised
    pub time_index: TimeIndex,
    /// Fuel price, heat demand and spot price for each time step
    pub time_series: TimeSeries,
    /// Conversion units (CHP units and heat plants)
    pub units: UnitMap,
    /// Heat storage units
    pub storages: StorageMap,
    /// User-fixed commitment states
    pub fixed_commitment: FixedCommitmentMap,
}

impl Model {
    /// Check that the model is internally consistent.
    ///
    /// This is performed when loading a model and again before building the optimisation problem,
    /// so that a model assembled in code is held to the same rules as one read from disk.
    pub fn validate(&self) -> Result<()> {
        self.parameters.validate()?;
        self.time_series.validate(&self.time_index)?;
        ensure!(!self.units.is_empty(), "Model must contain at least one unit");
        for unit in self.units.values() {
            unit.validate()?;
        }
        for storage in self.storages.values() {
            storage.validate()?;
        }
        for (unit_id, t) in self.fixed_commitment.keys() {
            ensure!(
                self.units.contains_key(unit_id),
                "Commitment given for unknown unit {unit_id}"
            );
            ensure!(
                self.time_index.contains(*t),
                "Commitment for unit {unit_id} given for time step {t}, which is outside the \
                model's time index"
            );
        }

        Ok(())
    }

    /// The commitment state fixed for `unit_id` at `t`, if any
    pub fn fixed_commitment(&self, unit_id: &UnitID, t: TimeStep) -> Option<bool> {
        self.fixed_commitment.get(&(unit_id.clone(), t)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model};
    use crate::units::Flow;
    use rstest::rstest;
    use std::rc::Rc;

    #[rstest]
    fn validate_ok(model: Model) {
        model.validate().unwrap();
    }

    #[rstest]
    fn validate_no_units(mut model: Model) {
        model.units.clear();
        assert_error!(model.validate(), "Model must contain at least one unit");
    }

    #[rstest]
    fn validate_bad_unit(mut model: Model) {
        let unit = model.units.values_mut().next().unwrap();
        Rc::make_mut(unit).parameters.input_min = Flow(1000.0);
        assert_error!(model.validate(), "Invalid parameters for unit chp");
    }

    #[rstest]
    fn validate_commitment_unknown_unit(mut model: Model) {
        model
            .fixed_commitment
            .insert(("missing".into(), TimeStep(1)), true);
        assert_error!(model.validate(), "Commitment given for unknown unit missing");
    }

    #[rstest]
    fn validate_commitment_outside_index(mut model: Model) {
        model.fixed_commitment.insert(("chp".into(), TimeStep(9)), true);
        assert_error!(
            model.validate(),
            "Commitment for unit chp given for time step 9, which is outside the model's time index"
        );
    }

    #[rstest]
    fn fixed_commitment_lookup(mut model: Model) {
        model.fixed_commitment.insert(("chp".into(), TimeStep(2)), false);
        assert_eq!(model.fixed_commitment(&"chp".into(), TimeStep(2)), Some(false));
        assert_eq!(model.fixed_commitment(&"chp".into(), TimeStep(1)), None);
    }

    #[rstest]
    fn clone_is_independent(model: Model) {
        let mut copy = model.clone();
        copy.parameters.accept_incumbent_on_timeout = true;
        copy.fixed_commitment.insert(("chp".into(), TimeStep(1)), true);
        assert!(!model.parameters.accept_incumbent_on_timeout);
        assert!(model.fixed_commitment.is_empty());
        assert_eq!(copy.units, model.units);
    }
}
