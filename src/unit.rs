//! Conversion units turn one input (fuel) into two co-produced outputs (power and heat).
//!
//! The data structures in this module describe a unit's technical envelope and costs. The
//! constraints derived from them live in [`crate::optimisation`].
use crate::id::define_id_type;
use crate::units::{Flow, Money};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use std::rc::Rc;

define_id_type! {UnitID}

/// A map of [`ConversionUnit`]s, keyed by unit ID
pub type UnitMap = IndexMap<UnitID, Rc<ConversionUnit>>;

/// A dispatchable unit with one input and two outputs.
///
/// For a CHP unit, the input is gas, output 1 is power and output 2 is heat. A heat-only plant is
/// modelled as the same kind of unit with a zero output 1.
#[derive(PartialEq, Debug, Clone)]
pub struct ConversionUnit {
    /// Unique identifier for the unit (e.g. "chp_old")
    pub id: UnitID,
    /// Text description of the unit
    pub description: String,
    /// Whether output 1 is sold on the spot market.
    ///
    /// Only units with this capability earn revenue for their output 1 in the objective.
    pub sells_output1: bool,
    /// Technical parameters
    pub parameters: UnitParameters,
    /// Costs of running the unit
    pub costs: UnitCosts,
}

/// The technical envelope of a [`ConversionUnit`].
///
/// The minimum values apply only while the unit is on; when off, all flows are zero.
#[derive(PartialEq, Debug, Clone)]
pub struct UnitParameters {
    /// Minimum input while on
    pub input_min: Flow,
    /// Maximum input while on
    pub input_max: Flow,
    /// Minimum output 1 while on
    pub output1_min: Flow,
    /// Maximum output 1 while on
    pub output1_max: Flow,
    /// Minimum output 2 while on
    pub output2_min: Flow,
    /// Maximum output 2 while on
    pub output2_max: Flow,
    /// Minimum number of consecutive time steps the unit stays on after starting
    pub up_time: u32,
    /// Minimum number of consecutive time steps the unit stays off after stopping
    pub down_time: u32,
}

/// The costs of a [`ConversionUnit`]
#[derive(PartialEq, Debug, Clone)]
pub struct UnitCosts {
    /// Cost of each time step in which the unit is on
    pub standby_cost: Money,
    /// Cost of each start-up
    pub start_cost: Money,
}

impl ConversionUnit {
    /// Check that the unit's parameters and costs are valid
    pub fn validate(&self) -> Result<()> {
        self.parameters
            .validate()
            .and_then(|()| self.costs.validate())
            .with_context(|| format!("Invalid parameters for unit {}", self.id))
    }
}

impl UnitParameters {
    /// Check that each min/max pair is a valid range of non-negative numbers
    pub fn validate(&self) -> Result<()> {
        check_flow_range("input", self.input_min, self.input_max)?;
        check_flow_range("output 1", self.output1_min, self.output1_max)?;
        check_flow_range("output 2", self.output2_min, self.output2_max)?;

        Ok(())
    }
}

impl UnitCosts {
    /// Check that costs are finite and non-negative
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.standby_cost.is_finite() && self.standby_cost >= Money(0.0),
            "Standby cost must be a finite number greater than or equal to zero"
        );
        ensure!(
            self.start_cost.is_finite() && self.start_cost >= Money(0.0),
            "Start cost must be a finite number greater than or equal to zero"
        );

        Ok(())
    }
}

fn check_flow_range(name: &str, min: Flow, max: Flow) -> Result<()> {
    ensure!(
        min.is_finite() && max.is_finite(),
        "Limits for {name} must be finite numbers"
    );
    ensure!(
        min >= Flow(0.0),
        "Minimum {name} must be greater than or equal to zero"
    );
    ensure!(
        min <= max,
        "Minimum {name} ({min}) is greater than maximum {name} ({max})"
    );

    Ok(())
}
