//! The values of the decision variables after a successful solve.
use super::SystemModel;
use super::problem::Variable;
use super::solver::{Assignment, ModelError, SolveStatus};
use crate::storage::StorageID;
use crate::time_index::{StepMap, TimeStep};
use crate::unit::UnitID;
use crate::units::{Flow, Money};
use anyhow::{Context, Result};

/// A binary column is read as "on" above this value
const BINARY_THRESHOLD: f64 = 0.5;

/// The dispatch of a conversion unit in one time step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitDispatch {
    /// Whether the unit is committed
    pub on: bool,
    /// Fuel input
    pub input: Flow,
    /// Output 1 (power)
    pub output1: Flow,
    /// Output 2 (heat)
    pub output2: Flow,
    /// Start cost incurred
    pub start_cost: Money,
}

/// The state of a storage unit in one time step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StorageState {
    /// Heat taken from the system
    pub charge: Flow,
    /// Heat returned to the system
    pub discharge: Flow,
    /// Stored energy at the end of the step
    pub capacity: Flow,
}

/// The solution to the unit commitment problem
#[derive(Debug)]
pub struct Solution {
    system: SystemModel,
    assignment: Assignment,
}

impl Solution {
    pub(super) fn new(system: SystemModel, assignment: Assignment) -> Self {
        Self { system, assignment }
    }

    /// The system model which was solved
    pub fn system(&self) -> &SystemModel {
        &self.system
    }

    /// Whether the solution is proven optimal or the best found before the time limit
    pub fn status(&self) -> SolveStatus {
        self.assignment.status
    }

    /// The objective value for the solution
    pub fn objective_value(&self) -> Money {
        self.assignment.objective_value
    }

    /// The value of a single variable
    pub fn value(&self, var: Variable) -> Result<f64, ModelError> {
        self.assignment.value(var)
    }

    fn flow(&self, var: Variable) -> Result<Flow, ModelError> {
        self.value(var).map(Flow)
    }

    /// The dispatch of a unit at a single time step
    pub fn unit_dispatch_at(&self, unit_id: &UnitID, t: TimeStep) -> Result<UnitDispatch> {
        let unit = self
            .system
            .unit(unit_id)
            .with_context(|| format!("Unknown unit {unit_id}"))?;
        let vars = unit.variables();

        Ok(UnitDispatch {
            on: self.value(vars.on[t])? > BINARY_THRESHOLD,
            input: self.flow(vars.input[t])?,
            output1: self.flow(vars.output1[t])?,
            output2: self.flow(vars.output2[t])?,
            start_cost: Money(self.value(vars.start_cost[t])?),
        })
    }

    /// The dispatch of a unit at every time step
    pub fn unit_dispatch(&self, unit_id: &UnitID) -> Result<StepMap<UnitDispatch>> {
        let time_index = self.system.time_index();
        let dispatch = time_index
            .iter()
            .map(|t| self.unit_dispatch_at(unit_id, t))
            .collect::<Result<Vec<_>>>()?;
        StepMap::from_values(time_index, dispatch)
    }

    /// The state of a storage unit at a single time step
    pub fn storage_state_at(&self, storage_id: &StorageID, t: TimeStep) -> Result<StorageState> {
        let storage = self
            .system
            .storage(storage_id)
            .with_context(|| format!("Unknown storage {storage_id}"))?;
        let vars = storage.variables();

        Ok(StorageState {
            charge: self.flow(vars.charge[t])?,
            discharge: self.flow(vars.discharge[t])?,
            capacity: self.flow(vars.capacity[t])?,
        })
    }

    /// The state of a storage unit at every time step
    pub fn storage_state(&self, storage_id: &StorageID) -> Result<StepMap<StorageState>> {
        let time_index = self.system.time_index();
        let states = time_index
            .iter()
            .map(|t| self.storage_state_at(storage_id, t))
            .collect::<Result<Vec<_>>>()?;
        StepMap::from_values(time_index, states)
    }

    /// The largest violation of any bound or constraint by the solution
    pub fn max_violation(&self) -> f64 {
        self.system.problem().max_violation(&self.assignment.values)
    }
}
