//! Variables and constraints for a heat storage unit.
use super::problem::{
    ConstraintKey, ConstraintKind, ConstraintOwner, Expression, Problem, RowSense, Variable,
};
use crate::storage::StorageUnit;
use crate::time_index::{StepMap, TimeIndex, TimeStep};
use anyhow::Result;
use std::rc::Rc;

/// The decision variables of a storage unit, one per time step
#[derive(Clone, Debug)]
pub struct StorageVariables {
    /// Whether the storage is charging (binary)
    pub on_charge: StepMap<Variable>,
    /// Whether the storage is discharging (binary)
    pub on_discharge: StepMap<Variable>,
    /// Heat taken from the system
    pub charge: StepMap<Variable>,
    /// Heat returned to the system
    pub discharge: StepMap<Variable>,
    /// Stored energy at the end of the time step
    pub capacity: StepMap<Variable>,
}

impl StorageVariables {
    fn new(problem: &mut Problem, time_index: &TimeIndex) -> Self {
        let on_charge = StepMap::from_fn(time_index, |_| problem.add_binary());
        let on_discharge = StepMap::from_fn(time_index, |_| problem.add_binary());
        let mut continuous =
            || StepMap::from_fn(time_index, |_| problem.add_continuous(0.0, f64::INFINITY));

        Self {
            on_charge,
            on_discharge,
            charge: continuous(),
            discharge: continuous(),
            capacity: continuous(),
        }
    }
}

/// The variables and constraints of a single storage unit
#[derive(Clone, Debug)]
pub struct StorageUnitModel {
    storage: Rc<StorageUnit>,
    variables: StorageVariables,
}

impl StorageUnitModel {
    /// Add variables and constraints for `storage` to `problem`.
    ///
    /// Per time step:
    ///
    /// * `charge[t] <= MaxCharge * onCharge[t]`
    /// * `discharge[t] <= MaxDischarge * onDischarge[t]`, except at the first step where the
    ///   discharge is zero
    /// * `capacity[t] <= MaxCapacity`
    /// * `capacity[t] <= capacity[t-1] + charge[t] - discharge[t]`, except at the first step where
    ///   the storage is empty
    /// * `onCharge[t] + onDischarge[t] <= 1`
    ///
    /// The carry-over of stored energy is an upper bound, not an equality: stored energy may be
    /// lost.
    pub fn build(
        problem: &mut Problem,
        storage: &Rc<StorageUnit>,
        time_index: &TimeIndex,
    ) -> Result<Self> {
        storage.validate()?;

        let model = Self {
            storage: Rc::clone(storage),
            variables: StorageVariables::new(problem, time_index),
        };
        for t in time_index.iter() {
            let prev = time_index.prev(t);
            model.add_charge_constraint(problem, t);
            model.add_discharge_constraint(problem, t, prev);
            model.add_capacity_limit_constraint(problem, t);
            model.add_balance_constraint(problem, t, prev);
            model.add_exclusivity_constraint(problem, t);
        }

        Ok(model)
    }

    /// The storage unit being modelled
    pub fn storage(&self) -> &Rc<StorageUnit> {
        &self.storage
    }

    /// The storage unit's decision variables
    pub fn variables(&self) -> &StorageVariables {
        &self.variables
    }

    fn key(&self, kind: ConstraintKind, t: TimeStep) -> ConstraintKey {
        ConstraintKey::new(kind, ConstraintOwner::Storage(self.storage.id.clone()), t)
    }

    fn add_charge_constraint(&self, problem: &mut Problem, t: TimeStep) {
        let vars = &self.variables;
        problem.add_constraint(
            self.key(ConstraintKind::StorageCharge, t),
            Expression::new()
                .with_term(vars.charge[t], 1.0)
                .with_term(
                    vars.on_charge[t],
                    -self.storage.parameters.max_charge.value(),
                ),
            RowSense::LessEqual,
            0.0,
        );
    }

    fn add_discharge_constraint(&self, problem: &mut Problem, t: TimeStep, prev: Option<TimeStep>) {
        let vars = &self.variables;
        let key = self.key(ConstraintKind::StorageDischarge, t);
        if prev.is_none() {
            let expression = Expression::new().with_term(vars.discharge[t], 1.0);
            problem.add_constraint(key, expression, RowSense::Equal, 0.0);
            return;
        }

        problem.add_constraint(
            key,
            Expression::new()
                .with_term(vars.discharge[t], 1.0)
                .with_term(
                    vars.on_discharge[t],
                    -self.storage.parameters.max_discharge.value(),
                ),
            RowSense::LessEqual,
            0.0,
        );
    }

    fn add_capacity_limit_constraint(&self, problem: &mut Problem, t: TimeStep) {
        problem.add_constraint(
            self.key(ConstraintKind::StorageCapacityLimit, t),
            Expression::new().with_term(self.variables.capacity[t], 1.0),
            RowSense::LessEqual,
            self.storage.parameters.max_capacity.value(),
        );
    }

    fn add_balance_constraint(&self, problem: &mut Problem, t: TimeStep, prev: Option<TimeStep>) {
        let vars = &self.variables;
        let key = self.key(ConstraintKind::StorageBalance, t);
        let Some(prev) = prev else {
            let expression = Expression::new().with_term(vars.capacity[t], 1.0);
            problem.add_constraint(key, expression, RowSense::Equal, 0.0);
            return;
        };

        problem.add_constraint(
            key,
            Expression::new()
                .with_term(vars.capacity[t], 1.0)
                .with_term(vars.capacity[prev], -1.0)
                .with_term(vars.charge[t], -1.0)
                .with_term(vars.discharge[t], 1.0),
            RowSense::LessEqual,
            0.0,
        );
    }

    fn add_exclusivity_constraint(&self, problem: &mut Problem, t: TimeStep) {
        let vars = &self.variables;
        problem.add_constraint(
            self.key(ConstraintKind::StorageExclusivity, t),
            Expression::new()
                .with_term(vars.on_charge[t], 1.0)
                .with_term(vars.on_discharge[t], 1.0),
            RowSense::LessEqual,
            1.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{storage_unit, time_index};
    use crate::units::Flow;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn build(storage_unit: StorageUnit, time_index: &TimeIndex) -> (Problem, StorageUnitModel) {
        let mut problem = Problem::default();
        let model =
            StorageUnitModel::build(&mut problem, &Rc::new(storage_unit), time_index).unwrap();
        (problem, model)
    }

    #[rstest]
    fn build_counts(storage_unit: StorageUnit, time_index: TimeIndex) {
        let (problem, _) = build(storage_unit, &time_index);
        assert_eq!(problem.num_cols(), 15);
        for kind in [
            ConstraintKind::StorageCharge,
            ConstraintKind::StorageDischarge,
            ConstraintKind::StorageCapacityLimit,
            ConstraintKind::StorageBalance,
            ConstraintKind::StorageExclusivity,
        ] {
            assert_eq!(problem.rows_of_kind(kind).count(), 3, "{kind}");
        }
    }

    #[rstest]
    fn first_step_is_empty(storage_unit: StorageUnit, time_index: TimeIndex) {
        let (problem, model) = build(storage_unit, &time_index);
        let first = time_index.first();
        for kind in [ConstraintKind::StorageDischarge, ConstraintKind::StorageBalance] {
            let row = problem
                .rows_of_kind(kind)
                .find(|row| row.key.time_step == first)
                .unwrap();
            assert_eq!(row.sense, RowSense::Equal);
            assert_approx_eq!(f64, row.rhs, 0.0);
        }

        let row = problem
            .rows_of_kind(ConstraintKind::StorageBalance)
            .find(|row| row.key.time_step == first)
            .unwrap();
        assert_eq!(
            row.expression.terms(),
            [(model.variables().capacity[first], 1.0)]
        );
    }

    /// The carry-over of stored energy is deliberately an upper bound rather than an equality
    #[rstest]
    fn balance_is_upper_bound(storage_unit: StorageUnit, time_index: TimeIndex) {
        let (problem, model) = build(storage_unit, &time_index);
        let vars = model.variables();
        let balance_rows: Vec<_> = problem
            .rows_of_kind(ConstraintKind::StorageBalance)
            .filter(|row| row.key.time_step != time_index.first())
            .collect();
        assert_eq!(balance_rows.len(), 2);
        assert!(
            balance_rows
                .iter()
                .all(|row| row.sense == RowSense::LessEqual)
        );

        // Charging 5 at t = 2 but storing nothing satisfies the bound
        let mut values = vec![0.0; problem.num_cols()];
        values[vars.on_charge[TimeStep(2)].index()] = 1.0;
        values[vars.charge[TimeStep(2)].index()] = 5.0;
        assert_approx_eq!(f64, problem.max_violation(&values), 0.0);

        // Storing more than was charged does not
        values[vars.capacity[TimeStep(2)].index()] = 6.0;
        assert_approx_eq!(f64, problem.max_violation(&values), 1.0);
    }

    #[rstest]
    fn charge_and_discharge_exclusive(storage_unit: StorageUnit, time_index: TimeIndex) {
        let (problem, model) = build(storage_unit, &time_index);
        let vars = model.variables();
        let mut values = vec![0.0; problem.num_cols()];
        values[vars.on_charge[TimeStep(3)].index()] = 1.0;
        values[vars.on_discharge[TimeStep(3)].index()] = 1.0;

        let violated = problem.violated_rows(&values, 1e-9);
        assert_eq!(violated.len(), 1);
        assert_eq!(violated[0].kind, ConstraintKind::StorageExclusivity);
    }

    #[rstest]
    fn build_invalid_storage(mut storage_unit: StorageUnit, time_index: TimeIndex) {
        storage_unit.parameters.max_charge = Flow(-1.0);
        let mut problem = Problem::default();
        assert!(
            StorageUnitModel::build(&mut problem, &Rc::new(storage_unit), &time_index).is_err()
        );
        assert_eq!(problem.num_cols(), 0);
    }
}
