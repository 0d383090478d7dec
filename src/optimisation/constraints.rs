//! Code for adding the system-wide heat balance and objective to the problem.
use super::conversion::ConversionUnitModel;
use super::problem::{
    ConstraintKey, ConstraintKind, ConstraintOwner, Expression, Problem, RowSense, Variable,
};
use super::storage::StorageUnitModel;
use crate::time_index::{StepMap, TimeIndex};
use crate::time_series::TimeSeries;
use crate::units::MoneyPerFlow;
use std::ops::Range;

/// Slack columns on the heat balance, used to find where demand cannot be balanced
#[derive(Clone, Debug)]
pub struct BalanceSlack {
    /// Heat demand which is not met
    pub unmet: StepMap<Variable>,
    /// Heat produced in excess of demand
    pub surplus: StepMap<Variable>,
}

impl BalanceSlack {
    /// Add slack columns for every time step
    pub fn new(problem: &mut Problem, time_index: &TimeIndex) -> Self {
        let mut continuous =
            || StepMap::from_fn(time_index, |_| problem.add_continuous(0.0, f64::INFINITY));
        let unmet = continuous();
        let surplus = continuous();

        Self { unmet, surplus }
    }
}

/// Add the heat balance for each time step.
///
/// `sum(out2) + sum(discharge) - sum(charge) == demand`, with `unmet - surplus` added to the
/// left-hand side when slack is present.
///
/// # Returns
///
/// The range of row indexes of the heat balance constraints.
pub fn add_heat_balance_constraints<'a, U, S>(
    problem: &mut Problem,
    time_series: &TimeSeries,
    units: U,
    storages: S,
    slack: Option<&BalanceSlack>,
) -> Range<usize>
where
    U: Iterator<Item = &'a ConversionUnitModel> + Clone,
    S: Iterator<Item = &'a StorageUnitModel> + Clone,
{
    // Row offset in problem. This line **must** come before we add more constraints.
    let offset = problem.num_rows();

    for (t, demand) in time_series.demand.iter() {
        let mut expression: Expression = units
            .clone()
            .map(|unit| (unit.heat_output(t), 1.0))
            .collect();
        for storage in storages.clone() {
            let vars = storage.variables();
            expression.add_term(vars.discharge[t], 1.0);
            expression.add_term(vars.charge[t], -1.0);
        }
        if let Some(slack) = slack {
            expression.add_term(slack.unmet[t], 1.0);
            expression.add_term(slack.surplus[t], -1.0);
        }

        problem.add_constraint(
            ConstraintKey::new(ConstraintKind::HeatBalance, ConstraintOwner::System, t),
            expression,
            RowSense::Equal,
            demand.value(),
        );
    }

    offset..problem.num_rows()
}

/// The expression to be minimised.
///
/// Fuel is bought at the gas price for every unit, while output 1 is sold at the spot price only
/// for units which sell it. Each unit's standby and start costs are added, as is the cost of any
/// balance slack.
pub fn objective<'a, U>(
    time_series: &TimeSeries,
    units: U,
    slack: Option<(&BalanceSlack, MoneyPerFlow)>,
) -> Expression
where
    U: Iterator<Item = &'a ConversionUnitModel>,
{
    let mut objective = Expression::new();
    for unit in units {
        let vars = unit.variables();
        for (t, gas_price, _, spot_price) in time_series.iter() {
            objective.add_term(vars.input[t], gas_price.value());
            if unit.unit().sells_output1 {
                objective.add_term(vars.output1[t], -spot_price.value());
            }
        }
        objective.extend(unit.cost());
    }

    if let Some((slack, value_of_lost_load)) = slack {
        for var in slack.unmet.values().chain(slack.surplus.values()) {
            objective.add_term(*var, value_of_lost_load.value());
        }
    }

    objective
}
