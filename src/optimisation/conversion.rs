//! Variables and constraints for a conversion unit with one input and two outputs.
//!
//! For every time step the unit has a binary commitment variable `on`, flows `in`, `out1` and
//! `out2`, and a start cost. The constraints are:
//!
//! 1. Capacity envelope: each flow lies between `min * on` and `max * on`.
//! 2. Output coupling: `out1 == a * out2 + b * on`, when both output ranges are non-degenerate.
//! 3. Input coupling: `in == a * out + b * on`, driven by output 1 or (failing that) output 2.
//! 4. Minimum up and down times, as a sliding window of implications (see [`is_valid_window`]).
//! 5. Start cost: `startCost[t] >= StartCost * (on[t] - on[t-1])`.
use super::problem::{
    ConstraintKey, ConstraintKind, ConstraintOwner, Expression, Problem, RowSense, Variable,
};
use crate::time_index::{StepMap, TimeIndex, TimeStep};
use crate::unit::{ConversionUnit, UnitParameters};
use crate::units::Flow;
use anyhow::Result;
use log::debug;
use std::rc::Rc;

/// Whether the window offset `l` yields a minimum up/down time constraint at time step `t`.
///
/// The window refers to the step `l_hat = t + l - 1`. No constraint is generated at the first or
/// last step, nor when `l_hat` falls outside `(t, last]`. In particular, offsets 0 and 1 never
/// produce a constraint, so up or down times of 0 or 1 impose nothing.
pub fn is_valid_window(t: TimeStep, l: u32, first: TimeStep, last: TimeStep) -> bool {
    if t == first || t == last {
        return false;
    }

    // l_hat > t  <=>  l >= 2
    l >= 2 && last.0.checked_sub(t.0).is_some_and(|gap| l - 1 <= gap)
}

/// The linear relationship `y = slope * x + intercept * on` between two flows of a unit
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearCoupling {
    /// Change in `y` per unit change of `x`
    pub slope: f64,
    /// Value of `y` when the unit is on and `x` is zero
    pub intercept: f64,
}

impl LinearCoupling {
    /// The line through `(x_min, y_min)` and `(x_max, y_max)`.
    ///
    /// Returns `None` if the `x` range is degenerate.
    pub fn between(x_min: Flow, x_max: Flow, y_min: Flow, y_max: Flow) -> Option<Self> {
        let x_span = x_max - x_min;
        if x_span <= Flow(0.0) {
            return None;
        }

        let slope = (y_max - y_min) / x_span;
        Some(Self {
            slope: slope.value(),
            intercept: (y_min - slope * x_min).value(),
        })
    }
}

/// The output which determines the input of a unit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CouplingDriver {
    /// Output 1 (e.g. power)
    Output1,
    /// Output 2 (e.g. heat)
    Output2,
}

/// Coupling of output 1 to output 2, or `None` if either output range is degenerate
pub fn output_coupling(parameters: &UnitParameters) -> Option<LinearCoupling> {
    if parameters.output1_max - parameters.output1_min <= Flow(0.0) {
        return None;
    }

    LinearCoupling::between(
        parameters.output2_min,
        parameters.output2_max,
        parameters.output1_min,
        parameters.output1_max,
    )
}

/// Coupling of the input to one of the outputs, or `None` if both output ranges are degenerate.
///
/// Output 1 drives the input where its range is non-degenerate; otherwise output 2 does.
pub fn input_coupling(parameters: &UnitParameters) -> Option<(CouplingDriver, LinearCoupling)> {
    let coupling_to = |min, max| {
        LinearCoupling::between(min, max, parameters.input_min, parameters.input_max)
    };

    coupling_to(parameters.output1_min, parameters.output1_max)
        .map(|coupling| (CouplingDriver::Output1, coupling))
        .or_else(|| {
            coupling_to(parameters.output2_min, parameters.output2_max)
                .map(|coupling| (CouplingDriver::Output2, coupling))
        })
}

/// The decision variables of a conversion unit, one per time step
#[derive(Clone, Debug)]
pub struct UnitVariables {
    /// Commitment (binary)
    pub on: StepMap<Variable>,
    /// Fuel input
    pub input: StepMap<Variable>,
    /// Output 1 (power)
    pub output1: StepMap<Variable>,
    /// Output 2 (heat)
    pub output2: StepMap<Variable>,
    /// Start cost incurred
    pub start_cost: StepMap<Variable>,
}

impl UnitVariables {
    fn new(problem: &mut Problem, time_index: &TimeIndex) -> Self {
        let mut continuous =
            || StepMap::from_fn(time_index, |_| problem.add_continuous(0.0, f64::INFINITY));
        let input = continuous();
        let output1 = continuous();
        let output2 = continuous();
        let start_cost = continuous();
        let on = StepMap::from_fn(time_index, |_| problem.add_binary());

        Self {
            on,
            input,
            output1,
            output2,
            start_cost,
        }
    }
}

/// The variables, constraints and costs of a single conversion unit
#[derive(Clone, Debug)]
pub struct ConversionUnitModel {
    unit: Rc<ConversionUnit>,
    variables: UnitVariables,
    cost: Expression,
}

impl ConversionUnitModel {
    /// Add variables and constraints for `unit` to `problem`.
    ///
    /// The unit's parameters are validated before anything is added to the problem.
    ///
    /// # Arguments
    ///
    /// * `problem` - The optimisation problem
    /// * `unit` - The unit to model
    /// * `time_index` - The time steps of the model
    /// * `fixed_commitment` - The commitment state fixed by the user for a time step, if any
    pub fn build<F>(
        problem: &mut Problem,
        unit: &Rc<ConversionUnit>,
        time_index: &TimeIndex,
        fixed_commitment: F,
    ) -> Result<Self>
    where
        F: Fn(TimeStep) -> Option<bool>,
    {
        unit.validate()?;

        let variables = UnitVariables::new(problem, time_index);
        for (t, &on) in variables.on.iter() {
            if let Some(state) = fixed_commitment(t) {
                problem.fix(on, if state { 1.0 } else { 0.0 });
            }
        }

        let model = Self {
            unit: Rc::clone(unit),
            cost: cost_expression(unit, &variables),
            variables,
        };
        model.add_capacity_constraints(problem);
        model.add_output_coupling_constraints(problem);
        model.add_input_coupling_constraints(problem);
        model.add_min_up_time_constraints(problem, time_index);
        model.add_min_down_time_constraints(problem, time_index);
        model.add_start_cost_constraints(problem, time_index);

        Ok(model)
    }

    /// The unit being modelled
    pub fn unit(&self) -> &Rc<ConversionUnit> {
        &self.unit
    }

    /// The unit's decision variables
    pub fn variables(&self) -> &UnitVariables {
        &self.variables
    }

    /// Standby and start costs: `sum_t (on[t] * StandbyCost + startCost[t])`
    pub fn cost(&self) -> &Expression {
        &self.cost
    }

    /// The unit's contribution to the heat balance at `t`
    pub fn heat_output(&self, t: TimeStep) -> Variable {
        self.variables.output2[t]
    }

    fn key(&self, kind: ConstraintKind, t: TimeStep) -> ConstraintKey {
        ConstraintKey::new(kind, ConstraintOwner::Unit(self.unit.id.clone()), t)
    }

    /// `min * on[t] <= flow[t] <= max * on[t]` for each flow
    fn add_capacity_constraints(&self, problem: &mut Problem) {
        let params = &self.unit.parameters;
        let vars = &self.variables;
        let envelopes = [
            (
                &vars.input,
                params.input_min,
                params.input_max,
                ConstraintKind::InputMin,
                ConstraintKind::InputMax,
            ),
            (
                &vars.output1,
                params.output1_min,
                params.output1_max,
                ConstraintKind::Output1Min,
                ConstraintKind::Output1Max,
            ),
            (
                &vars.output2,
                params.output2_min,
                params.output2_max,
                ConstraintKind::Output2Min,
                ConstraintKind::Output2Max,
            ),
        ];

        for (flows, min, max, min_kind, max_kind) in envelopes {
            for (t, &flow) in flows.iter() {
                let on = vars.on[t];
                problem.add_constraint(
                    self.key(min_kind, t),
                    Expression::new()
                        .with_term(flow, 1.0)
                        .with_term(on, -min.value()),
                    RowSense::GreaterEqual,
                    0.0,
                );
                problem.add_constraint(
                    self.key(max_kind, t),
                    Expression::new()
                        .with_term(flow, 1.0)
                        .with_term(on, -max.value()),
                    RowSense::LessEqual,
                    0.0,
                );
            }
        }
    }

    /// `out1[t] == a * out2[t] + b * on[t]`
    fn add_output_coupling_constraints(&self, problem: &mut Problem) {
        let Some(coupling) = output_coupling(&self.unit.parameters) else {
            debug!(
                "Unit {} has a degenerate output range: outputs are not coupled",
                self.unit.id
            );
            return;
        };

        let vars = &self.variables;
        for (t, &output1) in vars.output1.iter() {
            problem.add_constraint(
                self.key(ConstraintKind::OutputCoupling, t),
                Expression::new()
                    .with_term(output1, 1.0)
                    .with_term(vars.output2[t], -coupling.slope)
                    .with_term(vars.on[t], -coupling.intercept),
                RowSense::Equal,
                0.0,
            );
        }
    }

    /// `in[t] == a * out[t] + b * on[t]`, where `out` is the driving output
    fn add_input_coupling_constraints(&self, problem: &mut Problem) {
        let Some((driver, coupling)) = input_coupling(&self.unit.parameters) else {
            debug!(
                "Unit {} has degenerate ranges for both outputs: input is not coupled",
                self.unit.id
            );
            return;
        };

        let vars = &self.variables;
        let driving_output = match driver {
            CouplingDriver::Output1 => &vars.output1,
            CouplingDriver::Output2 => &vars.output2,
        };
        for (t, &input) in vars.input.iter() {
            problem.add_constraint(
                self.key(ConstraintKind::InputCoupling, t),
                Expression::new()
                    .with_term(input, 1.0)
                    .with_term(driving_output[t], -coupling.slope)
                    .with_term(vars.on[t], -coupling.intercept),
                RowSense::Equal,
                0.0,
            );
        }
    }

    /// `on[t] - on[t-1] <= on[l_hat]` for every valid window
    fn add_min_up_time_constraints(&self, problem: &mut Problem, time_index: &TimeIndex) {
        let on = &self.variables.on;
        for (t, prev, l_hat) in iter_windows(time_index, self.unit.parameters.up_time) {
            problem.add_constraint(
                self.key(ConstraintKind::MinUpTime, t),
                Expression::new()
                    .with_term(on[t], 1.0)
                    .with_term(on[prev], -1.0)
                    .with_term(on[l_hat], -1.0),
                RowSense::LessEqual,
                0.0,
            );
        }
    }

    /// `on[t-1] - on[t] <= 1 - on[l_hat]` for every valid window
    fn add_min_down_time_constraints(&self, problem: &mut Problem, time_index: &TimeIndex) {
        let on = &self.variables.on;
        for (t, prev, l_hat) in iter_windows(time_index, self.unit.parameters.down_time) {
            problem.add_constraint(
                self.key(ConstraintKind::MinDownTime, t),
                Expression::new()
                    .with_term(on[prev], 1.0)
                    .with_term(on[t], -1.0)
                    .with_term(on[l_hat], 1.0),
                RowSense::LessEqual,
                1.0,
            );
        }
    }

    /// `startCost[t] >= -StartCost * (on[t-1] - on[t])` for every step but the first
    fn add_start_cost_constraints(&self, problem: &mut Problem, time_index: &TimeIndex) {
        let start_cost = self.unit.costs.start_cost.value();
        let vars = &self.variables;
        for t in time_index.iter() {
            let Some(prev) = time_index.prev(t) else {
                continue;
            };

            problem.add_constraint(
                self.key(ConstraintKind::StartCost, t),
                Expression::new()
                    .with_term(vars.start_cost[t], 1.0)
                    .with_term(vars.on[prev], start_cost)
                    .with_term(vars.on[t], -start_cost),
                RowSense::GreaterEqual,
                0.0,
            );
        }
    }
}

/// Iterate over `(t, t - 1, l_hat)` for every valid window of length `duration`.
///
/// Offsets are limited to those with `l_hat <= last`, so the cost does not depend on `duration`
/// once it exceeds the horizon.
fn iter_windows(
    time_index: &TimeIndex,
    duration: u32,
) -> impl Iterator<Item = (TimeStep, TimeStep, TimeStep)> + use<> {
    let (first, last) = (time_index.first(), time_index.last());
    let time_index = *time_index;
    time_index.iter().flat_map(move |t| {
        let max_offset = duration.min(last.0 - t.0 + 1);
        (2..=max_offset)
            .filter(move |&l| is_valid_window(t, l, first, last))
            .filter_map(move |l| {
                let prev = time_index.prev(t)?;
                Some((t, prev, TimeStep(t.0 + l - 1)))
            })
    })
}

/// `sum_t (on[t] * StandbyCost + startCost[t])`
fn cost_expression(unit: &ConversionUnit, variables: &UnitVariables) -> Expression {
    let standby_cost = unit.costs.standby_cost.value();
    variables
        .on
        .iter()
        .flat_map(|(t, &on)| [(on, standby_cost), (variables.start_cost[t], 1.0)])
        .collect()
}
