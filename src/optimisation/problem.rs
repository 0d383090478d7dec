//! A solver-neutral representation of a mixed-integer linear program.
//!
//! Columns (variables) and rows (constraints) are accumulated here while the unit and system
//! models are built. Every row carries a [`ConstraintKey`] so that the structure of the problem can
//! be inspected and reported on. The problem is only handed to a solver once it is complete.
use crate::storage::StorageID;
use crate::time_index::TimeStep;
use crate::unit::UnitID;
use std::fmt;
use std::ops::Range;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem. Values are only available from a solved problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(usize);

impl Variable {
    /// The index of the corresponding column in the problem
    pub fn index(self) -> usize {
        self.0
    }
}

/// Whether a column may take any value within its bounds or only integer ones
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariableKind {
    /// A real-valued variable
    Continuous,
    /// An integer variable with bounds `0..=1`
    Binary,
}

/// A column of the problem
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    /// Objective coefficient
    pub cost: f64,
    /// Lower bound
    pub lower: f64,
    /// Upper bound (may be infinite)
    pub upper: f64,
    /// Continuous or binary
    pub kind: VariableKind,
}

/// The direction of a constraint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowSense {
    /// `expression <= rhs`
    LessEqual,
    /// `expression >= rhs`
    GreaterEqual,
    /// `expression == rhs`
    Equal,
}

impl RowSense {
    /// The lower and upper bounds on the row activity for the given right-hand side
    pub fn bounds(self, rhs: f64) -> (f64, f64) {
        match self {
            RowSense::LessEqual => (f64::NEG_INFINITY, rhs),
            RowSense::GreaterEqual => (rhs, f64::INFINITY),
            RowSense::Equal => (rhs, rhs),
        }
    }
}

impl fmt::Display for RowSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            RowSense::LessEqual => "<=",
            RowSense::GreaterEqual => ">=",
            RowSense::Equal => "==",
        };
        write!(f, "{symbol}")
    }
}

/// The family a constraint belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// `in >= InMin * on`
    InputMin,
    /// `in <= InMax * on`
    InputMax,
    /// `out1 >= Out1Min * on`
    Output1Min,
    /// `out1 <= Out1Max * on`
    Output1Max,
    /// `out2 >= Out2Min * on`
    Output2Min,
    /// `out2 <= Out2Max * on`
    Output2Max,
    /// `out1 == a * out2 + b * on`
    OutputCoupling,
    /// `in == a * out + b * on`
    InputCoupling,
    /// Sliding-window minimum up-time implication
    MinUpTime,
    /// Sliding-window minimum down-time implication
    MinDownTime,
    /// Lower bound on the start cost incurred when switching on
    StartCost,
    /// `charge <= MaxCharge * onCharge`
    StorageCharge,
    /// `discharge <= MaxDischarge * onDischarge`, or zero at the first step
    StorageDischarge,
    /// `capacity <= MaxCapacity`
    StorageCapacityLimit,
    /// Stored energy carried over from the previous step, or zero at the first step
    StorageBalance,
    /// `onCharge + onDischarge <= 1`
    StorageExclusivity,
    /// Supply of heat equals demand plus charging
    HeatBalance,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintKind::InputMin => "input_min",
            ConstraintKind::InputMax => "input_max",
            ConstraintKind::Output1Min => "output1_min",
            ConstraintKind::Output1Max => "output1_max",
            ConstraintKind::Output2Min => "output2_min",
            ConstraintKind::Output2Max => "output2_max",
            ConstraintKind::OutputCoupling => "output_coupling",
            ConstraintKind::InputCoupling => "input_coupling",
            ConstraintKind::MinUpTime => "min_up_time",
            ConstraintKind::MinDownTime => "min_down_time",
            ConstraintKind::StartCost => "start_cost",
            ConstraintKind::StorageCharge => "storage_charge",
            ConstraintKind::StorageDischarge => "storage_discharge",
            ConstraintKind::StorageCapacityLimit => "storage_capacity_limit",
            ConstraintKind::StorageBalance => "storage_balance",
            ConstraintKind::StorageExclusivity => "storage_exclusivity",
            ConstraintKind::HeatBalance => "heat_balance",
        };
        write!(f, "{name}")
    }
}

/// The part of the system a constraint belongs to
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintOwner {
    /// A conversion unit
    Unit(UnitID),
    /// A storage unit
    Storage(StorageID),
    /// The system as a whole
    System,
}

impl fmt::Display for ConstraintOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintOwner::Unit(id) => write!(f, "{id}"),
            ConstraintOwner::Storage(id) => write!(f, "{id}"),
            ConstraintOwner::System => write!(f, "system"),
        }
    }
}

/// A symbolic label for a row of the problem
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConstraintKey {
    /// The constraint family
    pub kind: ConstraintKind,
    /// The unit, storage or system the constraint applies to
    pub owner: ConstraintOwner,
    /// The time step the constraint is indexed by
    pub time_step: TimeStep,
}

impl ConstraintKey {
    /// Create a new key
    pub fn new(kind: ConstraintKind, owner: ConstraintOwner, time_step: TimeStep) -> Self {
        Self {
            kind,
            owner,
            time_step,
        }
    }
}

impl fmt::Display for ConstraintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}, t={}]", self.kind, self.owner, self.time_step)
    }
}

/// A linear combination of variables
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Expression {
    terms: Vec<(Variable, f64)>,
}

impl Expression {
    /// Create an empty expression
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `coeff * var` to the expression
    pub fn add_term(&mut self, var: Variable, coeff: f64) {
        self.terms.push((var, coeff));
    }

    /// Add `coeff * var` to the expression, returning it
    #[must_use]
    pub fn with_term(mut self, var: Variable, coeff: f64) -> Self {
        self.add_term(var, coeff);
        self
    }

    /// Add all the terms of `other` to the expression
    pub fn extend(&mut self, other: &Expression) {
        self.terms.extend_from_slice(&other.terms);
    }

    /// The terms of the expression
    pub fn terms(&self) -> &[(Variable, f64)] {
        &self.terms
    }

    /// Whether the expression has no terms
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate the expression for the given column values
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coeff)| coeff * values[var.index()])
            .sum()
    }
}

impl FromIterator<(Variable, f64)> for Expression {
    fn from_iter<I: IntoIterator<Item = (Variable, f64)>>(iter: I) -> Self {
        Self {
            terms: iter.into_iter().collect(),
        }
    }
}

/// A constraint of the problem
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    /// Symbolic label
    pub key: ConstraintKey,
    /// Left-hand side
    pub expression: Expression,
    /// Direction of the constraint
    pub sense: RowSense,
    /// Right-hand side
    pub rhs: f64,
}

impl Row {
    /// How far the row is from being satisfied by `values` (zero if it is satisfied)
    pub fn violation(&self, values: &[f64]) -> f64 {
        let activity = self.expression.evaluate(values);
        let (lower, upper) = self.sense.bounds(self.rhs);
        (lower - activity).max(activity - upper).max(0.0)
    }
}

/// A mixed-integer linear program to be minimised
#[derive(Clone, Debug, Default)]
pub struct Problem {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Problem {
    /// Add a continuous column with no objective cost
    pub fn add_continuous(&mut self, lower: f64, upper: f64) -> Variable {
        self.add_column(Column {
            cost: 0.0,
            lower,
            upper,
            kind: VariableKind::Continuous,
        })
    }

    /// Add a binary column with no objective cost
    pub fn add_binary(&mut self) -> Variable {
        self.add_column(Column {
            cost: 0.0,
            lower: 0.0,
            upper: 1.0,
            kind: VariableKind::Binary,
        })
    }

    fn add_column(&mut self, column: Column) -> Variable {
        let var = Variable(self.columns.len());
        self.columns.push(column);
        var
    }

    /// Fix a variable to the given value by tightening its bounds
    pub fn fix(&mut self, var: Variable, value: f64) {
        let column = &mut self.columns[var.index()];
        column.lower = value;
        column.upper = value;
    }

    /// Add the terms of `expression` to the objective
    pub fn add_to_objective(&mut self, expression: &Expression) {
        for (var, coeff) in expression.terms() {
            self.columns[var.index()].cost += coeff;
        }
    }

    /// Add a constraint `expression (sense) rhs`
    pub fn add_constraint(
        &mut self,
        key: ConstraintKey,
        expression: Expression,
        sense: RowSense,
        rhs: f64,
    ) {
        self.rows.push(Row {
            key,
            expression,
            sense,
            rhs,
        });
    }

    /// The number of columns (variables)
    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// The number of rows (constraints)
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// The columns of the problem
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The rows of the problem
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Iterate over the rows of a particular kind
    pub fn rows_of_kind(&self, kind: ConstraintKind) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(move |row| row.key.kind == kind)
    }

    /// Iterate over the rows in the given range of row indexes
    pub fn rows_in(&self, range: Range<usize>) -> impl Iterator<Item = &Row> {
        self.rows[range].iter()
    }

    /// The objective value for the given column values
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.columns
            .iter()
            .zip(values)
            .map(|(column, value)| column.cost * value)
            .sum()
    }

    /// The largest violation of any bound, integrality requirement or row by `values`.
    ///
    /// Returns infinity if `values` does not have one entry per column.
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        if values.len() != self.columns.len() {
            return f64::INFINITY;
        }

        let column_violation = self
            .columns
            .iter()
            .zip(values)
            .map(|(column, &value)| {
                let bound = (column.lower - value).max(value - column.upper).max(0.0);
                match column.kind {
                    VariableKind::Continuous => bound,
                    VariableKind::Binary => bound.max((value - value.round()).abs()),
                }
            })
            .fold(0.0, f64::max);

        self.rows
            .iter()
            .map(|row| row.violation(values))
            .fold(column_violation, f64::max)
    }

    /// The keys of rows violated by more than `tolerance` for the given column values
    pub fn violated_rows(&self, values: &[f64], tolerance: f64) -> Vec<&ConstraintKey> {
        self.rows
            .iter()
            .filter(|row| row.violation(values) > tolerance)
            .map(|row| &row.key)
            .collect()
    }
}
