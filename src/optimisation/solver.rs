//! The interface to the MILP solver.
//!
//! A [`Problem`] is handed to a [`SolverAdapter`], which returns an [`Assignment`] of values to
//! every column or a [`ModelError`] describing why none is available.
use super::problem::{Problem, Variable, VariableKind};
use crate::input::format_items_with_cap;
use crate::time_index::TimeStep;
use crate::units::Money;
use highs::{HighsModelStatus, HighsStatus, RowProblem, Sense};
use log::debug;
use serde::Serialize;
use std::error::Error;
use std::fmt;

/// Maximum violation of any bound or row for a timed-out incumbent to be considered feasible
const FEASIBILITY_TOLERANCE: f64 = 1e-5;

/// How the values of an [`Assignment`] were obtained
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// The solver proved the solution optimal (within the MIP gap)
    Optimal,
    /// The solver stopped at its time limit with a feasible incumbent
    TimeLimit,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::TimeLimit => write!(f, "time limit reached"),
        }
    }
}

/// Values for every column of a problem
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    /// How the values were obtained
    pub status: SolveStatus,
    /// One value per column, in column order
    pub values: Vec<f64>,
    /// The objective value of the assignment
    pub objective_value: Money,
}

impl Assignment {
    /// The value assigned to `var`
    pub fn value(&self, var: Variable) -> Result<f64, ModelError> {
        self.values
            .get(var.index())
            .copied()
            .ok_or(ModelError::UnresolvedVariable(var))
    }
}

/// Defines the possible errors that can occur when running the solver
#[derive(Debug, Clone)]
pub enum ModelError {
    /// The model definition is incoherent.
    ///
    /// Users should not be able to trigger this error.
    Incoherent(HighsStatus),
    /// The solver finished with a status other than optimal, infeasible or timed out
    NonOptimal(HighsModelStatus),
    /// No assignment satisfies the constraints.
    ///
    /// Lists the time steps at which the heat balance could not be met, where these are known.
    Infeasible {
        /// Time steps at which demand could not be balanced
        time_steps: Vec<TimeStep>,
    },
    /// The time limit was reached before optimality was proven
    TimedOut {
        /// The best feasible assignment found, if any
        incumbent: Option<Assignment>,
    },
    /// A variable has no value in the assignment
    UnresolvedVariable(Variable),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Incoherent(status) => write!(f, "Incoherent model: {status:?}"),
            ModelError::NonOptimal(status) => {
                write!(f, "Could not find optimal result: {status:?}")
            }
            ModelError::Infeasible { time_steps } if time_steps.is_empty() => {
                write!(f, "The solver has indicated that the problem is infeasible")
            }
            ModelError::Infeasible { time_steps } => write!(
                f,
                "The solver has indicated that the problem is infeasible. Heat demand could not \
                be balanced at the following time steps: {}",
                format_items_with_cap(time_steps)
            ),
            ModelError::TimedOut { incumbent: None } => {
                write!(f, "The solver reached its time limit without finding a solution")
            }
            ModelError::TimedOut {
                incumbent: Some(incumbent),
            } => write!(
                f,
                "The solver reached its time limit before proving optimality (best objective \
                found: {})",
                incumbent.objective_value
            ),
            ModelError::UnresolvedVariable(var) => {
                write!(f, "No value was found for variable {}", var.index())
            }
        }
    }
}

impl Error for ModelError {}

/// Something which can solve a [`Problem`]
pub trait SolverAdapter {
    /// Minimise the problem's objective subject to its constraints
    fn solve(&self, problem: &Problem) -> Result<Assignment, ModelError>;
}

/// Options passed to the solver
#[derive(Clone, Debug, PartialEq)]
pub struct SolverOptions {
    /// Wall-clock limit in seconds
    pub time_limit: Option<f64>,
    /// Relative MIP gap at which to stop
    pub mip_rel_gap: f64,
    /// Whether to show the solver's own output
    pub verbose: bool,
}

/// The broad class of a solver's model status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// An optimal solution was found
    Optimal,
    /// The solver stopped at its time limit
    TimedOut,
    /// There is no feasible solution
    Infeasible,
    /// Anything else (errors, unboundedness, other limits)
    Other,
}

/// Classify a HiGHS model status
pub fn classify_status(status: HighsModelStatus) -> Outcome {
    match status {
        HighsModelStatus::Optimal => Outcome::Optimal,
        HighsModelStatus::ReachedTimeLimit => Outcome::TimedOut,
        HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => {
            Outcome::Infeasible
        }
        _ => Outcome::Other,
    }
}

/// Solves problems with HiGHS
#[derive(Clone, Debug)]
pub struct HighsSolver {
    options: SolverOptions,
}

impl HighsSolver {
    /// Create a new solver with the given options
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    fn to_highs(problem: &Problem) -> RowProblem {
        let mut highs_problem = RowProblem::default();
        let cols: Vec<_> = problem
            .columns()
            .iter()
            .map(|column| {
                let bounds = column.lower..=column.upper;
                match column.kind {
                    VariableKind::Continuous => highs_problem.add_column(column.cost, bounds),
                    VariableKind::Binary => highs_problem.add_integer_column(column.cost, bounds),
                }
            })
            .collect();

        for row in problem.rows() {
            let (lower, upper) = row.sense.bounds(row.rhs);
            let factors = row
                .expression
                .terms()
                .iter()
                .map(|(var, coeff)| (cols[var.index()], *coeff));
            highs_problem.add_row(lower..=upper, factors);
        }

        highs_problem
    }
}

impl SolverAdapter for HighsSolver {
    fn solve(&self, problem: &Problem) -> Result<Assignment, ModelError> {
        let mut model = Self::to_highs(problem).optimise(Sense::Minimise);
        model.set_option("output_flag", self.options.verbose);
        model.set_option("mip_rel_gap", self.options.mip_rel_gap);
        if let Some(time_limit) = self.options.time_limit {
            model.set_option("time_limit", time_limit);
        }

        let solved = model.try_solve().map_err(ModelError::Incoherent)?;
        let status = solved.status();
        match classify_status(status) {
            Outcome::Optimal => Ok(Assignment {
                status: SolveStatus::Optimal,
                values: solved.get_solution().columns().to_vec(),
                objective_value: Money(solved.objective_value()),
            }),
            Outcome::TimedOut => {
                let values = solved.get_solution().columns().to_vec();
                let violated = problem.violated_rows(&values, FEASIBILITY_TOLERANCE);
                if !violated.is_empty() {
                    debug!(
                        "Values at the time limit violate constraints {}",
                        format_items_with_cap(violated)
                    );
                }
                let incumbent = (problem.max_violation(&values) <= FEASIBILITY_TOLERANCE).then(
                    || Assignment {
                        status: SolveStatus::TimeLimit,
                        objective_value: Money(problem.objective_value(&values)),
                        values,
                    },
                );
                Err(ModelError::TimedOut { incumbent })
            }
            Outcome::Infeasible => Err(ModelError::Infeasible {
                time_steps: Vec::new(),
            }),
            Outcome::Other => Err(ModelError::NonOptimal(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimisation::problem::{
        ConstraintKey, ConstraintKind, ConstraintOwner, Expression, RowSense,
    };
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn solver() -> HighsSolver {
        HighsSolver::new(SolverOptions {
            time_limit: None,
            mip_rel_gap: 0.0,
            verbose: false,
        })
    }

    fn key(t: u32) -> ConstraintKey {
        ConstraintKey::new(ConstraintKind::HeatBalance, ConstraintOwner::System, TimeStep(t))
    }

    #[rstest]
    #[case(HighsModelStatus::Optimal, Outcome::Optimal)]
    #[case(HighsModelStatus::ReachedTimeLimit, Outcome::TimedOut)]
    #[case(HighsModelStatus::Infeasible, Outcome::Infeasible)]
    #[case(HighsModelStatus::UnboundedOrInfeasible, Outcome::Infeasible)]
    #[case(HighsModelStatus::Unbounded, Outcome::Other)]
    #[case(HighsModelStatus::ReachedIterationLimit, Outcome::Other)]
    fn classify(#[case] status: HighsModelStatus, #[case] expected: Outcome) {
        assert_eq!(classify_status(status), expected);
    }

    #[rstest]
    fn solve_small_milp(solver: HighsSolver) {
        // min 2x - 3y, x + 4y <= 6, y binary, x in [1, 10]
        let mut problem = Problem::default();
        let x = problem.add_continuous(1.0, 10.0);
        let y = problem.add_binary();
        problem.add_to_objective(&Expression::new().with_term(x, 2.0).with_term(y, -3.0));
        problem.add_constraint(
            key(1),
            Expression::new().with_term(x, 1.0).with_term(y, 4.0),
            RowSense::LessEqual,
            6.0,
        );

        let assignment = solver.solve(&problem).unwrap();
        assert_eq!(assignment.status, SolveStatus::Optimal);
        assert_approx_eq!(f64, assignment.value(x).unwrap(), 1.0, epsilon = 1e-6);
        assert_approx_eq!(f64, assignment.value(y).unwrap(), 1.0, epsilon = 1e-6);
        assert_approx_eq!(f64, assignment.objective_value.value(), -1.0, epsilon = 1e-6);
    }

    #[rstest]
    fn solve_infeasible(solver: HighsSolver) {
        let mut problem = Problem::default();
        let x = problem.add_continuous(0.0, 1.0);
        problem.add_constraint(
            key(1),
            Expression::new().with_term(x, 1.0),
            RowSense::GreaterEqual,
            2.0,
        );

        assert!(matches!(
            solver.solve(&problem),
            Err(ModelError::Infeasible { time_steps }) if time_steps.is_empty()
        ));
    }

    #[test]
    fn unresolved_variable() {
        let mut problem = Problem::default();
        let x = problem.add_continuous(0.0, 1.0);
        let y = problem.add_continuous(0.0, 1.0);
        let assignment = Assignment {
            status: SolveStatus::Optimal,
            values: vec![0.5],
            objective_value: Money(0.0),
        };
        assert_approx_eq!(f64, assignment.value(x).unwrap(), 0.5);
        assert!(matches!(
            assignment.value(y),
            Err(ModelError::UnresolvedVariable(var)) if var == y
        ));
    }

    #[test]
    fn infeasible_message_lists_time_steps() {
        let err = ModelError::Infeasible {
            time_steps: vec![TimeStep(2), TimeStep(5)],
        };
        assert_eq!(
            err.to_string(),
            "The solver has indicated that the problem is infeasible. Heat demand could not be \
            balanced at the following time steps: [2, 5]"
        );
    }
}
