//! Code for building and solving the unit commitment problem.
//!
//! The problem is a mixed-integer linear program. Each conversion unit and storage unit adds its
//! own variables and constraints (see [`conversion`] and [`storage`]), then the system adds the
//! heat balance and the objective. The assembled [`Problem`] is solved through a
//! [`SolverAdapter`].
use crate::model::Model;
use crate::storage::StorageID;
use crate::time_index::{TimeIndex, TimeStep};
use crate::unit::UnitID;
use anyhow::Result;
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::ops::Range;

mod constraints;
pub mod conversion;
pub mod problem;
pub mod solution;
pub mod solver;
pub mod storage;

use constraints::{BalanceSlack, add_heat_balance_constraints, objective};
use conversion::ConversionUnitModel;
use problem::{Problem, Row};
use solution::Solution;
use solver::{HighsSolver, ModelError, SolverAdapter, SolverOptions};
use storage::StorageUnitModel;

/// Heat balance slack below this value is treated as zero
const SLACK_TOLERANCE: f64 = 1e-6;

/// The complete optimisation problem for a model: all unit and storage submodels plus the heat
/// balance and objective
#[derive(Debug)]
pub struct SystemModel {
    time_index: TimeIndex,
    problem: Problem,
    units: IndexMap<UnitID, ConversionUnitModel>,
    storages: IndexMap<StorageID, StorageUnitModel>,
    heat_balance_rows: Range<usize>,
    slack: Option<BalanceSlack>,
}

impl SystemModel {
    /// Build the optimisation problem for `model`.
    ///
    /// The model is validated before anything is added to the problem.
    pub fn build(model: &Model) -> Result<Self> {
        Self::build_internal(model, false)
    }

    /// Build the problem with slack on the heat balance, so that it is feasible whenever the units
    /// and storages themselves are
    fn build_with_slack(model: &Model) -> Result<Self> {
        Self::build_internal(model, true)
    }

    fn build_internal(model: &Model, with_slack: bool) -> Result<Self> {
        model.validate()?;

        let time_index = model.time_index;
        let mut problem = Problem::default();

        let mut units = IndexMap::new();
        for (id, unit) in &model.units {
            let unit_model =
                ConversionUnitModel::build(&mut problem, unit, &time_index, |t| {
                    model.fixed_commitment(id, t)
                })?;
            units.insert(id.clone(), unit_model);
        }

        let mut storages = IndexMap::new();
        for (id, storage) in &model.storages {
            let storage_model = StorageUnitModel::build(&mut problem, storage, &time_index)?;
            storages.insert(id.clone(), storage_model);
        }

        let slack = with_slack.then(|| BalanceSlack::new(&mut problem, &time_index));
        let heat_balance_rows = add_heat_balance_constraints(
            &mut problem,
            &model.time_series,
            units.values(),
            storages.values(),
            slack.as_ref(),
        );

        let slack_cost = slack
            .as_ref()
            .map(|slack| (slack, model.parameters.value_of_lost_load));
        problem.add_to_objective(&objective(
            &model.time_series,
            units.values(),
            slack_cost,
        ));

        debug!(
            "Built problem with {} columns and {} rows",
            problem.num_cols(),
            problem.num_rows()
        );

        Ok(Self {
            time_index,
            problem,
            units,
            storages,
            heat_balance_rows,
            slack,
        })
    }

    /// The time steps of the problem
    pub fn time_index(&self) -> &TimeIndex {
        &self.time_index
    }

    /// The assembled problem
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// The submodel for a conversion unit
    pub fn unit(&self, id: &UnitID) -> Option<&ConversionUnitModel> {
        self.units.get(id)
    }

    /// Iterate over the conversion unit submodels in input order
    pub fn iter_units(&self) -> impl Iterator<Item = &ConversionUnitModel> {
        self.units.values()
    }

    /// The submodel for a storage unit
    pub fn storage(&self, id: &StorageID) -> Option<&StorageUnitModel> {
        self.storages.get(id)
    }

    /// Iterate over the storage unit submodels in input order
    pub fn iter_storages(&self) -> impl Iterator<Item = &StorageUnitModel> {
        self.storages.values()
    }

    /// The heat balance constraints, one per time step
    pub fn heat_balance_rows(&self) -> impl Iterator<Item = &Row> {
        self.problem.rows_in(self.heat_balance_rows.clone())
    }

    /// Solve the problem with the given solver
    pub fn solve<S: SolverAdapter>(self, solver: &S) -> Result<Solution, ModelError> {
        let assignment = solver.solve(&self.problem)?;
        Ok(Solution::new(self, assignment))
    }

    /// Time steps at which heat balance slack is non-zero in `solution`
    fn steps_with_slack(solution: &Solution) -> Result<Vec<TimeStep>, ModelError> {
        let Some(slack) = &solution.system().slack else {
            return Ok(Vec::new());
        };

        let mut time_steps = Vec::new();
        for t in solution.system().time_index.iter() {
            let unmet = solution.value(slack.unmet[t])?;
            let surplus = solution.value(slack.surplus[t])?;
            if unmet > SLACK_TOLERANCE || surplus > SLACK_TOLERANCE {
                time_steps.push(t);
            }
        }

        Ok(time_steps)
    }
}

/// Provides the interface for running the unit commitment optimisation.
///
/// By default a run fails if the time limit is reached before the solver proves optimality. The
/// model parameter `accept_incumbent_on_timeout` allows the best solution found so far to be
/// returned instead.
pub struct DispatchRun<'model> {
    model: &'model Model,
    solver_output: bool,
}

impl<'model> DispatchRun<'model> {
    /// Create a new [`DispatchRun`] for the specified model
    pub fn new(model: &'model Model) -> Self {
        Self {
            model,
            solver_output: false,
        }
    }

    /// Whether to show the solver's own output
    pub fn with_solver_output(self, solver_output: bool) -> Self {
        Self {
            solver_output,
            ..self
        }
    }

    /// The options passed to HiGHS for this run
    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            time_limit: self.model.parameters.time_limit,
            mip_rel_gap: self.model.parameters.mip_rel_gap,
            verbose: self.solver_output,
        }
    }

    /// Build and solve the problem with HiGHS
    pub fn run(self) -> Result<Solution> {
        let solver = HighsSolver::new(self.solver_options());
        self.run_with(&solver)
    }

    /// Build and solve the problem with the given solver.
    ///
    /// If the problem is infeasible, it is solved again with slack on the heat balance so that the
    /// time steps at which demand cannot be balanced can be reported.
    pub fn run_with<S: SolverAdapter>(self, solver: &S) -> Result<Solution> {
        let system = SystemModel::build(self.model)?;
        info!(
            "Solving problem with {} variables and {} constraints",
            system.problem().num_cols(),
            system.problem().num_rows()
        );

        let assignment = match solver.solve(system.problem()) {
            Ok(assignment) => assignment,
            Err(ModelError::Infeasible { .. }) => {
                let time_steps = self.find_unbalanced_time_steps(solver)?;
                Err(ModelError::Infeasible { time_steps })?
            }
            Err(ModelError::TimedOut {
                incumbent: Some(incumbent),
            }) if self.model.parameters.accept_incumbent_on_timeout => {
                warn!(
                    "Time limit reached before optimality was proven. Using the best solution \
                    found (objective value: {})",
                    incumbent.objective_value
                );
                incumbent
            }
            Err(err) => Err(err)?,
        };

        Ok(Solution::new(system, assignment))
    }

    /// Solve with heat balance slack and return the steps where slack is used.
    ///
    /// Returns an empty list if the problem is infeasible even with slack, i.e. the units cannot
    /// satisfy their own constraints.
    fn find_unbalanced_time_steps<S: SolverAdapter>(&self, solver: &S) -> Result<Vec<TimeStep>> {
        info!("Problem is infeasible; solving again with slack on the heat balance");
        let system = SystemModel::build_with_slack(self.model)?;

        match system.solve(solver) {
            Ok(solution) => Ok(SystemModel::steps_with_slack(&solution)?),
            Err(ModelError::Infeasible { .. }) => Ok(Vec::new()),
            Err(err) => Err(err)?,
        }
    }
}
