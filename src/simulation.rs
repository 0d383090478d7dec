//! Functionality for running a model: solve the unit commitment problem and write the results.
use crate::model::Model;
use crate::optimisation::DispatchRun;
use crate::optimisation::solver::SolveStatus;
use crate::output::DataWriter;
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

/// Run the model.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `solver_output` - Whether to show the solver's own output
pub fn run(model: &Model, output_path: &Path, solver_output: bool) -> Result<()> {
    let writer = DataWriter::create(output_path, model)?;

    info!(
        "Optimising {} unit(s) and {} storage unit(s) over time steps {}..={}",
        model.units.len(),
        model.storages.len(),
        model.time_index.first(),
        model.time_index.last()
    );
    let solution = DispatchRun::new(model)
        .with_solver_output(solver_output)
        .run()
        .context("Unit commitment optimisation failed")?;

    match solution.status() {
        SolveStatus::Optimal => info!("Optimal solution found"),
        SolveStatus::TimeLimit => warn!("Solution is not proven optimal"),
    }
    info!("Objective value: {}", solution.objective_value());

    writer.write_solution(model, &solution)?;

    Ok(())
}
