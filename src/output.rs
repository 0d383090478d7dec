//! The module responsible for writing output data to disk.
use crate::model::Model;
use crate::optimisation::solution::{Solution, UnitDispatch};
use crate::optimisation::solver::SolveStatus;
use crate::time_series::TimeSeries;
use crate::unit::{ConversionUnit, UnitID};
use crate::units::{Flow, Money};
use anyhow::{Context, Result, ensure};
use csv::Writer;
use itertools::chain;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;
use metadata::write_metadata;

/// The output file name for the per-time-step results
const TIME_SERIES_FILE_NAME: &str = "timeseries.csv";

/// The output file name for the solver status and objective
const SUMMARY_FILE_NAME: &str = "summary.toml";

/// The output file name for per-unit totals
const UNIT_SUMMARY_FILE_NAME: &str = "unit_summary.csv";

/// Get the default output directory for the model
pub fn get_output_dir(model_dir: &Path, results_root: PathBuf) -> Result<PathBuf> {
    // The model name is the last component of the canonical model path
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    let mut path = results_root;
    path.push(model_name);

    Ok(path)
}

/// Create a new output directory for the model, specifying whether to allow overwriting.
///
/// # Returns
///
/// True if the output directory was overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    // If the folder already exists, then delete it
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass the \
            --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// The solver status and objective value, written to `summary.toml`
#[derive(Serialize, Debug, PartialEq)]
struct Summary {
    status: SolveStatus,
    objective_value: Money,
}

/// Totals over the whole horizon for one conversion unit
#[derive(Serialize, Debug, PartialEq)]
struct UnitSummaryRow {
    unit_id: UnitID,
    gas: Flow,
    power: Flow,
    heat: Flow,
    steps_on: u32,
    fuel_cost: Money,
    standby_cost: Money,
    start_cost: Money,
    revenue: Money,
}

impl UnitSummaryRow {
    /// Sum a unit's dispatch, given in time step order, against the model's prices.
    ///
    /// Revenue is only counted for units which sell output 1.
    fn new<'a, I>(unit: &ConversionUnit, time_series: &TimeSeries, dispatch: I) -> Self
    where
        I: IntoIterator<Item = &'a UnitDispatch>,
    {
        let mut row = Self {
            unit_id: unit.id.clone(),
            gas: Flow(0.0),
            power: Flow(0.0),
            heat: Flow(0.0),
            steps_on: 0,
            fuel_cost: Money(0.0),
            standby_cost: Money(0.0),
            start_cost: Money(0.0),
            revenue: Money(0.0),
        };

        for ((_, gas_price, _, spot_price), dispatch) in time_series.iter().zip(dispatch) {
            row.gas += dispatch.input;
            row.power += dispatch.output1;
            row.heat += dispatch.output2;
            row.fuel_cost += dispatch.input * gas_price;
            row.start_cost += dispatch.start_cost;
            if dispatch.on {
                row.steps_on += 1;
                row.standby_cost += unit.costs.standby_cost;
            }
            if unit.sells_output1 {
                row.revenue += dispatch.output1 * spot_price;
            }
        }

        row
    }
}

/// An object for writing results of a run to file
pub struct DataWriter {
    output_path: PathBuf,
}

impl DataWriter {
    /// Create a new [`DataWriter`], writing run metadata to the output directory.
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `model` - The model being run
    pub fn create(output_path: &Path, model: &Model) -> Result<Self> {
        write_metadata(output_path, model).context("Failed to save metadata")?;

        Ok(Self {
            output_path: output_path.to_path_buf(),
        })
    }

    /// Write the per-time-step results and the summary for a solution
    pub fn write_solution(&self, model: &Model, solution: &Solution) -> Result<()> {
        self.write_time_series(model, solution)?;
        self.write_unit_summary(model, solution)?;
        self.write_summary(solution)
    }

    fn write_time_series(&self, model: &Model, solution: &Solution) -> Result<()> {
        let file_path = self.output_path.join(TIME_SERIES_FILE_NAME);
        let mut writer = Writer::from_path(&file_path)
            .with_context(|| format!("Could not create {}", file_path.display()))?;
        writer.write_record(time_series_header(model))?;

        for (t, gas_price, demand, spot_price) in model.time_series.iter() {
            let mut record = vec![t.to_string()];
            for unit_id in model.units.keys() {
                let dispatch = solution.unit_dispatch_at(unit_id, t)?;
                record.extend([
                    dispatch.input.to_string(),
                    dispatch.output1.to_string(),
                    dispatch.output2.to_string(),
                    u8::from(dispatch.on).to_string(),
                    dispatch.start_cost.to_string(),
                ]);
            }
            for storage_id in model.storages.keys() {
                let state = solution.storage_state_at(storage_id, t)?;
                record.extend([
                    state.charge.to_string(),
                    state.capacity.to_string(),
                    state.discharge.to_string(),
                ]);
            }
            record.extend([
                demand.to_string(),
                spot_price.to_string(),
                gas_price.to_string(),
            ]);
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    fn write_unit_summary(&self, model: &Model, solution: &Solution) -> Result<()> {
        let file_path = self.output_path.join(UNIT_SUMMARY_FILE_NAME);
        let mut writer = Writer::from_path(&file_path)
            .with_context(|| format!("Could not create {}", file_path.display()))?;
        for unit in model.units.values() {
            let dispatch = solution.unit_dispatch(&unit.id)?;
            writer.serialize(UnitSummaryRow::new(
                unit,
                &model.time_series,
                dispatch.values(),
            ))?;
        }

        writer.flush()?;
        Ok(())
    }

    fn write_summary(&self, solution: &Solution) -> Result<()> {
        let summary = Summary {
            status: solution.status(),
            objective_value: solution.objective_value(),
        };
        let file_path = self.output_path.join(SUMMARY_FILE_NAME);
        fs::write(&file_path, toml::to_string(&summary)?)
            .with_context(|| format!("Could not write {}", file_path.display()))?;

        Ok(())
    }
}

/// Column names for `timeseries.csv`
fn time_series_header(model: &Model) -> Vec<String> {
    let unit_columns = model.units.keys().flat_map(|id| {
        ["in", "out1", "out2", "on", "start_cost"].map(|name| format!("{name}_{id}"))
    });
    let storage_columns = model
        .storages
        .keys()
        .flat_map(|id| ["charge", "capacity", "discharge"].map(|name| format!("{name}_{id}")));

    chain!(
        ["t".to_string()],
        unit_columns,
        storage_columns,
        ["demand", "spot", "gas"].map(String::from)
    )
    .collect()
}
