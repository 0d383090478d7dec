//! Code for reading the exogenous time series: gas price, heat demand and spot price.
use super::{input_err_msg, read_csv};
use crate::time_index::{StepMap, TimeIndex};
use crate::time_series::TimeSeries;
use crate::units::{Flow, MoneyPerFlow};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;

const GAS_PRICE_FILE_NAME: &str = "timeseries_gas.csv";
const HEAT_DEMAND_FILE_NAME: &str = "timeseries_heat_demand.csv";
const SPOT_PRICE_FILE_NAME: &str = "timeseries_spot.csv";

#[derive(Deserialize)]
struct GasPriceRaw {
    t: u32,
    gas: MoneyPerFlow,
}

#[derive(Deserialize)]
struct HeatDemandRaw {
    t: u32,
    dem: Flow,
}

#[derive(Deserialize)]
struct SpotPriceRaw {
    t: u32,
    spot: MoneyPerFlow,
}

/// Read the three time series files from the model directory.
///
/// The heat demand file defines the model's time index. The price files must cover exactly the
/// same time steps, in the same order.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The model's [`TimeIndex`] and [`TimeSeries`] or an error.
pub fn read_time_series(model_dir: &Path) -> Result<(TimeIndex, TimeSeries)> {
    let file_path = model_dir.join(HEAT_DEMAND_FILE_NAME);
    let demand_csv = read_csv::<HeatDemandRaw>(&file_path)?;
    let (time_index, demand) = read_index_and_series_from_iter(demand_csv.map(|r| (r.t, r.dem)))
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(GAS_PRICE_FILE_NAME);
    let gas_csv = read_csv::<GasPriceRaw>(&file_path)?;
    let gas_price = read_series_from_iter(gas_csv.map(|r| (r.t, r.gas)), &time_index)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(SPOT_PRICE_FILE_NAME);
    let spot_csv = read_csv::<SpotPriceRaw>(&file_path)?;
    let spot_price = read_series_from_iter(spot_csv.map(|r| (r.t, r.spot)), &time_index)
        .with_context(|| input_err_msg(&file_path))?;

    let time_series = TimeSeries {
        gas_price,
        demand,
        spot_price,
    };
    time_series.validate(&time_index)?;

    Ok((time_index, time_series))
}

/// Build a time index from the steps in `iter`, together with the values for each step
fn read_index_and_series_from_iter<I, T>(iter: I) -> Result<(TimeIndex, StepMap<T>)>
where
    I: Iterator<Item = (u32, T)>,
{
    let (steps, values): (Vec<_>, Vec<_>) = iter.unzip();
    let time_index = TimeIndex::from_steps(&steps)?;
    let series = StepMap::from_values(&time_index, values)?;

    Ok((time_index, series))
}

/// Read a series whose time steps must match `time_index`
fn read_series_from_iter<I, T>(iter: I, time_index: &TimeIndex) -> Result<StepMap<T>>
where
    I: Iterator<Item = (u32, T)>,
{
    let (steps, values): (Vec<_>, Vec<_>) = iter.unzip();
    ensure!(
        steps.iter().copied().eq(time_index.iter().map(|t| t.0)),
        "Time steps ({}) do not match those of the heat demand series ({}..={})",
        steps.iter().join(", "),
        time_index.first(),
        time_index.last()
    );

    StepMap::from_values(time_index, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::time_index::TimeStep;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = File::create(dir.join(name)).unwrap();
        write!(file, "{contents}").unwrap();
    }

    #[test]
    fn read_time_series_works() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), HEAT_DEMAND_FILE_NAME, "t,dem\n1,5\n2,6\n3,7\n");
        write_file(dir.path(), GAS_PRICE_FILE_NAME, "t,gas\n1,30\n2,30\n3,31\n");
        write_file(dir.path(), SPOT_PRICE_FILE_NAME, "t,spot\n1,40\n2,-5\n3,60\n");

        let (time_index, time_series) = read_time_series(dir.path()).unwrap();
        assert_eq!(time_index, TimeIndex::new(1, 3).unwrap());
        assert_eq!(time_series.demand[TimeStep(3)], Flow(7.0));
        assert_eq!(time_series.gas_price[TimeStep(3)], MoneyPerFlow(31.0));
        assert_eq!(time_series.spot_price[TimeStep(2)], MoneyPerFlow(-5.0));
    }

    #[test]
    fn read_time_series_mismatched_steps() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), HEAT_DEMAND_FILE_NAME, "t,dem\n1,5\n2,6\n3,7\n");
        write_file(dir.path(), GAS_PRICE_FILE_NAME, "t,gas\n1,30\n2,30\n");
        write_file(dir.path(), SPOT_PRICE_FILE_NAME, "t,spot\n1,40\n2,50\n3,60\n");

        let err = read_time_series(dir.path()).unwrap_err();
        assert_eq!(
            err.chain().nth(1).unwrap().to_string(),
            "Time steps (1, 2) do not match those of the heat demand series (1..=3)"
        );
    }

    #[test]
    fn read_index_non_contiguous() {
        let rows = [(1, Flow(1.0)), (2, Flow(1.0)), (4, Flow(1.0))];
        assert_error!(
            read_index_and_series_from_iter(rows.into_iter()),
            "Time steps must be contiguous, but step 2 is followed by 4"
        );
    }

    #[test]
    fn read_series_out_of_order() {
        let time_index = TimeIndex::new(1, 2).unwrap();
        let rows = [(2, MoneyPerFlow(1.0)), (1, MoneyPerFlow(1.0))];
        assert_error!(
            read_series_from_iter(rows.into_iter(), &time_index),
            "Time steps (2, 1) do not match those of the heat demand series (1..=2)"
        );
    }
}
