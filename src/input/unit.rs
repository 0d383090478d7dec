//! Code for reading conversion units, their technical parameters and their costs.
use super::{input_err_msg, read_csv, try_insert};
use crate::id::IDCollection;
use crate::unit::{ConversionUnit, UnitCosts, UnitID, UnitMap, UnitParameters};
use crate::units::{Flow, Money};
use anyhow::{Context, Result, ensure};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

const UNITS_FILE_NAME: &str = "units.csv";
const UNIT_PARAMETERS_FILE_NAME: &str = "unit_parameters.csv";
const UNIT_COSTS_FILE_NAME: &str = "unit_costs.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct UnitRaw {
    id: UnitID,
    description: String,
    sells_output1: bool,
}

#[derive(PartialEq, Debug, Deserialize)]
struct UnitParametersRaw {
    id: String,
    #[serde(rename = "Inmin")]
    input_min: Flow,
    #[serde(rename = "Inmax")]
    input_max: Flow,
    #[serde(rename = "Out1min")]
    output1_min: Flow,
    #[serde(rename = "Out1max")]
    output1_max: Flow,
    #[serde(rename = "Out2min")]
    output2_min: Flow,
    #[serde(rename = "Out2max")]
    output2_max: Flow,
    up: u32,
    down: u32,
}

impl UnitParametersRaw {
    fn into_parameters(self) -> UnitParameters {
        UnitParameters {
            input_min: self.input_min,
            input_max: self.input_max,
            output1_min: self.output1_min,
            output1_max: self.output1_max,
            output2_min: self.output2_min,
            output2_max: self.output2_max,
            up_time: self.up,
            down_time: self.down,
        }
    }
}

#[derive(PartialEq, Debug, Deserialize)]
struct UnitCostsRaw {
    id: String,
    oh: Money,
    start: Money,
}

/// Read conversion units from the model directory.
///
/// Each unit listed in the units file must have exactly one row in the parameters file and one row
/// in the costs file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// A map of validated [`ConversionUnit`]s, in the order given in the units file, or an error.
pub fn read_units(model_dir: &Path) -> Result<UnitMap> {
    let file_path = model_dir.join(UNITS_FILE_NAME);
    let units_csv = read_csv(&file_path)?;
    let unit_rows = read_unit_rows_from_iter(units_csv).with_context(|| input_err_msg(&file_path))?;
    let unit_ids: IndexSet<UnitID> = unit_rows.keys().cloned().collect();

    let file_path = model_dir.join(UNIT_PARAMETERS_FILE_NAME);
    let parameters_csv = read_csv(&file_path)?;
    let mut parameters = read_unit_parameters_from_iter(parameters_csv, &unit_ids)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(UNIT_COSTS_FILE_NAME);
    let costs_csv = read_csv(&file_path)?;
    let mut costs =
        read_unit_costs_from_iter(costs_csv, &unit_ids).with_context(|| input_err_msg(&file_path))?;

    unit_rows
        .into_iter()
        .map(|(id, row)| -> Result<_> {
            let parameters = parameters.remove(&id).with_context(|| {
                format!("No parameters given for unit {id} in {UNIT_PARAMETERS_FILE_NAME}")
            })?;
            let costs = costs
                .remove(&id)
                .with_context(|| format!("No costs given for unit {id} in {UNIT_COSTS_FILE_NAME}"))?;
            let unit = ConversionUnit {
                id: id.clone(),
                description: row.description,
                sells_output1: row.sells_output1,
                parameters,
                costs,
            };
            unit.validate()?;

            Ok((id, Rc::new(unit)))
        })
        .collect()
}

/// Read the rows of the units file, checking for duplicate IDs
fn read_unit_rows_from_iter<I>(iter: I) -> Result<IndexMap<UnitID, UnitRaw>>
where
    I: Iterator<Item = UnitRaw>,
{
    let mut map = IndexMap::new();
    for row in iter {
        let id = row.id.clone();
        ensure!(!id.0.is_empty(), "Unit IDs cannot be empty");
        ensure!(
            map.insert(id.clone(), row).is_none(),
            "Duplicate unit ID found: {id}"
        );
    }

    Ok(map)
}

fn read_unit_parameters_from_iter<I>(
    iter: I,
    unit_ids: &IndexSet<UnitID>,
) -> Result<HashMap<UnitID, UnitParameters>>
where
    I: Iterator<Item = UnitParametersRaw>,
{
    let mut map = HashMap::new();
    for row in iter {
        let id = unit_ids.get_id(&row.id)?.clone();
        try_insert(&mut map, id, row.into_parameters())?;
    }

    Ok(map)
}

fn read_unit_costs_from_iter<I>(
    iter: I,
    unit_ids: &IndexSet<UnitID>,
) -> Result<HashMap<UnitID, UnitCosts>>
where
    I: Iterator<Item = UnitCostsRaw>,
{
    let mut map = HashMap::new();
    for row in iter {
        let id = unit_ids.get_id(&row.id)?.clone();
        let costs = UnitCosts {
            standby_cost: row.oh,
            start_cost: row.start,
        };
        try_insert(&mut map, id, costs)?;
    }

    Ok(map)
}
