//! Code for reading user-fixed commitment states (must-run periods and outages).
use super::{input_err_msg, read_csv_optional};
use crate::id::IDCollection;
use crate::model::FixedCommitmentMap;
use crate::time_index::{TimeIndex, TimeStep};
use crate::unit::UnitMap;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const COMMITMENT_FILE_NAME: &str = "commitment.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct CommitmentRaw {
    unit_id: String,
    t: u32,
    on: u8,
}

/// Read fixed commitment states from the model directory.
///
/// The commitment file is optional; if it is absent, no commitment is fixed.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `units` - The model's conversion units
/// * `time_index` - The model's time index
///
/// # Returns
///
/// A map of fixed commitment states, keyed by unit and time step, or an error.
pub fn read_fixed_commitment(
    model_dir: &Path,
    units: &UnitMap,
    time_index: &TimeIndex,
) -> Result<FixedCommitmentMap> {
    let file_path = model_dir.join(COMMITMENT_FILE_NAME);
    let commitment_csv = read_csv_optional(&file_path)?;
    read_fixed_commitment_from_iter(commitment_csv, units, time_index)
        .with_context(|| input_err_msg(&file_path))
}

fn read_fixed_commitment_from_iter<I>(
    iter: I,
    units: &UnitMap,
    time_index: &TimeIndex,
) -> Result<FixedCommitmentMap>
where
    I: Iterator<Item = CommitmentRaw>,
{
    let mut map = FixedCommitmentMap::new();
    for row in iter {
        let unit_id = units.get_id(&row.unit_id)?;
        let t = TimeStep(row.t);
        ensure!(
            time_index.contains(t),
            "Time step {t} for unit {unit_id} is outside the model's time index"
        );
        ensure!(
            row.on <= 1,
            "Commitment for unit {unit_id} at time step {t} must be 0 or 1"
        );

        ensure!(
            map.insert((unit_id.clone(), t), row.on == 1).is_none(),
            "Duplicate commitment entry for unit {unit_id} at time step {t}"
        );
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model};
    use crate::model::Model;
    use rstest::rstest;

    fn row(unit_id: &str, t: u32, on: u8) -> CommitmentRaw {
        CommitmentRaw {
            unit_id: unit_id.into(),
            t,
            on,
        }
    }

    #[rstest]
    fn read_commitment_valid(model: Model) {
        let map = read_fixed_commitment_from_iter(
            [row("chp", 1, 1), row("chp", 3, 0)].into_iter(),
            &model.units,
            &model.time_index,
        )
        .unwrap();
        assert_eq!(map.len(), 2);
        assert!(map[&("chp".into(), TimeStep(1))]);
        assert!(!map[&("chp".into(), TimeStep(3))]);
    }

    #[rstest]
    #[case(row("turbine", 1, 1), "Unknown ID turbine found")]
    #[case(row("chp", 7, 1), "Time step 7 for unit chp is outside the model's time index")]
    #[case(row("chp", 1, 2), "Commitment for unit chp at time step 1 must be 0 or 1")]
    fn read_commitment_invalid(model: Model, #[case] bad_row: CommitmentRaw, #[case] msg: &str) {
        assert_error!(
            read_fixed_commitment_from_iter(
                std::iter::once(bad_row),
                &model.units,
                &model.time_index
            ),
            msg
        );
    }

    #[rstest]
    fn read_commitment_duplicate(model: Model) {
        assert_error!(
            read_fixed_commitment_from_iter(
                [row("chp", 2, 1), row("chp", 2, 0)].into_iter(),
                &model.units,
                &model.time_index,
            ),
            "Duplicate commitment entry for unit chp at time step 2"
        );
    }
}
