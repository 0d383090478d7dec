//! Code for reading heat storage units from a CSV file.
use super::{input_err_msg, read_csv_optional};
use crate::storage::{StorageID, StorageMap, StorageParameters, StorageUnit};
use crate::units::Flow;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const STORAGE_FILE_NAME: &str = "storage.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct StorageRaw {
    id: StorageID,
    charge: Flow,
    discharge: Flow,
    capacity: Flow,
}

/// Read storage units from the model directory.
///
/// The storage file is optional; if it is absent, the model has no storage.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// A map of validated [`StorageUnit`]s or an error.
pub fn read_storages(model_dir: &Path) -> Result<StorageMap> {
    let file_path = model_dir.join(STORAGE_FILE_NAME);
    let storage_csv = read_csv_optional(&file_path)?;
    read_storages_from_iter(storage_csv).with_context(|| input_err_msg(&file_path))
}

fn read_storages_from_iter<I>(iter: I) -> Result<StorageMap>
where
    I: Iterator<Item = StorageRaw>,
{
    let mut map = StorageMap::new();
    for row in iter {
        let storage = StorageUnit {
            id: row.id.clone(),
            parameters: StorageParameters {
                max_charge: row.charge,
                max_discharge: row.discharge,
                max_capacity: row.capacity,
            },
        };
        storage.validate()?;

        ensure!(
            map.insert(row.id.clone(), Rc::new(storage)).is_none(),
            "Duplicate storage ID found: {}",
            row.id
        );
    }

    Ok(map)
}
