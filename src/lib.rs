//! Unit commitment of combined heat and power (CHP) units, heat plants and thermal storage.
//!
//! A model directory describes a set of conversion units and storage units together with time
//! series for fuel price, heat demand and electricity spot price. The crate builds a mixed-integer
//! linear program which minimises operating cost while meeting heat demand, and solves it with
//! HiGHS.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod example;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod settings;
pub mod simulation;
pub mod storage;
pub mod time_index;
pub mod time_series;
pub mod unit;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory in which program configuration files are stored
pub fn get_heatcommit_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No sensible default for this platform; use the working directory
        return PathBuf::new();
    };

    config_dir.push("heatcommit");
    config_dir
}
