//! Thermal storage units, which shift heat between time steps.
use crate::id::define_id_type;
use crate::units::Flow;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use std::rc::Rc;

define_id_type! {StorageID}

/// A map of [`StorageUnit`]s, keyed by storage ID
pub type StorageMap = IndexMap<StorageID, Rc<StorageUnit>>;

/// A heat storage unit
#[derive(PartialEq, Debug, Clone)]
pub struct StorageUnit {
    /// Unique identifier for the storage unit
    pub id: StorageID,
    /// Limits on charging, discharging and stored energy
    pub parameters: StorageParameters,
}

/// Limits for a [`StorageUnit`]
#[derive(PartialEq, Debug, Clone)]
pub struct StorageParameters {
    /// Maximum charge per time step
    pub max_charge: Flow,
    /// Maximum discharge per time step
    pub max_discharge: Flow,
    /// Maximum amount of stored energy
    pub max_capacity: Flow,
}

impl StorageUnit {
    /// Check that the storage limits are valid
    pub fn validate(&self) -> Result<()> {
        self.parameters
            .validate()
            .with_context(|| format!("Invalid parameters for storage {}", self.id))
    }
}

impl StorageParameters {
    /// Check that all limits are finite and non-negative
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("charge", self.max_charge),
            ("discharge", self.max_discharge),
            ("capacity", self.max_capacity),
        ] {
            ensure!(
                value.is_finite() && value >= Flow(0.0),
                "Maximum {name} must be a finite number greater than or equal to zero"
            );
        }

        Ok(())
    }
}
