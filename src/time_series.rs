//! Exogenous inputs which vary over time: fuel price, heat demand and electricity spot price.
use crate::time_index::{StepMap, TimeIndex, TimeStep};
use crate::units::{Flow, MoneyPerFlow};
use anyhow::{Result, ensure};

/// The exogenous time series for a model, one value per time step
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeries {
    /// Price paid for fuel consumed by conversion units
    pub gas_price: StepMap<MoneyPerFlow>,
    /// Heat demand which must be met in each time step
    pub demand: StepMap<Flow>,
    /// Price received for electricity sold on the spot market
    pub spot_price: StepMap<MoneyPerFlow>,
}

impl TimeSeries {
    /// Check that the series are consistent with `time_index` and contain sensible values
    pub fn validate(&self, time_index: &TimeIndex) -> Result<()> {
        for (name, index) in [
            ("gas price", self.gas_price.time_index()),
            ("heat demand", self.demand.time_index()),
            ("spot price", self.spot_price.time_index()),
        ] {
            ensure!(
                index == time_index,
                "The {name} series covers time steps {}..={}, but the model covers {}..={}",
                index.first(),
                index.last(),
                time_index.first(),
                time_index.last()
            );
        }

        for (t, demand) in self.demand.iter() {
            ensure!(
                demand.is_finite() && *demand >= Flow(0.0),
                "Heat demand must be a finite, non-negative number (time step {t})"
            );
        }
        check_prices_finite("gas price", &self.gas_price)?;
        check_prices_finite("spot price", &self.spot_price)?;

        Ok(())
    }

    /// Iterate over time steps together with the gas price, demand and spot price for that step
    pub fn iter(&self) -> impl Iterator<Item = (TimeStep, MoneyPerFlow, Flow, MoneyPerFlow)> {
        self.demand.iter().map(|(t, demand)| {
            (t, self.gas_price[t], *demand, self.spot_price[t])
        })
    }
}

/// Prices may be negative, but must be finite
fn check_prices_finite(name: &str, prices: &StepMap<MoneyPerFlow>) -> Result<()> {
    for (t, price) in prices.iter() {
        ensure!(
            price.is_finite(),
            "The {name} must be a finite number (time step {t})"
        );
    }

    Ok(())
}
