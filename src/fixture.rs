//! Fixtures for tests

use crate::model::{FixedCommitmentMap, Model, ModelParameters};
use crate::storage::{StorageMap, StorageParameters, StorageUnit};
use crate::time_index::{StepMap, TimeIndex};
use crate::time_series::TimeSeries;
use crate::unit::{ConversionUnit, UnitCosts, UnitMap, UnitParameters};
use crate::units::{Flow, Money, MoneyPerFlow};
use rstest::fixture;
use std::path::PathBuf;
use std::rc::Rc;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn time_index() -> TimeIndex {
    TimeIndex::new(1, 3).unwrap()
}

#[fixture]
pub fn time_series(time_index: TimeIndex) -> TimeSeries {
    TimeSeries {
        gas_price: StepMap::from_fn(&time_index, |_| MoneyPerFlow(30.0)),
        demand: StepMap::from_fn(&time_index, |_| Flow(5.0)),
        spot_price: StepMap::from_values(
            &time_index,
            vec![MoneyPerFlow(40.0), MoneyPerFlow(50.0), MoneyPerFlow(60.0)],
        )
        .unwrap(),
    }
}

/// A CHP unit which sells its power on the spot market
#[fixture]
pub fn chp_unit() -> ConversionUnit {
    ConversionUnit {
        id: "chp".into(),
        description: "CHP unit".into(),
        sells_output1: true,
        parameters: UnitParameters {
            input_min: Flow(20.0),
            input_max: Flow(100.0),
            output1_min: Flow(8.0),
            output1_max: Flow(40.0),
            output2_min: Flow(10.0),
            output2_max: Flow(40.0),
            up_time: 2,
            down_time: 1,
        },
        costs: UnitCosts {
            standby_cost: Money(10.0),
            start_cost: Money(500.0),
        },
    }
}

/// A heat-only plant: output 1 is fixed at zero
#[fixture]
pub fn heat_plant() -> ConversionUnit {
    ConversionUnit {
        id: "boiler".into(),
        description: "Heat plant".into(),
        sells_output1: false,
        parameters: UnitParameters {
            input_min: Flow(0.0),
            input_max: Flow(60.0),
            output1_min: Flow(0.0),
            output1_max: Flow(0.0),
            output2_min: Flow(0.0),
            output2_max: Flow(50.0),
            up_time: 0,
            down_time: 0,
        },
        costs: UnitCosts {
            standby_cost: Money(0.0),
            start_cost: Money(0.0),
        },
    }
}

#[fixture]
pub fn storage_unit() -> StorageUnit {
    StorageUnit {
        id: "store1".into(),
        parameters: StorageParameters {
            max_charge: Flow(10.0),
            max_discharge: Flow(10.0),
            max_capacity: Flow(20.0),
        },
    }
}

#[fixture]
pub fn model(
    time_index: TimeIndex,
    time_series: TimeSeries,
    chp_unit: ConversionUnit,
    heat_plant: ConversionUnit,
    storage_unit: StorageUnit,
) -> Model {
    let units: UnitMap = [chp_unit, heat_plant]
        .into_iter()
        .map(|unit| (unit.id.clone(), Rc::new(unit)))
        .collect();
    let storages: StorageMap = [(storage_unit.id.clone(), Rc::new(storage_unit))]
        .into_iter()
        .collect();

    Model {
        model_path: PathBuf::new(),
        parameters: ModelParameters::default(),
        time_index,
        time_series,
        units,
        storages,
        fixed_commitment: FixedCommitmentMap::new(),
    }
}
