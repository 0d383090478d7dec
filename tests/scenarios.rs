//! Small models solved end to end with HiGHS.
use float_cmp::assert_approx_eq;
use heatcommit::model::{FixedCommitmentMap, Model, ModelParameters};
use heatcommit::optimisation::problem::{ConstraintKind, ConstraintOwner, Problem};
use heatcommit::optimisation::solution::Solution;
use heatcommit::optimisation::solver::{Assignment, ModelError, SolveStatus, SolverAdapter};
use heatcommit::optimisation::{DispatchRun, SystemModel};
use heatcommit::storage::{StorageParameters, StorageUnit};
use heatcommit::time_index::{StepMap, TimeIndex, TimeStep};
use heatcommit::time_series::TimeSeries;
use heatcommit::unit::{ConversionUnit, UnitCosts, UnitParameters};
use heatcommit::units::{Flow, Money, MoneyPerFlow};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::rc::Rc;

const TOLERANCE: f64 = 1e-6;

/// A unit with no power output, whose input equals its heat output
fn heat_unit(id: &str, out2: (f64, f64)) -> ConversionUnit {
    ConversionUnit {
        id: id.into(),
        description: String::new(),
        sells_output1: false,
        parameters: UnitParameters {
            input_min: Flow(out2.0),
            input_max: Flow(out2.1),
            output1_min: Flow(0.0),
            output1_max: Flow(0.0),
            output2_min: Flow(out2.0),
            output2_max: Flow(out2.1),
            up_time: 0,
            down_time: 0,
        },
        costs: UnitCosts {
            standby_cost: Money(0.0),
            start_cost: Money(0.0),
        },
    }
}

fn storage_unit(id: &str, max_charge: f64, max_discharge: f64, max_capacity: f64) -> StorageUnit {
    StorageUnit {
        id: id.into(),
        parameters: StorageParameters {
            max_charge: Flow(max_charge),
            max_discharge: Flow(max_discharge),
            max_capacity: Flow(max_capacity),
        },
    }
}

/// A model with a gas price of 1 and a spot price of 0 at every step
fn build_model(demand: &[f64], units: Vec<ConversionUnit>, storages: Vec<StorageUnit>) -> Model {
    let last = u32::try_from(demand.len()).unwrap();
    let time_index = TimeIndex::new(1, last).unwrap();
    let demand: Vec<Flow> = demand.iter().copied().map(Flow).collect();

    Model {
        model_path: PathBuf::new(),
        parameters: ModelParameters {
            mip_rel_gap: 0.0,
            ..ModelParameters::default()
        },
        time_index,
        time_series: TimeSeries {
            gas_price: StepMap::from_fn(&time_index, |_| MoneyPerFlow(1.0)),
            demand: StepMap::from_values(&time_index, demand).unwrap(),
            spot_price: StepMap::from_fn(&time_index, |_| MoneyPerFlow(0.0)),
        },
        units: units
            .into_iter()
            .map(|unit| (unit.id.clone(), Rc::new(unit)))
            .collect(),
        storages: storages
            .into_iter()
            .map(|storage| (storage.id.clone(), Rc::new(storage)))
            .collect(),
        fixed_commitment: FixedCommitmentMap::new(),
    }
}

fn fix(model: &mut Model, unit_id: &str, states: &[(u32, bool)]) {
    for &(t, on) in states {
        model
            .fixed_commitment
            .insert((unit_id.into(), TimeStep(t)), on);
    }
}

fn solve(model: &Model) -> Solution {
    let solution = DispatchRun::new(model).run().unwrap();
    assert_eq!(solution.status(), SolveStatus::Optimal);
    assert!(solution.max_violation() < TOLERANCE);
    assert_heat_balance(model, &solution);
    solution
}

fn commitment(solution: &Solution, unit_id: &str) -> Vec<bool> {
    solution
        .unit_dispatch(&unit_id.into())
        .unwrap()
        .values()
        .map(|dispatch| dispatch.on)
        .collect()
}

/// Heat supplied by units and storage equals demand plus charging at every step
fn assert_heat_balance(model: &Model, solution: &Solution) {
    for (t, _, demand, _) in model.time_series.iter() {
        let mut supply = 0.0;
        for unit_id in model.units.keys() {
            supply += solution.unit_dispatch_at(unit_id, t).unwrap().output2.value();
        }
        for storage_id in model.storages.keys() {
            let state = solution.storage_state_at(storage_id, t).unwrap();
            supply += state.discharge.value() - state.charge.value();
        }
        assert_approx_eq!(f64, supply, demand.value(), epsilon = TOLERANCE);
    }
}

/// A solver which must never be called
struct UnreachableSolver;

impl SolverAdapter for UnreachableSolver {
    fn solve(&self, _problem: &Problem) -> Result<Assignment, ModelError> {
        panic!("Solver should not have been called")
    }
}

#[test]
fn up_time_forced_on_at_start() {
    let mut unit = heat_unit("unit", (0.0, 10.0));
    unit.parameters.up_time = 2;
    let mut model = build_model(&[5.0, 5.0, 5.0], vec![unit], Vec::new());
    fix(&mut model, "unit", &[(1, true)]);

    let solution = solve(&model);
    assert_eq!(commitment(&solution, "unit"), [true, true, true]);
}

#[test]
fn up_time_after_switch_on() {
    let mut unit = heat_unit("unit", (0.0, 10.0));
    unit.parameters.up_time = 3;
    unit.costs.standby_cost = Money(1.0);
    let mut model = build_model(&[0.0, 5.0, 0.0, 0.0, 0.0], vec![unit], Vec::new());
    fix(&mut model, "unit", &[(1, false)]);

    let solution = solve(&model);
    assert_eq!(
        commitment(&solution, "unit"),
        [false, true, true, true, false]
    );
}

#[test]
fn down_time_after_switch_off() {
    let mut cheap = heat_unit("cheap", (2.0, 10.0));
    cheap.parameters.down_time = 3;
    let mut boiler = heat_unit("boiler", (0.0, 10.0));
    boiler.parameters.input_max = Flow(20.0);
    let mut model = build_model(&[5.0; 5], vec![cheap, boiler], Vec::new());
    fix(&mut model, "cheap", &[(1, true), (2, false)]);

    let solution = solve(&model);
    assert_eq!(
        commitment(&solution, "cheap"),
        [true, false, false, false, true]
    );
    let boiler = solution.unit_dispatch(&"boiler".into()).unwrap();
    for t in 2..=4 {
        assert_approx_eq!(
            f64,
            boiler[TimeStep(t)].output2.value(),
            5.0,
            epsilon = TOLERANCE
        );
    }
}

#[test]
fn fixed_off_unit_has_no_flows() {
    let chp = ConversionUnit {
        id: "chp".into(),
        description: "CHP".into(),
        sells_output1: true,
        parameters: UnitParameters {
            input_min: Flow(40.0),
            input_max: Flow(100.0),
            output1_min: Flow(15.0),
            output1_max: Flow(40.0),
            output2_min: Flow(20.0),
            output2_max: Flow(45.0),
            up_time: 0,
            down_time: 0,
        },
        costs: UnitCosts {
            standby_cost: Money(0.0),
            start_cost: Money(0.0),
        },
    };
    let mut model = build_model(
        &[30.0, 30.0, 30.0],
        vec![chp, heat_unit("boiler", (0.0, 50.0))],
        Vec::new(),
    );
    model.time_series.spot_price = StepMap::from_fn(&model.time_index, |_| MoneyPerFlow(100.0));
    fix(&mut model, "chp", &[(2, false)]);

    let solution = solve(&model);
    let dispatch = solution.unit_dispatch_at(&"chp".into(), TimeStep(2)).unwrap();
    assert!(!dispatch.on);
    for flow in [dispatch.input, dispatch.output1, dispatch.output2] {
        assert_approx_eq!(f64, flow.value(), 0.0, epsilon = TOLERANCE);
    }

    // Selling power at 100 makes the CHP unit worth running whenever it may
    assert_eq!(commitment(&solution, "chp"), [true, false, true]);
}

#[test]
fn output_coupling_holds_exactly() {
    let chp = ConversionUnit {
        id: "chp".into(),
        description: "CHP".into(),
        sells_output1: true,
        parameters: UnitParameters {
            input_min: Flow(40.0),
            input_max: Flow(100.0),
            output1_min: Flow(15.0),
            output1_max: Flow(40.0),
            output2_min: Flow(20.0),
            output2_max: Flow(45.0),
            up_time: 2,
            down_time: 2,
        },
        costs: UnitCosts {
            standby_cost: Money(5.0),
            start_cost: Money(50.0),
        },
    };
    let mut model = build_model(
        &[30.0, 40.0, 25.0, 10.0],
        vec![chp, heat_unit("boiler", (0.0, 50.0))],
        Vec::new(),
    );
    model.time_series.spot_price = StepMap::from_values(
        &model.time_index,
        vec![
            MoneyPerFlow(10.0),
            MoneyPerFlow(90.0),
            MoneyPerFlow(80.0),
            MoneyPerFlow(5.0),
        ],
    )
    .unwrap();

    let solution = solve(&model);
    // out1 = a * out2 + b * on, with a = 25 / 25 and b = 15 - 20
    // in = a * out1 + b * on, with a = 60 / 25 and b = 40 - 2.4 * 15
    for dispatch in solution.unit_dispatch(&"chp".into()).unwrap().values() {
        let on = if dispatch.on { 1.0 } else { 0.0 };
        assert_approx_eq!(
            f64,
            dispatch.output1.value(),
            dispatch.output2.value() - 5.0 * on,
            epsilon = TOLERANCE
        );
        assert_approx_eq!(
            f64,
            dispatch.input.value(),
            2.4 * dispatch.output1.value() + 4.0 * on,
            epsilon = TOLERANCE
        );
    }
}

#[test]
fn storage_shifts_heat() {
    let unit = heat_unit("unit", (5.0, 5.0));
    let mut model = build_model(
        &[0.0, 0.0, 5.0, 0.0],
        vec![unit],
        vec![storage_unit("store", 10.0, 10.0, 10.0)],
    );
    fix(
        &mut model,
        "unit",
        &[(1, false), (2, true), (3, false), (4, false)],
    );

    let solution = solve(&model);
    let store = solution.storage_state(&"store".into()).unwrap();
    assert_approx_eq!(f64, store[TimeStep(2)].charge.value(), 5.0, epsilon = TOLERANCE);
    assert_approx_eq!(f64, store[TimeStep(2)].capacity.value(), 5.0, epsilon = TOLERANCE);
    assert_approx_eq!(f64, store[TimeStep(3)].discharge.value(), 5.0, epsilon = TOLERANCE);
    for state in store.values() {
        assert!(state.capacity.value() <= 10.0 + TOLERANCE);
    }
    assert_approx_eq!(f64, store[TimeStep(1)].capacity.value(), 0.0, epsilon = TOLERANCE);
    assert_approx_eq!(f64, store[TimeStep(1)].discharge.value(), 0.0, epsilon = TOLERANCE);
}

/// Stored energy may be lost, so forced production beyond the store's capacity is feasible
#[test]
fn storage_balance_is_upper_bound() {
    let unit = heat_unit("unit", (5.0, 5.0));
    let mut model = build_model(
        &[0.0; 4],
        vec![unit],
        vec![storage_unit("store", 10.0, 10.0, 6.0)],
    );
    fix(
        &mut model,
        "unit",
        &[(1, false), (2, true), (3, true), (4, false)],
    );

    let solution = solve(&model);
    let store = solution.storage_state(&"store".into()).unwrap();
    assert_approx_eq!(f64, store[TimeStep(2)].charge.value(), 5.0, epsilon = TOLERANCE);
    assert_approx_eq!(f64, store[TimeStep(3)].charge.value(), 5.0, epsilon = TOLERANCE);
    assert!(store[TimeStep(3)].capacity.value() <= 6.0 + TOLERANCE);
}

#[test]
fn infeasible_reports_time_steps() {
    let model = build_model(
        &[5.0, 20.0, 5.0, 30.0],
        vec![heat_unit("unit", (0.0, 10.0))],
        Vec::new(),
    );

    let err = DispatchRun::new(&model).run().unwrap_err();
    match err.downcast_ref::<ModelError>() {
        Some(ModelError::Infeasible { time_steps }) => {
            assert_eq!(time_steps, &[TimeStep(2), TimeStep(4)]);
        }
        other => panic!("Unexpected error: {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "The solver has indicated that the problem is infeasible. Heat demand could not be \
        balanced at the following time steps: [2, 4]"
    );
}

#[test]
fn invalid_unit_fails_before_solve() {
    let mut unit = heat_unit("unit", (0.0, 10.0));
    unit.parameters.input_min = Flow(20.0);
    let model = build_model(&[5.0], vec![unit], Vec::new());

    let err = DispatchRun::new(&model)
        .run_with(&UnreachableSolver)
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid parameters for unit unit");
    assert_eq!(
        err.root_cause().to_string(),
        "Minimum input (20) is greater than maximum input (10)"
    );
}

#[test]
fn degenerate_unit_has_no_output_coupling() {
    let model = build_model(
        &[5.0, 5.0],
        vec![
            heat_unit("boiler", (0.0, 10.0)),
            heat_unit("fixed", (5.0, 5.0)),
        ],
        Vec::new(),
    );

    let system = SystemModel::build(&model).unwrap();
    let problem = system.problem();
    assert_eq!(problem.rows_of_kind(ConstraintKind::OutputCoupling).count(), 0);

    // Only the boiler, with a non-degenerate heat range, has an input coupling
    let owners: IndexMap<_, usize> = problem
        .rows_of_kind(ConstraintKind::InputCoupling)
        .fold(IndexMap::new(), |mut counts, row| {
            *counts.entry(row.key.owner.clone()).or_default() += 1;
            counts
        });
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[&ConstraintOwner::Unit("boiler".into())], 2);
}
