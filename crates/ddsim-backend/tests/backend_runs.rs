//! End-to-end runs of every backend variant on the dense engine.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::Arc;

use ddsim_adapter_dense::DenseSimulator;
use ddsim_backend::{RunnerKind, SimulatorBackend};
use ddsim_hal::{ErrorKind, JobStatus, RunOptions};
use ddsim_ir::{Circuit, ClbitId, ParameterExpression, QubitId};
use num_complex::Complex64;
use proptest::prelude::*;
use serde_json::json;

fn backend(kind: RunnerKind) -> SimulatorBackend {
    SimulatorBackend::new(kind, Arc::new(DenseSimulator::new()))
}

#[test]
fn test_qasm_batch_keeps_submission_order() {
    let backend = backend(RunnerKind::QasmSimulator);
    let circuits = vec![Circuit::bell().unwrap(), Circuit::ghz(3).unwrap()];
    let job = backend.run(circuits, RunOptions::new().with_shots(256).with_seed(3));
    assert_eq!(job.status(), JobStatus::Completed);
    let job_id = job.id();

    let result = job.result().unwrap();
    assert_eq!(result.backend_name, "qasm_simulator");
    assert_eq!(result.job_id, job_id);
    assert!(result.success);
    assert_eq!(result.results.len(), 2);
    assert_eq!(result.results[0].header.name, "bell");
    assert_eq!(result.results[1].header.n_qubits, 3);

    let ghz = result.results[1].binary_counts().unwrap();
    assert_eq!(ghz.get("000") + ghz.get("111"), 256);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let backend = backend(RunnerKind::StochasticDdSimulator);
    let options = RunOptions::new().with_shots(300).with_seed(21);
    let a = backend
        .run(vec![Circuit::ghz(3).unwrap()], options.clone())
        .result()
        .unwrap();
    let b = backend
        .run(vec![Circuit::ghz(3).unwrap()], options)
        .result()
        .unwrap();
    assert_eq!(a.results[0].data.counts, b.results[0].data.counts);
    assert_eq!(a.results[0].seed, 21);
}

#[test]
fn test_unitary_backend_modes_agree() {
    let backend = backend(RunnerKind::UnitarySimulator);
    let mut circuit = Circuit::with_size("qft2", 2, 2);
    circuit
        .h(QubitId(1))
        .unwrap()
        .cp(std::f64::consts::FRAC_PI_2, QubitId(0), QubitId(1))
        .unwrap()
        .h(QubitId(0))
        .unwrap()
        .swap(QubitId(0), QubitId(1))
        .unwrap()
        .rx(0.4, QubitId(0))
        .unwrap();
    circuit.measure(QubitId(0), ClbitId(0)).unwrap();

    let run = |mode: &str| {
        backend
            .run(vec![circuit.clone()], RunOptions::new().with_mode(mode))
            .result()
            .unwrap()
            .results
            .remove(0)
    };
    let sequential = run("sequential");
    let recursive = run("recursive");
    let (a, b) = (
        sequential.data.unitary.unwrap(),
        recursive.data.unitary.unwrap(),
    );
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).norm() < 1e-12);
    }
    assert_eq!(sequential.data.dd_nodes, recursive.data.dd_nodes);

    // unitarity: U^† U = I
    let product = a.t().mapv(|z: Complex64| z.conj()).dot(&a);
    for ((i, j), z) in product.indexed_iter() {
        let expected = if i == j { 1.0 } else { 0.0 };
        assert!((z - Complex64::new(expected, 0.0)).norm() < 1e-12);
    }
}

#[test]
fn test_batch_aborts_on_first_failure() {
    let backend = backend(RunnerKind::UnitarySimulator);
    let mut dynamic = Circuit::with_size("dyn", 1, 1);
    dynamic.measure(QubitId(0), ClbitId(0)).unwrap();
    dynamic.x(QubitId(0)).unwrap();

    let job = backend.run(
        vec![Circuit::with_size("ok", 1, 0), dynamic],
        RunOptions::new(),
    );
    let err = job.result().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

fn rotation(name: &str) -> Circuit {
    let mut circuit = Circuit::with_size(name, 1, 1);
    circuit
        .rx(ParameterExpression::symbol("θ"), QubitId(0))
        .unwrap();
    circuit.measure(QubitId(0), ClbitId(0)).unwrap();
    circuit
}

fn binds(values: &[f64]) -> BTreeMap<String, Vec<f64>> {
    BTreeMap::from([("θ".to_string(), values.to_vec())])
}

#[test]
fn test_parameter_binds_expand_each_circuit() {
    let backend = backend(RunnerKind::QasmSimulator);
    let options = RunOptions::new()
        .with_shots(32)
        .with_seed(5)
        .with_parameter_binds(vec![binds(&[0.0, PI]), binds(&[PI])]);
    let result = backend
        .run(vec![rotation("a"), rotation("b")], options)
        .result()
        .unwrap();

    let names: Vec<_> = result.results.iter().map(|r| r.header.name.as_str()).collect();
    assert_eq!(names, ["a", "a", "b"]);
    let ones: Vec<_> = result
        .results
        .iter()
        .map(|r| r.binary_counts().unwrap().get("1"))
        .collect();
    assert_eq!(ones, [0, 32, 32]);
}

#[test]
fn test_parameter_binds_reach_unitary_runner() {
    let backend = backend(RunnerKind::UnitarySimulator);
    let options = RunOptions::new().with_parameter_binds(vec![binds(&[PI])]);
    let result = backend.run(vec![rotation("x")], options).result().unwrap();
    let unitary = result.results[0].data.unitary.as_ref().unwrap();
    assert!(unitary[[0, 0]].norm() < 1e-12);
    assert!((unitary[[1, 0]] - Complex64::new(0.0, -1.0)).norm() < 1e-12);
}

#[test]
fn test_malformed_parameter_binds_are_rejected() {
    let backend = backend(RunnerKind::QasmSimulator);
    let cases = [
        vec![binds(&[0.0])],
        vec![binds(&[0.0]), binds(&[])],
        vec![
            binds(&[0.0]),
            BTreeMap::from([("φ".to_string(), vec![1.0])]),
        ],
    ];
    for case in cases {
        let err = backend
            .run(
                vec![rotation("a"), rotation("b")],
                RunOptions::new().with_parameter_binds(case),
            )
            .result()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    // unbound circuits without binds are still invalid
    let err = backend
        .run(vec![rotation("a")], RunOptions::new())
        .result()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_options_from_json() {
    let backend = backend(RunnerKind::QasmSimulator);
    let job = backend
        .run_with_value(vec![Circuit::bell().unwrap()], json!({"shots": 10, "seed": 4}))
        .unwrap();
    assert_eq!(job.result().unwrap().results[0].shots, 10);

    let err = backend
        .run_with_value(vec![Circuit::bell().unwrap()], json!({"seed": 1.5}))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = backend
        .run_with_value(vec![Circuit::bell().unwrap()], json!({"shot": 10}))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_backend_result_serializes() {
    let backend = backend(RunnerKind::QasmSimulator);
    let result = backend
        .run(vec![Circuit::bell().unwrap()], RunOptions::new().with_shots(8))
        .result()
        .unwrap();
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["backend_name"], json!("qasm_simulator"));
    assert_eq!(value["results"][0]["shots"], json!(8));
    assert_eq!(value["results"][0]["seed"], json!(-1));
}

#[derive(Debug, Clone)]
enum Step {
    H(u32),
    Rx(u32, f64),
    Cx(u32, u32),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u32..3).prop_map(Step::H),
        (0u32..3, -PI..PI).prop_map(|(q, a)| Step::Rx(q, a)),
        (0u32..3, 1u32..3).prop_map(|(c, d)| Step::Cx(c, (c + d) % 3)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_unitary_modes_agree(steps in proptest::collection::vec(step(), 1..12)) {
        let mut circuit = Circuit::with_size("random", 3, 0);
        for s in &steps {
            let applied = match *s {
                Step::H(q) => circuit.h(QubitId(q)).map(|_| ()),
                Step::Rx(q, a) => circuit.rx(a, QubitId(q)).map(|_| ()),
                Step::Cx(c, t) => circuit.cx(QubitId(c), QubitId(t)).map(|_| ()),
            };
            applied.unwrap();
        }

        let backend = backend(RunnerKind::UnitarySimulator);
        let run = |mode: &str| {
            backend
                .run(vec![circuit.clone()], RunOptions::new().with_mode(mode))
                .result()
                .unwrap()
                .results
                .remove(0)
                .data
                .unitary
                .unwrap()
        };
        let (a, b) = (run("sequential"), run("recursive"));
        for (x, y) in a.iter().zip(b.iter()) {
            prop_assert!((x - y).norm() < 1e-10);
        }
    }

    #[test]
    fn prop_seeded_batches_are_order_stable(seed in 0i64..1000, n in 1usize..4) {
        let backend = backend(RunnerKind::QasmSimulator);
        let circuits: Vec<Circuit> = (0..n).map(|k| Circuit::ghz(k as u32 + 1).unwrap()).collect();
        let options = RunOptions::new().with_shots(64).with_seed(seed);
        let a = backend.run(circuits.clone(), options.clone()).result().unwrap();
        let b = backend.run(circuits, options).result().unwrap();
        prop_assert_eq!(a.results.len(), n);
        for (k, (x, y)) in a.results.iter().zip(&b.results).enumerate() {
            prop_assert_eq!(x.header.n_qubits, k + 1);
            prop_assert_eq!(&x.data.counts, &y.data.counts);
        }
    }
}
