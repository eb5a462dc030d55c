//! Sampler runs on the dense engine.

use std::sync::Arc;

use ddsim_adapter_dense::DenseSimulator;
use ddsim_hal::ErrorKind;
use ddsim_ir::{Circuit, ClbitId, QubitId};
use ddsim_primitives::{BindingsArray, Sampler, SamplerOptions, SamplerPub};
use serde_json::json;

const PARAMS_A: [f64; 6] = [0.0, 1.0, 1.0, 2.0, 3.0, 5.0];
const PARAMS_B: [f64; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

/// Outcome probabilities of RealAmplitudes(2, reps=2), indexed by the
/// outcome's integer value.
const PROBS_A: [f64; 4] = [
    0.13092484629757767,
    0.3608720796028449,
    0.09324865232050059,
    0.414954421779077,
];
const PROBS_B: [f64; 4] = [
    0.06282290651933871,
    0.02877144385576705,
    0.6066544941320852,
    0.3017511554928095,
];

const KEYS: [&str; 4] = ["00", "01", "10", "11"];

fn sampler(seed: i64) -> Sampler {
    Sampler::with_options(
        Arc::new(DenseSimulator::new()),
        SamplerOptions {
            seed,
            ..SamplerOptions::default()
        },
    )
}

fn measured_real_amplitudes() -> Circuit {
    let mut circuit = Circuit::real_amplitudes(2, 2).unwrap();
    circuit.measure_all().unwrap();
    circuit
}

fn assert_distribution(counts: &ddsim_hal::Counts, expected: &[f64; 4], tolerance: f64) {
    let total = counts.total_shots() as f64;
    for (key, p) in KEYS.iter().zip(expected) {
        let freq = counts.get(key) as f64 / total;
        assert!(
            (freq - p).abs() < tolerance,
            "{key}: sampled {freq}, expected {p}"
        );
    }
}

#[test]
fn test_scalar_pub_counts_sum_to_shots() {
    let result = sampler(11)
        .run([Circuit::ghz(3).unwrap()], Some(500))
        .result()
        .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.metadata["version"], json!(2));

    let bits = result[0].data.get("c").unwrap();
    assert_eq!(bits.shape(), &[] as &[usize]);
    assert_eq!(bits.num_shots(), 500);
    assert_eq!(bits.num_bits(), 3);
    let counts = bits.get_counts();
    assert_eq!(counts.total_shots(), 500);
    assert_eq!(counts.get("000") + counts.get("111"), 500);
    assert_eq!(result[0].metadata["shots"], json!(500));
}

#[test]
fn test_real_amplitudes_distribution() {
    let pub_ = SamplerPub::from((measured_real_amplitudes(), PARAMS_A.to_vec(), 65536));
    let result = sampler(5).run([pub_], None).result().unwrap();
    let counts = result[0].data.get("meas").unwrap().get_counts();
    assert_eq!(counts.total_shots(), 65536);
    assert_distribution(&counts, &PROBS_A, 0.01);
}

#[test]
fn test_leading_axis_follows_bindings() {
    let bindings = BindingsArray::from_rows(vec![PARAMS_A.to_vec(), PARAMS_B.to_vec()]).unwrap();
    let result = sampler(8)
        .run([(measured_real_amplitudes(), bindings)], Some(40000))
        .result()
        .unwrap();

    let bits = result[0].data.get("meas").unwrap();
    assert_eq!(bits.shape(), &[2]);
    assert_eq!(result[0].data.shape(), &[2]);
    assert_distribution(&bits.get(0).unwrap().get_counts(), &PROBS_A, 0.015);
    assert_distribution(&bits.get(1).unwrap().get_counts(), &PROBS_B, 0.015);
}

#[test]
fn test_seeded_runs_are_identical() {
    let run = || {
        sampler(1234)
            .run(
                [SamplerPub::from((
                    measured_real_amplitudes(),
                    PARAMS_B.to_vec(),
                    300,
                ))],
                None,
            )
            .result()
            .unwrap()
    };
    let (a, b) = (run(), run());
    assert_eq!(a[0].data, b[0].data);
}

#[test]
fn test_registers_split_independently() {
    let mut circuit = Circuit::new("split");
    let p = circuit.add_qreg("p", 2).unwrap();
    let q = circuit.add_qreg("q", 2).unwrap();
    let b = circuit.add_creg("b", 2).unwrap();
    let c = circuit.add_creg("c", 2).unwrap();
    circuit.x(p[0]).unwrap().x(p[1]).unwrap();
    for i in 0..2 {
        circuit.measure(p[i], b[i]).unwrap();
        circuit.measure(q[i], c[i]).unwrap();
    }

    let result = sampler(-1).run([circuit], Some(65536)).result().unwrap();
    let data = &result[0].data;
    assert_eq!(data.names().collect::<Vec<_>>(), vec!["b", "c"]);
    assert_eq!(data.get("b").unwrap().get_counts().get("11"), 65536);
    assert_eq!(data.get("c").unwrap().get_counts().get("00"), 65536);
}

#[test]
fn test_overlapping_registers_share_bits() {
    let mut circuit = Circuit::with_size("alias", 3, 3);
    circuit.x(QubitId(1)).unwrap();
    for i in 0..3 {
        circuit.measure(QubitId(i), ClbitId(i)).unwrap();
    }
    circuit.add_creg_alias("upper", 1, 2).unwrap();

    let result = sampler(2).run([circuit], Some(16)).result().unwrap();
    let data = &result[0].data;
    assert_eq!(data.get("c").unwrap().get_counts().get("010"), 16);
    assert_eq!(data.get("upper").unwrap().get_counts().get("01"), 16);
}

#[test]
fn test_shots_precedence() {
    let bell = Circuit::bell().unwrap();
    let pubs = vec![
        SamplerPub::from(bell.clone()),
        SamplerPub::from((bell.clone(), Vec::<f64>::new(), 7)),
    ];

    let result = sampler(3).run(pubs.clone(), Some(20)).result().unwrap();
    assert_eq!(result[0].data.get("c").unwrap().num_shots(), 20);
    assert_eq!(result[1].data.get("c").unwrap().num_shots(), 7);

    let result = sampler(3).run(pubs, None).result().unwrap();
    assert_eq!(result[0].data.get("c").unwrap().num_shots(), 1024);
    assert_eq!(result[1].metadata["shots"], json!(7));
}

#[test]
fn test_zero_run_shots_unused_when_pubs_set_their_own() {
    let bell = Circuit::bell().unwrap();
    let pubs = vec![
        SamplerPub::from((bell.clone(), Vec::<f64>::new(), 5)),
        SamplerPub::from((bell.clone(), Vec::<f64>::new(), 9)),
    ];
    let result = sampler(3).run(pubs, Some(0)).result().unwrap();
    assert_eq!(result[0].data.get("c").unwrap().num_shots(), 5);
    assert_eq!(result[1].data.get("c").unwrap().num_shots(), 9);

    let err = sampler(3)
        .run(
            [
                SamplerPub::from((bell.clone(), Vec::<f64>::new(), 5)),
                SamplerPub::from(bell),
            ],
            Some(0),
        )
        .result()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_unmeasured_register_reads_zero() {
    let mut circuit = Circuit::with_size("unmeasured", 1, 3);
    circuit.x(QubitId(0)).unwrap();
    let result = sampler(6).run([circuit], Some(10)).result().unwrap();
    let counts = result[0].data.get("c").unwrap().get_counts();
    assert_eq!(counts.get("000"), 10);

    let mut narrow = Circuit::with_size("narrow", 2, 1);
    narrow.x(QubitId(1)).unwrap();
    let result = sampler(6).run([narrow], Some(10)).result().unwrap();
    assert_eq!(result[0].data.get("c").unwrap().get_counts().get("0"), 10);
}

#[test]
fn test_circuit_metadata_is_reported() {
    let mut bell = Circuit::bell().unwrap();
    bell.metadata_mut().insert("experiment".into(), json!("e1"));
    let result = sampler(3).run([bell], Some(4)).result().unwrap();
    assert_eq!(
        result[0].metadata["circuit_metadata"],
        json!({"experiment": "e1"})
    );
}

#[test]
fn test_parameter_count_mismatch_is_a_validation_error() {
    let pub_ = SamplerPub::from((measured_real_amplitudes(), vec![0.0, 1.0]));
    let err = sampler(1).run([pub_], None).result().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_non_integer_seed_is_rejected() {
    let err = Sampler::from_value(Arc::new(DenseSimulator::new()), json!({"seed": 0.5}))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let sampler = Sampler::from_value(Arc::new(DenseSimulator::new()), json!({"seed": 9})).unwrap();
    assert_eq!(sampler.options().seed, 9);
}
