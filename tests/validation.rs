// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! End-to-end validation flow over a stand-in interpreter.

use std::collections::BTreeSet;

use tflite_check::{
    ClassLabelSet, ElementType, InferenceError, Probe, ProbeConfig, ProbeData, ProbeKind,
    TensorContract, Validator, ValidatorConfig,
};

fn softmax(scores: &[f32]) -> Vec<f32> {
    let total: f32 = scores.iter().map(|s| s.exp()).sum();
    scores.iter().map(|s| s.exp() / total).collect()
}

/// Stand-in classifier: the hot class follows the probe's mean intensity,
/// through a softmax head.
fn classifier_stub(width: usize) -> impl FnMut(&Probe) -> Result<Vec<f32>, InferenceError> {
    move |probe: &Probe| {
        let mean = match &probe.data {
            ProbeData::Float32(v) => v.iter().sum::<f32>() / v.len() as f32,
            ProbeData::Int8(v) => {
                v.iter().map(|&x| x as f32 + 128.0).sum::<f32>() / (255.0 * v.len() as f32)
            }
        };
        let mut scores = vec![0.0_f32; width];
        let hot = ((mean * width as f32) as usize).min(width - 1);
        scores[hot] = 4.0;
        Ok(softmax(&scores))
    }
}

fn plant_labels() -> ClassLabelSet {
    ClassLabelSet::new((0..38).map(|i| format!("class_{i}")).collect())
}

#[test]
fn black_and_white_probes_produce_well_formed_results() {
    let validator = Validator::new(ValidatorConfig {
        probe: ProbeConfig {
            random_probes: 0,
            ..Default::default()
        },
        ..Default::default()
    });
    let input =
        TensorContract::new("input", vec![1, 224, 224, 3], ElementType::Float32, None).unwrap();
    let output = TensorContract::new("output", vec![1, 38], ElementType::Float32, None).unwrap();

    let report = validator
        .validate_with(input, output, &plant_labels(), Vec::new(), classifier_stub(38))
        .unwrap();

    // black, white, and the two solid-color probes
    assert_eq!(report.records.len(), 4);

    let constants: Vec<_> = report
        .records
        .iter()
        .filter(|r| matches!(r.kind, ProbeKind::ConstantZero | ProbeKind::ConstantMax))
        .collect();
    assert_eq!(constants.len(), 2);
    for record in &constants {
        let result = record.result().expect("constant probe completed");
        assert!((0.0..=1.0).contains(&result.confidence), "{}", record.label);
        assert_eq!(result.raw_output.len(), 38);
    }

    // The derived count matches the predictions actually recorded.
    let distinct: BTreeSet<usize> = report
        .records
        .iter()
        .filter_map(|r| r.result().map(|p| p.predicted_class))
        .collect();
    assert_eq!(report.unique_prediction_count(), distinct.len());
    assert!(report.unique_prediction_count() >= 2);

    // A softmax head within tolerance never trips the sum heuristic.
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn quantized_contract_flows_through_the_same_pipeline() {
    use tflite_check::Quantization;

    let validator = Validator::new(ValidatorConfig::default());
    let input = TensorContract::new(
        "input",
        vec![1, 224, 224, 3],
        ElementType::Int8,
        Some(Quantization {
            scale: 1.0 / 255.0,
            zero_point: -128,
        }),
    )
    .unwrap();
    let output = TensorContract::new("output", vec![1, 38], ElementType::Float32, None).unwrap();

    let report = validator
        .validate_with(input, output, &plant_labels(), Vec::new(), classifier_stub(38))
        .unwrap();

    assert_eq!(report.records.len(), 9);
    assert_eq!(report.completed(), 9);
    assert!(report.unique_prediction_count() >= 2);
}

#[test]
fn report_serializes_for_machine_consumption() {
    let validator = Validator::new(ValidatorConfig::default());
    let input =
        TensorContract::new("input", vec![1, 224, 224, 3], ElementType::Float32, None).unwrap();
    let output = TensorContract::new("output", vec![1, 39], ElementType::Float32, None).unwrap();

    let report = validator
        .validate_with(input, output, &plant_labels(), Vec::new(), classifier_stub(39))
        .unwrap();

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("ClassCountMismatch"));
    assert!(json.contains("\"expected_class_count\":38"));
}
