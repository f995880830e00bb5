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

//! Probe results and the end-of-run validation report.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::contract::TensorContract;
use crate::probe::ProbeKind;

/// Index of the greatest value; ties resolve to the lowest index.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// The `k` highest entries as `(class index, score)`, best first. Equal
/// scores keep ascending index order.
pub fn top_k(values: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    indexed.truncate(k);
    indexed
}

/// One successful evaluation of the artifact against one probe. The raw
/// output is always the decoded floating-point vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub predicted_class: usize,
    pub confidence: f32,
    pub raw_output: Vec<f32>,
}

impl ProbeResult {
    /// Builds a result from a decoded output vector. Empty outputs carry
    /// no prediction and are rejected.
    pub fn from_output(raw_output: Vec<f32>) -> Option<Self> {
        let predicted_class = argmax(&raw_output)?;
        let confidence = raw_output[predicted_class];
        Some(Self {
            predicted_class,
            confidence,
            raw_output,
        })
    }
}

/// Per-probe outcome. A failed probe never aborts the battery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProbeOutcome {
    Completed(ProbeResult),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeRecord {
    pub label: String,
    pub kind: ProbeKind,
    pub outcome: ProbeOutcome,
}

impl ProbeRecord {
    pub fn result(&self) -> Option<&ProbeResult> {
        match &self.outcome {
            ProbeOutcome::Completed(r) => Some(r),
            ProbeOutcome::Failed { .. } => None,
        }
    }
}

/// Non-fatal findings. Every warning is informational: the run's verdict
/// only tracks fatal errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ValidationWarning {
    ClassCountMismatch {
        output_width: usize,
        expected: usize,
    },
    LabelCountMismatch {
        output_width: usize,
        labels: usize,
    },
    LowPredictionDiversity {
        unique: usize,
        completed: usize,
    },
    ConfidenceSumDeviation {
        probe: String,
        sum: f32,
    },
    InputSizeMismatch {
        height: usize,
        width: usize,
        expected_height: usize,
        expected_width: usize,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClassCountMismatch {
                output_width,
                expected,
            } => write!(
                f,
                "model outputs {output_width} classes, expected {expected}"
            ),
            Self::LabelCountMismatch {
                output_width,
                labels,
            } => write!(
                f,
                "label file has {labels} entries, model outputs {output_width} classes"
            ),
            Self::LowPredictionDiversity { unique, completed } => write!(
                f,
                "all {completed} probes predicted the same class ({unique} unique); \
                 the model may have degenerate weights"
            ),
            Self::ConfidenceSumDeviation { probe, sum } => write!(
                f,
                "output does not sum to 1 (got {sum:.4} on probe \"{probe}\"); \
                 final layer may not be a normalized classifier"
            ),
            Self::InputSizeMismatch {
                height,
                width,
                expected_height,
                expected_width,
            } => write!(
                f,
                "input size {height}x{width} does not match the expected \
                 {expected_height}x{expected_width}"
            ),
        }
    }
}

/// Aggregate of one validation run: every probe outcome, the contracts the
/// artifact declared, and the collected warnings.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub input: TensorContract,
    pub output: TensorContract,
    pub expected_class_count: usize,
    pub records: Vec<ProbeRecord>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    /// Distinct predicted classes across the completed probes.
    pub fn unique_prediction_count(&self) -> usize {
        self.records
            .iter()
            .filter_map(|r| r.result().map(|p| p.predicted_class))
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn class_count_match(&self) -> bool {
        self.output.output_width() == self.expected_class_count
    }

    pub fn completed(&self) -> usize {
        self.records.iter().filter(|r| r.result().is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ElementType;

    fn report_with_predictions(classes: &[usize], width: usize, expected: usize) -> ValidationReport {
        let records = classes
            .iter()
            .map(|&c| {
                let mut raw = vec![0.0_f32; width];
                raw[c] = 1.0;
                ProbeRecord {
                    label: format!("probe {c}"),
                    kind: ProbeKind::UniformRandom,
                    outcome: ProbeOutcome::Completed(ProbeResult::from_output(raw).unwrap()),
                }
            })
            .collect();
        ValidationReport {
            input: TensorContract::new("in", vec![1, 224, 224, 3], ElementType::Float32, None)
                .unwrap(),
            output: TensorContract::new("out", vec![1, width], ElementType::Float32, None)
                .unwrap(),
            expected_class_count: expected,
            records,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn argmax_breaks_ties_toward_the_lowest_index() {
        for _ in 0..10 {
            assert_eq!(argmax(&[0.1, 0.9, 0.9, 0.2]), Some(1));
            assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        }
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[0.0, 0.0, 1.0]), Some(2));
    }

    #[test]
    fn top_k_orders_best_first() {
        let scores = [0.1, 0.6, 0.05, 0.25];
        assert_eq!(top_k(&scores, 3), vec![(1, 0.6), (3, 0.25), (0, 0.1)]);
        assert_eq!(top_k(&scores, 10).len(), 4);
    }

    #[test]
    fn probe_result_records_argmax_and_confidence() {
        let r = ProbeResult::from_output(vec![0.2, 0.7, 0.1]).unwrap();
        assert_eq!(r.predicted_class, 1);
        assert_eq!(r.confidence, 0.7);
        assert!(ProbeResult::from_output(Vec::new()).is_none());
    }

    #[test]
    fn unique_predictions_ignore_failed_probes() {
        let mut report = report_with_predictions(&[3, 3, 7, 3, 7], 10, 10);
        report.records.push(ProbeRecord {
            label: "broken".into(),
            kind: ProbeKind::ConstantZero,
            outcome: ProbeOutcome::Failed {
                error: "interpreter execution failed".into(),
            },
        });
        assert_eq!(report.unique_prediction_count(), 2);
        assert_eq!(report.completed(), 5);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn class_count_warning_states_both_numbers() {
        let w = ValidationWarning::LabelCountMismatch {
            output_width: 39,
            labels: 38,
        };
        let text = w.to_string();
        assert!(text.contains("38"));
        assert!(text.contains("39"));

        let report = report_with_predictions(&[0], 39, 38);
        assert!(!report.class_count_match());
    }
}
