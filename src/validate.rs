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

//! Inference validator.
//!
//! Drives the probe battery through the artifact, records per-probe
//! outcomes (a failed probe never aborts the run) and scores the completed
//! results against the health heuristics.

use crate::artifact::Artifact;
use crate::config::ValidatorConfig;
use crate::contract::TensorContract;
use crate::error::{InferenceError, ProbeError};
use crate::labels::ClassLabelSet;
use crate::probe::{Probe, ProbeBattery};
use crate::report::{
    ProbeOutcome, ProbeRecord, ProbeResult, ValidationReport, ValidationWarning,
};

/// Tolerance for the confidence-sum heuristic on a normalized classifier
/// head.
const SUM_TOLERANCE: f32 = 1e-3;

pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Runs the full battery against a loaded artifact, appending any
    /// caller-supplied extra probes (e.g. decoded image files).
    pub fn validate(
        &self,
        artifact: &Artifact,
        labels: &ClassLabelSet,
        extra_probes: Vec<Probe>,
    ) -> Result<ValidationReport, ProbeError> {
        self.validate_with(
            artifact.input().clone(),
            artifact.output().clone(),
            labels,
            extra_probes,
            |probe| artifact.run(probe),
        )
    }

    /// Same flow with the interpreter behind a closure. This is the seam
    /// the tests drive with constructed outputs.
    pub fn validate_with<F>(
        &self,
        input: TensorContract,
        output: TensorContract,
        labels: &ClassLabelSet,
        extra_probes: Vec<Probe>,
        mut infer: F,
    ) -> Result<ValidationReport, ProbeError>
    where
        F: FnMut(&Probe) -> Result<Vec<f32>, InferenceError>,
    {
        let battery = ProbeBattery::new(&input, &self.config.probe)?;

        let mut records = Vec::new();
        for probe in battery.chain(extra_probes) {
            let outcome = match infer(&probe) {
                Ok(raw) => match ProbeResult::from_output(raw) {
                    Some(result) => ProbeOutcome::Completed(result),
                    None => ProbeOutcome::Failed {
                        error: "empty output tensor".into(),
                    },
                },
                Err(err) => ProbeOutcome::Failed {
                    error: err.to_string(),
                },
            };
            records.push(ProbeRecord {
                label: probe.label.clone(),
                kind: probe.kind,
                outcome,
            });
        }

        let mut report = ValidationReport {
            input,
            output,
            expected_class_count: self.config.expected_class_count,
            records,
            warnings: Vec::new(),
        };
        report.warnings = self.score(&report, labels);
        Ok(report)
    }

    /// Health heuristics. Each finding is independent and none is fatal.
    fn score(&self, report: &ValidationReport, labels: &ClassLabelSet) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let width = report.output.output_width();

        if width != self.config.expected_class_count {
            warnings.push(ValidationWarning::ClassCountMismatch {
                output_width: width,
                expected: self.config.expected_class_count,
            });
        }
        if width != labels.len() {
            warnings.push(ValidationWarning::LabelCountMismatch {
                output_width: width,
                labels: labels.len(),
            });
        }

        // A single completed probe says nothing about diversity.
        let completed = report.completed();
        let unique = report.unique_prediction_count();
        if completed >= 2 && unique <= 1 {
            warnings.push(ValidationWarning::LowPredictionDiversity { unique, completed });
        }

        // One warning naming the worst-deviating probe; a non-softmax head
        // deviates on every probe.
        let mut worst: Option<(&str, f32, f32)> = None;
        for record in &report.records {
            if let Some(result) = record.result() {
                let sum: f32 = result.raw_output.iter().sum();
                let deviation = (sum - 1.0).abs();
                if deviation > SUM_TOLERANCE && worst.map_or(true, |(_, _, w)| deviation > w) {
                    worst = Some((&record.label, sum, deviation));
                }
            }
        }
        if let Some((probe, sum, _)) = worst {
            warnings.push(ValidationWarning::ConfidenceSumDeviation {
                probe: probe.to_string(),
                sum,
            });
        }

        if let Some((height, width)) = report.input.image_size() {
            if height != self.config.expected_input_height
                || width != self.config.expected_input_width
            {
                warnings.push(ValidationWarning::InputSizeMismatch {
                    height,
                    width,
                    expected_height: self.config.expected_input_height,
                    expected_width: self.config.expected_input_width,
                });
            }
        }

        warnings
    }
}
