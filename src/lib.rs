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

//! Health validation for packaged TFLite classifiers.
//!
//! Load an artifact, discover its tensor contract, feed it a battery of
//! synthetic probes and score the outcome: `load → contract → probes →
//! run → score → report`, strictly linear, no state kept across runs.

pub mod artifact;
pub mod config;
pub mod contract;
pub mod error;
pub mod labels;
pub mod probe;
pub mod report;
pub mod validate;

pub use artifact::Artifact;
pub use config::{ConfigError, ValidatorConfig};
pub use contract::{ElementType, Quantization, RawValues, TensorContract};
pub use error::{ArtifactError, InferenceError, ProbeError};
pub use labels::ClassLabelSet;
pub use probe::{Probe, ProbeBattery, ProbeConfig, ProbeData, ProbeKind};
pub use report::{
    argmax, top_k, ProbeOutcome, ProbeRecord, ProbeResult, ValidationReport, ValidationWarning,
};
pub use validate::Validator;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
