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

//! Artifact loader and interpreter handle.
//!
//! Opens a packaged `.tflite` classifier, reads the declared tensor table
//! into [`TensorContract`]s (the computation graph is never re-derived for
//! that) and prepares the runnable plan used to execute probes. The handle
//! owns the plan for the duration of one validation run.

use std::fs;
use std::path::{Path, PathBuf};

use tract_core::framework::Framework;
use tract_core::prelude::*;
use tract_tflite::tflite;
use tract_tflite::Tflite;

use crate::contract::{ElementType, Quantization, RawValues, TensorContract};
use crate::error::{ArtifactError, InferenceError};
use crate::probe::{Probe, ProbeData};

pub struct Artifact {
    plan: TypedRunnableModel<TypedModel>,
    input: TensorContract,
    output: TensorContract,
    path: PathBuf,
    size_bytes: u64,
}

impl Artifact {
    /// Opens the package at `path` and prepares it for probing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ArtifactError::NotFound(path.to_path_buf()));
        }
        let size_bytes = fs::metadata(path)?.len();

        let framework = Tflite::default();
        let mut file = fs::File::open(path)?;
        let proto = framework
            .proto_model_for_read(&mut file)
            .map_err(|e| ArtifactError::Malformed(format!("unreadable package: {e}")))?;

        let (input, output) = declared_contracts(proto.root())?;

        let model = framework
            .model_for_proto_model(&proto)
            .map_err(|e| ArtifactError::Malformed(format!("graph translation failed: {e}")))?;
        let plan = model
            .into_optimized()
            .and_then(|m| m.into_runnable())
            .map_err(|e| ArtifactError::Malformed(format!("cannot prepare interpreter: {e}")))?;

        Ok(Self {
            plan,
            input,
            output,
            path: path.to_path_buf(),
            size_bytes,
        })
    }

    pub fn input(&self) -> &TensorContract {
        &self.input
    }

    pub fn output(&self) -> &TensorContract {
        &self.output
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Executes one probe and decodes the output to floating point.
    pub fn run(&self, probe: &Probe) -> Result<Vec<f32>, InferenceError> {
        let input = self.input_tensor(probe)?;
        let mut outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::Execution(e.to_string()))?;
        if outputs.is_empty() {
            return Err(InferenceError::Decode("interpreter returned no tensor".into()));
        }
        let output = outputs.remove(0).into_tensor();
        self.decode_output(output)
    }

    fn input_tensor(&self, probe: &Probe) -> Result<Tensor, InferenceError> {
        if probe.shape != self.input.shape {
            return Err(InferenceError::ShapeMismatch {
                expected: self.input.shape.clone(),
                got: probe.shape.clone(),
            });
        }

        let fact = self
            .plan
            .model()
            .input_fact(0)
            .map_err(|e| InferenceError::Execution(e.to_string()))?;
        let expected_dt = fact.datum_type;

        let mut tensor = match &probe.data {
            ProbeData::Float32(values) => Tensor::from_shape(&probe.shape, values),
            ProbeData::Int8(values) => Tensor::from_shape(&probe.shape, values),
        }
        .map_err(|e| InferenceError::Execution(e.to_string()))?;

        if tensor.datum_type() != expected_dt {
            if tensor.datum_type().unquantized() != expected_dt.unquantized() {
                return Err(InferenceError::TypeMismatch {
                    expected: format!("{expected_dt:?}"),
                    got: format!("{:?}", tensor.datum_type()),
                });
            }
            // Same storage width; stamp the interpreter's quantized type
            // onto the raw values.
            unsafe { tensor.set_datum_type(expected_dt) };
        }
        Ok(tensor)
    }

    fn decode_output(&self, tensor: Tensor) -> Result<Vec<f32>, InferenceError> {
        match self.output.element_type {
            ElementType::Float32 => {
                if tensor.datum_type() != DatumType::F32 {
                    return Err(InferenceError::TypeMismatch {
                        expected: "F32".into(),
                        got: format!("{:?}", tensor.datum_type()),
                    });
                }
                let values = tensor
                    .as_slice::<f32>()
                    .map_err(|e| InferenceError::Decode(e.to_string()))?;
                Ok(self.output.decode(RawValues::Float32(values)))
            }
            ElementType::Int8 => {
                if tensor.datum_type().unquantized() != DatumType::I8 {
                    return Err(InferenceError::TypeMismatch {
                        expected: "I8".into(),
                        got: format!("{:?}", tensor.datum_type()),
                    });
                }
                let mut tensor = tensor;
                unsafe { tensor.set_datum_type(DatumType::I8) };
                let raw = tensor
                    .as_slice::<i8>()
                    .map_err(|e| InferenceError::Decode(e.to_string()))?;
                Ok(self.output.decode(RawValues::Int8(raw)))
            }
        }
    }
}

/// Reads both endpoint contracts from the package's declared tensor table.
fn declared_contracts(
    root: tflite::Model<'_>,
) -> Result<(TensorContract, TensorContract), ArtifactError> {
    let subgraphs = root
        .subgraphs()
        .ok_or_else(|| ArtifactError::Malformed("package declares no subgraph".into()))?;
    if subgraphs.len() == 0 {
        return Err(ArtifactError::Malformed("package declares no subgraph".into()));
    }
    let graph = subgraphs.get(0);
    let tensors = graph
        .tensors()
        .ok_or_else(|| ArtifactError::Malformed("subgraph declares no tensor table".into()))?;

    let input_ix = graph
        .inputs()
        .filter(|v| v.len() > 0)
        .map(|v| v.get(0))
        .ok_or_else(|| ArtifactError::Malformed("subgraph declares no input tensor".into()))?;
    let output_ix = graph
        .outputs()
        .filter(|v| v.len() > 0)
        .map(|v| v.get(0))
        .ok_or_else(|| ArtifactError::Malformed("subgraph declares no output tensor".into()))?;
    if input_ix < 0
        || output_ix < 0
        || input_ix as usize >= tensors.len()
        || output_ix as usize >= tensors.len()
    {
        return Err(ArtifactError::Malformed(
            "endpoint index outside the tensor table".into(),
        ));
    }

    let input = declared_contract(tensors.get(input_ix as usize))?;
    let output = declared_contract(tensors.get(output_ix as usize))?;
    Ok((input, output))
}

/// Contract of one declared tensor. Shapes may carry -1 for dynamic
/// extents; those are recorded as 0 and rejected later by the probe
/// generator.
fn declared_contract(tensor: tflite::Tensor<'_>) -> Result<TensorContract, ArtifactError> {
    let name = tensor.name().unwrap_or_default().to_string();
    let shape: Vec<usize> = tensor
        .shape()
        .map(|dims| dims.iter().map(|d| d.max(0) as usize).collect())
        .unwrap_or_default();

    let element_type = if tensor.type_() == tflite::TensorType::FLOAT32 {
        ElementType::Float32
    } else if tensor.type_() == tflite::TensorType::INT8 {
        ElementType::Int8
    } else {
        return Err(ArtifactError::UnsupportedElementType(format!(
            "{:?}",
            tensor.type_()
        )));
    };

    let quantization = match element_type {
        ElementType::Float32 => None,
        ElementType::Int8 => Some(declared_quantization(&tensor)?),
    };

    TensorContract::new(name, shape, element_type, quantization)
        .map_err(ArtifactError::Malformed)
}

fn declared_quantization(tensor: &tflite::Tensor<'_>) -> Result<Quantization, ArtifactError> {
    let missing = || {
        ArtifactError::Malformed(format!(
            "fixed-point tensor \"{}\" declares no quantization parameters",
            tensor.name().unwrap_or_default()
        ))
    };
    let params = tensor.quantization().ok_or_else(missing)?;
    let scale = params
        .scale()
        .filter(|v| v.len() > 0)
        .map(|v| v.get(0))
        .ok_or_else(missing)?;
    let zero_point = params
        .zero_point()
        .filter(|v| v.len() > 0)
        .map(|v| v.get(0) as i32)
        .unwrap_or(0);
    Ok(Quantization { scale, zero_point })
}
