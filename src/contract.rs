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

//! Tensor endpoint contracts as declared by the artifact package.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage type of one tensor endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    Int8,
    Float32,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int8 => write!(f, "int8"),
            Self::Float32 => write!(f, "float32"),
        }
    }
}

/// Affine quantization parameters of a fixed-point tensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantization {
    pub scale: f32,
    pub zero_point: i32,
}

impl Quantization {
    /// Decodes one raw fixed-point value to real units.
    pub fn dequantize_one(&self, raw: i8) -> f32 {
        (raw as f32 - self.zero_point as f32) * self.scale
    }

    /// Decodes a raw fixed-point tensor to real units.
    pub fn dequantize(&self, raw: &[i8]) -> Vec<f32> {
        raw.iter().map(|&v| self.dequantize_one(v)).collect()
    }
}

/// Declared shape, element type and quantization of one input or output
/// endpoint. Quantization parameters are present exactly when the element
/// type is fixed-point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorContract {
    pub name: String,
    pub shape: Vec<usize>,
    pub element_type: ElementType,
    pub quantization: Option<Quantization>,
}

impl TensorContract {
    pub fn new(
        name: impl Into<String>,
        shape: Vec<usize>,
        element_type: ElementType,
        quantization: Option<Quantization>,
    ) -> Result<Self, String> {
        match (element_type, quantization.is_some()) {
            (ElementType::Int8, false) => {
                return Err("fixed-point tensor is missing quantization parameters".into())
            }
            (ElementType::Float32, true) => {
                return Err("floating-point tensor carries quantization parameters".into())
            }
            _ => {}
        }
        Ok(Self {
            name: name.into(),
            shape,
            element_type,
            quantization,
        })
    }

    /// Number of elements one conforming tensor holds.
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Width of a classifier output: the extent of the last dimension.
    pub fn output_width(&self) -> usize {
        self.shape.last().copied().unwrap_or(0)
    }

    /// True for the NHWC single-image layout the probe battery can render
    /// solid-color pictures for.
    pub fn is_rgb_image(&self) -> bool {
        self.shape.len() == 4
            && self.shape[3] == 3
            && self.shape[1] >= 1
            && self.shape[2] >= 1
    }

    /// Height and width of an image-shaped input.
    pub fn image_size(&self) -> Option<(usize, usize)> {
        if self.shape.len() == 4 {
            Some((self.shape[1], self.shape[2]))
        } else {
            None
        }
    }

    /// Decodes a raw output vector to floating point. Fixed-point storage
    /// goes through the declared affine parameters, floating point passes
    /// through unchanged.
    pub fn decode(&self, raw: RawValues<'_>) -> Vec<f32> {
        match (raw, self.quantization) {
            (RawValues::Int8(v), Some(q)) => q.dequantize(v),
            (RawValues::Int8(v), None) => v.iter().map(|&x| x as f32).collect(),
            (RawValues::Float32(v), _) => v.to_vec(),
        }
    }
}

/// Borrowed view over a raw output tensor, before decoding.
#[derive(Debug, Clone, Copy)]
pub enum RawValues<'a> {
    Int8(&'a [i8]),
    Float32(&'a [f32]),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dequantize_matches_hand_computed_values() {
        // Parameters observed on the quantized PlantVillage export.
        let q = Quantization {
            scale: 0.00390625,
            zero_point: -128,
        };
        assert_eq!(q.dequantize_one(-128), 0.0);
        assert_eq!(q.dequantize_one(127), 255.0 * 0.00390625);
        assert_eq!(q.dequantize_one(0), 128.0 * 0.00390625);

        let q = Quantization {
            scale: 0.5,
            zero_point: 3,
        };
        assert_eq!(q.dequantize(&[3, 5, 1]), vec![0.0, 1.0, -1.0]);
    }

    #[test]
    fn quantization_present_iff_fixed_point() {
        assert!(TensorContract::new("t", vec![1, 4], ElementType::Int8, None).is_err());
        assert!(TensorContract::new(
            "t",
            vec![1, 4],
            ElementType::Float32,
            Some(Quantization {
                scale: 1.0,
                zero_point: 0
            })
        )
        .is_err());
        assert!(TensorContract::new("t", vec![1, 4], ElementType::Float32, None).is_ok());
    }

    #[test]
    fn decode_is_identity_for_float_outputs() {
        let c = TensorContract::new("out", vec![1, 3], ElementType::Float32, None).unwrap();
        assert_eq!(
            c.decode(RawValues::Float32(&[0.1, 0.7, 0.2])),
            vec![0.1, 0.7, 0.2]
        );
    }

    #[test]
    fn decode_applies_declared_parameters() {
        let c = TensorContract::new(
            "out",
            vec![1, 3],
            ElementType::Int8,
            Some(Quantization {
                scale: 0.25,
                zero_point: -2,
            }),
        )
        .unwrap();
        assert_eq!(
            c.decode(RawValues::Int8(&[-2, 2, 6])),
            vec![0.0, 1.0, 2.0]
        );
    }

    #[test]
    fn image_layout_detection() {
        let img = TensorContract::new("in", vec![1, 224, 224, 3], ElementType::Float32, None)
            .unwrap();
        assert!(img.is_rgb_image());
        assert_eq!(img.image_size(), Some((224, 224)));
        assert_eq!(img.element_count(), 224 * 224 * 3);

        let flat = TensorContract::new("in", vec![1, 784], ElementType::Float32, None).unwrap();
        assert!(!flat.is_rgb_image());
        assert_eq!(flat.image_size(), None);
    }
}
