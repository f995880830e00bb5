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

//! Synthetic probe battery.
//!
//! Generates input tensors conforming to the artifact's input contract:
//! constant black/white, solid colors for image-shaped inputs, and a seeded
//! run of uniform-random tensors. Every probe is reproducible from the
//! configured seed.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::contract::{ElementType, TensorContract};
use crate::error::ProbeError;

/// Solid colors probed on image-shaped inputs, in 8-bit RGB terms. Black
/// and white are already covered by the constant probes.
const SOLID_COLORS: [(&str, [u8; 3]); 2] = [
    ("mid-gray (128,128,128)", [128, 128, 128]),
    ("leaf-green (50,200,50)", [50, 200, 50]),
];

/// Probe generation settings. The normalization divisor is the externally
/// supplied preprocessing convention for floating-point inputs; it is
/// never inferred from the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_random_probes")]
    pub random_probes: usize,
    #[serde(default = "default_divisor")]
    pub normalize_divisor: f32,
}

fn default_seed() -> u64 {
    42
}

fn default_random_probes() -> usize {
    5
}

fn default_divisor() -> f32 {
    255.0
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            random_probes: default_random_probes(),
            normalize_divisor: default_divisor(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProbeKind {
    ConstantZero,
    ConstantMax,
    SolidColor,
    UniformRandom,
    Image,
}

/// Element data of one probe, matching the contract's storage type.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeData {
    Float32(Vec<f32>),
    Int8(Vec<i8>),
}

impl ProbeData {
    pub fn len(&self) -> usize {
        match self {
            Self::Float32(v) => v.len(),
            Self::Int8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One input tensor ready to hand to the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
    pub label: String,
    pub kind: ProbeKind,
    pub shape: Vec<usize>,
    pub data: ProbeData,
}

impl Probe {
    /// Decodes an image file into a probe: resized to the contract's
    /// height/width and converted to its element type under the
    /// configured normalization convention.
    pub fn from_image_file(
        path: impl AsRef<Path>,
        contract: &TensorContract,
        config: &ProbeConfig,
    ) -> Result<Self, ProbeError> {
        check_shape(contract)?;
        if !contract.is_rgb_image() {
            return Err(ProbeError::UnsupportedShape {
                shape: contract.shape.clone(),
                reason: "image probes need a 3-channel image-shaped input".into(),
            });
        }
        let (height, width) = contract.image_size().unwrap_or((0, 0));
        let img = image::open(path.as_ref())?
            .resize_exact(width as u32, height as u32, image::imageops::FilterType::Triangle)
            .to_rgb8();
        let bytes = img.into_raw();
        let data = match contract.element_type {
            ElementType::Float32 => ProbeData::Float32(
                bytes
                    .iter()
                    .map(|&b| b as f32 / config.normalize_divisor)
                    .collect(),
            ),
            ElementType::Int8 => {
                ProbeData::Int8(bytes.iter().map(|&b| (b as i16 - 128) as i8).collect())
            }
        };
        Ok(Self {
            label: format!("image {}", path.as_ref().display()),
            kind: ProbeKind::Image,
            shape: contract.shape.clone(),
            data,
        })
    }
}

#[derive(Debug, Clone)]
enum Step {
    Zero,
    Max,
    Solid(&'static str, [u8; 3]),
    Random(usize),
}

/// Lazy, finite battery of synthetic probes for one input contract.
pub struct ProbeBattery {
    contract: TensorContract,
    divisor: f32,
    rng: StdRng,
    steps: Vec<Step>,
    cursor: usize,
}

impl ProbeBattery {
    pub fn new(contract: &TensorContract, config: &ProbeConfig) -> Result<Self, ProbeError> {
        check_shape(contract)?;

        let mut steps = vec![Step::Zero, Step::Max];
        if contract.is_rgb_image() {
            for (name, rgb) in SOLID_COLORS {
                steps.push(Step::Solid(name, rgb));
            }
        }
        for i in 1..=config.random_probes {
            steps.push(Step::Random(i));
        }

        Ok(Self {
            contract: contract.clone(),
            divisor: config.normalize_divisor,
            rng: StdRng::seed_from_u64(config.seed),
            steps,
            cursor: 0,
        })
    }

    fn constant(&self, label: &str, kind: ProbeKind, f: f32, i: i8) -> Probe {
        let n = self.contract.element_count();
        let data = match self.contract.element_type {
            ElementType::Float32 => ProbeData::Float32(vec![f; n]),
            ElementType::Int8 => ProbeData::Int8(vec![i; n]),
        };
        Probe {
            label: label.to_string(),
            kind,
            shape: self.contract.shape.clone(),
            data,
        }
    }

    fn solid(&self, name: &str, rgb: [u8; 3]) -> Probe {
        let n = self.contract.element_count();
        // NHWC layout: the channel is the fastest-varying index.
        let data = match self.contract.element_type {
            ElementType::Float32 => ProbeData::Float32(
                (0..n).map(|i| rgb[i % 3] as f32 / self.divisor).collect(),
            ),
            ElementType::Int8 => {
                ProbeData::Int8((0..n).map(|i| (rgb[i % 3] as i16 - 128) as i8).collect())
            }
        };
        Probe {
            label: format!("solid {name}"),
            kind: ProbeKind::SolidColor,
            shape: self.contract.shape.clone(),
            data,
        }
    }

    fn random(&mut self, index: usize) -> Probe {
        let n = self.contract.element_count();
        let data = match self.contract.element_type {
            ElementType::Float32 => {
                ProbeData::Float32((0..n).map(|_| self.rng.random::<f32>()).collect())
            }
            ElementType::Int8 => ProbeData::Int8(
                (0..n)
                    .map(|_| self.rng.random_range(i8::MIN..=i8::MAX))
                    .collect(),
            ),
        };
        Probe {
            label: format!("uniform random #{index}"),
            kind: ProbeKind::UniformRandom,
            shape: self.contract.shape.clone(),
            data,
        }
    }
}

impl Iterator for ProbeBattery {
    type Item = Probe;

    fn next(&mut self) -> Option<Probe> {
        let step = self.steps.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(match step {
            Step::Zero => self.constant("constant zero (solid black)", ProbeKind::ConstantZero, 0.0, 0),
            Step::Max => self.constant("constant max (solid white)", ProbeKind::ConstantMax, 1.0, i8::MAX),
            Step::Solid(name, rgb) => self.solid(name, rgb),
            Step::Random(i) => self.random(i),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.steps.len() - self.cursor;
        (left, Some(left))
    }
}

impl ExactSizeIterator for ProbeBattery {}

fn check_shape(contract: &TensorContract) -> Result<(), ProbeError> {
    if contract.shape.len() < 2 {
        return Err(ProbeError::UnsupportedShape {
            shape: contract.shape.clone(),
            reason: "fewer than 2 dimensions".into(),
        });
    }
    if contract.shape.iter().any(|&d| d == 0) {
        return Err(ProbeError::UnsupportedShape {
            shape: contract.shape.clone(),
            reason: "non-positive extent".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Quantization;

    fn image_contract() -> TensorContract {
        TensorContract::new("in", vec![1, 224, 224, 3], ElementType::Float32, None).unwrap()
    }

    fn quantized_contract() -> TensorContract {
        TensorContract::new(
            "in",
            vec![1, 96, 96, 3],
            ElementType::Int8,
            Some(Quantization {
                scale: 0.007843,
                zero_point: -1,
            }),
        )
        .unwrap()
    }

    fn collect(contract: &TensorContract, config: &ProbeConfig) -> Vec<Probe> {
        ProbeBattery::new(contract, config).unwrap().collect()
    }

    #[test]
    fn probes_conform_to_contract_shape() {
        let contract = image_contract();
        let probes = collect(&contract, &ProbeConfig::default());
        // black, white, two solid colors, five random
        assert_eq!(probes.len(), 9);
        for p in &probes {
            assert_eq!(p.shape, contract.shape);
            assert_eq!(p.data.len(), contract.element_count());
        }
    }

    #[test]
    fn flat_inputs_skip_solid_colors() {
        let contract = TensorContract::new("in", vec![1, 784], ElementType::Float32, None).unwrap();
        let probes = collect(&contract, &ProbeConfig::default());
        assert_eq!(probes.len(), 7);
        assert!(probes.iter().all(|p| p.kind != ProbeKind::SolidColor));
    }

    #[test]
    fn rejects_unprobeable_shapes() {
        let rank1 = TensorContract::new("in", vec![10], ElementType::Float32, None).unwrap();
        assert!(matches!(
            ProbeBattery::new(&rank1, &ProbeConfig::default()),
            Err(ProbeError::UnsupportedShape { .. })
        ));

        let hollow =
            TensorContract::new("in", vec![1, 0, 224, 3], ElementType::Float32, None).unwrap();
        assert!(matches!(
            ProbeBattery::new(&hollow, &ProbeConfig::default()),
            Err(ProbeError::UnsupportedShape { .. })
        ));
    }

    #[test]
    fn same_seed_reproduces_the_battery() {
        let contract = image_contract();
        let config = ProbeConfig {
            seed: 7,
            ..Default::default()
        };
        let a = collect(&contract, &config);
        let b = collect(&contract, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn float_probes_stay_normalized() {
        let probes = collect(&image_contract(), &ProbeConfig::default());
        for p in probes {
            let ProbeData::Float32(values) = p.data else {
                panic!("expected float probes");
            };
            assert!(values.iter().all(|v| (0.0..=1.0).contains(v)), "{}", p.label);
        }
    }

    #[test]
    fn constant_probes_use_the_fixed_point_storage_type() {
        let probes = collect(&quantized_contract(), &ProbeConfig::default());
        let ProbeData::Int8(zeros) = &probes[0].data else {
            panic!("expected int8 probes");
        };
        assert!(zeros.iter().all(|&v| v == 0));
        let ProbeData::Int8(max) = &probes[1].data else {
            panic!("expected int8 probes");
        };
        assert!(max.iter().all(|&v| v == i8::MAX));
    }

    #[test]
    fn solid_green_repeats_the_channel_pattern() {
        let probes = collect(&image_contract(), &ProbeConfig::default());
        let green = probes
            .iter()
            .find(|p| p.label.contains("leaf-green"))
            .unwrap();
        let ProbeData::Float32(values) = &green.data else {
            panic!("expected float probes");
        };
        assert_eq!(values[0], 50.0 / 255.0);
        assert_eq!(values[1], 200.0 / 255.0);
        assert_eq!(values[2], 50.0 / 255.0);
        assert_eq!(values[3], 50.0 / 255.0);

        let quantized = collect(&quantized_contract(), &ProbeConfig::default());
        let green = quantized
            .iter()
            .find(|p| p.label.contains("leaf-green"))
            .unwrap();
        let ProbeData::Int8(values) = &green.data else {
            panic!("expected int8 probes");
        };
        assert_eq!(&values[..3], &[-78, 72, -78]);
    }
}
