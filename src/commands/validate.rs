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

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use tflite_check::report::top_k;
use tflite_check::{
    Artifact, ClassLabelSet, Probe, ProbeRecord, ValidationReport, Validator, ValidatorConfig,
};

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

#[derive(Parser, Debug)]
pub struct Args {
    /// The path of the packaged .tflite classifier
    #[arg(short, long)]
    model: Option<PathBuf>,
    /// Line-delimited class label file, one label per line
    #[arg(short, long)]
    labels: Option<PathBuf>,
    /// JSON config file; flags override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Class count the model is supposed to expose
    #[arg(long)]
    expected_classes: Option<usize>,
    /// Expected square input size, e.g. 224
    #[arg(long)]
    expected_size: Option<usize>,
    /// Seed for the uniform-random probes
    #[arg(long)]
    seed: Option<u64>,
    /// Number of uniform-random probes
    #[arg(long)]
    random_probes: Option<usize>,
    /// Extra probe from an image file, resized to the model input; can be
    /// multiple
    #[arg(short, long)]
    image: Vec<PathBuf>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

pub fn execute(args: &Args) -> anyhow::Result<()> {
    let config = resolve_config(args)?;
    anyhow::ensure!(
        !config.artifact_path.as_os_str().is_empty(),
        "no model artifact given; pass --model or set artifact_path in the config file"
    );

    let artifact = Artifact::load(&config.artifact_path)
        .with_context(|| format!("cannot load model {}", config.artifact_path.display()))?;

    let label_path = config.label_path.clone().context(
        "no label file given; pass --labels or set label_path in the config file",
    )?;
    let labels = ClassLabelSet::from_file(&label_path)
        .with_context(|| format!("cannot read labels from {}", label_path.display()))?;

    let extra_probes = args
        .image
        .iter()
        .map(|path| {
            Probe::from_image_file(path, artifact.input(), &config.probe)
                .with_context(|| format!("cannot build a probe from {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let validator = Validator::new(config);
    let report = validator.validate(&artifact, &labels, extra_probes)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_report(&artifact, &labels, &report);
    Ok(())
}

fn resolve_config(args: &Args) -> anyhow::Result<ValidatorConfig> {
    let mut config = match &args.config {
        Some(path) => ValidatorConfig::from_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => ValidatorConfig::default(),
    };
    if let Some(model) = &args.model {
        config.artifact_path = model.clone();
    }
    if let Some(labels) = &args.labels {
        config.label_path = Some(labels.clone());
    }
    if let Some(n) = args.expected_classes {
        config.expected_class_count = n;
    }
    if let Some(size) = args.expected_size {
        config.expected_input_height = size;
        config.expected_input_width = size;
    }
    if let Some(seed) = args.seed {
        config.probe.seed = seed;
    }
    if let Some(n) = args.random_probes {
        config.probe.random_probes = n;
    }
    Ok(config)
}

fn print_report(artifact: &Artifact, labels: &ClassLabelSet, report: &ValidationReport) {
    println!("{RULE}");
    println!("Validating {}", artifact.path().display());
    println!("{RULE}");
    super::print_contract("INPUT", &report.input);
    super::print_contract("OUTPUT", &report.output);
    println!("Labels: {} classes", labels.len());

    println!();
    println!("PROBES");
    println!("{THIN_RULE}");
    for (i, record) in report.records.iter().enumerate() {
        print_record(i + 1, record, labels);
    }

    println!();
    println!("SUMMARY");
    println!("{THIN_RULE}");
    println!(
        "   probes completed: {}/{}",
        report.completed(),
        report.records.len()
    );
    println!("   unique predictions: {}", report.unique_prediction_count());
    if report.warnings.is_empty() {
        println!("   no warnings");
    } else {
        println!("   warnings: {}", report.warnings.len());
        for warning in &report.warnings {
            println!("   - {warning}");
        }
    }
    println!("{RULE}");
    println!("VERDICT: PASS ({} warnings)", report.warnings.len());
}

fn print_record(index: usize, record: &ProbeRecord, labels: &ClassLabelSet) {
    match record.result() {
        Some(result) => {
            println!(
                "{index}. {}: class {} ({}), confidence {:.2}%",
                record.label,
                result.predicted_class,
                labels.name_or_unknown(result.predicted_class),
                result.confidence * 100.0
            );
            for (class, score) in top_k(&result.raw_output, 3) {
                println!(
                    "      {}: {:.2}%",
                    labels.name_or_unknown(class),
                    score * 100.0
                );
            }
        }
        None => {
            if let tflite_check::ProbeOutcome::Failed { error } = &record.outcome {
                println!("{index}. {}: FAILED ({error})", record.label);
            }
        }
    }
}
