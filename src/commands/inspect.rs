use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;

use tflite_check::{Artifact, ClassLabelSet};

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// The path of the packaged .tflite classifier
    #[arg(short, long)]
    model: PathBuf,
    /// Optional label file to preview against the model
    #[arg(short, long)]
    labels: Option<PathBuf>,
}

pub fn execute(args: &Args) -> Result<()> {
    let artifact = Artifact::load(&args.model)
        .with_context(|| format!("cannot load model {}", args.model.display()))?;

    println!("Model: {}", artifact.path().display());
    println!(
        "Size: {:.2} MB",
        artifact.size_bytes() as f64 / (1024.0 * 1024.0)
    );
    super::print_contract("INPUT", artifact.input());
    super::print_contract("OUTPUT", artifact.output());

    if let Some(path) = &args.labels {
        let labels = ClassLabelSet::from_file(path)
            .with_context(|| format!("cannot read labels from {}", path.display()))?;
        println!("Labels: {} classes", labels.len());
        preview(&labels);
        let width = artifact.output().output_width();
        if labels.len() != width {
            println!(
                "WARNING: label file has {} entries, model outputs {} classes",
                labels.len(),
                width
            );
        }
    }
    Ok(())
}

fn preview(labels: &ClassLabelSet) {
    let n = labels.len();
    for i in 0..n.min(5) {
        println!("   {i}: {}", labels.name_or_unknown(i));
    }
    if n > 10 {
        println!("   ...");
    }
    for i in n.saturating_sub(5).max(n.min(5))..n {
        println!("   {i}: {}", labels.name_or_unknown(i));
    }
}
