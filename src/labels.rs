//! Class label sets, loaded independently of the artifact.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Ordered, 0-indexed class names from a line-delimited label file. The
/// set carries no enforced relationship to the artifact's output width;
/// disagreement is reported by the validator, not rejected here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabelSet {
    labels: Vec<String>,
}

impl ClassLabelSet {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Reads one label per line, index given by line number. Lines are
    /// stripped of surrounding whitespace; blank trailing lines are
    /// dropped.
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut labels: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
        while labels.last().is_some_and(|l| l.is_empty()) {
            labels.pop();
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Label for a predicted index, or a placeholder when the artifact
    /// predicts outside the set.
    pub fn name_or_unknown(&self, index: usize) -> &str {
        self.get(index).unwrap_or("UNKNOWN")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
