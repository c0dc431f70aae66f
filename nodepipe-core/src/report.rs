//! Execution Report - what a single run did, step by step

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub engine_version: String,
    pub pipeline_hash: String,
    pub input_size: [u32; 2],
    pub steps: Vec<StepReport>,
}

impl RunReport {
    /// Dimensions after the last step, or of the input for an empty pipeline
    pub fn output_size(&self) -> [u32; 2] {
        self.steps
            .last()
            .map_or(self.input_size, |step| step.output_size)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    /// 1-based position in the pipeline
    pub step: usize,
    pub name: String,
    pub params: String,
    pub input_size: [u32; 2],
    pub output_size: [u32; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

/// An intermediate image written to disk after a step
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub path: PathBuf,
    pub bytes: u64,
    pub hash: String,
}

impl Artifact {
    /// Size in decimal megabytes
    pub fn megabytes(&self) -> f64 {
        self.bytes as f64 / 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_megabytes_are_decimal() {
        let artifact = Artifact {
            path: PathBuf::from("output1.png"),
            bytes: 1_234_567,
            hash: String::new(),
        };
        assert_eq!(format!("{:.3}", artifact.megabytes()), "1.235");
    }
}
