//! Pipeline Executor - runs an ordered list of operations over one image
//!
//! Strictly sequential: step N's output is step N+1's input. The executor
//! owns the image and lends it to one operation at a time. Any failure
//! aborts the run; nothing is retried or rolled back.

use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{ParserOptions, RunOptions};
use crate::hashing::{compute_pipeline_hash, sha256_hex};
use crate::operation::{Operation, OperationError};
use crate::parser::{parse_operations, ParseError};
use crate::raster::{artifact_path, Image};
use crate::report::{Artifact, RunReport, StepReport};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Step {step} ({operation}) failed: {source}")]
    Step {
        step: usize,
        operation: &'static str,
        #[source]
        source: OperationError,
    },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Step {step}: could not save to {}: {source}", .path.display())]
    SaveIntermediate {
        step: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Step {step}: could not write {}: {source}", .path.display())]
    Artifact {
        step: usize,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An ordered, possibly empty, sequence of operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    operations: Vec<Operation>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a pipeline definition, one operation per line
    pub fn parse(text: &str, options: ParserOptions) -> Result<Self, ParseError> {
        Ok(Self {
            operations: parse_operations(text, options)?,
        })
    }

    pub fn from_file(path: &Path, options: ParserOptions) -> Result<Self, PipelineError> {
        let text = fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text, options)?)
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl From<Vec<Operation>> for Pipeline {
    fn from(operations: Vec<Operation>) -> Self {
        Self { operations }
    }
}

/// The definition text, one canonical line per operation
impl Display for Pipeline {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for op in &self.operations {
            writeln!(f, "{}", op)?;
        }
        Ok(())
    }
}

/// The final image of a run together with what happened along the way
#[derive(Debug)]
pub struct Execution {
    pub image: Image,
    pub report: RunReport,
}

pub struct PipelineExecutor {
    options: RunOptions,
}

impl PipelineExecutor {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// Run `pipeline` over `image` with a non-deterministic random source
    pub fn run(&self, image: Image, pipeline: &Pipeline) -> Result<Image, PipelineError> {
        Ok(self.run_with_rng(image, pipeline, &mut rand::thread_rng())?.image)
    }

    /// Run `pipeline` over `image`, drawing any randomness from `rng`.
    ///
    /// An empty pipeline returns the input unchanged.
    pub fn run_with_rng<R: Rng>(
        &self,
        mut image: Image,
        pipeline: &Pipeline,
        rng: &mut R,
    ) -> Result<Execution, PipelineError> {
        let mut report = RunReport {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            pipeline_hash: compute_pipeline_hash(pipeline)?,
            input_size: image.size(),
            steps: vec![],
        };

        if self.options.logging {
            info!(
                "Running {} step(s) on a {} image (pipeline {})",
                pipeline.len(),
                image,
                &report.pipeline_hash[..12]
            );
        }

        for (idx, op) in pipeline.operations().iter().enumerate() {
            let step = idx + 1;
            let input_size = image.size();

            if self.options.logging {
                info!("[{}] {} {} input={}", step, op.name(), op.other_info(), image);
            }

            op.apply(&mut image, rng)
                .map_err(|source| PipelineError::Step {
                    step,
                    operation: op.name(),
                    source,
                })?;

            if self.options.logging {
                info!("[{}] output={}", step, image);
            }

            let artifact = if self.options.save_intermediate {
                let artifact = self.save_intermediate(step, &image)?;
                if self.options.logging {
                    info!(
                        "[{}] saved {} ({:.3} MB)",
                        step,
                        artifact.path.display(),
                        artifact.megabytes()
                    );
                }
                Some(artifact)
            } else {
                None
            };

            report.steps.push(StepReport {
                step,
                name: op.name().to_string(),
                params: op.other_info(),
                input_size,
                output_size: image.size(),
                artifact,
            });
        }

        Ok(Execution { image, report })
    }

    /// Write `<save_directory>/output<step>.png`, creating the directory if needed
    fn save_intermediate(&self, step: usize, image: &Image) -> Result<Artifact, PipelineError> {
        let dir = &self.options.save_directory;
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|source| PipelineError::SaveIntermediate {
                step,
                path: dir.clone(),
                source,
            })?;
            debug!("Created {}", dir.display());
        }

        let path = artifact_path(dir, &format!("output{}", step));
        image
            .save(&path)
            .map_err(|source| PipelineError::Artifact {
                step,
                path: path.clone(),
                source,
            })?;

        let data = fs::read(&path).map_err(|source| PipelineError::SaveIntermediate {
            step,
            path: path.clone(),
            source,
        })?;

        Ok(Artifact {
            bytes: data.len() as u64,
            hash: sha256_hex(&data),
            path,
        })
    }
}

impl Default for PipelineExecutor {
    fn default() -> Self {
        Self::new(RunOptions::default())
    }
}
