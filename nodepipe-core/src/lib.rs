//! Node Pipeline Core - line-oriented image processing engine
//!
//! A pipeline definition names one operation (node) per line:
//!
//! ```text
//! node=greyscale
//! node=crop origin=10x20 size=300x200
//! node=noise noiseValue=0.1
//! node=vignette
//! ```
//!
//! [`Pipeline::parse`] turns the text into operations and
//! [`PipelineExecutor`] folds an [`Image`] through them in order.

pub mod config;
pub mod hashing;
pub mod operation;
pub mod parser;
pub mod pipeline;
pub mod pixel_ops;
pub mod raster;
pub mod report;

pub use config::{Config, ParserOptions, RunOptions, UnknownKeywordPolicy};
pub use hashing::{canonical_json, compute_pipeline_hash, sha256_hex};
pub use operation::{Operation, OperationError};
pub use parser::{ParseError, ParseErrorKind};
pub use pipeline::{Execution, Pipeline, PipelineError, PipelineExecutor};
pub use raster::Image;
pub use report::{Artifact, RunReport, StepReport};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
