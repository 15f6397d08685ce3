//! Frame-level sample index and windowed two-stream dataset for
//! face-manipulation video corpora.
//!
//! This crate provides utilities for:
//! - Deterministic per-video frame selection
//! - Building, freezing and persisting the per-split file list
//! - Windowed face/flow retrieval with normalization
//! - Parallel batch iteration (Burn tensors behind `burn-runtime`)
//! - Split statistics and validation

pub mod aug;
pub mod batch;
pub mod dataset;
pub mod file_list;
pub mod select;
pub mod types;
pub mod validation;

pub use aug::{
    CenterCrop, FnTransform, ImageTransform, NormalizedFrame, Resize, TransformConfig,
    TransformPipeline, TransformPipelineBuilder, NORMALIZE_MEAN, NORMALIZE_STD,
};
pub use batch::{BatchConfig, BatchIter, SequenceBatch};
pub use dataset::{DefaultLoader, ImageLoader, WindowedDataset};
pub use file_list::{FileList, FileListBuilder};
pub use select::{min_sequence_length, select_frames, SamplesPerVideo};
pub use types::*;
pub use validation::{summarize, validate_file_list};

#[cfg(feature = "burn-runtime")]
pub use batch::BurnBatch;
