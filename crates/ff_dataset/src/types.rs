//! Core types, error definitions, and data structures for ff_dataset.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, FileListError>;

#[derive(Debug, Error)]
pub enum FileListError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json parse error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("unknown label `{label}` (known classes: {known:?})")]
    UnknownLabel { label: String, known: Vec<String> },
    #[error("duplicate class name `{0}`")]
    DuplicateClass(String),
    #[error("index {index} out of range for {split} split with {len} positions")]
    IndexOutOfRange {
        split: Split,
        index: usize,
        len: usize,
    },
    #[error(
        "window [{window_start}, {anchor}] in {split} split spans videos {first_video} and {last_video}"
    )]
    WindowCrossesVideoBoundary {
        split: Split,
        anchor: usize,
        window_start: usize,
        first_video: usize,
        last_video: usize,
    },
    #[error("window of length {sequence_length} ending at {anchor} starts before the first frame of the {split} split")]
    WindowUnderflow {
        split: Split,
        anchor: usize,
        sequence_length: usize,
    },
    #[error("path {path} is not under root {root}")]
    PathOutsideRoot { path: PathBuf, root: PathBuf },
    #[error("length mismatch: {face} face frames, {flow} flow frames")]
    LengthMismatch { face: usize, flow: usize },
    #[error("selected position {position} outside video of {frames} frames")]
    PositionOutOfVideo { position: usize, frames: usize },
    #[error("frame {path} is {found:?} after transforms, expected {expected:?}")]
    InconsistentFrameSize {
        path: PathBuf,
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("validation failed: {msg}")]
    Validation { msg: String },
    #[error("{0}")]
    Other(String),
}

/// Disjoint partition of the indexed videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Val, Split::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = FileListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(Split::Train),
            "val" | "validation" => Ok(Split::Val),
            "test" => Ok(Split::Test),
            other => Err(FileListError::Other(format!("unknown split `{other}`"))),
        }
    }
}

/// One retained frame: path relative to the index root plus its class id.
///
/// Persisted as a two-element array `[path, label]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, usize)", into = "(String, usize)")]
pub struct FrameRecord {
    pub path: String,
    pub label: usize,
}

impl From<(String, usize)> for FrameRecord {
    fn from((path, label): (String, usize)) -> Self {
        Self { path, label }
    }
}

impl From<FrameRecord> for (String, usize) {
    fn from(record: FrameRecord) -> Self {
        (record.path, record.label)
    }
}

/// Per-split backing lists of a file list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSamples {
    pub face_samples: Vec<FrameRecord>,
    pub flow_samples: Vec<FrameRecord>,
    /// Offsets into the sample lists that may end a window.
    pub valid_positions: Vec<usize>,
    /// Start offset of every video block, ascending. Empty means unknown,
    /// in which case the whole split counts as one block.
    #[serde(default)]
    pub video_offsets: Vec<usize>,
}

impl SplitSamples {
    pub fn len(&self) -> usize {
        self.face_samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.face_samples.is_empty()
    }

    pub fn video_count(&self) -> usize {
        if self.video_offsets.is_empty() {
            usize::from(!self.is_empty())
        } else {
            self.video_offsets.len()
        }
    }

    /// Index of the video block containing `position`.
    pub fn video_of(&self, position: usize) -> usize {
        self.video_offsets
            .partition_point(|&start| start <= position)
            .saturating_sub(1)
    }

    /// First position of the video block containing `position`.
    pub fn video_start(&self, position: usize) -> usize {
        if self.video_offsets.is_empty() {
            return 0;
        }
        self.video_offsets[self.video_of(position)]
    }

    /// Half-open range of positions of video block `video`.
    pub fn video_range(&self, video: usize) -> std::ops::Range<usize> {
        if self.video_offsets.is_empty() {
            return 0..self.len();
        }
        let start = self.video_offsets[video];
        let end = self
            .video_offsets
            .get(video + 1)
            .copied()
            .unwrap_or_else(|| self.len());
        start..end
    }
}

/// The three per-split collections, persisted as `{"train": .., "val": .., "test": ..}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitTable {
    pub train: SplitSamples,
    pub val: SplitSamples,
    pub test: SplitSamples,
}

impl SplitTable {
    pub fn get(&self, split: Split) -> &SplitSamples {
        match split {
            Split::Train => &self.train,
            Split::Val => &self.val,
            Split::Test => &self.test,
        }
    }

    pub(crate) fn get_mut(&mut self, split: Split) -> &mut SplitSamples {
        match split {
            Split::Train => &mut self.train,
            Split::Val => &mut self.val,
            Split::Test => &mut self.test,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Fail with `WindowCrossesVideoBoundary`.
    #[default]
    Reject,
    /// Replace out-of-video positions with the first in-video frame of the window.
    Clamp,
    /// Return mixed-video windows as-is.
    Unchecked,
}

impl BoundaryPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryPolicy::Reject => "reject",
            BoundaryPolicy::Clamp => "clamp",
            BoundaryPolicy::Unchecked => "unchecked",
        }
    }
}

impl fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoundaryPolicy {
    type Err = FileListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(BoundaryPolicy::Reject),
            "clamp" => Ok(BoundaryPolicy::Clamp),
            "unchecked" => Ok(BoundaryPolicy::Unchecked),
            other => Err(FileListError::Other(format!(
                "unknown boundary policy `{other}` (expected reject, clamp or unchecked)"
            ))),
        }
    }
}

/// A resolved window: positions into the split's sample lists, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub anchor: usize,
    pub positions: Vec<usize>,
}

/// A stacked two-stream sample: face window followed by flow window.
#[derive(Debug, Clone)]
pub struct WindowSample {
    /// Normalized frames, layout `[2 * sequence_length, 3, height, width]`.
    pub frames: Vec<f32>,
    pub shape: [usize; 4],
    pub label: usize,
    pub anchor: usize,
}

impl WindowSample {
    pub fn frame_count(&self) -> usize {
        self.shape[0]
    }

    pub fn frame(&self, i: usize) -> &[f32] {
        let per_frame = self.shape[1] * self.shape[2] * self.shape[3];
        &self.frames[i * per_frame..(i + 1) * per_frame]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassSummary {
    pub frames: usize,
    pub anchors: usize,
    pub videos: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitSummary {
    pub split: Split,
    pub frames: usize,
    pub anchors: usize,
    pub videos: usize,
    pub per_class: Vec<(String, ClassSummary)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListSummary {
    pub root: String,
    pub min_sequence_length: usize,
    pub splits: Vec<SplitSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationOutcome {
    Pass,
    Warn,
    Fail,
}

impl ValidationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationOutcome::Pass => "pass",
            ValidationOutcome::Warn => "warn",
            ValidationOutcome::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub outcome: ValidationOutcome,
    pub reasons: Vec<String>,
    pub summary: FileListSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_record_persists_as_pair() {
        let rec = FrameRecord {
            path: "a/b.png".into(),
            label: 3,
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"["a/b.png",3]"#);
        let back: FrameRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn video_lookup_uses_offsets() {
        let rec = |i: usize| FrameRecord {
            path: format!("{i}.png"),
            label: 0,
        };
        let samples = SplitSamples {
            face_samples: (0..7).map(rec).collect(),
            flow_samples: (0..7).map(rec).collect(),
            valid_positions: vec![],
            video_offsets: vec![0, 3, 5],
        };
        assert_eq!(samples.video_of(0), 0);
        assert_eq!(samples.video_of(2), 0);
        assert_eq!(samples.video_of(3), 1);
        assert_eq!(samples.video_of(6), 2);
        assert_eq!(samples.video_start(4), 3);
        assert_eq!(samples.video_range(2), 5..7);
        assert_eq!(samples.video_count(), 3);
    }

    #[test]
    fn boundary_policy_parses_its_own_names() {
        for policy in [
            BoundaryPolicy::Reject,
            BoundaryPolicy::Clamp,
            BoundaryPolicy::Unchecked,
        ] {
            assert_eq!(policy.to_string().parse::<BoundaryPolicy>().unwrap(), policy);
        }
        assert_eq!(" Clamp ".parse::<BoundaryPolicy>().unwrap(), BoundaryPolicy::Clamp);
        assert!("wrap".parse::<BoundaryPolicy>().is_err());
    }

    #[test]
    fn split_parses_validation_alias() {
        assert_eq!("validation".parse::<Split>().unwrap(), Split::Val);
        assert!("holdout".parse::<Split>().is_err());
    }
}
