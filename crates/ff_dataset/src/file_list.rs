//! Sample index: which frames exist per split, their labels and which of
//! them may anchor a retrieval window.

use crate::aug::TransformPipeline;
use crate::dataset::WindowedDataset;
use crate::types::{DatasetResult, FileListError, FrameRecord, Split, SplitSamples, SplitTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Mutable index under construction. Appends happen in video order, one
/// writer per builder.
#[derive(Debug, Clone)]
pub struct FileListBuilder {
    inner: FileList,
}

impl FileListBuilder {
    pub fn new<S: Into<String>>(
        root: impl Into<PathBuf>,
        classes: impl IntoIterator<Item = S>,
        min_sequence_length: usize,
    ) -> DatasetResult<Self> {
        let classes: Vec<String> = classes.into_iter().map(Into::into).collect();
        let mut class_to_idx = BTreeMap::new();
        for (idx, class) in classes.iter().enumerate() {
            if class_to_idx.insert(class.clone(), idx).is_some() {
                return Err(FileListError::DuplicateClass(class.clone()));
            }
        }
        let root = root.into().display().to_string();
        Ok(Self {
            inner: FileList {
                root,
                classes,
                class_to_idx,
                splits: SplitTable::default(),
                min_sequence_length,
            },
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.inner.classes
    }

    pub fn split(&self, split: Split) -> &SplitSamples {
        self.inner.splits.get(split)
    }

    /// Open a new video block; later `add_data_point` calls extend it.
    pub fn start_video(&mut self, split: Split) {
        open_block(self.inner.splits.get_mut(split));
    }

    /// Append one face/flow frame pair to the current video block of `split`.
    pub fn add_data_point(
        &mut self,
        face_path: impl AsRef<Path>,
        flow_path: impl AsRef<Path>,
        label: &str,
        split: Split,
    ) -> DatasetResult<()> {
        let label_idx = self.inner.label_index(label)?;
        let face = self.relative(face_path.as_ref())?;
        let flow = self.relative(flow_path.as_ref())?;
        let samples = self.inner.splits.get_mut(split);
        if samples.video_offsets.is_empty() {
            samples.video_offsets.push(samples.len());
        }
        push_pair(samples, face, flow, label_idx);
        Ok(())
    }

    /// Append a whole video. Every frame is stored so windows can reach back
    /// from an anchor; only `selected_positions` (indices into the given
    /// paths) become valid anchors.
    pub fn add_data_points<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        face_paths: &[P],
        flow_paths: &[Q],
        label: &str,
        split: Split,
        selected_positions: &[usize],
    ) -> DatasetResult<()> {
        let label_idx = self.inner.label_index(label)?;
        if face_paths.len() != flow_paths.len() {
            return Err(FileListError::LengthMismatch {
                face: face_paths.len(),
                flow: flow_paths.len(),
            });
        }
        if let Some(&position) = selected_positions.iter().find(|&&p| p >= face_paths.len()) {
            return Err(FileListError::PositionOutOfVideo {
                position,
                frames: face_paths.len(),
            });
        }
        let faces = face_paths
            .iter()
            .map(|p| self.relative(p.as_ref()))
            .collect::<DatasetResult<Vec<_>>>()?;
        let flows = flow_paths
            .iter()
            .map(|p| self.relative(p.as_ref()))
            .collect::<DatasetResult<Vec<_>>>()?;

        let samples = self.inner.splits.get_mut(split);
        let offset = samples.len();
        samples
            .valid_positions
            .extend(selected_positions.iter().map(|p| p + offset));
        if !faces.is_empty() {
            open_block(samples);
        }
        for (face, flow) in faces.into_iter().zip(flows) {
            push_pair(samples, face, flow, label_idx);
        }
        Ok(())
    }

    pub fn set_min_sequence_length(&mut self, min_sequence_length: usize) {
        self.inner.min_sequence_length = min_sequence_length;
    }

    /// Freeze the index. No mutation is possible afterwards.
    ///
    /// Blocks opened by `start_video` that never received a frame are dropped.
    pub fn finalize(mut self) -> FileList {
        for split in Split::ALL {
            let samples = self.inner.splits.get_mut(split);
            while samples.video_offsets.last() == Some(&samples.len()) {
                samples.video_offsets.pop();
            }
        }
        self.inner
    }

    fn relative(&self, path: &Path) -> DatasetResult<String> {
        let root = Path::new(&self.inner.root);
        let rel = if path.is_absolute() || path.starts_with(root) {
            path.strip_prefix(root)
                .map_err(|_| FileListError::PathOutsideRoot {
                    path: path.to_path_buf(),
                    root: root.to_path_buf(),
                })?
        } else {
            path
        };
        Ok(rel.to_string_lossy().into_owned())
    }
}

fn open_block(samples: &mut SplitSamples) {
    let start = samples.len();
    if samples.video_offsets.last() != Some(&start) {
        samples.video_offsets.push(start);
    }
}

fn push_pair(samples: &mut SplitSamples, face: String, flow: String, label: usize) {
    samples.face_samples.push(FrameRecord { path: face, label });
    samples.flow_samples.push(FrameRecord { path: flow, label });
}

/// Frozen, serializable sample index. Safe to share across threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileList {
    root: String,
    classes: Vec<String>,
    class_to_idx: BTreeMap<String, usize>,
    splits: SplitTable,
    min_sequence_length: usize,
}

impl FileList {
    pub fn root(&self) -> &Path {
        Path::new(&self.root)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn class_to_idx(&self) -> &BTreeMap<String, usize> {
        &self.class_to_idx
    }

    pub fn split(&self, split: Split) -> &SplitSamples {
        self.splits.get(split)
    }

    pub fn min_sequence_length(&self) -> usize {
        self.min_sequence_length
    }

    pub fn label_index(&self, label: &str) -> DatasetResult<usize> {
        self.class_to_idx
            .get(label)
            .copied()
            .ok_or_else(|| FileListError::UnknownLabel {
                label: label.to_string(),
                known: self.classes.clone(),
            })
    }

    /// Absolute path of a stored record.
    pub fn resolve(&self, record: &FrameRecord) -> PathBuf {
        self.root().join(&record.path)
    }

    pub fn to_document(&self) -> DatasetResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| FileListError::Other(e.to_string()))
    }

    /// Rehydrate verbatim. Invariants are trusted; call `validate` to check them.
    pub fn from_document(document: serde_json::Value) -> DatasetResult<Self> {
        serde_json::from_value(document).map_err(|e| FileListError::Json {
            path: PathBuf::from("<document>"),
            source: e,
        })
    }

    pub fn save(&self, path: &Path) -> DatasetResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| FileListError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let data =
            serde_json::to_vec_pretty(self).map_err(|e| FileListError::Other(e.to_string()))?;
        fs::write(path, data).map_err(|e| FileListError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn load(path: &Path) -> DatasetResult<Self> {
        let raw = fs::read(path).map_err(|e| FileListError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_slice(&raw).map_err(|e| FileListError::Json {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Check the index invariants of a document from another producer.
    pub fn validate(&self) -> DatasetResult<()> {
        let fail = |msg: String| Err(FileListError::Validation { msg });
        if self.class_to_idx.len() != self.classes.len() {
            return fail(format!(
                "class_to_idx has {} entries for {} classes",
                self.class_to_idx.len(),
                self.classes.len()
            ));
        }
        for (idx, class) in self.classes.iter().enumerate() {
            if self.class_to_idx.get(class) != Some(&idx) {
                return fail(format!("class `{class}` is not mapped to {idx}"));
            }
        }
        for split in Split::ALL {
            let samples = self.splits.get(split);
            if samples.face_samples.len() != samples.flow_samples.len() {
                return fail(format!(
                    "{split}: {} face samples vs {} flow samples",
                    samples.face_samples.len(),
                    samples.flow_samples.len()
                ));
            }
            let mut records = samples.face_samples.iter().chain(&samples.flow_samples);
            if let Some(bad) = records.find(|r| r.label >= self.classes.len()) {
                return fail(format!(
                    "{split}: label {} of {} exceeds class count {}",
                    bad.label,
                    bad.path,
                    self.classes.len()
                ));
            }
            if let Some(pos) = samples
                .valid_positions
                .iter()
                .find(|&&p| p >= samples.len())
            {
                return fail(format!(
                    "{split}: valid position {pos} outside {} samples",
                    samples.len()
                ));
            }
            let offsets = &samples.video_offsets;
            if offsets.windows(2).any(|w| w[0] >= w[1])
                || offsets.last().is_some_and(|&o| o >= samples.len())
                || offsets.first().is_some_and(|&o| o != 0)
            {
                return fail(format!("{split}: malformed video offsets"));
            }
        }
        Ok(())
    }

    /// Windowed view over one split, sharing this index.
    pub fn get_dataset(
        self: &Arc<Self>,
        split: Split,
        sequence_length: usize,
        pipeline: TransformPipeline,
    ) -> DatasetResult<WindowedDataset> {
        WindowedDataset::new(Arc::clone(self), split, sequence_length, pipeline)
    }

    /// Load an index from disk and open a windowed view over one split.
    pub fn get_dataset_from_file(
        path: &Path,
        split: Split,
        sequence_length: usize,
        pipeline: TransformPipeline,
    ) -> DatasetResult<WindowedDataset> {
        Arc::new(Self::load(path)?).get_dataset(split, sequence_length, pipeline)
    }
}

impl fmt::Display for FileList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        for (class, idx) in &self.class_to_idx {
            writeln!(f, "    {class:?}: {idx},")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(video: &str, n: usize) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let face = (0..n)
            .map(|i| PathBuf::from(format!("/data/face/{video}/{i:04}.png")))
            .collect();
        let flow = (0..n)
            .map(|i| PathBuf::from(format!("/data/flow/{video}/{i:04}.png")))
            .collect();
        (face, flow)
    }

    fn builder() -> FileListBuilder {
        FileListBuilder::new("/data", ["youtube", "Deepfakes"], 5).unwrap()
    }

    #[test]
    fn duplicate_classes_rejected() {
        let err = FileListBuilder::new("/data", ["a", "b", "a"], 1).unwrap_err();
        assert!(matches!(err, FileListError::DuplicateClass(c) if c == "a"));
    }

    #[test]
    fn second_video_positions_are_offset() {
        let mut b = builder();
        let (face, flow) = frames("000", 10);
        b.add_data_points(&face, &flow, "youtube", Split::Train, &[0, 2, 4])
            .unwrap();
        let (face, flow) = frames("001", 5);
        b.add_data_points(&face, &flow, "Deepfakes", Split::Train, &[0, 2, 4])
            .unwrap();
        let list = b.finalize();
        let train = list.split(Split::Train);
        assert_eq!(train.valid_positions, vec![0, 2, 4, 10, 12, 14]);
        assert_eq!(train.face_samples.len(), 15);
        assert_eq!(train.flow_samples.len(), 15);
        assert_eq!(train.video_offsets, vec![0, 10]);
        assert_eq!(train.face_samples[10].path, "face/001/0000.png");
        assert_eq!(train.flow_samples[14].label, 1);
        assert!(list.split(Split::Val).is_empty());
    }

    #[test]
    fn unknown_label_appends_nothing() {
        let mut b = builder();
        let (face, flow) = frames("000", 4);
        let err = b
            .add_data_points(&face, &flow, "FaceSwap", Split::Val, &[1])
            .unwrap_err();
        assert!(matches!(err, FileListError::UnknownLabel { ref label, .. } if label == "FaceSwap"));
        let err = b
            .add_data_point(&face[0], &flow[0], "FaceSwap", Split::Val)
            .unwrap_err();
        assert!(matches!(err, FileListError::UnknownLabel { .. }));
        assert!(b.split(Split::Val).is_empty());
        assert!(b.split(Split::Val).valid_positions.is_empty());
    }

    #[test]
    fn mismatched_modalities_rejected() {
        let mut b = builder();
        let (face, _) = frames("000", 4);
        let (_, flow) = frames("000", 3);
        let err = b
            .add_data_points(&face, &flow, "youtube", Split::Train, &[0])
            .unwrap_err();
        assert!(matches!(err, FileListError::LengthMismatch { face: 4, flow: 3 }));
        let (face, flow) = frames("000", 3);
        let err = b
            .add_data_points(&face, &flow, "youtube", Split::Train, &[3])
            .unwrap_err();
        assert!(matches!(err, FileListError::PositionOutOfVideo { position: 3, frames: 3 }));
    }

    #[test]
    fn single_points_extend_current_video() {
        let mut b = builder();
        b.add_data_point("face/a/0.png", "flow/a/0.png", "youtube", Split::Test)
            .unwrap();
        b.add_data_point("face/a/1.png", "flow/a/1.png", "youtube", Split::Test)
            .unwrap();
        b.start_video(Split::Test);
        b.add_data_point("/data/face/b/0.png", "/data/flow/b/0.png", "Deepfakes", Split::Test)
            .unwrap();
        let list = b.finalize();
        let test = list.split(Split::Test);
        assert_eq!(test.video_offsets, vec![0, 2]);
        assert_eq!(test.face_samples[2].path, "face/b/0.png");
        assert!(test.valid_positions.is_empty());
    }

    #[test]
    fn unused_video_block_dropped_on_finalize() {
        let mut b = builder();
        b.add_data_point("f/0.png", "o/0.png", "youtube", Split::Train)
            .unwrap();
        b.start_video(Split::Train);
        b.start_video(Split::Val);
        let list = b.finalize();
        assert_eq!(list.split(Split::Train).video_offsets, vec![0]);
        assert!(list.split(Split::Val).video_offsets.is_empty());
        list.validate().unwrap();
    }

    #[test]
    fn paths_outside_root_rejected() {
        let mut b = builder();
        let err = b
            .add_data_point("/elsewhere/x.png", "/data/flow/x.png", "youtube", Split::Train)
            .unwrap_err();
        assert!(matches!(err, FileListError::PathOutsideRoot { .. }));
    }

    #[test]
    fn document_round_trip_is_exact() {
        let mut b = builder();
        let (face, flow) = frames("000", 6);
        b.add_data_points(&face, &flow, "youtube", Split::Train, &[1, 3, 5])
            .unwrap();
        let (face, flow) = frames("001", 4);
        b.add_data_points(&face, &flow, "Deepfakes", Split::Test, &[0, 1, 2, 3])
            .unwrap();
        let list = b.finalize();
        let doc = list.to_document().unwrap();
        assert_eq!(doc["classes"][1], "Deepfakes");
        assert_eq!(doc["class_to_idx"]["Deepfakes"], 1);
        assert_eq!(doc["splits"]["train"]["valid_positions"][2], 5);
        assert_eq!(doc["splits"]["test"]["flow_samples"][0][0], "flow/001/0000.png");
        assert_eq!(doc["min_sequence_length"], 5);
        let back = FileList::from_document(doc).unwrap();
        assert_eq!(back, list);
        back.validate().unwrap();
    }

    #[test]
    fn documents_without_offsets_load_as_one_block() {
        let doc = serde_json::json!({
            "root": "/data",
            "classes": ["youtube"],
            "class_to_idx": {"youtube": 0},
            "splits": {
                "train": {
                    "face_samples": [["f/0.png", 0], ["f/1.png", 0]],
                    "flow_samples": [["o/0.png", 0], ["o/1.png", 0]],
                    "valid_positions": [1]
                },
                "val": {"face_samples": [], "flow_samples": [], "valid_positions": []},
                "test": {"face_samples": [], "flow_samples": [], "valid_positions": []}
            },
            "min_sequence_length": 2
        });
        let list = FileList::from_document(doc).unwrap();
        let train = list.split(Split::Train);
        assert!(train.video_offsets.is_empty());
        assert_eq!(train.video_count(), 1);
        assert_eq!(train.video_of(1), 0);
        list.validate().unwrap();
    }

    #[test]
    fn validate_catches_bad_positions_and_labels() {
        let doc = serde_json::json!({
            "root": "/data",
            "classes": ["youtube"],
            "class_to_idx": {"youtube": 0},
            "splits": {
                "train": {
                    "face_samples": [["f/0.png", 0]],
                    "flow_samples": [["o/0.png", 0]],
                    "valid_positions": [1]
                },
                "val": {"face_samples": [], "flow_samples": [], "valid_positions": []},
                "test": {"face_samples": [["f/0.png", 4]], "flow_samples": [["o/0.png", 4]], "valid_positions": []}
            },
            "min_sequence_length": 1
        });
        let list = FileList::from_document(doc).unwrap();
        let err = list.validate().unwrap_err();
        assert!(matches!(err, FileListError::Validation { ref msg } if msg.contains("valid position 1")));
    }

    #[test]
    fn display_lists_class_mapping() {
        let list = builder().finalize();
        let text = list.to_string();
        assert!(text.contains("\"youtube\": 0"));
        assert!(text.contains("\"Deepfakes\": 1"));
    }
}
