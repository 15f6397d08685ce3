//! Read-only windowed view over one split of a [`FileList`].

use crate::aug::{NormalizedFrame, TransformPipeline};
use crate::file_list::FileList;
use crate::types::{
    BoundaryPolicy, DatasetResult, FileListError, FrameRecord, Split, SplitSamples, Window,
    WindowSample,
};
use image::RgbImage;
use std::path::Path;
use std::sync::Arc;

/// Image decoding collaborator.
pub trait ImageLoader: Send + Sync {
    fn load(&self, path: &Path) -> DatasetResult<RgbImage>;
}

/// Decodes with `image::open` and converts to RGB8.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLoader;

impl ImageLoader for DefaultLoader {
    fn load(&self, path: &Path) -> DatasetResult<RgbImage> {
        Ok(image::open(path)
            .map_err(|e| FileListError::Image {
                path: path.to_path_buf(),
                source: e,
            })?
            .to_rgb8())
    }
}

#[derive(Clone)]
pub struct WindowedDataset {
    file_list: Arc<FileList>,
    split: Split,
    sequence_length: usize,
    pipeline: TransformPipeline,
    boundary: BoundaryPolicy,
    loader: Arc<dyn ImageLoader>,
}

impl std::fmt::Debug for WindowedDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowedDataset")
            .field("root", &self.file_list.root())
            .field("split", &self.split)
            .field("sequence_length", &self.sequence_length)
            .field("boundary", &self.boundary)
            .field("len", &self.len())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl WindowedDataset {
    pub fn new(
        file_list: Arc<FileList>,
        split: Split,
        sequence_length: usize,
        pipeline: TransformPipeline,
    ) -> DatasetResult<Self> {
        if sequence_length == 0 {
            return Err(FileListError::Validation {
                msg: "sequence_length must be positive".to_string(),
            });
        }
        let dataset = Self {
            file_list,
            split,
            sequence_length,
            pipeline,
            boundary: BoundaryPolicy::default(),
            loader: Arc::new(DefaultLoader),
        };
        if dataset.exceeds_min_sequence_length() {
            log::warn!(
                "sequence length {} > minimum sequence length {}; windows of shorter videos \
                 cannot be filled from their own frames",
                dataset.sequence_length,
                dataset.file_list.min_sequence_length()
            );
        }
        Ok(dataset)
    }

    /// True when some indexed video is shorter than one window.
    pub fn exceeds_min_sequence_length(&self) -> bool {
        self.sequence_length > self.file_list.min_sequence_length()
    }

    pub fn with_boundary_policy(mut self, boundary: BoundaryPolicy) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_loader<L: ImageLoader + 'static>(mut self, loader: L) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    pub fn file_list(&self) -> &FileList {
        &self.file_list
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn boundary_policy(&self) -> BoundaryPolicy {
        self.boundary
    }

    pub fn classes(&self) -> &[String] {
        self.file_list.classes()
    }

    fn samples(&self) -> &SplitSamples {
        self.file_list.split(self.split)
    }

    /// Number of addressable windows.
    pub fn len(&self) -> usize {
        self.samples().valid_positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label of every anchor, in index order.
    pub fn targets(&self) -> DatasetResult<Vec<usize>> {
        let samples = self.samples();
        samples
            .valid_positions
            .iter()
            .map(|&p| self.record(&samples.face_samples, p).map(|r| r.label))
            .collect()
    }

    fn record<'s>(
        &self,
        records: &'s [FrameRecord],
        position: usize,
    ) -> DatasetResult<&'s FrameRecord> {
        records.get(position).ok_or_else(|| FileListError::Validation {
            msg: format!(
                "{} position {position} outside {} samples",
                self.split,
                records.len()
            ),
        })
    }

    /// Resolve `index` into the positions of its window, without touching disk.
    pub fn window(&self, index: usize) -> DatasetResult<Window> {
        let samples = self.samples();
        let anchor = *samples
            .valid_positions
            .get(index)
            .ok_or(FileListError::IndexOutOfRange {
                split: self.split,
                index,
                len: samples.valid_positions.len(),
            })?;
        if anchor >= samples.len() {
            return Err(FileListError::Validation {
                msg: format!(
                    "{} anchor {anchor} outside {} samples",
                    self.split,
                    samples.len()
                ),
            });
        }
        let reach = self.sequence_length - 1;
        let video_start = samples.video_start(anchor);

        let positions = match self.boundary {
            BoundaryPolicy::Clamp => (0..self.sequence_length)
                .map(|i| (anchor + i).checked_sub(reach).map_or(video_start, |p| p.max(video_start)))
                .collect(),
            BoundaryPolicy::Reject | BoundaryPolicy::Unchecked => {
                let start = anchor
                    .checked_sub(reach)
                    .ok_or(FileListError::WindowUnderflow {
                        split: self.split,
                        anchor,
                        sequence_length: self.sequence_length,
                    })?;
                if self.boundary == BoundaryPolicy::Reject && start < video_start {
                    return Err(FileListError::WindowCrossesVideoBoundary {
                        split: self.split,
                        anchor,
                        window_start: start,
                        first_video: samples.video_of(start),
                        last_video: samples.video_of(anchor),
                    });
                }
                (start..=anchor).collect()
            }
        };
        Ok(Window { anchor, positions })
    }

    /// Load, transform and stack the face window followed by the flow window.
    pub fn get(&self, index: usize) -> DatasetResult<WindowSample> {
        let window = self.window(index)?;
        let samples = self.samples();
        let label = self.record(&samples.face_samples, window.anchor)?.label;

        let records = window
            .positions
            .iter()
            .map(|&p| self.record(&samples.face_samples, p))
            .chain(
                window
                    .positions
                    .iter()
                    .map(|&p| self.record(&samples.flow_samples, p)),
            )
            .collect::<DatasetResult<Vec<_>>>()?;

        let mut expected: Option<(u32, u32)> = None;
        let mut frames = Vec::new();
        for record in records {
            let frame = self.load_frame(record)?;
            let size = (frame.width, frame.height);
            match expected {
                None => {
                    expected = Some(size);
                    frames.reserve(frame.data.len() * 2 * self.sequence_length);
                }
                Some(sz) if sz != size => {
                    return Err(FileListError::InconsistentFrameSize {
                        path: self.file_list.resolve(record),
                        expected: sz,
                        found: size,
                    });
                }
                _ => {}
            }
            frames.extend_from_slice(&frame.data);
        }

        let (width, height) = expected.unwrap_or((0, 0));
        Ok(WindowSample {
            frames,
            shape: [
                2 * self.sequence_length,
                3,
                height as usize,
                width as usize,
            ],
            label,
            anchor: window.anchor,
        })
    }

    fn load_frame(&self, record: &FrameRecord) -> DatasetResult<NormalizedFrame> {
        let path = self.file_list.resolve(record);
        let img = self.loader.load(&path)?;
        self.pipeline.apply(img)
    }
}
