//! Image transform pipeline: user stages followed by the fixed tensor tail.

use crate::types::{DatasetResult, FileListError};
use image::imageops::FilterType;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Per-channel mean of the fixed normalization stage.
pub const NORMALIZE_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Per-channel std of the fixed normalization stage.
pub const NORMALIZE_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// One image-to-image stage. Must be deterministic for a given input.
pub trait ImageTransform: Send + Sync {
    fn apply(&self, img: RgbImage) -> DatasetResult<RgbImage>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct Resize {
    pub width: u32,
    pub height: u32,
    pub filter: FilterType,
}

impl Resize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: FilterType::Triangle,
        }
    }
}

impl ImageTransform for Resize {
    fn apply(&self, img: RgbImage) -> DatasetResult<RgbImage> {
        if self.width == 0 || self.height == 0 {
            return Err(FileListError::Other(format!(
                "resize target {}x{} is empty",
                self.width, self.height
            )));
        }
        if img.dimensions() == (self.width, self.height) {
            return Ok(img);
        }
        Ok(image::imageops::resize(
            &img,
            self.width,
            self.height,
            self.filter,
        ))
    }

    fn describe(&self) -> String {
        format!("resize={}x{}", self.width, self.height)
    }
}

/// Crop the centered `width` x `height` region.
#[derive(Debug, Clone, Copy)]
pub struct CenterCrop {
    pub width: u32,
    pub height: u32,
}

impl ImageTransform for CenterCrop {
    fn apply(&self, img: RgbImage) -> DatasetResult<RgbImage> {
        let (w, h) = img.dimensions();
        if self.width > w || self.height > h {
            return Err(FileListError::Other(format!(
                "center crop {}x{} larger than image {}x{}",
                self.width, self.height, w, h
            )));
        }
        let x = (w - self.width) / 2;
        let y = (h - self.height) / 2;
        Ok(image::imageops::crop_imm(&img, x, y, self.width, self.height).to_image())
    }

    fn describe(&self) -> String {
        format!("center_crop={}x{}", self.width, self.height)
    }
}

/// Adapter for ad-hoc closures.
pub struct FnTransform<F> {
    name: String,
    f: F,
}

impl<F> FnTransform<F>
where
    F: Fn(RgbImage) -> DatasetResult<RgbImage> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> ImageTransform for FnTransform<F>
where
    F: Fn(RgbImage) -> DatasetResult<RgbImage> + Send + Sync,
{
    fn apply(&self, img: RgbImage) -> DatasetResult<RgbImage> {
        (self.f)(img)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// A frame after the tensor tail: CHW, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFrame {
    pub data: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

/// Ordered user stages; `to_tensor` and normalization always run last.
#[derive(Clone, Default)]
pub struct TransformPipeline {
    stages: Vec<Arc<dyn ImageTransform>>,
}

impl fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("stages", &self.describe())
            .finish()
    }
}

impl TransformPipeline {
    /// Pipeline with only the fixed tail.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &TransformConfig) -> Self {
        let mut builder = TransformPipelineBuilder::new();
        if let Some((w, h)) = cfg.resize {
            builder = builder.resize(w, h);
        }
        if let Some((w, h)) = cfg.center_crop {
            builder = builder.center_crop(w, h);
        }
        builder.build()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn describe(&self) -> String {
        let mut parts: Vec<String> = self.stages.iter().map(|s| s.describe()).collect();
        parts.push("to_tensor".to_string());
        parts.push(format!(
            "normalize(mean={:?}, std={:?})",
            NORMALIZE_MEAN, NORMALIZE_STD
        ));
        parts.join(" -> ")
    }

    pub fn apply(&self, img: RgbImage) -> DatasetResult<NormalizedFrame> {
        let mut img = img;
        for stage in &self.stages {
            img = stage.apply(img)?;
        }
        let mut frame = to_tensor(&img);
        normalize(&mut frame);
        Ok(frame)
    }
}

#[derive(Default)]
pub struct TransformPipelineBuilder {
    stages: Vec<Arc<dyn ImageTransform>>,
}

impl TransformPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<T: ImageTransform + 'static>(mut self, stage: T) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn resize(self, width: u32, height: u32) -> Self {
        self.push(Resize::new(width, height))
    }

    pub fn center_crop(self, width: u32, height: u32) -> Self {
        self.push(CenterCrop { width, height })
    }

    pub fn map<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(RgbImage) -> DatasetResult<RgbImage> + Send + Sync + 'static,
    {
        self.push(FnTransform::new(name, f))
    }

    pub fn build(self) -> TransformPipeline {
        TransformPipeline {
            stages: self.stages,
        }
    }
}

/// Serializable pipeline description for config files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Resize every frame to (width, height).
    #[serde(default)]
    pub resize: Option<(u32, u32)>,
    /// Applied after `resize`.
    #[serde(default)]
    pub center_crop: Option<(u32, u32)>,
}

/// HWC u8 -> CHW f32 in [0, 1].
fn to_tensor(img: &RgbImage) -> NormalizedFrame {
    let (width, height) = img.dimensions();
    let plane = (width * height) as usize;
    let mut data = vec![0.0f32; plane * 3];
    for (x, y, pixel) in img.enumerate_pixels() {
        let base = (y * width + x) as usize;
        data[base] = pixel[0] as f32 / 255.0;
        data[plane + base] = pixel[1] as f32 / 255.0;
        data[2 * plane + base] = pixel[2] as f32 / 255.0;
    }
    NormalizedFrame {
        data,
        width,
        height,
    }
}

fn normalize(frame: &mut NormalizedFrame) {
    let plane = (frame.width * frame.height) as usize;
    if plane == 0 {
        return;
    }
    for (c, channel) in frame.data.chunks_mut(plane).enumerate() {
        let (mean, std) = (NORMALIZE_MEAN[c], NORMALIZE_STD[c]);
        for v in channel.iter_mut() {
            *v = (*v - mean) / std;
        }
    }
}
