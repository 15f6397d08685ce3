//! Batch iteration over a [`WindowedDataset`].

use crate::dataset::WindowedDataset;
use crate::types::{DatasetResult, FileListError, WindowSample};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub batch_size: usize,
    /// Shuffle window order before iteration.
    pub shuffle: bool,
    /// Seed for reproducible shuffling.
    pub seed: Option<u64>,
    /// Drop the last partial batch.
    pub drop_last: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            shuffle: true,
            seed: None,
            drop_last: false,
        }
    }
}

/// Stacked windows, layout `[batch, 2 * sequence_length, 3, height, width]`.
#[derive(Debug, Clone)]
pub struct SequenceBatch {
    pub frames: Vec<f32>,
    pub shape: [usize; 5],
    pub labels: Vec<usize>,
    pub anchors: Vec<usize>,
}

impl SequenceBatch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn collate(samples: Vec<WindowSample>) -> DatasetResult<Self> {
        let Some(first) = samples.first() else {
            return Err(FileListError::Other("cannot collate empty batch".to_string()));
        };
        let sample_shape = first.shape;
        let mut frames = Vec::with_capacity(first.frames.len() * samples.len());
        let mut labels = Vec::with_capacity(samples.len());
        let mut anchors = Vec::with_capacity(samples.len());
        for sample in &samples {
            if sample.shape != sample_shape {
                return Err(FileListError::Other(format!(
                    "batch contains varying window shapes {:?} vs {:?}; configure a resize",
                    sample.shape, sample_shape
                )));
            }
            frames.extend_from_slice(&sample.frames);
            labels.push(sample.label);
            anchors.push(sample.anchor);
        }
        Ok(Self {
            frames,
            shape: [
                samples.len(),
                sample_shape[0],
                sample_shape[1],
                sample_shape[2],
                sample_shape[3],
            ],
            labels,
            anchors,
        })
    }
}

#[cfg(feature = "burn-runtime")]
pub struct BurnBatch<B: burn::tensor::backend::Backend> {
    pub frames: burn::tensor::Tensor<B, 5>,
    pub labels: burn::tensor::Tensor<B, 1, burn::tensor::Int>,
}

#[cfg(feature = "burn-runtime")]
impl SequenceBatch {
    pub fn to_burn<B: burn::tensor::backend::Backend>(&self, device: &B::Device) -> BurnBatch<B> {
        let frames = burn::tensor::Tensor::<B, 1>::from_floats(self.frames.as_slice(), device)
            .reshape(self.shape);
        let labels: Vec<i64> = self.labels.iter().map(|&l| l as i64).collect();
        let labels =
            burn::tensor::Tensor::<B, 1, burn::tensor::Int>::from_ints(labels.as_slice(), device);
        BurnBatch { frames, labels }
    }
}

pub struct BatchIter<'a> {
    dataset: &'a WindowedDataset,
    order: Vec<usize>,
    cursor: usize,
    cfg: BatchConfig,
    processed_batches: usize,
    total_load_time: Duration,
}

impl<'a> BatchIter<'a> {
    pub fn new(dataset: &'a WindowedDataset, cfg: BatchConfig) -> DatasetResult<Self> {
        if cfg.batch_size == 0 {
            return Err(FileListError::Validation {
                msg: "batch_size must be positive".to_string(),
            });
        }
        let mut order: Vec<usize> = (0..dataset.len()).collect();
        if cfg.shuffle {
            let mut rng = match cfg.seed {
                Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
                None => rand::rngs::StdRng::from_rng(&mut rand::rng()),
            };
            order.shuffle(&mut rng);
        }
        Ok(Self {
            dataset,
            order,
            cursor: 0,
            cfg,
            processed_batches: 0,
            total_load_time: Duration::ZERO,
        })
    }

    /// Window indices in iteration order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn num_batches(&self) -> usize {
        let n = self.order.len();
        if self.cfg.drop_last {
            n / self.cfg.batch_size
        } else {
            n.div_ceil(self.cfg.batch_size)
        }
    }

    /// Next batch, loaded in parallel. Any failing window aborts the batch.
    pub fn next_batch(&mut self) -> DatasetResult<Option<SequenceBatch>> {
        if self.cursor >= self.order.len() {
            return Ok(None);
        }
        let end = (self.cursor + self.cfg.batch_size).min(self.order.len());
        if self.cfg.drop_last && end - self.cursor < self.cfg.batch_size {
            self.cursor = self.order.len();
            return Ok(None);
        }
        let start = self.cursor;
        self.cursor = end;

        let dataset = self.dataset;
        let t_load = Instant::now();
        let samples = self.order[start..end]
            .par_iter()
            .map(|&i| dataset.get(i))
            .collect::<DatasetResult<Vec<_>>>()?;
        let load_elapsed = t_load.elapsed();
        let batch = SequenceBatch::collate(samples)?;

        self.processed_batches += 1;
        self.total_load_time += load_elapsed;
        log::debug!(
            "[{}] batch={} samples={} load_ms={:.2} avg_load_ms={:.2}",
            self.dataset.split(),
            self.processed_batches,
            batch.len(),
            load_elapsed.as_secs_f64() * 1000.0,
            self.total_load_time.as_secs_f64() * 1000.0 / self.processed_batches as f64
        );
        Ok(Some(batch))
    }
}

impl Iterator for BatchIter<'_> {
    type Item = DatasetResult<SequenceBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch().transpose()
    }
}
