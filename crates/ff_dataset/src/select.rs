//! Deterministic frame sub-sampling for variable-length videos.

use crate::types::FileListError;
use std::fmt;
use std::str::FromStr;

/// How many frames to keep per video. `All` is the `-1` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplesPerVideo {
    #[default]
    All,
    Count(usize),
}

impl SamplesPerVideo {
    pub fn from_signed(value: i64) -> Result<Self, FileListError> {
        match value {
            -1 => Ok(SamplesPerVideo::All),
            v if v >= 0 => Ok(SamplesPerVideo::Count(v as usize)),
            v => Err(FileListError::Other(format!(
                "samples per video must be -1 or non-negative, got {v}"
            ))),
        }
    }

    pub fn as_signed(&self) -> i64 {
        match self {
            SamplesPerVideo::All => -1,
            SamplesPerVideo::Count(n) => *n as i64,
        }
    }
}

impl fmt::Display for SamplesPerVideo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_signed())
    }
}

impl FromStr for SamplesPerVideo {
    type Err = FileListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|e| FileListError::Other(format!("invalid samples per video `{s}`: {e}")))?;
        Self::from_signed(value)
    }
}

/// Pick which frames of a `nb_images`-long video to keep.
///
/// Positions are spread evenly over `1..=nb_images`, shifted down by one and
/// rounded half-to-even. Repeated indices are kept.
pub fn select_frames(nb_images: usize, samples: SamplesPerVideo) -> Vec<usize> {
    let k = match samples {
        SamplesPerVideo::Count(k) if k <= nb_images => k,
        _ => return (0..nb_images).collect(),
    };
    if k == 0 {
        return Vec::new();
    }
    if k == 1 {
        return vec![0];
    }
    let start = 1.0f64;
    let stop = nb_images as f64;
    let step = (stop - start) / (k - 1) as f64;
    (0..k)
        .map(|i| {
            let v = if i == k - 1 {
                stop
            } else {
                start + i as f64 * step
            };
            (v - 1.0).round_ties_even() as usize
        })
        .collect()
}

/// Shortest video length, or 0 when there are no videos.
pub fn min_sequence_length<I>(lengths: I) -> usize
where
    I: IntoIterator<Item = usize>,
{
    lengths.into_iter().min().unwrap_or(0)
}
