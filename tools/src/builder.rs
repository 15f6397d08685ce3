//! Walks a FaceForensics tree and builds the per-split file list.

use crate::config::ToolConfig;
use crate::layout::{video_id, FaceForensicsLayout};
use crate::splits::SplitMembership;
use ff_dataset::{
    min_sequence_length, select_frames, FileList, FileListBuilder, SamplesPerVideo, Split,
};
use std::path::PathBuf;

/// One video with its face frames and the flow frames of the same names.
#[derive(Debug, Clone)]
pub struct VideoFrames {
    pub method: String,
    pub name: String,
    pub split: Split,
    pub faces: Vec<PathBuf>,
    pub flows: Vec<PathBuf>,
}

impl VideoFrames {
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// Collect every video that belongs to a split, in method/compression/name order.
pub fn collect_videos(
    cfg: &ToolConfig,
    membership: &SplitMembership,
) -> anyhow::Result<Vec<VideoFrames>> {
    let layout = FaceForensicsLayout::new(&cfg.source_root, cfg.image_extension.clone());
    let mut videos = Vec::new();
    for method in &cfg.methods {
        for compression in &cfg.compressions {
            let face_dir = layout.data_dir(method, compression, &cfg.face_data_type);
            let flow_dir = layout.data_dir(method, compression, &cfg.flow_data_type);
            if !face_dir.exists() {
                log::warn!("missing data directory {}", face_dir.display());
                continue;
            }
            for video_dir in layout.video_dirs(&face_dir)? {
                let Some(split) = video_id(&video_dir).and_then(|id| membership.split_of(id))
                else {
                    log::debug!("{} is in no split; skipping", video_dir.display());
                    continue;
                };
                let Some(name) = video_dir.file_name().map(|n| n.to_owned()) else {
                    continue;
                };
                let flow_video = flow_dir.join(&name);
                let mut faces = Vec::new();
                let mut flows = Vec::new();
                let all_faces = layout.frames(&video_dir)?;
                let total = all_faces.len();
                for face in all_faces {
                    let Some(file) = face.file_name() else { continue };
                    let flow = flow_video.join(file);
                    if flow.exists() {
                        faces.push(face);
                        flows.push(flow);
                    }
                }
                let dropped = total - faces.len();
                if dropped > 0 {
                    log::warn!(
                        "{}: {dropped} face frames without a flow frame in {}",
                        video_dir.display(),
                        flow_video.display()
                    );
                }
                videos.push(VideoFrames {
                    method: method.clone(),
                    name: name.to_string_lossy().into_owned(),
                    split,
                    faces,
                    flows,
                });
            }
        }
    }
    Ok(videos)
}

/// Build the file list. The test split always keeps every frame as an anchor.
pub fn build_file_list(
    cfg: &ToolConfig,
    membership: &SplitMembership,
) -> anyhow::Result<FileList> {
    let videos = collect_videos(cfg, membership)?;
    let min_length = min_sequence_length(videos.iter().map(VideoFrames::len));
    if let SamplesPerVideo::Count(n) = cfg.samples_per_video {
        if min_length < n {
            log::warn!(
                "There is a sequence that has less frames than you would like to sample: {min_length}<{n}"
            );
        }
    }

    let mut builder = FileListBuilder::new(&cfg.source_root, cfg.methods.iter(), min_length)?;
    for split in Split::ALL {
        let requested = match split {
            Split::Test => SamplesPerVideo::All,
            _ => cfg.samples_per_video,
        };
        let mut count = 0usize;
        for video in videos.iter().filter(|v| v.split == split) {
            let selected = select_frames(video.len(), requested);
            builder.add_data_points(&video.faces, &video.flows, &video.method, split, &selected)?;
            count += 1;
        }
        let samples = builder.split(split);
        log::info!(
            "{split}: {count} videos, {} frames, {} anchors",
            samples.len(),
            samples.valid_positions.len()
        );
    }
    Ok(builder.finalize())
}
