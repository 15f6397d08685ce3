//! Builds a file list from a synthetic FaceForensics tree.

use ff_dataset::{FileList, SamplesPerVideo, Split, TransformPipeline};
use ff_tools::{build_file_list, collect_videos, FaceForensicsLayout, SplitMembership, ToolConfig};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn write_frames(dir: &Path, frames: usize) -> anyhow::Result<()> {
    fs::create_dir_all(dir)?;
    for i in 0..frames {
        RgbImage::from_pixel(4, 4, Rgb([i as u8, 0, 0])).save(dir.join(format!("{i:04}.png")))?;
    }
    Ok(())
}

fn synthetic_tree(root: &Path) -> anyhow::Result<ToolConfig> {
    let cfg = ToolConfig {
        source_root: root.to_path_buf(),
        output_file: root.join("file_list.json"),
        splits_dir: root.join("splits"),
        methods: vec!["youtube".into(), "Deepfakes".into()],
        compressions: vec!["c40".into()],
        samples_per_video: SamplesPerVideo::Count(2),
        ..ToolConfig::default()
    };
    let layout = FaceForensicsLayout::new(root, "png");
    let videos = [
        ("youtube", "000", 6),
        ("youtube", "001", 5),
        ("youtube", "002", 4),
        ("Deepfakes", "000_001", 6),
        ("Deepfakes", "002_000", 3),
        ("Deepfakes", "777_778", 2),
    ];
    for (method, video, frames) in videos {
        write_frames(&layout.data_dir(method, "c40", &cfg.face_data_type).join(video), frames)?;
        write_frames(&layout.data_dir(method, "c40", &cfg.flow_data_type).join(video), frames)?;
    }
    // face frame without a flow counterpart
    RgbImage::new(4, 4).save(
        layout
            .data_dir("youtube", "c40", &cfg.face_data_type)
            .join("001/0009.png"),
    )?;

    fs::create_dir_all(&cfg.splits_dir)?;
    fs::write(cfg.splits_dir.join("train.json"), r#"[["000", "001"]]"#)?;
    fs::write(cfg.splits_dir.join("val.json"), r#"[]"#)?;
    fs::write(cfg.splits_dir.join("test.json"), r#"[["002", "003"]]"#)?;
    Ok(cfg)
}

#[test]
fn collects_only_split_members_with_paired_frames() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cfg = synthetic_tree(tmp.path())?;
    let membership = SplitMembership::load(&cfg.splits_dir)?;
    let videos = collect_videos(&cfg, &membership)?;
    let names: Vec<(&str, &str, Split, usize)> = videos
        .iter()
        .map(|v| (v.method.as_str(), v.name.as_str(), v.split, v.len()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("youtube", "000", Split::Train, 6),
            ("youtube", "001", Split::Train, 5),
            ("youtube", "002", Split::Test, 4),
            ("Deepfakes", "000_001", Split::Train, 6),
            ("Deepfakes", "002_000", Split::Test, 3),
        ]
    );
    Ok(())
}

#[test]
fn min_sequence_length_counts_indexed_videos_only() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cfg = synthetic_tree(tmp.path())?;
    let membership = SplitMembership::load(&cfg.splits_dir)?;
    // 777_778 has 2 frames but belongs to no split; 001 keeps 5 paired frames of 6
    let list = build_file_list(&cfg, &membership)?;
    assert_eq!(list.min_sequence_length(), 3);

    let membership = {
        let mut m = SplitMembership::default();
        m.insert(Split::Train, ["000", "001", "777"])?;
        m
    };
    let list = build_file_list(&cfg, &membership)?;
    assert_eq!(list.min_sequence_length(), 2);
    Ok(())
}

#[test]
fn test_split_is_exhaustive_and_train_is_sampled() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cfg = synthetic_tree(tmp.path())?;
    let membership = SplitMembership::load(&cfg.splits_dir)?;
    let list = build_file_list(&cfg, &membership)?;

    assert_eq!(list.classes(), ["youtube", "Deepfakes"]);
    assert_eq!(list.min_sequence_length(), 3);

    let train = list.split(Split::Train);
    assert_eq!(train.len(), 17);
    assert_eq!(train.video_offsets, vec![0, 6, 11]);
    assert_eq!(train.valid_positions, vec![0, 5, 6, 10, 11, 16]);
    assert_eq!(train.face_samples[11].label, 1);
    assert!(train.face_samples[0]
        .path
        .starts_with("original_sequences/youtube/c40/face_images_tracked/000"));

    let test = list.split(Split::Test);
    assert_eq!(test.valid_positions, (0..7).collect::<Vec<_>>());
    assert!(list.split(Split::Val).is_empty());

    list.save(&cfg.output_file)?;
    let loaded = Arc::new(FileList::load(&cfg.output_file)?);
    assert_eq!(*loaded, list);
    let ds = loaded.get_dataset(Split::Test, 2, TransformPipeline::new())?;
    let sample = ds.get(1)?;
    assert_eq!(sample.shape, [4, 3, 4, 4]);
    assert_eq!(sample.label, 0);
    Ok(())
}
