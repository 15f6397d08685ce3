use anyhow::Context;
use clap::Parser;
use ff_dataset::{summarize, FileList, SamplesPerVideo, Split};
use ff_tools::{build_file_list, SplitMembership, ToolConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "create_file_list",
    about = "Index extracted face/flow frames into a per-split file list"
)]
struct Args {
    /// Dataset root (FaceForensics layout).
    #[arg(long)]
    source_dir_root: Option<PathBuf>,
    /// Where to write the file list JSON.
    #[arg(long)]
    output_file: Option<PathBuf>,
    /// Directory with train.json / val.json / test.json.
    #[arg(long)]
    splits_dir: Option<PathBuf>,
    /// Methods to index, in label order (repeatable).
    #[arg(long = "methods", short = 'm')]
    methods: Vec<String>,
    /// Compressions to index (repeatable).
    #[arg(long = "compressions", short = 'c')]
    compressions: Vec<String>,
    /// Data type holding the face crops.
    #[arg(long)]
    face_data_type: Option<String>,
    /// Data type holding the flow images.
    #[arg(long)]
    flow_data_type: Option<String>,
    /// Frames selected per video; -1 selects all. The test split always selects all.
    #[arg(long, short = 's', allow_hyphen_values = true)]
    samples_per_video: Option<SamplesPerVideo>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let mut cfg = ToolConfig::load();
    if let Some(root) = args.source_dir_root {
        cfg.source_root = root;
    }
    if let Some(out) = args.output_file {
        cfg.output_file = out;
    }
    if let Some(dir) = args.splits_dir {
        cfg.splits_dir = dir;
    }
    if !args.methods.is_empty() {
        cfg.methods = args.methods;
    }
    if !args.compressions.is_empty() {
        cfg.compressions = args.compressions;
    }
    if let Some(t) = args.face_data_type {
        cfg.face_data_type = t;
    }
    if let Some(t) = args.flow_data_type {
        cfg.flow_data_type = t;
    }
    if let Some(s) = args.samples_per_video {
        cfg.samples_per_video = s;
    }

    let membership = SplitMembership::load(&cfg.splits_dir)
        .with_context(|| format!("loading splits from {}", cfg.splits_dir.display()))?;
    let file_list = build_file_list(&cfg, &membership)?;
    file_list
        .save(&cfg.output_file)
        .with_context(|| format!("writing {}", cfg.output_file.display()))?;
    log::info!("{} created.", cfg.output_file.display());

    let reloaded = FileList::load(&cfg.output_file)?;
    log::info!("classes: {reloaded}");
    for split in summarize(&reloaded).splits {
        log::info!(
            "{}-data-set: videos={} frames={} anchors={}",
            split.split,
            split.videos,
            split.frames,
            split.anchors
        );
    }
    if reloaded.split(Split::Train).valid_positions.is_empty() {
        log::warn!("train split has no valid positions");
    }
    Ok(())
}
