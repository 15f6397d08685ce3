use anyhow::Context;
use clap::Parser;
use ff_dataset::{validate_file_list, BoundaryPolicy, FileList, Split, TransformPipeline};
use ff_tools::ToolConfig;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "file_list_info",
    about = "Summarize and validate a file list; optionally decode one window"
)]
struct Args {
    /// File list JSON (defaults to the configured output file).
    #[arg(long)]
    file_list: Option<PathBuf>,
    /// Decode the window at this index to check shapes.
    #[arg(long)]
    probe_index: Option<usize>,
    /// Split to probe.
    #[arg(long, default_value = "train")]
    split: Split,
    /// Window length for the probe.
    #[arg(long, default_value_t = 1)]
    sequence_length: usize,
    /// Boundary policy for the probe: reject, clamp or unchecked.
    #[arg(long, default_value = "reject")]
    boundary: BoundaryPolicy,
    /// Print the report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let cfg = ToolConfig::load();
    let path = args.file_list.unwrap_or_else(|| cfg.output_file.clone());
    let file_list =
        Arc::new(FileList::load(&path).with_context(|| format!("loading {}", path.display()))?);

    let report = validate_file_list(&file_list);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Validation outcome: {} (root={} classes={} min_sequence_length={})",
            report.outcome.as_str(),
            report.summary.root,
            file_list.classes().len(),
            report.summary.min_sequence_length
        );
        for split in &report.summary.splits {
            println!(
                " - {}: videos={} frames={} anchors={}",
                split.split, split.videos, split.frames, split.anchors
            );
            for (class, stats) in &split.per_class {
                println!(
                    "     {class}: videos={} frames={} anchors={}",
                    stats.videos, stats.frames, stats.anchors
                );
            }
        }
        for reason in &report.reasons {
            println!(" ! {reason}");
        }
    }

    if let Some(index) = args.probe_index {
        let pipeline = TransformPipeline::from_config(&cfg.transform);
        log::info!("pipeline: {}", pipeline.describe());
        let ds = file_list
            .get_dataset(args.split, args.sequence_length, pipeline)?
            .with_boundary_policy(args.boundary);
        let window = ds.window(index)?;
        let sample = ds
            .get(index)
            .with_context(|| format!("loading window {index} of {}", args.split))?;
        println!(
            "window {index}: anchor={} positions={:?} shape={:?} label={} ({})",
            window.anchor,
            window.positions,
            sample.shape,
            sample.label,
            file_list
                .classes()
                .get(sample.label)
                .map(String::as_str)
                .unwrap_or("?")
        );
    }
    if report.outcome == ff_dataset::ValidationOutcome::Fail {
        anyhow::bail!("Validation failed; see above.");
    }
    Ok(())
}
