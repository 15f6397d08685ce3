use std::fs;
use std::path::PathBuf;

use ff_dataset::SamplesPerVideo;
use ff_tools::ToolConfig;

fn write_temp_config(name: &str, contents: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("ff-tools-test-{}-{name}.toml", std::process::id()));
    fs::write(&path, contents).expect("write temp config");
    path
}

#[test]
fn loads_minimal_config() {
    let path = write_temp_config("minimal", "source_root = \"/mnt/ff\"\n");
    let cfg = ToolConfig::from_path(&path).expect("load config");
    assert_eq!(cfg.source_root, PathBuf::from("/mnt/ff"));
    assert_eq!(cfg.output_file, PathBuf::from("/mnt/ff/file_list.json"));
    assert_eq!(cfg.splits_dir, PathBuf::from("/mnt/ff/splits"));
    assert_eq!(cfg.methods.first().map(String::as_str), Some("youtube"));
    assert_eq!(cfg.samples_per_video, SamplesPerVideo::All);
    let _ = fs::remove_file(&path);
}

#[test]
fn loads_full_config() {
    let path = write_temp_config(
        "full",
        r#"
source_root = "/mnt/ff"
output_file = "/tmp/lists/c23.json"
methods = ["youtube", "NeuralTextures"]
compressions = ["c23"]
face_data_type = "face_images"
flow_data_type = "flow_images"
samples_per_video = 20
image_extension = ".PNG"

[transform]
resize = [112, 112]
"#,
    );
    let cfg = ToolConfig::from_path(&path).expect("load config");
    assert_eq!(cfg.output_file, PathBuf::from("/tmp/lists/c23.json"));
    assert_eq!(cfg.methods, vec!["youtube", "NeuralTextures"]);
    assert_eq!(cfg.compressions, vec!["c23"]);
    assert_eq!(cfg.face_data_type, "face_images");
    assert_eq!(cfg.samples_per_video, SamplesPerVideo::Count(20));
    assert_eq!(cfg.image_extension, "PNG");
    assert_eq!(cfg.transform.resize, Some((112, 112)));
    assert_eq!(cfg.transform.center_crop, None);
    let _ = fs::remove_file(&path);
}

#[test]
fn invalid_sample_count_falls_back_to_all() {
    let cfg = ToolConfig::from_toml("samples_per_video = -5\n").expect("parse");
    assert_eq!(cfg.samples_per_video, SamplesPerVideo::All);
}

#[test]
fn missing_file_is_none() {
    assert!(ToolConfig::from_path(std::path::Path::new("/nonexistent/ff-tools.toml")).is_none());
}
