use std::path::{Path, PathBuf};

use ff_dataset::{SamplesPerVideo, TransformConfig};
use serde::Deserialize;

const DEFAULT_CONFIG_NAME: &str = "ff-tools.toml";
const DEFAULT_METHODS: [&str; 5] = [
    "youtube",
    "Deepfakes",
    "Face2Face",
    "FaceSwap",
    "NeuralTextures",
];

#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub source_root: PathBuf,
    pub output_file: PathBuf,
    pub splits_dir: PathBuf,
    /// Class names in label order; `youtube` is the pristine class.
    pub methods: Vec<String>,
    pub compressions: Vec<String>,
    pub face_data_type: String,
    pub flow_data_type: String,
    pub samples_per_video: SamplesPerVideo,
    pub image_extension: String,
    pub transform: TransformConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        let source_root = PathBuf::from("data/faceforensics");
        Self {
            output_file: source_root.join("file_list.json"),
            splits_dir: source_root.join("splits"),
            source_root,
            methods: DEFAULT_METHODS.iter().map(|m| m.to_string()).collect(),
            compressions: vec!["c40".to_string()],
            face_data_type: "face_images_tracked".to_string(),
            flow_data_type: "flow_images_tracked".to_string(),
            samples_per_video: SamplesPerVideo::All,
            image_extension: "png".to_string(),
            transform: TransformConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ToolConfigFile {
    source_root: Option<String>,
    output_file: Option<String>,
    splits_dir: Option<String>,
    methods: Option<Vec<String>>,
    compressions: Option<Vec<String>>,
    face_data_type: Option<String>,
    flow_data_type: Option<String>,
    samples_per_video: Option<i64>,
    image_extension: Option<String>,
    transform: Option<TransformConfig>,
}

impl ToolConfig {
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("FF_TOOLS_CONFIG") {
            let cfg = Self::from_path(Path::new(&path)).unwrap_or_default();
            cfg.warn_if_invalid();
            return cfg;
        }
        let cfg = Self::from_path(Path::new(DEFAULT_CONFIG_NAME)).unwrap_or_default();
        cfg.warn_if_invalid();
        cfg
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let raw = std::fs::read_to_string(path).ok()?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Option<Self> {
        match toml::from_str::<ToolConfigFile>(raw) {
            Ok(file) => Some(Self::from_file(file)),
            Err(e) => {
                log::warn!("tools config: parse error: {e}");
                None
            }
        }
    }

    fn from_file(file: ToolConfigFile) -> Self {
        let defaults = ToolConfig::default();
        let source_root = file
            .source_root
            .map(|v| expand_path(&v))
            .unwrap_or(defaults.source_root);
        let output_file = file
            .output_file
            .map(|v| expand_path(&v))
            .unwrap_or_else(|| source_root.join("file_list.json"));
        let splits_dir = file
            .splits_dir
            .map(|v| expand_path(&v))
            .unwrap_or_else(|| source_root.join("splits"));
        let samples_per_video = match file.samples_per_video {
            Some(v) => SamplesPerVideo::from_signed(v).unwrap_or_else(|e| {
                log::warn!("tools config: {e}; taking every frame");
                SamplesPerVideo::All
            }),
            None => defaults.samples_per_video,
        };

        ToolConfig {
            source_root,
            output_file,
            splits_dir,
            methods: file.methods.unwrap_or(defaults.methods),
            compressions: file.compressions.unwrap_or(defaults.compressions),
            face_data_type: file
                .face_data_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(defaults.face_data_type),
            flow_data_type: file
                .flow_data_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(defaults.flow_data_type),
            samples_per_video,
            image_extension: file
                .image_extension
                .map(|e| e.trim_start_matches('.').to_string())
                .unwrap_or(defaults.image_extension),
            transform: file.transform.unwrap_or_default(),
        }
    }

    pub fn warn_if_invalid(&self) {
        if self.methods.is_empty() {
            log::warn!("tools config: methods is empty; the file list will have no classes");
        }
        if self.compressions.is_empty() {
            log::warn!("tools config: compressions is empty; no videos will be indexed");
        }
        if self.face_data_type == self.flow_data_type {
            log::warn!(
                "tools config: face and flow data types are both `{}`",
                self.face_data_type
            );
        }
        if !self.source_root.exists() {
            log::warn!(
                "tools config: source_root {} does not exist",
                self.source_root.display()
            );
        }
    }
}

fn expand_path(raw: &str) -> PathBuf {
    let mut out = raw.to_string();
    if let Some(stripped) = out.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

fn expand_env(input: &str) -> String {
    let mut out = String::new();
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match std::env::var(key) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => out.push_str(&format!("${{{key}}}")),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_variables_only() {
        std::env::set_var("FF_TOOLS_TEST_ROOT", "/mnt/ff");
        assert_eq!(expand_env("${FF_TOOLS_TEST_ROOT}/c40"), "/mnt/ff/c40");
        assert_eq!(
            expand_env("${FF_TOOLS_TEST_UNSET_VAR}/x"),
            "${FF_TOOLS_TEST_UNSET_VAR}/x"
        );
        assert_eq!(expand_env("plain/${unterminated"), "plain/${unterminated");
    }
}
