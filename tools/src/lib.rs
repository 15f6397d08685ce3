pub mod builder;
pub mod config;
pub mod layout;
pub mod splits;

pub use builder::{build_file_list, collect_videos, VideoFrames};
pub use config::ToolConfig;
pub use layout::FaceForensicsLayout;
pub use splits::SplitMembership;
