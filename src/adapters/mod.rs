// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod fs_local;
#[cfg(feature = "libav")]
pub mod probe_libav;
pub mod probe_ffprobe;
pub mod source_auto;
pub mod source_local;
pub mod source_ytdlp;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::FFmpegAdapter;
pub use fs_local::FsLocalAdapter;
#[cfg(feature = "libav")]
pub use probe_libav::ProbeLibavAdapter;
pub use probe_ffprobe::FFprobeAdapter;
pub use source_auto::AutoSource;
pub use source_local::LocalFileSource;
pub use source_ytdlp::YtDlpSource;
pub use toml_config::{AppConfig, TomlConfigAdapter};
pub use tracing_log::{LogFormat, TracingLogAdapter};
