use clap::Parser;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "mkext4",
    about = "Build an ext4 filesystem image without mounting anything",
    long_about = "Create an ext4 image of the requested size and populate it from tar archives and host directories"
)]
pub struct Args {
    /// Output image file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Image size in MiB
    #[arg(short = 's', long = "size", default_value = "64")]
    pub size: u64,

    /// Host directory to copy into the image root (repeatable)
    #[arg(short = 'd', long = "dir", value_name = "HOST_DIR")]
    pub dirs: Vec<PathBuf>,

    /// Tar archives (.tar, .tar.gz, .tgz) applied in order
    pub archives: Vec<PathBuf>,

    /// Use a fixed UUID and timestamp for reproducible images
    #[arg(long = "deterministic")]
    pub deterministic: bool,

    /// Filesystem UUID in deterministic mode (hyphenated or 32 hex digits)
    #[arg(long = "uuid", value_name = "UUID", value_parser = parse_uuid)]
    pub uuid: Option<[u8; 16]>,

    /// Timestamp in deterministic mode (seconds since the epoch)
    #[arg(long = "timestamp", value_name = "SECS", default_value = "0")]
    pub timestamp: u32,

    /// Volume label (at most 16 bytes)
    #[arg(long = "volume-name")]
    pub volume_name: Option<String>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// 解析 UUID：带连字符的标准格式或 32 位十六进制
pub fn parse_uuid(s: &str) -> Result<[u8; 16], String> {
    Uuid::parse_str(s)
        .map(Uuid::into_bytes)
        .map_err(|e| format!("invalid UUID {s:?}: {e}"))
}
