//! 文件系统高级 API
//!
//! 这个模块提供构建 ext4 镜像的完整接口：创建文件系统、
//! 建立目录/文件/链接、修改属性，以及构建完成后的读回检查。

mod config;
mod filesystem;
mod metadata;
mod path;
mod read;
pub(crate) mod volume;

pub use config::FsConfig;
pub use filesystem::Ext4Filesystem;
pub use metadata::{DirEntry, Metadata, StatFs};
pub use path::clean as clean_path;

pub use crate::inode::FileType;
