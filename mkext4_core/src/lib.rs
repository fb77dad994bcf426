//! mkext4-core: 纯 Rust 的 ext4 镜像构建器
//!
//! 不依赖内核、挂载或外部 mkfs 工具，在进程内直接生成可挂载的 ext4 镜像。
//! 镜像内容建立在稀疏的虚拟地址空间（[`vm::VirtualMemory`]）之上：
//! 各种磁盘结构以内存区域（[`region::Region`]）的形式映射到镜像偏移处，
//! 只有在调用者顺序读出时才真正拼接成字节流。

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// 公共模块
pub mod consts;
pub mod error;
pub mod hal;
pub mod region;
pub mod vm;
pub mod types;
pub mod superblock;
pub mod block_group;
pub mod balloc;
pub mod ialloc;
pub mod extent;
pub mod inode;
pub mod dir;
pub mod fs;

// 重新导出常用类型
pub use consts::*;
pub use error::{Error, ErrorKind, Result};
pub use hal::{DummyHal, SystemHal};
#[cfg(feature = "std")]
pub use hal::StdHal;
pub use region::Region;
pub use vm::VirtualMemory;

// 重新导出核心API
pub use extent::{Extent, ExtentTree};
pub use fs::{DirEntry, Ext4Filesystem, FileType, FsConfig, Metadata, StatFs};
