//! 硬件抽象层：时间与随机数来源
//!
//! 镜像构建器本身不访问系统时钟或随机数，所有时间戳和 UUID 都经由
//! [`SystemHal`] 获取，便于在 `no_std` 环境或可重复构建时替换。

use core::time::Duration;

/// 系统硬件抽象层
pub trait SystemHal {
    /// 获取当前时间（UNIX 纪元起），不可用时返回 `None`
    fn now() -> Option<Duration>;

    /// 生成文件系统 UUID
    fn random_uuid() -> [u8; 16];
}

/// 默认实现：不提供时间，UUID 全零
pub struct DummyHal;

impl SystemHal for DummyHal {
    fn now() -> Option<Duration> {
        None
    }

    fn random_uuid() -> [u8; 16] {
        [0; 16]
    }
}

/// 基于标准库的实现
#[cfg(feature = "std")]
pub struct StdHal;

#[cfg(feature = "std")]
impl SystemHal for StdHal {
    fn now() -> Option<Duration> {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()
    }

    fn random_uuid() -> [u8; 16] {
        uuid::Uuid::new_v4().into_bytes()
    }
}

/// 将 HAL 时间转换为 32 位 inode/superblock 时间戳
pub(crate) fn timestamp<H: SystemHal>() -> u32 {
    H::now().map(|d| d.as_secs() as u32).unwrap_or(0)
}
