//! 文件系统配置参数

use alloc::string::String;

use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};

/// 一个位图块能表示的最大数量
const MAX_PER_GROUP: u32 = (EXT4_BLOCK_SIZE * 8) as u32;

/// 文件系统配置参数
#[derive(Debug, Clone)]
pub struct FsConfig {
    pub blocks_per_group: u32,
    pub inodes_per_group: u32,
    pub reserved_blocks: u64,
    pub log_groups_per_flex: u8,
    /// 卷标，最多 16 字节
    pub volume_name: String,
    /// 块大小，只支持 4096
    pub block_size: u32,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            blocks_per_group: EXT4_DEFAULT_BLOCKS_PER_GROUP,
            inodes_per_group: EXT4_DEFAULT_INODES_PER_GROUP,
            reserved_blocks: EXT4_DEFAULT_RESERVED_BLOCKS,
            log_groups_per_flex: 4,
            volume_name: String::new(),
            block_size: EXT4_BLOCK_SIZE as u32,
        }
    }
}

impl FsConfig {
    /// 检查配置
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 1024 {
            return Err(Error::new(
                ErrorKind::Unsupported,
                "1024-byte block size is not supported",
            ));
        }
        if self.block_size as u64 != EXT4_BLOCK_SIZE {
            return Err(Error::new(ErrorKind::Unsupported, "block size must be 4096"));
        }

        for count in [self.blocks_per_group, self.inodes_per_group] {
            if count == 0 || count % 8 != 0 || count > MAX_PER_GROUP {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "per-group counts must be non-zero multiples of 8 within one bitmap block",
                ));
            }
        }

        if self.volume_name.len() > 16 {
            return Err(Error::new(ErrorKind::InvalidInput, "volume name longer than 16 bytes"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        FsConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_geometry() {
        let small = FsConfig {
            block_size: 1024,
            ..Default::default()
        };
        assert_eq!(small.validate().unwrap_err().kind(), ErrorKind::Unsupported);

        for bpg in [0, 12, 32776] {
            let cfg = FsConfig {
                blocks_per_group: bpg,
                ..Default::default()
            };
            assert_eq!(cfg.validate().unwrap_err().kind(), ErrorKind::InvalidInput);
        }

        let named = FsConfig {
            volume_name: "a-very-long-volume-name".into(),
            ..Default::default()
        };
        assert!(named.validate().is_err());
    }
}
