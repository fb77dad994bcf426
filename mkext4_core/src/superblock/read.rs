//! Superblock 字段读取

use alloc::string::String;

use super::Superblock;
use crate::consts::*;
use crate::types::{
    div_round_up, join_u64, sb_off, FeatureCompat, FeatureIncompat, FeatureRoCompat,
};

impl Superblock {
    /// 检查魔数
    pub fn is_valid(&self) -> bool {
        self.magic() == EXT4_SUPERBLOCK_MAGIC
    }

    pub fn magic(&self) -> u16 {
        self.raw.read_u16(sb_off::MAGIC)
    }

    /// 获取块大小
    pub fn block_size(&self) -> u64 {
        1024u64 << self.raw.read_u32(sb_off::LOG_BLOCK_SIZE)
    }

    /// 获取总块数
    pub fn blocks_count(&self) -> u64 {
        join_u64(
            self.raw.read_u32(sb_off::BLOCKS_COUNT_LO),
            self.raw.read_u32(sb_off::BLOCKS_COUNT_HI),
        )
    }

    /// 获取保留块数
    pub fn r_blocks_count(&self) -> u64 {
        join_u64(
            self.raw.read_u32(sb_off::R_BLOCKS_COUNT_LO),
            self.raw.read_u32(sb_off::R_BLOCKS_COUNT_HI),
        )
    }

    /// 获取空闲块数
    pub fn free_blocks_count(&self) -> u64 {
        join_u64(
            self.raw.read_u32(sb_off::FREE_BLOCKS_COUNT_LO),
            self.raw.read_u32(sb_off::FREE_BLOCKS_COUNT_HI),
        )
    }

    pub fn inodes_count(&self) -> u32 {
        self.raw.read_u32(sb_off::INODES_COUNT)
    }

    pub fn free_inodes_count(&self) -> u32 {
        self.raw.read_u32(sb_off::FREE_INODES_COUNT)
    }

    pub fn blocks_per_group(&self) -> u32 {
        self.raw.read_u32(sb_off::BLOCKS_PER_GROUP)
    }

    pub fn inodes_per_group(&self) -> u32 {
        self.raw.read_u32(sb_off::INODES_PER_GROUP)
    }

    pub fn first_data_block(&self) -> u32 {
        self.raw.read_u32(sb_off::FIRST_DATA_BLOCK)
    }

    pub fn inode_size(&self) -> u16 {
        self.raw.read_u16(sb_off::INODE_SIZE)
    }

    pub fn desc_size(&self) -> u16 {
        self.raw.read_u16(sb_off::DESC_SIZE)
    }

    pub fn first_ino(&self) -> u32 {
        self.raw.read_u32(sb_off::FIRST_INO)
    }

    /// 获取块组数量
    pub fn block_group_count(&self) -> u32 {
        let bpg = self.blocks_per_group() as u64;
        if bpg == 0 {
            return 0;
        }
        div_round_up(self.blocks_count(), bpg) as u32
    }

    pub fn feature_compat(&self) -> FeatureCompat {
        FeatureCompat::from_bits_retain(self.raw.read_u32(sb_off::FEATURE_COMPAT))
    }

    pub fn feature_incompat(&self) -> FeatureIncompat {
        FeatureIncompat::from_bits_retain(self.raw.read_u32(sb_off::FEATURE_INCOMPAT))
    }

    pub fn feature_ro_compat(&self) -> FeatureRoCompat {
        FeatureRoCompat::from_bits_retain(self.raw.read_u32(sb_off::FEATURE_RO_COMPAT))
    }

    pub fn uuid(&self) -> [u8; 16] {
        let mut uuid = [0u8; 16];
        self.raw.read_bytes(sb_off::UUID, &mut uuid);
        uuid
    }

    /// 获取卷名称（到第一个 NUL 为止）
    pub fn volume_name(&self) -> String {
        let mut name = [0u8; 16];
        self.raw.read_bytes(sb_off::VOLUME_NAME, &mut name);
        let len = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        String::from_utf8_lossy(&name[..len]).into_owned()
    }

    pub fn mkfs_time(&self) -> u32 {
        self.raw.read_u32(sb_off::MKFS_TIME)
    }

    pub fn lastcheck(&self) -> u32 {
        self.raw.read_u32(sb_off::LASTCHECK)
    }

    pub fn log_groups_per_flex(&self) -> u8 {
        self.raw.read_u8(sb_off::LOG_GROUPS_PER_FLEX)
    }

    /// 文件系统是否处于干净状态
    pub fn is_clean(&self) -> bool {
        self.raw.read_u16(sb_off::STATE) & EXT4_SUPER_STATE_VALID != 0
    }
}
