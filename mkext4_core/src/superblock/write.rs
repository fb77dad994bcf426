//! Superblock 初始化和更新

use super::Superblock;
use crate::consts::*;
use crate::types::{
    split_u64, sb_off, EXT4_FEATURE_COMPAT, EXT4_FEATURE_INCOMPAT, EXT4_FEATURE_RO_COMPAT,
};

/// 新文件系统的几何参数
#[derive(Debug, Clone)]
pub struct SuperblockGeometry<'a> {
    pub blocks_count: u64,
    pub inodes_count: u32,
    pub blocks_per_group: u32,
    pub inodes_per_group: u32,
    pub reserved_blocks: u64,
    pub log_groups_per_flex: u8,
    pub volume_name: &'a str,
    pub uuid: [u8; 16],
    pub time: u32,
}

impl Superblock {
    /// 按几何参数初始化全部字段
    ///
    /// 空闲块数初始为总块数，之后由分配器逐步扣减。
    pub fn initialize(&self, geo: &SuperblockGeometry<'_>) {
        let raw = &self.raw;
        raw.with_mut(|b| b.fill(0));

        raw.write_u16(sb_off::MAGIC, EXT4_SUPERBLOCK_MAGIC);
        self.set_blocks_count(geo.blocks_count);
        raw.write_u32(sb_off::INODES_COUNT, geo.inodes_count);

        let (lo, hi) = split_u64(core::cmp::min(geo.reserved_blocks, geo.blocks_count));
        raw.write_u32(sb_off::R_BLOCKS_COUNT_LO, lo);
        raw.write_u32(sb_off::R_BLOCKS_COUNT_HI, hi);

        raw.write_u32(sb_off::LOG_BLOCK_SIZE, EXT4_LOG_BLOCK_SIZE);
        raw.write_u32(sb_off::LOG_CLUSTER_SIZE, EXT4_LOG_BLOCK_SIZE);
        raw.write_u32(sb_off::BLOCKS_PER_GROUP, geo.blocks_per_group);
        raw.write_u32(sb_off::CLUSTERS_PER_GROUP, geo.blocks_per_group);
        raw.write_u32(sb_off::INODES_PER_GROUP, geo.inodes_per_group);
        raw.write_u32(sb_off::FIRST_DATA_BLOCK, 0);

        self.set_free_blocks_count(geo.blocks_count);
        self.set_free_inodes_count(geo.inodes_count);

        raw.write_u16(sb_off::MAX_MNT_COUNT, u16::MAX);
        raw.write_u16(sb_off::STATE, EXT4_SUPER_STATE_VALID);
        raw.write_u16(sb_off::ERRORS, EXT4_ERRORS_RO);
        raw.write_u32(sb_off::REV_LEVEL, 1);
        raw.write_u32(sb_off::FIRST_INO, EXT4_FIRST_INO);
        raw.write_u16(sb_off::INODE_SIZE, EXT4_INODE_SIZE);
        raw.write_u16(sb_off::DESC_SIZE, EXT4_GROUP_DESC_SIZE_64);
        raw.write_u8(sb_off::LOG_GROUPS_PER_FLEX, geo.log_groups_per_flex);

        raw.write_u32(sb_off::FEATURE_COMPAT, EXT4_FEATURE_COMPAT.bits());
        raw.write_u32(sb_off::FEATURE_INCOMPAT, EXT4_FEATURE_INCOMPAT.bits());
        raw.write_u32(sb_off::FEATURE_RO_COMPAT, EXT4_FEATURE_RO_COMPAT.bits());

        self.set_uuid(geo.uuid);
        self.set_volume_name(geo.volume_name);
        self.set_mkfs_time(geo.time);
        self.set_lastcheck(geo.time);
    }

    fn set_blocks_count(&self, count: u64) {
        let (lo, hi) = split_u64(count);
        self.raw.write_u32(sb_off::BLOCKS_COUNT_LO, lo);
        self.raw.write_u32(sb_off::BLOCKS_COUNT_HI, hi);
    }

    /// 更新空闲块数
    pub fn set_free_blocks_count(&self, count: u64) {
        let (lo, hi) = split_u64(count);
        self.raw.write_u32(sb_off::FREE_BLOCKS_COUNT_LO, lo);
        self.raw.write_u32(sb_off::FREE_BLOCKS_COUNT_HI, hi);
    }

    /// 更新空闲 inode 数
    pub fn set_free_inodes_count(&self, count: u32) {
        self.raw.write_u32(sb_off::FREE_INODES_COUNT, count);
    }

    pub fn set_uuid(&self, uuid: [u8; 16]) {
        self.raw.write_bytes(sb_off::UUID, &uuid);
    }

    /// 设置卷名称，超过 16 字节的部分被截断
    pub fn set_volume_name(&self, name: &str) {
        let mut buf = [0u8; 16];
        let n = core::cmp::min(name.len(), buf.len());
        buf[..n].copy_from_slice(&name.as_bytes()[..n]);
        self.raw.write_bytes(sb_off::VOLUME_NAME, &buf);
    }

    pub fn set_mkfs_time(&self, time: u32) {
        self.raw.write_u32(sb_off::MKFS_TIME, time);
    }

    pub fn set_lastcheck(&self, time: u32) {
        self.raw.write_u32(sb_off::LASTCHECK, time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureIncompat;

    fn geometry() -> SuperblockGeometry<'static> {
        SuperblockGeometry {
            blocks_count: 16384,
            inodes_count: 8192,
            blocks_per_group: 32768,
            inodes_per_group: 8192,
            reserved_blocks: 3276,
            log_groups_per_flex: 4,
            volume_name: "rootfs",
            uuid: [7; 16],
            time: 1_700_000_000,
        }
    }

    #[test]
    fn test_initialize() {
        let sb = Superblock::new();
        assert!(!sb.is_valid());
        sb.initialize(&geometry());

        assert!(sb.is_valid());
        assert!(sb.is_clean());
        assert_eq!(sb.block_size(), 4096);
        assert_eq!(sb.blocks_count(), 16384);
        assert_eq!(sb.free_blocks_count(), 16384);
        assert_eq!(sb.r_blocks_count(), 3276);
        assert_eq!(sb.block_group_count(), 1);
        assert_eq!(sb.inode_size(), 256);
        assert_eq!(sb.desc_size(), 64);
        assert_eq!(sb.first_ino(), 11);
        assert_eq!(sb.uuid(), [7; 16]);
        assert_eq!(sb.volume_name(), "rootfs");
        assert_eq!(sb.mkfs_time(), 1_700_000_000);
        assert_eq!(sb.log_groups_per_flex(), 4);
        assert!(sb.feature_incompat().contains(FeatureIncompat::BIT64 | FeatureIncompat::FLEX_BG));
    }

    #[test]
    fn test_free_counts_wide() {
        let sb = Superblock::new();
        sb.set_free_blocks_count(0x1_0000_0002);
        assert_eq!(sb.free_blocks_count(), 0x1_0000_0002);
    }

    #[test]
    fn test_reserved_clamped_to_size() {
        let sb = Superblock::new();
        let mut geo = geometry();
        geo.blocks_count = 1000;
        sb.initialize(&geo);
        assert_eq!(sb.r_blocks_count(), 1000);
    }
}
