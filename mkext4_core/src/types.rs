//! ext4 核心数据结构
//!
//! 磁盘结构都以 [`RawRegion`](crate::region::RawRegion) 为底层缓冲区，
//! 映射进虚拟内存后仍可通过访问器原地修改。这里给出各结构的字段偏移
//! 以及特性、标志位集合。

use bitflags::bitflags;

bitflags! {
    /// 兼容特性 (s_feature_compat)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FeatureCompat: u32 {
        const DIR_PREALLOC = 0x0001;
        const IMAGIC_INODES = 0x0002;
        const HAS_JOURNAL = 0x0004;
        const EXT_ATTR = 0x0008;
        const RESIZE_INODE = 0x0010;
        const DIR_INDEX = 0x0020;
        const LAZY_BG = 0x0040;
        const EXCLUDE_INODE = 0x0080;
        const EXCLUDE_BITMAP = 0x0100;
        const SPARSE_SUPER2 = 0x0200;
    }
}

bitflags! {
    /// 不兼容特性 (s_feature_incompat)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FeatureIncompat: u32 {
        const COMPRESSION = 0x0001;
        const FILETYPE = 0x0002;
        const RECOVER = 0x0004;
        const JOURNAL_DEV = 0x0008;
        const META_BG = 0x0010;
        const EXTENTS = 0x0040;
        const BIT64 = 0x0080;
        const MMP = 0x0100;
        const FLEX_BG = 0x0200;
        const EA_INODE = 0x0400;
        const DIRDATA = 0x1000;
        const CSUM_SEED = 0x2000;
        const LARGEDIR = 0x4000;
        const INLINE_DATA = 0x8000;
        const ENCRYPT = 0x10000;
    }
}

bitflags! {
    /// 只读兼容特性 (s_feature_ro_compat)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FeatureRoCompat: u32 {
        const SPARSE_SUPER = 0x0001;
        const LARGE_FILE = 0x0002;
        const BTREE_DIR = 0x0004;
        const HUGE_FILE = 0x0008;
        const GDT_CSUM = 0x0010;
        const DIR_NLINK = 0x0020;
        const EXTRA_ISIZE = 0x0040;
        const HAS_SNAPSHOT = 0x0080;
        const QUOTA = 0x0100;
        const BIGALLOC = 0x0200;
        const METADATA_CSUM = 0x0400;
        const REPLICA = 0x0800;
        const READONLY = 0x1000;
        const PROJECT = 0x2000;
    }
}

bitflags! {
    /// Inode 标志 (i_flags)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InodeFlags: u32 {
        const SECRM = 0x0000_0001;
        const UNRM = 0x0000_0002;
        const COMPR = 0x0000_0004;
        const SYNC = 0x0000_0008;
        const IMMUTABLE = 0x0000_0010;
        const APPEND = 0x0000_0020;
        const NODUMP = 0x0000_0040;
        const NOATIME = 0x0000_0080;
        const INDEX = 0x0000_1000;
        const JOURNAL_DATA = 0x0000_4000;
        const NOTAIL = 0x0000_8000;
        const DIRSYNC = 0x0001_0000;
        const TOPDIR = 0x0002_0000;
        const HUGE_FILE = 0x0004_0000;
        const EXTENTS = 0x0008_0000;
        const EA_INODE = 0x0020_0000;
        const INLINE_DATA = 0x1000_0000;
    }
}

/// 本构建器总是启用的特性
pub const EXT4_FEATURE_COMPAT: FeatureCompat = FeatureCompat::SPARSE_SUPER2;
pub const EXT4_FEATURE_INCOMPAT: FeatureIncompat = FeatureIncompat::BIT64
    .union(FeatureIncompat::FILETYPE)
    .union(FeatureIncompat::EXTENTS)
    .union(FeatureIncompat::FLEX_BG);
pub const EXT4_FEATURE_RO_COMPAT: FeatureRoCompat = FeatureRoCompat::SPARSE_SUPER
    .union(FeatureRoCompat::LARGE_FILE)
    .union(FeatureRoCompat::HUGE_FILE);

/// Superblock 字段偏移（struct ext4_super_block）
pub mod sb_off {
    pub const INODES_COUNT: usize = 0; // u32: 总 inode 数
    pub const BLOCKS_COUNT_LO: usize = 4; // u32: 总块数（低32位）
    pub const R_BLOCKS_COUNT_LO: usize = 8; // u32: 保留块数（低32位）
    pub const FREE_BLOCKS_COUNT_LO: usize = 12; // u32: 空闲块数（低32位）
    pub const FREE_INODES_COUNT: usize = 16; // u32: 空闲 inode 数
    pub const FIRST_DATA_BLOCK: usize = 20; // u32: 第一个数据块
    pub const LOG_BLOCK_SIZE: usize = 24; // u32: 块大小 = 2^(10+n)
    pub const LOG_CLUSTER_SIZE: usize = 28; // u32: 簇大小
    pub const BLOCKS_PER_GROUP: usize = 32; // u32: 每组块数
    pub const CLUSTERS_PER_GROUP: usize = 36; // u32: 每组簇数
    pub const INODES_PER_GROUP: usize = 40; // u32: 每组 inode 数
    pub const MTIME: usize = 44; // u32: 挂载时间
    pub const WTIME: usize = 48; // u32: 写入时间
    pub const MNT_COUNT: usize = 52; // u16: 挂载次数
    pub const MAX_MNT_COUNT: usize = 54; // u16: 最大挂载次数
    pub const MAGIC: usize = 56; // u16: 魔数
    pub const STATE: usize = 58; // u16: 文件系统状态
    pub const ERRORS: usize = 60; // u16: 错误处理方式
    pub const LASTCHECK: usize = 64; // u32: 最后检查时间
    pub const REV_LEVEL: usize = 76; // u32: 版本级别
    pub const FIRST_INO: usize = 84; // u32: 第一个非保留 inode
    pub const INODE_SIZE: usize = 88; // u16: inode 大小
    pub const FEATURE_COMPAT: usize = 92; // u32
    pub const FEATURE_INCOMPAT: usize = 96; // u32
    pub const FEATURE_RO_COMPAT: usize = 100; // u32
    pub const UUID: usize = 104; // [u8; 16]
    pub const VOLUME_NAME: usize = 120; // [u8; 16]
    pub const DESC_SIZE: usize = 254; // u16: 块组描述符大小
    pub const MKFS_TIME: usize = 264; // u32: 创建时间
    pub const BLOCKS_COUNT_HI: usize = 336; // u32
    pub const R_BLOCKS_COUNT_HI: usize = 340; // u32
    pub const FREE_BLOCKS_COUNT_HI: usize = 344; // u32
    pub const LOG_GROUPS_PER_FLEX: usize = 372; // u8
}

/// 块组描述符字段偏移（struct ext4_group_desc，64 字节版本）
pub mod bg_off {
    pub const BLOCK_BITMAP_LO: usize = 0; // u32
    pub const INODE_BITMAP_LO: usize = 4; // u32
    pub const INODE_TABLE_LO: usize = 8; // u32
    pub const FREE_BLOCKS_COUNT_LO: usize = 12; // u16
    pub const FREE_INODES_COUNT_LO: usize = 14; // u16
    pub const USED_DIRS_COUNT_LO: usize = 16; // u16
    pub const FLAGS: usize = 18; // u16
    pub const ITABLE_UNUSED_LO: usize = 28; // u16
    pub const BLOCK_BITMAP_HI: usize = 32; // u32
    pub const INODE_BITMAP_HI: usize = 36; // u32
    pub const INODE_TABLE_HI: usize = 40; // u32
    pub const FREE_BLOCKS_COUNT_HI: usize = 44; // u16
    pub const FREE_INODES_COUNT_HI: usize = 46; // u16
    pub const USED_DIRS_COUNT_HI: usize = 48; // u16
    pub const ITABLE_UNUSED_HI: usize = 50; // u16
}

/// Inode 字段偏移（struct ext4_inode）
pub mod inode_off {
    pub const MODE: usize = 0; // u16
    pub const UID: usize = 2; // u16: uid 低16位
    pub const SIZE_LO: usize = 4; // u32
    pub const ATIME: usize = 8; // u32
    pub const CTIME: usize = 12; // u32
    pub const MTIME: usize = 16; // u32
    pub const DTIME: usize = 20; // u32
    pub const GID: usize = 24; // u16: gid 低16位
    pub const LINKS_COUNT: usize = 26; // u16
    pub const BLOCKS_LO: usize = 28; // u32: 以 512 字节为单位
    pub const FLAGS: usize = 32; // u32
    pub const BLOCK: usize = 40; // [u8; 60]: extent 树或内联符号链接
    pub const SIZE_HI: usize = 108; // u32
    pub const BLOCKS_HI: usize = 116; // u16 (osd2)
    pub const UID_HI: usize = 120; // u16 (osd2)
    pub const GID_HI: usize = 122; // u16 (osd2)
}

/// Extent 结构字段偏移（相对于各自 12 字节条目）
pub mod extent_off {
    // struct ext4_extent_header
    pub const EH_MAGIC: usize = 0; // u16
    pub const EH_ENTRIES: usize = 2; // u16
    pub const EH_MAX: usize = 4; // u16
    pub const EH_DEPTH: usize = 6; // u16
    pub const EH_GENERATION: usize = 8; // u32

    // struct ext4_extent（叶子）
    pub const EE_BLOCK: usize = 0; // u32: 起始逻辑块
    pub const EE_LEN: usize = 4; // u16: 块数
    pub const EE_START_HI: usize = 6; // u16
    pub const EE_START_LO: usize = 8; // u32

    // struct ext4_extent_idx（索引）
    pub const EI_BLOCK: usize = 0; // u32
    pub const EI_LEAF_LO: usize = 4; // u32
    pub const EI_LEAF_HI: usize = 8; // u16
}

/// 目录项字段偏移（struct ext4_dir_entry_2）
pub mod dirent_off {
    pub const INODE: usize = 0; // u32
    pub const REC_LEN: usize = 4; // u16
    pub const NAME_LEN: usize = 6; // u8
    pub const FILE_TYPE: usize = 7; // u8
    pub const NAME: usize = 8;
}

/// 拆分 64 位值为 (低32位, 高32位)
#[inline]
pub(crate) fn split_u64(v: u64) -> (u32, u32) {
    (v as u32, (v >> 32) as u32)
}

/// 合并 (低32位, 高32位)
#[inline]
pub(crate) fn join_u64(lo: u32, hi: u32) -> u64 {
    lo as u64 | (hi as u64) << 32
}

/// 向上取整除法
#[inline]
pub(crate) fn div_round_up(x: u64, y: u64) -> u64 {
    x.div_ceil(y)
}
