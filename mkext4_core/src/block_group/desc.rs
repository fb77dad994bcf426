//! 块组描述符

use crate::consts::*;
use crate::region::{RawRegion, Region};
use crate::types::{bg_off, join_u64, split_u64};

/// 64 字节块组描述符
#[derive(Clone)]
pub struct GroupDescriptor {
    raw: RawRegion,
}

impl GroupDescriptor {
    pub fn new() -> Self {
        Self {
            raw: RawRegion::new(EXT4_GROUP_DESC_SIZE_64 as usize),
        }
    }

    /// 从已有字节解析
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let desc = Self::new();
        let n = core::cmp::min(bytes.len(), EXT4_GROUP_DESC_SIZE_64 as usize);
        desc.raw.write_bytes(0, &bytes[..n]);
        desc
    }

    pub fn region(&self) -> Region {
        Region::Raw(self.raw.clone())
    }

    fn read_lo_hi32(&self, lo: usize, hi: usize) -> u64 {
        join_u64(self.raw.read_u32(lo), self.raw.read_u32(hi))
    }

    fn write_lo_hi32(&self, lo: usize, hi: usize, v: u64) {
        let (l, h) = split_u64(v);
        self.raw.write_u32(lo, l);
        self.raw.write_u32(hi, h);
    }

    fn read_lo_hi16(&self, lo: usize, hi: usize) -> u32 {
        self.raw.read_u16(lo) as u32 | (self.raw.read_u16(hi) as u32) << 16
    }

    fn write_lo_hi16(&self, lo: usize, hi: usize, v: u32) {
        self.raw.write_u16(lo, v as u16);
        self.raw.write_u16(hi, (v >> 16) as u16);
    }

    pub fn block_bitmap(&self) -> u64 {
        self.read_lo_hi32(bg_off::BLOCK_BITMAP_LO, bg_off::BLOCK_BITMAP_HI)
    }

    pub fn set_block_bitmap(&self, block: u64) {
        self.write_lo_hi32(bg_off::BLOCK_BITMAP_LO, bg_off::BLOCK_BITMAP_HI, block);
    }

    pub fn inode_bitmap(&self) -> u64 {
        self.read_lo_hi32(bg_off::INODE_BITMAP_LO, bg_off::INODE_BITMAP_HI)
    }

    pub fn set_inode_bitmap(&self, block: u64) {
        self.write_lo_hi32(bg_off::INODE_BITMAP_LO, bg_off::INODE_BITMAP_HI, block);
    }

    pub fn inode_table(&self) -> u64 {
        self.read_lo_hi32(bg_off::INODE_TABLE_LO, bg_off::INODE_TABLE_HI)
    }

    pub fn set_inode_table(&self, block: u64) {
        self.write_lo_hi32(bg_off::INODE_TABLE_LO, bg_off::INODE_TABLE_HI, block);
    }

    pub fn free_blocks_count(&self) -> u32 {
        self.read_lo_hi16(bg_off::FREE_BLOCKS_COUNT_LO, bg_off::FREE_BLOCKS_COUNT_HI)
    }

    pub fn set_free_blocks_count(&self, count: u32) {
        self.write_lo_hi16(bg_off::FREE_BLOCKS_COUNT_LO, bg_off::FREE_BLOCKS_COUNT_HI, count);
    }

    pub fn free_inodes_count(&self) -> u32 {
        self.read_lo_hi16(bg_off::FREE_INODES_COUNT_LO, bg_off::FREE_INODES_COUNT_HI)
    }

    pub fn set_free_inodes_count(&self, count: u32) {
        self.write_lo_hi16(bg_off::FREE_INODES_COUNT_LO, bg_off::FREE_INODES_COUNT_HI, count);
    }

    pub fn used_dirs_count(&self) -> u32 {
        self.read_lo_hi16(bg_off::USED_DIRS_COUNT_LO, bg_off::USED_DIRS_COUNT_HI)
    }

    pub fn set_used_dirs_count(&self, count: u32) {
        self.write_lo_hi16(bg_off::USED_DIRS_COUNT_LO, bg_off::USED_DIRS_COUNT_HI, count);
    }

    pub fn itable_unused(&self) -> u32 {
        self.read_lo_hi16(bg_off::ITABLE_UNUSED_LO, bg_off::ITABLE_UNUSED_HI)
    }

    pub fn flags(&self) -> u16 {
        self.raw.read_u16(bg_off::FLAGS)
    }

    pub fn set_flags(&self, flags: u16) {
        self.raw.write_u16(bg_off::FLAGS, flags);
    }

    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags() & flag != 0
    }
}

impl Default for GroupDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_fields() {
        let d = GroupDescriptor::new();
        d.set_inode_table(0x2_0000_0010);
        d.set_free_blocks_count(0x1_8000);
        d.set_used_dirs_count(3);
        d.set_flags(EXT4_BG_INODE_ZEROED);

        assert_eq!(d.inode_table(), 0x2_0000_0010);
        assert_eq!(d.free_blocks_count(), 0x1_8000);
        assert_eq!(d.used_dirs_count(), 3);
        assert!(d.has_flag(EXT4_BG_INODE_ZEROED));

        let bytes = d.region().to_vec().unwrap();
        assert_eq!(bytes.len(), 64);
        assert_eq!(bytes[12..14], [0x00, 0x80]);
        assert_eq!(bytes[44..46], [0x01, 0x00]);
        assert_eq!(GroupDescriptor::from_bytes(&bytes).inode_table(), 0x2_0000_0010);
    }
}
