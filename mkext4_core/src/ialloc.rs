//! Inode 分配功能

use crate::balloc::BlockAllocator;
use crate::block_group::BlockGroup;
use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};

/// 新分配的 inode 位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatedInode {
    /// inode 编号（从 1 开始）
    pub ino: u32,
    /// 所在块组
    pub group: u32,
    /// inode 记录在文件系统中的字节偏移
    pub offset: u64,
}

impl BlockGroup {
    /// 在组内分配第一个空闲 inode
    ///
    /// # 返回
    ///
    /// 组内索引；没有空闲 inode 时返回 `None`
    pub fn allocate_inode(&mut self) -> Result<Option<u32>> {
        if self.free_inodes_count() == 0 {
            return Ok(None);
        }

        for i in self.first_free_inode..self.inode_count() {
            if self.inode_bitmap().get(i as u64)? {
                self.first_free_inode = i + 1;
                continue;
            }

            self.inode_bitmap().set(i as u64, true)?;
            self.desc()
                .set_free_inodes_count(self.free_inodes_count() - 1);
            self.first_free_inode = i + 1;
            return Ok(Some(i));
        }

        Ok(None)
    }
}

impl BlockAllocator {
    /// 按块组顺序分配一个 inode
    pub fn allocate_inode(&mut self) -> Result<AllocatedInode> {
        let block_size = self.superblock().block_size();
        let inodes_per_group = self.superblock().inodes_per_group();

        let mut found = None;
        for group in self.groups_mut() {
            if let Some(index) = group.allocate_inode()? {
                let table = group.desc().inode_table() * block_size;
                found = Some(AllocatedInode {
                    ino: group.index() * inodes_per_group + index + 1,
                    group: group.index(),
                    offset: table + index as u64 * EXT4_INODE_SIZE as u64,
                });
                break;
            }
        }

        let inode = found.ok_or(Error::new(
            ErrorKind::NoSpace,
            "filesystem has run out of inodes",
        ))?;

        let sb = self.superblock();
        sb.set_free_inodes_count(sb.free_inodes_count() - 1);
        self.stats_mut().inode_allocations += 1;
        log::trace!("allocated inode {} at {:#x}", inode.ino, inode.offset);

        Ok(inode)
    }
}
