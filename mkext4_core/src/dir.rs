//! 线性目录
//!
//! 目录内容是按块排列的目录项链：每项由 inode 号、记录长度、名称长度、
//! 文件类型和名称组成，记录长度把块内剩余空间留给最后一项。
//!
//! 新目录项总是从当前块最后一项的空闲尾部切出；块满时启用下一个块，
//! 没有备用块时通过 extent 树把目录扩大为原来的 4 倍。

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};
use crate::extent::{split_into_blocks, Extent, ExtentTree};
use crate::fs::volume::Volume;
use crate::inode::{FileType, InodeRecord};
use crate::region::{RawRegion, Region};
use crate::types::dirent_off;

/// 目录项占用的最小记录长度（4 字节对齐）
#[inline]
pub fn rec_len_for(name_len: usize) -> usize {
    (EXT4_DIR_ENTRY_HEADER_SIZE + name_len + 3) & !3
}

/// 检查目录项名称
pub fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::new(ErrorKind::InvalidInput, "empty file name"));
    }
    if name.len() > EXT4_NAME_MAX {
        return Err(Error::new(ErrorKind::InvalidInput, "file name too long"));
    }
    if name.bytes().any(|b| b == b'/' || b == 0) {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "file name contains '/' or NUL",
        ));
    }
    Ok(())
}

/// 一个目录块
struct DirBlock {
    raw: RawRegion,
    /// 最后一项的块内偏移；`None` 表示块内只有占位项
    last: Option<usize>,
}

impl DirBlock {
    /// 新块中只有一个覆盖整块的空占位项
    fn new(block_size: usize) -> Self {
        let raw = RawRegion::new(block_size);
        raw.write_u32(dirent_off::INODE, 0);
        raw.write_u16(dirent_off::REC_LEN, block_size as u16);
        Self { raw, last: None }
    }

    fn write_entry(&self, off: usize, ino: u32, rec_len: usize, file_type: u8, name: &str) {
        self.raw.write_u32(off + dirent_off::INODE, ino);
        self.raw.write_u16(off + dirent_off::REC_LEN, rec_len as u16);
        self.raw.write_u8(off + dirent_off::NAME_LEN, name.len() as u8);
        self.raw.write_u8(off + dirent_off::FILE_TYPE, file_type);
        self.raw.write_bytes(off + dirent_off::NAME, name.as_bytes());
    }

    /// 尝试放入一项，空间不足时返回 `false`
    fn try_insert(&mut self, ino: u32, file_type: u8, name: &str) -> bool {
        let block_size = self.raw.size() as usize;
        let need = rec_len_for(name.len());

        let Some(last) = self.last else {
            self.write_entry(0, ino, block_size, file_type, name);
            self.last = Some(0);
            return true;
        };

        let last_rec = self.raw.read_u16(last + dirent_off::REC_LEN) as usize;
        let last_need = rec_len_for(self.raw.read_u8(last + dirent_off::NAME_LEN) as usize);
        if last_rec < last_need + need {
            return false;
        }

        // 从最后一项的尾部切出新项
        let off = last + last_need;
        self.raw.write_u16(last + dirent_off::REC_LEN, last_need as u16);
        self.write_entry(off, ino, last_rec - last_need, file_type, name);
        self.last = Some(off);
        true
    }
}

/// 构建期的目录
pub struct Directory {
    entries: BTreeMap<String, u32>,
    blocks: Vec<DirBlock>,
    /// 已启用的块数，其后的块是增长时预留的备用块
    active: usize,
    block_size: u64,
}

impl Directory {
    /// 在目录 inode 已分配的单个 extent 上建立空目录
    pub(crate) fn new(vol: &mut Volume, tree: &ExtentTree) -> Result<Self> {
        let extents = tree.extents()?;
        if extents.len() != 1 {
            return Err(Error::new(
                ErrorKind::Corrupted,
                "directory must start with exactly one extent",
            ));
        }

        let mut dir = Self {
            entries: BTreeMap::new(),
            blocks: Vec::new(),
            active: 1,
            block_size: vol.block_size(),
        };
        dir.map_blocks(vol, &extents)?;
        Ok(dir)
    }

    fn map_blocks(&mut self, vol: &mut Volume, extents: &[Extent]) -> Result<()> {
        for e in split_into_blocks(extents) {
            let block = DirBlock::new(self.block_size as usize);
            vol.map_raw_extent(Region::Raw(block.raw.clone()), &e)?;
            self.blocks.push(block);
        }
        Ok(())
    }

    /// 查找子项
    pub fn get(&self, name: &str) -> Option<u32> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// 按名称排序的全部目录项（含 `.` 和 `..`）
    pub fn entries(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 已分配的目录块数（含备用块）
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// 已写入目录项的块数
    pub fn active_blocks(&self) -> usize {
        self.active
    }

    /// 添加目录项
    ///
    /// 只写目录内容，子节点的链接数由调用者维护。
    pub(crate) fn add_entry(
        &mut self,
        vol: &mut Volume,
        tree: &mut ExtentTree,
        record: &InodeRecord,
        ino: u32,
        file_type: FileType,
        name: &str,
    ) -> Result<()> {
        check_name(name)?;
        if self.entries.contains_key(name) {
            return Err(Error::new(ErrorKind::AlreadyExists, "directory entry exists"));
        }
        if rec_len_for(name.len()) > self.block_size as usize {
            return Err(Error::new(ErrorKind::InvalidInput, "file name too long"));
        }

        loop {
            if self.blocks[self.active - 1].try_insert(ino, file_type.dirent_type(), name) {
                break;
            }
            if self.active < self.blocks.len() {
                self.active += 1;
                continue;
            }
            self.increase_size(vol, tree, record)?;
        }

        self.entries.insert(name.to_string(), ino);
        Ok(())
    }

    /// 把目录扩大为原来的 4 倍并启用下一个块
    fn increase_size(
        &mut self,
        vol: &mut Volume,
        tree: &mut ExtentTree,
        record: &InodeRecord,
    ) -> Result<()> {
        let total = self.blocks.len() as u64;
        let added = tree.allocate_blocks(vol, total * 3)?;
        self.map_blocks(vol, &added)?;
        self.active += 1;

        let blocks = self.blocks.len() as u64;
        record.set_size(blocks * self.block_size);
        record.set_blocks((blocks + tree.metadata_blocks()) * self.block_size / 512);

        log::debug!("directory grew from {} to {} blocks", total, blocks);
        Ok(())
    }
}
