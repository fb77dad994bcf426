//! 读回接口
//!
//! 构建完成（或进行中）的文件系统通过虚拟内存读回：文件内容按 extent
//! 从映射后的镜像字节中读取，目录从映射后的目录块中解析，
//! 与最终写出的镜像看到的是同一份数据。

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use byteorder::{ByteOrder, LittleEndian};

use super::filesystem::Ext4Filesystem;
use super::metadata::{DirEntry, Metadata, StatFs};
use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};
use crate::extent::{split_into_blocks, Extent};
use crate::hal::SystemHal;
use crate::inode::{FileType, Inode};
use crate::types::dirent_off;

impl<H: SystemHal> Ext4Filesystem<H> {
    /// 获取文件元数据
    pub fn metadata(&self, path: &str) -> Result<Metadata> {
        let ino = self.resolve(path)?;
        let record = self.inode(ino)?.record();
        Ok(Metadata {
            ino,
            mode: record.mode(),
            file_type: record.file_type(),
            size: record.size(),
            nlink: record.links_count(),
            uid: record.uid(),
            gid: record.gid(),
            blocks: record.blocks(),
            atime: record.atime(),
            mtime: record.mtime(),
            ctime: record.ctime(),
        })
    }

    /// 读取整个文件内容
    ///
    /// # 错误
    ///
    /// - `ErrorKind::NotFound` - 路径不存在
    /// - `ErrorKind::InvalidInput` - 路径是目录
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let inode = self.inode(self.resolve(path)?)?;
        if inode.is_dir() {
            return Err(Error::new(ErrorKind::InvalidInput, "is a directory"));
        }
        self.read_contents(inode)
    }

    /// 读取符号链接目标
    pub fn read_link(&self, path: &str) -> Result<String> {
        let inode = self.inode(self.resolve(path)?)?;
        if inode.file_type() != FileType::Symlink {
            return Err(Error::new(ErrorKind::InvalidInput, "not a symbolic link"));
        }
        String::from_utf8(self.read_contents(inode)?)
            .map_err(|_| Error::new(ErrorKind::Corrupted, "symlink target is not valid UTF-8"))
    }

    /// 列出目录项（含 `.` 和 `..`），按磁盘顺序
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let inode = self.inode(self.resolve(path)?)?;
        if !inode.is_dir() {
            return Err(Error::new(ErrorKind::InvalidInput, "not a directory"));
        }

        let bs = self.vol.block_size();
        let used_blocks = inode.record().size() / bs;
        let mut buf = vec![0u8; bs as usize];
        let mut entries = Vec::new();

        for block in split_into_blocks(&self.inode_extents(inode)?) {
            if block.logical_block() as u64 >= used_blocks {
                break;
            }
            self.vol.read_at(&mut buf, block.physical_block() * bs)?;
            parse_dir_block(&buf, &mut entries)?;
        }

        Ok(entries)
    }

    /// 文件的 extent 列表
    pub fn extents(&self, path: &str) -> Result<Vec<Extent>> {
        let inode = self.inode(self.resolve(path)?)?;
        if !inode.record().has_extents() {
            return Ok(Vec::new());
        }
        self.inode_extents(inode)
    }

    /// 文件系统统计信息
    pub fn statfs(&self) -> StatFs {
        StatFs {
            blocks_count: self.sb.blocks_count(),
            free_blocks_count: self.sb.free_blocks_count(),
            inodes_count: self.sb.inodes_count(),
            free_inodes_count: self.sb.free_inodes_count(),
            block_size: self.sb.block_size(),
        }
    }

    fn inode_extents(&self, inode: &Inode) -> Result<Vec<Extent>> {
        inode
            .tree()
            .ok_or(Error::new(ErrorKind::Corrupted, "inode has no extent tree"))?
            .extents()
    }

    fn read_contents(&self, inode: &Inode) -> Result<Vec<u8>> {
        let record = inode.record();
        let size = record.size();

        // 内联符号链接
        if !record.has_extents() {
            let block = record.block_bytes();
            let n = core::cmp::min(size as usize, block.len());
            return Ok(block[..n].to_vec());
        }

        let bs = self.vol.block_size();
        let mut data = vec![0u8; size as usize];
        for e in self.inode_extents(inode)? {
            let start = e.logical_block() as u64 * bs;
            if start >= size {
                continue;
            }
            let len = core::cmp::min(e.len() as u64 * bs, size - start) as usize;
            let start = start as usize;
            self.vol
                .read_at(&mut data[start..start + len], e.physical_block() * bs)?;
        }
        Ok(data)
    }
}

/// 解析一个目录块，跳过 inode 为 0 的空项
fn parse_dir_block(buf: &[u8], out: &mut Vec<DirEntry>) -> Result<()> {
    let mut off = 0usize;
    while off + EXT4_DIR_ENTRY_HEADER_SIZE <= buf.len() {
        let ino = LittleEndian::read_u32(&buf[off + dirent_off::INODE..]);
        let rec_len = LittleEndian::read_u16(&buf[off + dirent_off::REC_LEN..]) as usize;
        let name_len = buf[off + dirent_off::NAME_LEN] as usize;

        if rec_len < EXT4_DIR_ENTRY_HEADER_SIZE
            || off + rec_len > buf.len()
            || EXT4_DIR_ENTRY_HEADER_SIZE + name_len > rec_len
        {
            return Err(Error::new(ErrorKind::Corrupted, "bad directory entry"));
        }

        if ino != 0 {
            let name = &buf[off + dirent_off::NAME..off + dirent_off::NAME + name_len];
            out.push(DirEntry {
                name: String::from_utf8_lossy(name).into_owned(),
                inode: ino,
                file_type: FileType::from_dirent_type(buf[off + dirent_off::FILE_TYPE]),
            });
        }
        off += rec_len;
    }
    Ok(())
}
