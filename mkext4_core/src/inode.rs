//! Inode 记录与内存中的 inode 状态
//!
//! [`InodeRecord`] 是 256 字节的磁盘 inode，映射进镜像后仍可原地修改；
//! [`Inode`] 在它之外记录 extent 树和目录内容这些构建期状态。

use crate::consts::*;
use crate::dir::Directory;
use crate::error::{Error, ErrorKind, Result};
use crate::extent::ExtentTree;
use crate::region::{RawRegion, Region};
use crate::types::{inode_off, InodeFlags};

/// 节点类型（来自 mode 的高 4 位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FileType {
    #[default]
    Unknown = 0,
    Fifo = 1,
    CharacterDevice = 2,
    Directory = 4,
    BlockDevice = 6,
    RegularFile = 8,
    Symlink = 10,
    Socket = 12,
}

impl FileType {
    /// 从 inode mode 解析
    pub fn from_mode(mode: u16) -> Self {
        ((mode >> 12) as u8).into()
    }

    /// 对应的 mode 类型位
    pub fn mode_bits(self) -> u16 {
        (self as u16) << 12
    }

    /// 目录项中的 file_type 字段
    pub fn dirent_type(self) -> u8 {
        match self {
            FileType::RegularFile => EXT4_DE_REG_FILE,
            FileType::Directory => EXT4_DE_DIR,
            FileType::CharacterDevice => EXT4_DE_CHRDEV,
            FileType::BlockDevice => EXT4_DE_BLKDEV,
            FileType::Fifo => EXT4_DE_FIFO,
            FileType::Socket => EXT4_DE_SOCK,
            FileType::Symlink => EXT4_DE_SYMLINK,
            FileType::Unknown => EXT4_DE_UNKNOWN,
        }
    }

    /// 从目录项的 file_type 字段解析
    pub fn from_dirent_type(value: u8) -> Self {
        match value {
            EXT4_DE_REG_FILE => FileType::RegularFile,
            EXT4_DE_DIR => FileType::Directory,
            EXT4_DE_CHRDEV => FileType::CharacterDevice,
            EXT4_DE_BLKDEV => FileType::BlockDevice,
            EXT4_DE_FIFO => FileType::Fifo,
            EXT4_DE_SOCK => FileType::Socket,
            EXT4_DE_SYMLINK => FileType::Symlink,
            _ => FileType::Unknown,
        }
    }
}

impl From<u8> for FileType {
    fn from(value: u8) -> Self {
        match value {
            1 => FileType::Fifo,
            2 => FileType::CharacterDevice,
            4 => FileType::Directory,
            6 => FileType::BlockDevice,
            8 => FileType::RegularFile,
            10 => FileType::Symlink,
            12 => FileType::Socket,
            _ => FileType::Unknown,
        }
    }
}

/// 256 字节磁盘 inode
#[derive(Clone)]
pub struct InodeRecord {
    raw: RawRegion,
}

impl InodeRecord {
    pub fn new() -> Self {
        Self {
            raw: RawRegion::new(EXT4_INODE_SIZE as usize),
        }
    }

    /// 从已有字节解析（多余部分忽略，不足部分为零）
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let record = Self::new();
        let n = core::cmp::min(bytes.len(), EXT4_INODE_SIZE as usize);
        record.raw.write_bytes(0, &bytes[..n]);
        record
    }

    pub fn region(&self) -> Region {
        Region::Raw(self.raw.clone())
    }

    pub(crate) fn raw(&self) -> &RawRegion {
        &self.raw
    }

    pub fn mode(&self) -> u16 {
        self.raw.read_u16(inode_off::MODE)
    }

    pub fn set_mode(&self, mode: u16) {
        self.raw.write_u16(inode_off::MODE, mode);
    }

    pub fn file_type(&self) -> FileType {
        FileType::from_mode(self.mode())
    }

    /// 设置类型位，保留权限位
    pub fn set_file_type(&self, ty: FileType) {
        let perm = self.mode() & EXT4_INODE_MODE_PERM_MASK;
        self.set_mode(ty.mode_bits() | perm);
    }

    /// 设置权限位（含 setuid/setgid/sticky），保留类型位
    pub fn chmod(&self, perm: u16) {
        let ty = self.mode() & EXT4_INODE_MODE_TYPE_MASK;
        self.set_mode(ty | (perm & EXT4_INODE_MODE_PERM_MASK));
    }

    pub fn uid(&self) -> u32 {
        self.raw.read_u16(inode_off::UID) as u32 | (self.raw.read_u16(inode_off::UID_HI) as u32) << 16
    }

    pub fn gid(&self) -> u32 {
        self.raw.read_u16(inode_off::GID) as u32 | (self.raw.read_u16(inode_off::GID_HI) as u32) << 16
    }

    pub fn chown(&self, uid: u32, gid: u32) {
        self.raw.write_u16(inode_off::UID, uid as u16);
        self.raw.write_u16(inode_off::UID_HI, (uid >> 16) as u16);
        self.raw.write_u16(inode_off::GID, gid as u16);
        self.raw.write_u16(inode_off::GID_HI, (gid >> 16) as u16);
    }

    pub fn size(&self) -> u64 {
        self.raw.read_u32(inode_off::SIZE_LO) as u64
            | (self.raw.read_u32(inode_off::SIZE_HI) as u64) << 32
    }

    pub fn set_size(&self, size: u64) {
        self.raw.write_u32(inode_off::SIZE_LO, size as u32);
        self.raw.write_u32(inode_off::SIZE_HI, (size >> 32) as u32);
    }

    pub fn atime(&self) -> u32 {
        self.raw.read_u32(inode_off::ATIME)
    }

    pub fn ctime(&self) -> u32 {
        self.raw.read_u32(inode_off::CTIME)
    }

    pub fn mtime(&self) -> u32 {
        self.raw.read_u32(inode_off::MTIME)
    }

    pub fn set_mtime(&self, time: u32) {
        self.raw.write_u32(inode_off::MTIME, time);
    }

    /// 同时设置 atime、ctime、mtime
    pub fn set_times(&self, time: u32) {
        self.raw.write_u32(inode_off::ATIME, time);
        self.raw.write_u32(inode_off::CTIME, time);
        self.raw.write_u32(inode_off::MTIME, time);
    }

    pub fn links_count(&self) -> u16 {
        self.raw.read_u16(inode_off::LINKS_COUNT)
    }

    /// 链接数加一
    pub fn inc_links(&self) -> Result<()> {
        let links = self
            .links_count()
            .checked_add(1)
            .ok_or(Error::new(ErrorKind::OutOfRange, "too many links to inode"))?;
        self.raw.write_u16(inode_off::LINKS_COUNT, links);
        Ok(())
    }

    /// 占用的 512 字节扇区数
    pub fn blocks(&self) -> u64 {
        self.raw.read_u32(inode_off::BLOCKS_LO) as u64
            | (self.raw.read_u16(inode_off::BLOCKS_HI) as u64) << 32
    }

    pub fn set_blocks(&self, sectors: u64) {
        self.raw.write_u32(inode_off::BLOCKS_LO, sectors as u32);
        self.raw.write_u16(inode_off::BLOCKS_HI, (sectors >> 32) as u16);
    }

    pub fn flags(&self) -> InodeFlags {
        InodeFlags::from_bits_retain(self.raw.read_u32(inode_off::FLAGS))
    }

    pub fn set_flags(&self, flags: InodeFlags) {
        self.raw.write_u32(inode_off::FLAGS, flags.bits());
    }

    pub fn has_extents(&self) -> bool {
        self.flags().contains(InodeFlags::EXTENTS)
    }

    /// i_block 区域（60 字节）
    pub fn block_bytes(&self) -> [u8; EXT4_INODE_BLOCK_SIZE] {
        let mut out = [0u8; EXT4_INODE_BLOCK_SIZE];
        self.raw.read_bytes(inode_off::BLOCK, &mut out);
        out
    }

    /// 写入 i_block 区域，用于内联符号链接
    pub fn set_block_bytes(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > EXT4_INODE_BLOCK_SIZE {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "data does not fit in i_block",
            ));
        }
        self.raw.write_bytes(inode_off::BLOCK, &[0u8; EXT4_INODE_BLOCK_SIZE]);
        self.raw.write_bytes(inode_off::BLOCK, bytes);
        Ok(())
    }
}

impl Default for InodeRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// 构建期的 inode
pub struct Inode {
    ino: u32,
    group: u32,
    offset: u64,
    record: InodeRecord,
    pub(crate) tree: Option<ExtentTree>,
    pub(crate) dir: Option<Directory>,
}

impl Inode {
    pub(crate) fn new(ino: u32, group: u32, offset: u64, record: InodeRecord) -> Self {
        Self {
            ino,
            group,
            offset,
            record,
            tree: None,
            dir: None,
        }
    }

    pub fn ino(&self) -> u32 {
        self.ino
    }

    pub fn group(&self) -> u32 {
        self.group
    }

    /// inode 记录在文件系统中的字节偏移
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn record(&self) -> &InodeRecord {
        &self.record
    }

    pub fn tree(&self) -> Option<&ExtentTree> {
        self.tree.as_ref()
    }

    pub fn dir(&self) -> Option<&Directory> {
        self.dir.as_ref()
    }

    pub fn file_type(&self) -> FileType {
        self.record.file_type()
    }

    pub fn is_dir(&self) -> bool {
        self.dir.is_some()
    }
}
