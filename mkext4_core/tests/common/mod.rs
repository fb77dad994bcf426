//! 集成测试共享的 ext4 镜像解析器
//!
//! 只依赖镜像字节本身，不调用构建器的任何读回接口，
//! 用于从外部验证生成的磁盘结构。

#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian};
use mkext4_core::{Ext4Filesystem, FsConfig, SystemHal, VirtualMemory};

pub const BLOCK_SIZE: u64 = 4096;
pub const MIB: u64 = 1 << 20;

/// 测试用的小几何参数：每组 2048 块、512 个 inode
pub fn small_config() -> FsConfig {
    FsConfig {
        blocks_per_group: 2048,
        inodes_per_group: 512,
        reserved_blocks: 0,
        ..Default::default()
    }
}

pub fn new_fs<H: SystemHal>(size: u64, config: FsConfig) -> Ext4Filesystem<H> {
    let vm = VirtualMemory::new(size, BLOCK_SIZE).unwrap();
    Ext4Filesystem::create(vm, 0, size, config).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperInfo {
    pub magic: u16,
    pub inodes_count: u32,
    pub blocks_count: u64,
    pub r_blocks_count: u64,
    pub free_blocks_count: u64,
    pub free_inodes_count: u32,
    pub first_data_block: u32,
    pub log_block_size: u32,
    pub blocks_per_group: u32,
    pub inodes_per_group: u32,
    pub first_ino: u32,
    pub inode_size: u16,
    pub desc_size: u16,
    pub feature_incompat: u32,
    pub feature_ro_compat: u32,
    pub uuid: [u8; 16],
    pub mkfs_time: u32,
    pub lastcheck: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub block_bitmap: u64,
    pub inode_bitmap: u64,
    pub inode_table: u64,
    pub free_blocks: u32,
    pub free_inodes: u32,
    pub used_dirs: u32,
    pub flags: u16,
}

#[derive(Debug, Clone)]
pub struct InodeInfo {
    pub mode: u16,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: u32,
    pub ctime: u32,
    pub mtime: u32,
    pub links: u16,
    pub blocks: u64,
    pub flags: u32,
    pub block: [u8; 60],
}

impl InodeInfo {
    pub fn is_dir(&self) -> bool {
        self.mode & 0xF000 == 0x4000
    }

    pub fn has_extents(&self) -> bool {
        self.flags & 0x80000 != 0
    }
}

/// 一个完整镜像
pub struct Image {
    pub bytes: Vec<u8>,
}

impl Image {
    /// 结束构建并把整个虚拟内存读出
    pub fn from_fs<H: SystemHal>(fs: Ext4Filesystem<H>) -> Self {
        let vm = fs.into_vm();
        let mut bytes = Vec::with_capacity(vm.size() as usize);
        vm.write_to(&mut bytes).unwrap();
        Self { bytes }
    }

    fn u16_at(&self, off: u64) -> u16 {
        LittleEndian::read_u16(&self.bytes[off as usize..])
    }

    fn u32_at(&self, off: u64) -> u32 {
        LittleEndian::read_u32(&self.bytes[off as usize..])
    }

    fn lo_hi(&self, lo: u64, hi: u64) -> u64 {
        self.u32_at(lo) as u64 | (self.u32_at(hi) as u64) << 32
    }

    pub fn block(&self, n: u64) -> &[u8] {
        let start = (n * BLOCK_SIZE) as usize;
        &self.bytes[start..start + BLOCK_SIZE as usize]
    }

    pub fn superblock(&self) -> SuperInfo {
        let sb = 1024;
        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(&self.bytes[sb + 104..sb + 120]);
        let sb = sb as u64;
        SuperInfo {
            magic: self.u16_at(sb + 56),
            inodes_count: self.u32_at(sb),
            blocks_count: self.lo_hi(sb + 4, sb + 336),
            r_blocks_count: self.lo_hi(sb + 8, sb + 340),
            free_blocks_count: self.lo_hi(sb + 12, sb + 344),
            free_inodes_count: self.u32_at(sb + 16),
            first_data_block: self.u32_at(sb + 20),
            log_block_size: self.u32_at(sb + 24),
            blocks_per_group: self.u32_at(sb + 32),
            inodes_per_group: self.u32_at(sb + 40),
            first_ino: self.u32_at(sb + 84),
            inode_size: self.u16_at(sb + 88),
            desc_size: self.u16_at(sb + 254),
            feature_incompat: self.u32_at(sb + 96),
            feature_ro_compat: self.u32_at(sb + 100),
            uuid,
            mkfs_time: self.u32_at(sb + 264),
            lastcheck: self.u32_at(sb + 64),
        }
    }

    pub fn group_count(&self) -> u32 {
        let sb = self.superblock();
        sb.blocks_count.div_ceil(sb.blocks_per_group as u64) as u32
    }

    pub fn group(&self, index: u32) -> GroupInfo {
        let d = BLOCK_SIZE + index as u64 * 64;
        let lo_hi16 = |lo: u64, hi: u64| self.u16_at(d + lo) as u32 | (self.u16_at(d + hi) as u32) << 16;
        GroupInfo {
            block_bitmap: self.lo_hi(d, d + 32),
            inode_bitmap: self.lo_hi(d + 4, d + 36),
            inode_table: self.lo_hi(d + 8, d + 40),
            free_blocks: lo_hi16(12, 44),
            free_inodes: lo_hi16(14, 46),
            used_dirs: lo_hi16(16, 48),
            flags: self.u16_at(d + 18),
        }
    }

    /// 组内块位图中被占用的块数（只统计本组实际拥有的块）
    pub fn used_blocks_in_group(&self, index: u32) -> u32 {
        let sb = self.superblock();
        let first = index as u64 * sb.blocks_per_group as u64;
        let count = std::cmp::min(sb.blocks_per_group as u64, sb.blocks_count - first);
        let bitmap = self.block(self.group(index).block_bitmap);
        (0..count)
            .filter(|&i| bitmap[(i / 8) as usize] & (1 << (i % 8)) != 0)
            .count() as u32
    }

    pub fn used_inodes_in_group(&self, index: u32) -> u32 {
        let ipg = self.superblock().inodes_per_group as u64;
        let bitmap = self.block(self.group(index).inode_bitmap);
        (0..ipg)
            .filter(|&i| bitmap[(i / 8) as usize] & (1 << (i % 8)) != 0)
            .count() as u32
    }

    pub fn inode(&self, ino: u32) -> InodeInfo {
        let ipg = self.superblock().inodes_per_group;
        let group = (ino - 1) / ipg;
        let index = (ino - 1) % ipg;
        let off = self.group(group).inode_table * BLOCK_SIZE + index as u64 * 256;
        let mut block = [0u8; 60];
        block.copy_from_slice(&self.bytes[off as usize + 40..off as usize + 100]);
        InodeInfo {
            mode: self.u16_at(off),
            uid: self.u16_at(off + 2) as u32 | (self.u16_at(off + 120) as u32) << 16,
            gid: self.u16_at(off + 24) as u32 | (self.u16_at(off + 122) as u32) << 16,
            size: self.lo_hi(off + 4, off + 108),
            atime: self.u32_at(off + 8),
            ctime: self.u32_at(off + 12),
            mtime: self.u32_at(off + 16),
            links: self.u16_at(off + 26),
            blocks: self.u32_at(off + 28) as u64 | (self.u16_at(off + 116) as u64) << 32,
            flags: self.u32_at(off + 32),
            block,
        }
    }

    /// 解析 extent 树，返回 (逻辑块, 物理块, 长度)
    pub fn extents(&self, inode: &InodeInfo) -> Vec<(u32, u64, u16)> {
        assert!(inode.has_extents(), "inode does not use extents");
        parse_node(&inode.block, |leaf| self.block(leaf).to_vec())
    }

    pub fn read_file(&self, ino: u32) -> Vec<u8> {
        let inode = self.inode(ino);
        if !inode.has_extents() {
            return inode.block[..inode.size as usize].to_vec();
        }
        let mut data = vec![0u8; inode.size as usize];
        for (logical, physical, len) in self.extents(&inode) {
            let start = logical as u64 * BLOCK_SIZE;
            if start >= inode.size {
                continue;
            }
            let n = std::cmp::min(len as u64 * BLOCK_SIZE, inode.size - start) as usize;
            let src = (physical * BLOCK_SIZE) as usize;
            data[start as usize..start as usize + n].copy_from_slice(&self.bytes[src..src + n]);
        }
        data
    }

    /// 解析目录，返回 (名称, inode, 文件类型)
    pub fn read_dir(&self, ino: u32) -> Vec<(String, u32, u8)> {
        let inode = self.inode(ino);
        assert!(inode.is_dir());
        let data = self.read_file(ino);
        let mut out = Vec::new();
        for block in data.chunks(BLOCK_SIZE as usize) {
            let mut off = 0usize;
            while off < block.len() {
                let child = LittleEndian::read_u32(&block[off..]);
                let rec_len = LittleEndian::read_u16(&block[off + 4..]) as usize;
                let name_len = block[off + 6] as usize;
                assert!(rec_len >= 8 && off + rec_len <= block.len(), "bad rec_len {rec_len} at {off}");
                if child != 0 {
                    let name = String::from_utf8(block[off + 8..off + 8 + name_len].to_vec()).unwrap();
                    out.push((name, child, block[off + 7]));
                }
                off += rec_len;
            }
            assert_eq!(off, block.len(), "directory records must cover the block");
        }
        out
    }

    pub fn lookup(&self, path: &str) -> Option<u32> {
        let mut ino = 2;
        for name in path.split('/').filter(|s| !s.is_empty()) {
            ino = self
                .read_dir(ino)
                .into_iter()
                .find(|(n, _, _)| n == name)
                .map(|(_, child, _)| child)?;
        }
        Some(ino)
    }
}

fn parse_node(node: &[u8], load: impl Fn(u64) -> Vec<u8> + Copy) -> Vec<(u32, u64, u16)> {
    assert_eq!(LittleEndian::read_u16(node), 0xF30A, "bad extent magic");
    let entries = LittleEndian::read_u16(&node[2..]) as usize;
    let depth = LittleEndian::read_u16(&node[6..]);

    let mut out = Vec::new();
    for i in 0..entries {
        let e = &node[12 * (i + 1)..];
        if depth == 0 {
            let start = LittleEndian::read_u32(&e[8..]) as u64
                | (LittleEndian::read_u16(&e[6..]) as u64) << 32;
            out.push((LittleEndian::read_u32(e), start, LittleEndian::read_u16(&e[4..])));
        } else {
            let leaf = LittleEndian::read_u32(&e[4..]) as u64
                | (LittleEndian::read_u16(&e[8..]) as u64) << 32;
            out.extend(parse_node(&load(leaf), load));
        }
    }
    out
}
