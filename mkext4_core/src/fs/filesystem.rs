//! Ext4 文件系统构建器

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use core::fmt;
use core::marker::PhantomData;

use super::config::FsConfig;
use super::path;
use super::volume::Volume;
use crate::balloc::{AllocStats, BlockAllocator};
use crate::block_group::BlockGroup;
use crate::consts::*;
use crate::dir::{check_name, Directory};
use crate::error::{Error, ErrorKind, Result};
use crate::extent::ExtentTree;
use crate::hal::{timestamp, DummyHal, SystemHal};
use crate::inode::{FileType, Inode, InodeRecord};
use crate::region::Region;
use crate::superblock::{Superblock, SuperblockGeometry};
use crate::types::div_round_up;
use crate::vm::VirtualMemory;

/// Ext4 文件系统构建器
///
/// 在给定的虚拟内存中从零创建 ext4 文件系统，并逐个添加目录、文件和链接。
/// 所有磁盘结构都以区域的形式映射进虚拟内存，构建过程中原地更新；
/// 最终镜像由 [`VirtualMemory`] 顺序读出。
///
/// # 示例
///
/// ```rust,ignore
/// use mkext4_core::{Ext4Filesystem, FsConfig, VirtualMemory, StdHal};
///
/// let vm = VirtualMemory::new(64 << 20, 4096)?;
/// let mut fs = Ext4Filesystem::<StdHal>::create(vm, 0, 64 << 20, FsConfig::default())?;
///
/// fs.mkdir("/etc", false)?;
/// fs.create_file("/etc/hostname", b"builder\n")?;
/// fs.symlink("/etc/localtime", "/usr/share/zoneinfo/UTC")?;
///
/// let vm = fs.into_vm();
/// vm.write_to(std::fs::File::create("rootfs.img")?)?;
/// ```
pub struct Ext4Filesystem<H: SystemHal = DummyHal> {
    pub(super) vol: Volume,
    pub(super) sb: Superblock,
    pub(super) inodes: BTreeMap<u32, Inode>,
    /// 规范化绝对路径 -> inode 编号
    pub(super) cache: BTreeMap<String, u32>,
    deterministic_time: Option<u32>,
    size: u64,
    config: FsConfig,
    _phantom: PhantomData<H>,
}

impl<H: SystemHal> fmt::Debug for Ext4Filesystem<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ext4Filesystem")
            .field("size", &self.size)
            .field("inodes", &self.inodes.len())
            .field("paths", &self.cache.len())
            .field("deterministic_time", &self.deterministic_time)
            .finish_non_exhaustive()
    }
}

impl<H: SystemHal> Ext4Filesystem<H> {
    /// 创建文件系统
    ///
    /// # 参数
    ///
    /// * `vm` - 承载镜像的虚拟内存
    /// * `offset` - 文件系统在虚拟内存中的起始偏移
    /// * `size` - 文件系统大小（字节），向上取整到块
    /// * `config` - 几何参数
    ///
    /// # 错误
    ///
    /// - `ErrorKind::Unsupported` - 块大小不是 4096
    /// - `ErrorKind::InvalidInput` - 几何参数无效或文件系统过小
    /// - `ErrorKind::OutOfRange` - 文件系统超出虚拟内存
    /// - `ErrorKind::NoSpace` - 元数据放不下
    pub fn create(vm: VirtualMemory, offset: u64, size: u64, config: FsConfig) -> Result<Self> {
        config.validate()?;

        let block_size = config.block_size as u64;
        if size < 2 * block_size {
            return Err(Error::new(ErrorKind::InvalidInput, "filesystem is too small"));
        }
        if offset.checked_add(size).map_or(true, |end| end > vm.size()) {
            return Err(Error::new(
                ErrorKind::OutOfRange,
                "filesystem does not fit in virtual memory",
            ));
        }

        let blocks_count = div_round_up(size, block_size);
        let group_count = div_round_up(blocks_count, config.blocks_per_group as u64);
        let inodes_count = u32::try_from(group_count * config.inodes_per_group as u64)
            .map_err(|_| Error::new(ErrorKind::InvalidInput, "too many inodes for filesystem size"))?;

        log::debug!(
            "creating ext4 filesystem: {} blocks, {} groups, {} inodes, vm page size {}",
            blocks_count,
            group_count,
            inodes_count,
            vm.page_size()
        );

        let sb = Superblock::new();
        sb.initialize(&SuperblockGeometry {
            blocks_count,
            inodes_count,
            blocks_per_group: config.blocks_per_group,
            inodes_per_group: config.inodes_per_group,
            reserved_blocks: config.reserved_blocks,
            log_groups_per_flex: config.log_groups_per_flex,
            volume_name: &config.volume_name,
            uuid: H::random_uuid(),
            time: timestamp::<H>(),
        });

        let alloc = BlockAllocator::new(sb.clone(), config.blocks_per_group, block_size);
        let mut fs = Self {
            vol: Volume::new(vm, offset, alloc, block_size),
            sb,
            inodes: BTreeMap::new(),
            cache: BTreeMap::new(),
            deterministic_time: None,
            size,
            config,
            _phantom: PhantomData,
        };

        fs.vol.map_region(fs.sb.region(), EXT4_SUPERBLOCK_OFFSET)?;
        fs.create_groups(group_count as u32, blocks_count)?;
        fs.create_reserved_inodes()?;

        // 映射最后一个字节，使镜像覆盖整个文件系统大小
        fs.vol.map_region(Region::from_bytes(&[0]), size - 1)?;

        Ok(fs)
    }

    /// 建立块组：描述符、位图和 inode 表
    fn create_groups(&mut self, group_count: u32, blocks_count: u64) -> Result<()> {
        let bs = self.vol.block_size();
        let bpg = self.config.blocks_per_group as u64;
        let ipg = self.config.inodes_per_group;

        // 位图按整块分配，多出的位在块组创建时置位
        let block_bits = div_round_up(bpg / 8, bs) * bs * 8;
        let inode_bits = div_round_up(ipg as u64 / 8, bs) * bs * 8;

        for i in 0..group_count {
            let first = i as u64 * bpg;
            let count = core::cmp::min(bpg, blocks_count - first) as u32;

            let group = BlockGroup::new(i, first, count, ipg, block_bits, inode_bits)?;
            let desc = group.desc().clone();
            let block_bitmap = group.block_bitmap().clone();
            let inode_bitmap = group.inode_bitmap().clone();
            self.vol.alloc.push_group(group);

            if i == 0 {
                // 块 0 存放引导区和 superblock，之后是描述符表
                self.vol.alloc.reserve_blocks(0, 1)?;
                let gdt_bytes = group_count as u64 * EXT4_GROUP_DESC_SIZE_64 as u64;
                self.vol.alloc.reserve_blocks(0, div_round_up(gdt_bytes, bs) as u32)?;
            }

            self.vol
                .map_region(desc.region(), bs + i as u64 * EXT4_GROUP_DESC_SIZE_64 as u64)?;

            let e = self.vol.alloc.allocate_blocks_for_bytes(block_bitmap.size())?;
            desc.set_block_bitmap(e.physical_block());
            self.vol.map_extent(Region::Bitmap(block_bitmap), &e)?;

            let e = self.vol.alloc.allocate_blocks_for_bytes(inode_bitmap.size())?;
            desc.set_inode_bitmap(e.physical_block());
            self.vol.map_extent(Region::Bitmap(inode_bitmap), &e)?;

            // inode 表只占用块，记录在分配 inode 时逐个映射
            let e = self
                .vol
                .alloc
                .allocate_blocks_for_bytes(ipg as u64 * EXT4_INODE_SIZE as u64)?;
            desc.set_inode_table(e.physical_block());
        }

        Ok(())
    }

    /// 分配保留 inode 1..=11，建立根目录和 lost+found
    fn create_reserved_inodes(&mut self) -> Result<()> {
        for _ in 0..EXT4_FIRST_INO {
            let ino = self.allocate_inode()?;
            match ino {
                EXT4_ROOT_INO => {
                    self.allocate_directory(ino, ino)?;
                    self.record(ino)?.chmod(0o755);
                    self.cache.insert("/".to_string(), ino);
                }
                EXT4_LOST_FOUND_INO => {
                    self.allocate_directory(ino, EXT4_ROOT_INO)?;
                    self.record(ino)?.chmod(0o700);
                    self.add_dir_entry(EXT4_ROOT_INO, ino, "lost+found")?;
                    self.cache.insert("/lost+found".to_string(), ino);
                }
                _ => self.record(ino)?.set_mode(0),
            }
        }
        Ok(())
    }

    /// 当前时间戳（确定性模式下为固定值）
    fn now(&self) -> u32 {
        self.deterministic_time.unwrap_or_else(timestamp::<H>)
    }

    pub(super) fn inode(&self, ino: u32) -> Result<&Inode> {
        self.inodes
            .get(&ino)
            .ok_or(Error::new(ErrorKind::NotFound, "no such inode"))
    }

    fn record(&self, ino: u32) -> Result<InodeRecord> {
        Ok(self.inode(ino)?.record().clone())
    }

    fn dir(&self, ino: u32) -> Result<&Directory> {
        self.inode(ino)?
            .dir()
            .ok_or(Error::new(ErrorKind::InvalidInput, "not a directory"))
    }

    /// 分配 inode 并把记录映射到 inode 表中
    fn allocate_inode(&mut self) -> Result<u32> {
        let at = self.vol.alloc.allocate_inode()?;
        let record = InodeRecord::new();
        record.set_mode(EXT4_DEFAULT_MODE);
        self.vol.map_region(record.region(), at.offset)?;
        self.inodes
            .insert(at.ino, Inode::new(at.ino, at.group, at.offset, record));
        Ok(at.ino)
    }

    /// 把 inode 初始化为目录，写入 `.` 和 `..`
    fn allocate_directory(&mut self, ino: u32, parent: u32) -> Result<()> {
        let record = self.record(ino)?;
        record.set_file_type(FileType::Directory);
        record.set_times(self.now());

        let bs = self.vol.block_size();
        let tree = ExtentTree::create(&mut self.vol, &record, 1)?;
        record.set_size(bs);
        record.set_blocks(bs / 512);
        let dir = Directory::new(&mut self.vol, &tree)?;

        let group = {
            let inode = self
                .inodes
                .get_mut(&ino)
                .ok_or(Error::new(ErrorKind::NotFound, "no such inode"))?;
            inode.tree = Some(tree);
            inode.dir = Some(dir);
            inode.group()
        };

        self.add_dir_entry(ino, ino, ".")?;
        self.add_dir_entry(ino, parent, "..")?;

        if let Some(bg) = self.vol.alloc.group(group) {
            bg.inc_used_dirs();
        }
        Ok(())
    }

    /// 在目录中添加指向 `child` 的项，并增加其链接数
    fn add_dir_entry(&mut self, dir_ino: u32, child: u32, name: &str) -> Result<()> {
        let child_record = self.record(child)?;
        let inode = self
            .inodes
            .get_mut(&dir_ino)
            .ok_or(Error::new(ErrorKind::NotFound, "no such inode"))?;
        let record = inode.record().clone();
        let (Some(dir), Some(tree)) = (inode.dir.as_mut(), inode.tree.as_mut()) else {
            return Err(Error::new(ErrorKind::InvalidInput, "not a directory"));
        };

        dir.add_entry(
            &mut self.vol,
            tree,
            &record,
            child,
            child_record.file_type(),
            name,
        )?;
        child_record.inc_links()
    }

    /// 写入普通文件或符号链接的内容
    ///
    /// 短于 60 字节的符号链接目标直接存放在 i_block 中；
    /// 其他内容按块分配 extent，并把区域逐段映射到对应物理块。
    fn add_contents(&mut self, ino: u32, content: Region, symlink: bool) -> Result<()> {
        let record = self.record(ino)?;
        record.set_file_type(if symlink {
            FileType::Symlink
        } else {
            FileType::RegularFile
        });
        record.set_times(self.now());

        let size = content.size();
        if symlink && size < EXT4_INODE_BLOCK_SIZE as u64 {
            record.set_block_bytes(&content.to_vec()?)?;
            record.set_size(size);
            return Ok(());
        }

        let bs = self.vol.block_size();
        let blocks = div_round_up(size, bs);
        let tree = ExtentTree::create(&mut self.vol, &record, blocks)?;
        record.set_size(size);
        record.set_blocks((blocks + tree.metadata_blocks()) * bs / 512);

        for e in tree.extents()? {
            self.vol.map_extent(content.clone(), &e)?;
        }

        if let Some(inode) = self.inodes.get_mut(&ino) {
            inode.tree = Some(tree);
        }
        Ok(())
    }

    /// 检查 `parent` 是目录且 `name` 可用
    fn check_new_entry(&self, parent: u32, name: &str) -> Result<()> {
        check_name(name)?;
        if self.dir(parent)?.contains(name) {
            return Err(Error::new(ErrorKind::AlreadyExists, "file exists"));
        }
        Ok(())
    }

    /// 在 `parent` 下新建目录
    fn make_dir(&mut self, parent: u32, name: &str) -> Result<u32> {
        self.check_new_entry(parent, name)?;
        let ino = self.allocate_inode()?;
        self.allocate_directory(ino, parent)?;
        self.add_dir_entry(parent, ino, name)?;
        Ok(ino)
    }

    /// 查找规范化路径，结果写入缓存
    ///
    /// `mkdir` 为真时沿途缺失的目录会被创建。
    fn lookup(&mut self, path: &str, mkdir: bool) -> Result<u32> {
        if let Some(&ino) = self.cache.get(path) {
            return Ok(ino);
        }
        let (parent, name) = path::split(path)
            .ok_or(Error::new(ErrorKind::Corrupted, "root directory missing from cache"))?;

        let parent_ino = self.lookup(parent, mkdir)?;
        let found = self.dir(parent_ino)?.get(name);
        let ino = match found {
            Some(ino) => ino,
            None if mkdir => self.make_dir(parent_ino, name)?,
            None => {
                return Err(Error::new(
                    ErrorKind::NotFound,
                    "no such file or directory",
                ))
            }
        };

        self.cache.insert(path.to_string(), ino);
        Ok(ino)
    }

    /// 只读路径解析，不修改缓存
    pub(super) fn resolve(&self, path: &str) -> Result<u32> {
        let path = path::clean(path);
        if let Some(&ino) = self.cache.get(&path) {
            return Ok(ino);
        }

        let mut ino = EXT4_ROOT_INO;
        for name in path.split('/').filter(|s| !s.is_empty()) {
            ino = self.dir(ino)?.get(name).ok_or(Error::new(
                ErrorKind::NotFound,
                "no such file or directory",
            ))?;
        }
        Ok(ino)
    }

    /// 为新节点拆分路径并定位父目录
    fn prepare_new(&mut self, path: &str, mkdir_parents: bool) -> Result<(String, u32)> {
        let path = path::clean(path);
        let (parent, name) = path::split(&path)
            .ok_or(Error::new(ErrorKind::AlreadyExists, "root directory already exists"))?;
        let parent_ino = self.lookup(parent, mkdir_parents)?;
        self.check_new_entry(parent_ino, name)?;
        Ok((path, parent_ino))
    }

    fn create_node(&mut self, path: &str, content: Region, symlink: bool) -> Result<()> {
        let (path, parent) = self.prepare_new(path, false)?;
        let name = base_name(&path);

        let ino = self.allocate_inode()?;
        self.add_contents(ino, content, symlink)?;
        self.add_dir_entry(parent, ino, name)?;

        self.cache.insert(path, ino);
        Ok(())
    }

    /// 创建目录
    ///
    /// `all` 为真时同时创建缺失的父目录（`mkdir -p`）。
    /// 最后一个分量已存在时返回 `AlreadyExists`。
    pub fn mkdir(&mut self, path: &str, all: bool) -> Result<()> {
        let (path, parent) = self.prepare_new(path, all)?;
        let ino = self.make_dir(parent, base_name(&path))?;
        self.cache.insert(path, ino);
        Ok(())
    }

    /// 以任意区域为内容创建普通文件
    ///
    /// 区域按引用映射，文件内容在镜像读出时才被读取。
    pub fn create_file_from_region(&mut self, path: &str, content: Region) -> Result<()> {
        self.create_node(path, content, false)
    }

    /// 创建普通文件
    pub fn create_file(&mut self, path: &str, content: &[u8]) -> Result<()> {
        self.create_file_from_region(path, Region::from_bytes(content))
    }

    /// 创建符号链接
    pub fn symlink(&mut self, path: &str, target: &str) -> Result<()> {
        if target.is_empty() {
            return Err(Error::new(ErrorKind::InvalidInput, "empty symlink target"));
        }
        self.create_node(path, Region::from_bytes(target.as_bytes()), true)
    }

    /// 创建硬链接
    ///
    /// `target` 必须是绝对路径，且不能是目录。
    pub fn link(&mut self, path: &str, target: &str) -> Result<()> {
        if !target.starts_with('/') {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "hard link target must be an absolute path",
            ));
        }

        let (path, parent) = self.prepare_new(path, false)?;
        let target_ino = self.lookup(&path::clean(target), false)?;
        if self.inode(target_ino)?.is_dir() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "cannot hard link a directory",
            ));
        }

        self.add_dir_entry(parent, target_ino, base_name(&path))?;
        self.cache.insert(path, target_ino);
        Ok(())
    }

    /// 路径是否存在
    pub fn exists(&mut self, path: &str) -> bool {
        self.lookup(&path::clean(path), false).is_ok()
    }

    fn node_record(&mut self, path: &str) -> Result<InodeRecord> {
        let ino = self.lookup(&path::clean(path), false)?;
        self.record(ino)
    }

    /// 修改权限位（含 setuid/setgid/sticky），保留类型位
    pub fn chmod(&mut self, path: &str, mode: u16) -> Result<()> {
        self.node_record(path)?.chmod(mode);
        Ok(())
    }

    /// 修改属主
    pub fn chown(&mut self, path: &str, uid: u32, gid: u32) -> Result<()> {
        self.node_record(path)?.chown(uid, gid);
        Ok(())
    }

    /// 修改 mtime
    pub fn chtimes(&mut self, path: &str, mtime: u32) -> Result<()> {
        self.node_record(path)?.set_mtime(mtime);
        Ok(())
    }

    /// 进入确定性模式
    ///
    /// 覆盖 UUID、创建时间和根目录、lost+found 的时间戳，
    /// 之后新建的 inode 都使用 `time`。
    pub fn make_deterministic(&mut self, uuid: [u8; 16], time: u32) -> Result<()> {
        self.sb.set_uuid(uuid);
        self.sb.set_mkfs_time(time);
        self.sb.set_lastcheck(time);

        for ino in [EXT4_ROOT_INO, EXT4_LOST_FOUND_INO] {
            self.record(ino)?.set_times(time);
        }
        self.deterministic_time = Some(time);
        Ok(())
    }

    /// 每个已分配 inode 输出一行
    pub fn dump_inode_map(&self, out: &mut impl fmt::Write) -> fmt::Result {
        for (ino, inode) in &self.inodes {
            let record = inode.record();
            write!(
                out,
                "{:08}: mode={:06o} size={} links={} ",
                ino,
                record.mode(),
                record.size(),
                record.links_count()
            )?;
            match inode.tree() {
                Some(tree) => writeln!(out, "{:?}", tree)?,
                None => writeln!(out, "-")?,
            }
        }
        Ok(())
    }

    /// 以 info 级别输出分配统计
    pub fn dump_stats(&self) {
        let stats = self.vol.alloc.stats();
        log::info!(
            "ext4 stats: inodes={} block_allocations={} blocks_allocated={} full_groups={} free_blocks={} free_inodes={}",
            stats.inode_allocations,
            stats.block_allocations,
            stats.blocks_allocated,
            stats.full_group_allocations,
            self.sb.free_blocks_count(),
            self.sb.free_inodes_count()
        );
        self.vol.vm.dump_stats();
    }

    pub fn superblock(&self) -> &Superblock {
        &self.sb
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    /// 文件系统大小（字节）
    pub fn size(&self) -> u64 {
        self.size
    }

    /// 文件系统在虚拟内存中的偏移
    pub fn offset(&self) -> u64 {
        self.vol.base
    }

    pub fn block_groups(&self) -> &[BlockGroup] {
        self.vol.alloc.groups()
    }

    pub fn alloc_stats(&self) -> AllocStats {
        self.vol.alloc.stats()
    }

    pub fn vm(&self) -> &VirtualMemory {
        &self.vol.vm
    }

    pub fn vm_mut(&mut self) -> &mut VirtualMemory {
        &mut self.vol.vm
    }

    /// 结束构建，取回虚拟内存
    pub fn into_vm(self) -> VirtualMemory {
        self.vol.vm
    }
}

/// 规范化路径的最后一个分量
fn base_name(path: &str) -> &str {
    path::split(path).map_or("", |(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1 << 20;

    fn small_config() -> FsConfig {
        FsConfig {
            blocks_per_group: 1024,
            inodes_per_group: 256,
            reserved_blocks: 0,
            ..Default::default()
        }
    }

    fn new_fs(size: u64) -> Ext4Filesystem {
        let vm = VirtualMemory::new(size, EXT4_BLOCK_SIZE).unwrap();
        Ext4Filesystem::create(vm, 0, size, small_config()).unwrap()
    }

    #[test]
    fn test_reserved_inodes() {
        let fs = new_fs(8 * MIB);
        let root = fs.inode(EXT4_ROOT_INO).unwrap().record();
        assert_eq!(root.mode(), 0o040755);
        assert_eq!(root.links_count(), 3);

        let lf = fs.inode(EXT4_LOST_FOUND_INO).unwrap().record();
        assert_eq!(lf.mode(), 0o040700);
        assert_eq!(lf.links_count(), 2);

        for ino in [1, 3, 10] {
            assert_eq!(fs.inode(ino).unwrap().record().mode(), 0);
        }
        assert_eq!(fs.superblock().free_inodes_count(), 2 * 256 - 11);
        assert_eq!(fs.block_groups()[0].desc().used_dirs_count(), 2);
    }

    #[test]
    fn test_last_group_is_partial() {
        let fs = new_fs(5 * MIB);
        let groups = fs.block_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].block_count(), 1280 - 1024);
        assert_eq!(fs.superblock().blocks_count(), 1280);
    }

    #[test]
    fn test_mkdir_rules() {
        let mut fs = new_fs(8 * MIB);
        fs.mkdir("/usr", false).unwrap();
        assert_eq!(fs.mkdir("/usr", false).unwrap_err().kind(), ErrorKind::AlreadyExists);
        assert_eq!(fs.mkdir("/", true).unwrap_err().kind(), ErrorKind::AlreadyExists);
        assert_eq!(
            fs.mkdir("/opt/app/bin", false).unwrap_err().kind(),
            ErrorKind::NotFound
        );

        fs.mkdir("/opt/app/bin", true).unwrap();
        assert!(fs.exists("/opt/app"));
        assert!(fs.exists("//opt/./app/bin/"));

        // 父目录链接数：. 、上级中的名字、子目录的 ..
        let app = fs.resolve("/opt/app").unwrap();
        assert_eq!(fs.inode(app).unwrap().record().links_count(), 3);
    }

    #[test]
    fn test_files_and_links() {
        let mut fs = new_fs(8 * MIB);
        fs.create_file("/hello", b"hello world").unwrap();
        assert_eq!(
            fs.create_file("/hello", b"again").unwrap_err().kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            fs.create_file("/hello/x", b"").unwrap_err().kind(),
            ErrorKind::InvalidInput
        );

        fs.link("/hello2", "/hello").unwrap();
        let ino = fs.resolve("/hello").unwrap();
        assert_eq!(fs.resolve("/hello2").unwrap(), ino);
        assert_eq!(fs.inode(ino).unwrap().record().links_count(), 2);

        assert_eq!(fs.link("/x", "hello").unwrap_err().kind(), ErrorKind::InvalidInput);
        assert_eq!(fs.link("/x", "/lost+found").unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_attributes() {
        let mut fs = new_fs(8 * MIB);
        fs.create_file("/bin", b"#!").unwrap();
        fs.chmod("/bin", 0o4755).unwrap();
        fs.chown("/bin", 100_000, 5).unwrap();
        fs.chtimes("/bin", 1_700_000_000).unwrap();

        let record = fs.node_record("/bin").unwrap();
        assert_eq!(record.mode(), 0o104755);
        assert_eq!((record.uid(), record.gid()), (100_000, 5));
        assert_eq!(record.mtime(), 1_700_000_000);
        assert!(fs.chmod("/missing", 0o644).is_err());
    }

    #[test]
    fn test_deterministic_time() {
        let mut fs = new_fs(8 * MIB);
        fs.make_deterministic([7; 16], 1234).unwrap();
        fs.mkdir("/d", false).unwrap();

        assert_eq!(fs.superblock().uuid(), [7; 16]);
        assert_eq!(fs.superblock().mkfs_time(), 1234);
        assert_eq!(fs.node_record("/d").unwrap().ctime(), 1234);
        assert_eq!(fs.node_record("/").unwrap().atime(), 1234);
    }

    #[test]
    fn test_dump_inode_map() {
        let mut fs = new_fs(8 * MIB);
        fs.create_file("/a", b"x").unwrap();
        let mut out = String::new();
        fs.dump_inode_map(&mut out).unwrap();
        assert_eq!(out.lines().count(), 12);
        assert!(out.starts_with("00000001: mode=000000"));
        assert!(out.contains("00000012: mode=100755 size=1 links=1 ExtentTree<inline>"));
    }

    #[test]
    fn test_too_small_and_misfit() {
        let vm = VirtualMemory::new(MIB, EXT4_BLOCK_SIZE).unwrap();
        let err = Ext4Filesystem::<DummyHal>::create(vm, 0, 4096, small_config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let vm = VirtualMemory::new(MIB, EXT4_BLOCK_SIZE).unwrap();
        let err = Ext4Filesystem::<DummyHal>::create(vm, 4096, MIB, small_config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn test_debug_summary() {
        let mut fs = new_fs(8 * MIB);
        fs.create_file("/a", b"x").unwrap();
        let out = alloc::format!("{fs:?}");
        assert!(out.starts_with("Ext4Filesystem {"));
        assert!(out.contains("size: 8388608"));
        assert!(out.contains("deterministic_time: None"));
    }
}
