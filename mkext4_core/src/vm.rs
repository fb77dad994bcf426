//! 虚拟内存
//!
//! 以页为粒度的稀疏地址空间。每个页槽可以为空（读为零）、直接引用一个
//! 区域（大区域跨页时后续页使用偏移视图），或者是一个碎片化页面。
//! 对页面的写入先复制出一份影子页（写时复制），之后该页的读写都走影子页。

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::error::{Error, ErrorKind, Result};
use crate::region::{FragmentedRegion, RawRegion, Region};

/// 映射统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VmStats {
    /// `map` 调用次数
    pub maps: u64,
    /// 整页直接映射次数
    pub page_maps: u64,
    /// 子页片段插入次数
    pub fragment_maps: u64,
    /// 当前影子页数量
    pub shadow_pages: u64,
}

/// 稀疏虚拟地址空间
pub struct VirtualMemory {
    page_size: u64,
    total_size: u64,
    pages: Vec<Option<Region>>,
    shadows: Vec<Option<RawRegion>>,
    stats: VmStats,
}

impl VirtualMemory {
    /// 创建虚拟内存
    ///
    /// # 参数
    ///
    /// * `total_size` - 总大小，必须是页大小的整数倍
    /// * `page_size` - 页大小
    pub fn new(total_size: u64, page_size: u64) -> Result<Self> {
        if page_size == 0 || total_size % page_size != 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "total size must be a multiple of the page size",
            ));
        }
        let pages = (total_size / page_size) as usize;
        Ok(Self {
            page_size,
            total_size,
            pages: vec![None; pages],
            shadows: vec![None; pages],
            stats: VmStats::default(),
        })
    }

    pub fn size(&self) -> u64 {
        self.total_size
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn stats(&self) -> VmStats {
        self.stats
    }

    /// 将区域映射到 `offset`
    ///
    /// 非对齐的头部和不足一页的尾部作为片段插入，中间整页直接引用区域：
    /// 第一页引用区域本身，之后的页引用偏移视图。
    pub fn map(&mut self, region: Region, offset: u64) -> Result<()> {
        let size = region.size();
        if offset.checked_add(size).map_or(true, |end| end > self.total_size) {
            return Err(Error::new(ErrorKind::OutOfRange, "mapping exceeds virtual memory size"));
        }
        self.stats.maps += 1;
        if size == 0 {
            return Ok(());
        }
        log::trace!("vm map {:?} at {:#x}", region, offset);

        let page = self.page_size;
        let mut consumed = 0u64;
        let mut pos = offset;

        if pos % page != 0 {
            consumed = self.map_fragment(region.clone(), pos)?;
            pos += consumed;
        }

        while size - consumed >= page {
            self.map_page(Region::offset(region.clone(), consumed), pos)?;
            consumed += page;
            pos += page;
        }

        if size > consumed {
            self.map_fragment(Region::offset(region, consumed), pos)?;
        }

        Ok(())
    }

    /// 整页映射，`offset` 必须页对齐
    fn map_page(&mut self, region: Region, offset: u64) -> Result<()> {
        if offset % self.page_size != 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "attempted to map an unaligned region as a page",
            ));
        }
        let index = self.page_index(offset)?;
        self.stats.page_maps += 1;

        if self.shadows[index].take().is_some() {
            self.stats.shadow_pages -= 1;
        }
        self.pages[index] = Some(region);

        Ok(())
    }

    /// 在页内插入片段，返回片段覆盖的字节数
    fn map_fragment(&mut self, region: Region, offset: u64) -> Result<u64> {
        let index = self.page_index(offset)?;
        let local = offset % self.page_size;
        self.stats.fragment_maps += 1;

        // 已有影子页时，影子内容成为该页的新底层
        let existing = match self.shadows[index].take() {
            Some(shadow) => {
                self.stats.shadow_pages -= 1;
                Some(Region::Raw(shadow))
            }
            None => self.pages[index].take(),
        };

        let mut frag = match existing {
            Some(Region::Fragmented(frag)) => frag,
            Some(other) => {
                let mut frag = FragmentedRegion::new(self.page_size);
                frag.map_fragment(other, 0)?;
                frag
            }
            None => FragmentedRegion::new(self.page_size),
        };

        let mapped = frag.map_fragment(region, local);
        self.pages[index] = Some(Region::Fragmented(frag));
        mapped
    }

    /// 映射按需读取的数据源
    #[cfg(feature = "std")]
    pub fn map_file(
        &mut self,
        source: impl crate::region::ReadAt + 'static,
        offset: u64,
        size: u64,
    ) -> Result<crate::region::FileRegion> {
        let region = crate::region::FileRegion::new(source, size);
        self.map(Region::File(region.clone()), offset)?;
        Ok(region)
    }

    /// 把 `offset` 处的当前内容复制进 `region`，再用 `region` 替换这段地址
    pub fn reinterpret(&mut self, region: Region, offset: u64) -> Result<()> {
        let size = region.size();
        if size > 0 {
            let mut buf = vec![0u8; size as usize];
            self.read_at(&mut buf, offset)?;
            region.write_at(&buf, 0)?;
        }
        self.map(region, offset)
    }

    fn page_index(&self, offset: u64) -> Result<usize> {
        if offset >= self.total_size {
            return Err(Error::out_of_range());
        }
        Ok((offset / self.page_size) as usize)
    }

    /// 随机读取
    ///
    /// 未映射的页读为零。返回 `min(buf.len(), size() - off)`。
    pub fn read_at(&self, buf: &mut [u8], off: u64) -> Result<usize> {
        if off >= self.total_size {
            return Err(Error::out_of_range());
        }
        let n = core::cmp::min(buf.len() as u64, self.total_size - off) as usize;

        let mut done = 0usize;
        while done < n {
            let pos = off + done as u64;
            let index = (pos / self.page_size) as usize;
            let local = pos % self.page_size;
            let chunk = core::cmp::min((self.page_size - local) as usize, n - done);
            let dst = &mut buf[done..done + chunk];

            let got = match (&self.shadows[index], &self.pages[index]) {
                (Some(shadow), _) => shadow.read_at(dst, local)?,
                (None, Some(region)) => region.read_at(dst, local)?,
                (None, None) => 0,
            };
            dst[got..].fill(0);

            done += chunk;
        }

        Ok(n)
    }

    /// 随机写入
    ///
    /// 第一次写某页时以该页当前内容为种子创建影子页。
    /// 写入越过末尾时整体失败，不做部分写入。
    pub fn write_at(&mut self, buf: &[u8], off: u64) -> Result<usize> {
        if off
            .checked_add(buf.len() as u64)
            .map_or(true, |end| end > self.total_size)
            || off >= self.total_size
        {
            return Err(Error::out_of_range());
        }

        let mut done = 0usize;
        while done < buf.len() {
            let pos = off + done as u64;
            let index = (pos / self.page_size) as usize;
            let local = pos % self.page_size;
            let chunk = core::cmp::min((self.page_size - local) as usize, buf.len() - done);

            let shadow = self.shadow_page(index)?;
            shadow.write_at(&buf[done..done + chunk], local)?;

            done += chunk;
        }

        Ok(done)
    }

    fn shadow_page(&mut self, index: usize) -> Result<RawRegion> {
        if let Some(shadow) = &self.shadows[index] {
            return Ok(shadow.clone());
        }

        let shadow = RawRegion::new(self.page_size as usize);
        if let Some(region) = &self.pages[index] {
            shadow.with_mut(|data| region.read_at(data, 0))?;
        }
        self.shadows[index] = Some(shadow.clone());
        self.stats.shadow_pages += 1;

        Ok(shadow)
    }

    /// 输出内存映射：每个已映射页一行，碎片化页面逐个列出片段
    pub fn dump_map(&self, out: &mut impl fmt::Write) -> fmt::Result {
        for (index, page) in self.pages.iter().enumerate() {
            let base = index as u64 * self.page_size;
            if self.shadows[index].is_some() {
                writeln!(out, "{:016X}: shadow", base)?;
            }
            match page {
                None => {}
                Some(Region::Fragmented(frag)) => {
                    writeln!(out, "{:016X}: fragmented", base)?;
                    for f in frag.fragments().iter().filter(|f| !is_hole(f.region())) {
                        writeln!(out, "  {:016X}: {:?}", base + f.start(), f.region())?;
                    }
                }
                Some(region) => writeln!(out, "{:016X}: {:?}", base, region)?,
            }
        }
        Ok(())
    }

    /// 以 info 级别输出映射统计
    pub fn dump_stats(&self) {
        let mapped = self.pages.iter().filter(|p| p.is_some()).count();
        log::info!(
            "vm stats: maps={} page_maps={} fragment_maps={} shadow_pages={} mapped_pages={}/{}",
            self.stats.maps,
            self.stats.page_maps,
            self.stats.fragment_maps,
            self.stats.shadow_pages,
            mapped,
            self.pages.len()
        );
    }
}

/// 碎片化页面中的零填充空洞
fn is_hole(region: &Region) -> bool {
    match region {
        Region::Offset(o) => is_hole(o.base()),
        Region::Padded(p) => p.inner().size() == 0,
        _ => false,
    }
}

#[cfg(feature = "std")]
mod stream {
    use super::VirtualMemory;
    use crate::error::Error;
    use std::io;

    impl From<Error> for io::Error {
        fn from(e: Error) -> Self {
            io::Error::other(e)
        }
    }

    impl VirtualMemory {
        /// 把整个地址空间顺序写出
        pub fn write_to<W: io::Write>(&self, mut out: W) -> io::Result<()> {
            let mut buf = std::vec![0u8; self.page_size as usize];
            let mut off = 0;
            while off < self.total_size {
                let n = self.read_at(&mut buf, off)?;
                out.write_all(&buf[..n])?;
                off += n as u64;
            }
            out.flush()
        }

        /// 顺序读取器
        pub fn reader(&self) -> VmReader<'_> {
            VmReader { vm: self, pos: 0 }
        }
    }

    /// 实现 `io::Read + io::Seek` 的只读视图
    pub struct VmReader<'a> {
        vm: &'a VirtualMemory,
        pos: u64,
    }

    impl io::Read for VmReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if buf.is_empty() || self.pos >= self.vm.size() {
                return Ok(0);
            }
            let n = self.vm.read_at(buf, self.pos)?;
            self.pos += n as u64;
            Ok(n)
        }
    }

    impl io::Seek for VmReader<'_> {
        fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
            let target = match pos {
                io::SeekFrom::Start(p) => Some(p),
                io::SeekFrom::End(d) => self.vm.size().checked_add_signed(d),
                io::SeekFrom::Current(d) => self.pos.checked_add_signed(d),
            };
            match target {
                Some(p) => {
                    self.pos = p;
                    Ok(p)
                }
                None => Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "seek to a negative or overflowing position",
                )),
            }
        }
    }
}

#[cfg(feature = "std")]
pub use stream::VmReader;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use proptest::prelude::*;

    const PAGE: u64 = 16;

    fn read_all(vm: &VirtualMemory) -> Vec<u8> {
        let mut buf = vec![0u8; vm.size() as usize];
        vm.read_at(&mut buf, 0).unwrap();
        buf
    }

    #[test]
    fn test_new_requires_multiple_of_page() {
        assert_eq!(
            VirtualMemory::new(100, 16).err().map(|e| e.kind()),
            Some(ErrorKind::InvalidInput)
        );
        assert!(VirtualMemory::new(0, 16).is_ok());
    }

    #[test]
    fn test_fresh_vm_reads_zero() {
        for n in 1..5 {
            let vm = VirtualMemory::new(n * PAGE, PAGE).unwrap();
            assert!(read_all(&vm).iter().all(|&b| b == 0));
        }
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_map_file_reads_lazily() {
        let mut vm = VirtualMemory::new(4 * PAGE, PAGE).unwrap();
        let data: Vec<u8> = (1..=20).collect();
        let region = vm.map_file(data, PAGE + 4, 24).unwrap();
        assert_eq!(region.size(), 24);

        let all = read_all(&vm);
        assert!(all[..20].iter().all(|&b| b == 0));
        assert_eq!(&all[20..40], &(1..=20).collect::<Vec<u8>>()[..]);
        // 数据源比声明的大小短，其余读为零
        assert!(all[40..].iter().all(|&b| b == 0));

        // 写入落在页副本上，数据源不变
        vm.write_at(&[0xaa], PAGE + 4).unwrap();
        assert_eq!(read_all(&vm)[20], 0xaa);
        let mut first = [0u8; 1];
        region.read_at(&mut first, 0).unwrap();
        assert_eq!(first, [1]);
    }

    #[test]
    fn test_large_region_spans_pages() {
        let mut vm = VirtualMemory::new(8 * PAGE, PAGE).unwrap();
        let data: Vec<u8> = (1..=50).collect();
        vm.map(Region::from_bytes(&data), 5).unwrap();

        let mut buf = vec![0u8; 50];
        vm.read_at(&mut buf, 5).unwrap();
        assert_eq!(buf, data);

        let all = read_all(&vm);
        assert!(all[..5].iter().all(|&b| b == 0));
        assert!(all[55..].iter().all(|&b| b == 0));

        // 头部和尾部是片段，中间两页直接引用
        let stats = vm.stats();
        assert_eq!(stats.fragment_maps, 2);
        assert_eq!(stats.page_maps, 2);
    }

    #[test]
    fn test_map_out_of_range() {
        let mut vm = VirtualMemory::new(2 * PAGE, PAGE).unwrap();
        let err = vm.map(Region::from_bytes(&[1; 4]), 2 * PAGE - 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn test_map_page_rejects_misalignment() {
        let mut vm = VirtualMemory::new(2 * PAGE, PAGE).unwrap();
        let err = vm.map_page(Region::from_bytes(&[1; 16]), 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_write_creates_shadow() {
        let mut vm = VirtualMemory::new(4 * PAGE, PAGE).unwrap();
        let raw = RawRegion::from_vec(vec![7; 16]);
        vm.map(Region::Raw(raw.clone()), PAGE).unwrap();

        vm.write_at(&[1, 2, 3], PAGE + 14).unwrap();
        assert_eq!(vm.stats().shadow_pages, 2);
        // 原区域不受影响
        assert_eq!(raw.to_vec(), vec![7; 16]);

        let all = read_all(&vm);
        assert_eq!(all[PAGE as usize..PAGE as usize + 14], [7; 14]);
        assert_eq!(all[30..33], [1, 2, 3]);
    }

    #[test]
    fn test_write_past_end_fails() {
        let mut vm = VirtualMemory::new(2 * PAGE, PAGE).unwrap();
        let err = vm.write_at(&[0; 4], 2 * PAGE - 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert_eq!(vm.stats().shadow_pages, 0);
    }

    #[test]
    fn test_mapping_after_write_wins() {
        let mut vm = VirtualMemory::new(2 * PAGE, PAGE).unwrap();
        vm.write_at(&[5; 16], 0).unwrap();
        vm.map(Region::from_bytes(&[9; 4]), 2).unwrap();
        let all = read_all(&vm);
        assert_eq!(all[..2], [5, 5]);
        assert_eq!(all[2..6], [9; 4]);
        assert_eq!(all[6..16], [5; 10]);
        assert_eq!(vm.stats().shadow_pages, 0);
    }

    #[test]
    fn test_reinterpret_copies_contents() {
        let mut vm = VirtualMemory::new(2 * PAGE, PAGE).unwrap();
        vm.map(Region::from_bytes(&[1, 2, 3, 4]), 6).unwrap();
        let raw = RawRegion::new(4);
        vm.reinterpret(Region::Raw(raw.clone()), 5).unwrap();
        assert_eq!(raw.to_vec(), [0, 1, 2, 3]);

        raw.write_u8(0, 0xaa);
        let mut buf = [0u8; 5];
        vm.read_at(&mut buf, 5).unwrap();
        assert_eq!(buf, [0xaa, 1, 2, 3, 4]);
    }

    #[test]
    fn test_dump_map() {
        let mut vm = VirtualMemory::new(4 * PAGE, PAGE).unwrap();
        vm.map(Region::from_bytes(&[1; 16]), 0).unwrap();
        vm.map(Region::from_bytes(&[2; 4]), 2 * PAGE + 4).unwrap();
        let mut out = String::new();
        vm.dump_map(&mut out).unwrap();
        assert!(out.contains("0000000000000000: raw<16>"));
        assert!(out.contains("0000000000000020: fragmented"));
        assert!(out.contains("  0000000000000024: raw<4>"));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_write_to_and_reader() {
        use std::io::{Read, Seek, SeekFrom};

        let mut vm = VirtualMemory::new(4 * PAGE, PAGE).unwrap();
        vm.map(Region::from_bytes(b"hello"), 40).unwrap();

        let mut out = std::vec::Vec::new();
        vm.write_to(&mut out).unwrap();
        assert_eq!(out.len(), 64);
        assert_eq!(&out[40..45], b"hello");

        let mut r = vm.reader();
        r.seek(SeekFrom::Start(40)).unwrap();
        let mut word = [0u8; 5];
        r.read_exact(&mut word).unwrap();
        assert_eq!(&word, b"hello");
        assert_eq!(r.seek(SeekFrom::End(0)).unwrap(), 64);
        assert_eq!(r.read(&mut word).unwrap(), 0);
    }

    proptest! {
        #[test]
        fn prop_map_matches_flat_model(
            ops in proptest::collection::vec((0u64..8 * PAGE, 1usize..48, any::<u8>()), 1..16)
        ) {
            let total = 8 * PAGE;
            let mut vm = VirtualMemory::new(total, PAGE).unwrap();
            let mut model = vec![0u8; total as usize];

            for (off, len, fill) in ops {
                let len = core::cmp::min(len as u64, total - off) as usize;
                let data: Vec<u8> = (0..len).map(|i| fill.wrapping_add(i as u8)).collect();
                vm.map(Region::from_bytes(&data), off).unwrap();
                model[off as usize..off as usize + len].copy_from_slice(&data);

                let mut back = vec![0u8; len];
                vm.read_at(&mut back, off).unwrap();
                prop_assert_eq!(&back, &data);
            }

            prop_assert_eq!(read_all(&vm), model);
        }

        #[test]
        fn prop_writes_and_maps_interleave(
            ops in proptest::collection::vec((any::<bool>(), 0u64..4 * PAGE, 1usize..24, any::<u8>()), 1..16)
        ) {
            let total = 4 * PAGE;
            let mut vm = VirtualMemory::new(total, PAGE).unwrap();
            let mut model = vec![0u8; total as usize];

            for (write, off, len, fill) in ops {
                let len = core::cmp::min(len as u64, total - off) as usize;
                let data = vec![fill; len];
                if write {
                    vm.write_at(&data, off).unwrap();
                } else {
                    vm.map(Region::from_bytes(&data), off).unwrap();
                }
                model[off as usize..off as usize + len].copy_from_slice(&data);
            }

            prop_assert_eq!(read_all(&vm), model);
        }
    }
}
