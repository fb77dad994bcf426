//! 碎片化页面
//!
//! 当多个子页粒度的映射落在同一页内时，该页被提升为 [`FragmentedRegion`]：
//! 一个按起始偏移排序、互不重叠、恰好覆盖整页的片段列表。
//! 后插入的片段覆盖重叠部分，早先片段在重叠之外的字节保持不变。

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use super::{bounds, Region};
use crate::error::Result;

/// 页内的一个片段
///
/// 页内 `[start, start + len)` 的字节来自 `region` 的 `[0, len)`。
#[derive(Clone)]
pub struct Fragment {
    region: Region,
    start: u64,
    len: u64,
}

impl Fragment {
    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.start + self.len
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 保留前 `at` 字节
    fn cut_at(&self, at: u64) -> Fragment {
        Fragment {
            region: self.region.clone(),
            start: self.start,
            len: at,
        }
    }

    /// 丢弃前 `at` 字节
    fn offset_at(&self, at: u64) -> Fragment {
        Fragment {
            region: Region::offset(self.region.clone(), at),
            start: self.start + at,
            len: self.len - at,
        }
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}-{:08X} {:?}", self.start, self.end(), self.region)
    }
}

/// 由片段组成的单页区域
#[derive(Clone)]
pub struct FragmentedRegion {
    fragments: Vec<Fragment>,
    size: u64,
}

impl FragmentedRegion {
    /// 创建一个全零页
    ///
    /// 初始片段是零填充的空区域，不分配整页内存。
    pub fn new(page_size: u64) -> Self {
        Self {
            fragments: vec![Fragment {
                region: Region::padded(Region::from_bytes(&[]), page_size),
                start: 0,
                len: page_size,
            }],
            size: page_size,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// 在页内 `off` 处插入新片段
    ///
    /// 片段长度截断到页尾。与之重叠的旧片段被切分、截短或丢弃，
    /// 列表保持有序。
    ///
    /// # 返回
    ///
    /// 新片段实际覆盖的字节数
    pub fn map_fragment(&mut self, region: Region, off: u64) -> Result<u64> {
        bounds(self.size, off, 1)?;

        let len = core::cmp::min(region.size(), self.size - off);
        if len == 0 {
            return Ok(0);
        }
        let new = Fragment {
            region,
            start: off,
            len,
        };
        let (s, e) = (new.start(), new.end());

        let mut out = Vec::with_capacity(self.fragments.len() + 2);
        for old in self.fragments.drain(..) {
            let (a, b) = (old.start(), old.end());
            if b <= s || a >= e {
                out.push(old);
                continue;
            }
            if a < s {
                out.push(old.cut_at(s - a));
            }
            if b > e {
                out.push(old.offset_at(e - a));
            }
        }

        let pos = out.partition_point(|f| f.start() < s);
        out.insert(pos, new);
        self.fragments = out;

        Ok(len)
    }

    pub fn read_at(&self, buf: &mut [u8], off: u64) -> Result<usize> {
        let n = bounds(self.size, off, buf.len())?;
        let end = off + n as u64;
        let mut pos = off;

        for frag in &self.fragments {
            if frag.end() <= pos {
                continue;
            }
            if frag.start() >= end {
                break;
            }
            if frag.start() > pos {
                let gap = (frag.start() - pos) as usize;
                let at = (pos - off) as usize;
                buf[at..at + gap].fill(0);
                pos = frag.start();
            }

            let at = (pos - off) as usize;
            let want = (core::cmp::min(end, frag.end()) - pos) as usize;
            let got = frag.region.read_at(&mut buf[at..at + want], pos - frag.start())?;
            buf[at + got..at + want].fill(0);
            pos += want as u64;
        }

        let at = (pos - off) as usize;
        buf[at..n].fill(0);

        Ok(n)
    }

    pub fn write_at(&self, buf: &[u8], off: u64) -> Result<usize> {
        let n = bounds(self.size, off, buf.len())?;
        let end = off + n as u64;

        for frag in &self.fragments {
            if frag.end() <= off {
                continue;
            }
            if frag.start() >= end {
                break;
            }
            let lo = core::cmp::max(off, frag.start());
            let hi = core::cmp::min(end, frag.end());
            let src = &buf[(lo - off) as usize..(hi - off) as usize];
            frag.region.write_at(src, lo - frag.start())?;
        }

        Ok(n)
    }
}

impl fmt::Debug for FragmentedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fragments.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RawRegion;
    use proptest::prelude::*;

    const PAGE: u64 = 64;

    fn contents(f: &FragmentedRegion) -> Vec<u8> {
        let mut buf = vec![0u8; f.size() as usize];
        f.read_at(&mut buf, 0).unwrap();
        buf
    }

    fn assert_tiles(f: &FragmentedRegion) {
        let mut pos = 0;
        for frag in f.fragments() {
            assert_eq!(frag.start(), pos, "fragments must be contiguous: {:?}", f);
            assert!(!frag.is_empty());
            pos = frag.end();
        }
        assert_eq!(pos, f.size());
    }

    #[test]
    fn test_new_page_is_zero() {
        let f = FragmentedRegion::new(PAGE);
        assert_eq!(contents(&f), vec![0; PAGE as usize]);
        assert_tiles(&f);
    }

    #[test]
    fn test_contained_insert_splits() {
        let mut f = FragmentedRegion::new(PAGE);
        f.map_fragment(Region::from_bytes(&[1; 40]), 10).unwrap();
        f.map_fragment(Region::from_bytes(&[2; 4]), 20).unwrap();
        assert_eq!(f.fragments().len(), 5);
        assert_tiles(&f);

        let c = contents(&f);
        assert_eq!(c[9], 0);
        assert_eq!(c[10..20], [1; 10]);
        assert_eq!(c[20..24], [2; 4]);
        assert_eq!(c[24..50], [1; 26]);
        assert_eq!(c[50], 0);
    }

    #[test]
    fn test_fragment_clamped_to_page() {
        let mut f = FragmentedRegion::new(PAGE);
        assert_eq!(f.map_fragment(Region::from_bytes(&[3; 100]), 60).unwrap(), 4);
        assert_eq!(contents(&f)[60..], [3; 4]);
        assert!(f.map_fragment(Region::from_bytes(&[3]), PAGE).is_err());
    }

    #[test]
    fn test_write_reaches_fragments() {
        let raw = RawRegion::new(8);
        let mut f = FragmentedRegion::new(PAGE);
        f.map_fragment(Region::Raw(raw.clone()), 4).unwrap();
        assert_eq!(f.write_at(&[5; 10], 0).unwrap(), 10);
        assert_eq!(raw.to_vec(), [5, 5, 5, 5, 5, 5, 0, 0]);
    }

    proptest! {
        #[test]
        fn prop_later_insertions_win(
            ops in proptest::collection::vec((0u64..PAGE, 1usize..80, any::<u8>()), 1..24)
        ) {
            let mut f = FragmentedRegion::new(PAGE);
            let mut model = vec![0u8; PAGE as usize];

            for (off, len, fill) in ops {
                let data: Vec<u8> = (0..len).map(|i| fill.wrapping_add(i as u8)).collect();
                f.map_fragment(Region::from_bytes(&data), off).unwrap();

                let end = core::cmp::min(PAGE as usize, off as usize + len);
                model[off as usize..end].copy_from_slice(&data[..end - off as usize]);

                assert_tiles(&f);
                prop_assert_eq!(&contents(&f), &model);
            }
        }
    }
}
