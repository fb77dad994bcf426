//! 区域数组
//!
//! 多个区域首尾相接紧密排列，跨越子区域边界的访问会被拆分。

use alloc::rc::Rc;
use alloc::vec::Vec;

use super::{bounds, Region};
use crate::error::{Error, ErrorKind, Result};

/// 紧密拼接的区域序列
#[derive(Clone)]
pub struct RegionArray {
    children: Rc<[Region]>,
}

impl RegionArray {
    pub fn new(children: Vec<Region>) -> Self {
        Self {
            children: children.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> &[Region] {
        &self.children
    }

    pub fn size(&self) -> u64 {
        self.children.iter().map(Region::size).sum()
    }

    pub fn read_at(&self, buf: &mut [u8], off: u64) -> Result<usize> {
        let n = bounds(self.size(), off, buf.len())?;
        let mut done = 0usize;
        let mut child_start = 0u64;

        for child in self.children.iter() {
            if done == n {
                break;
            }
            let child_len = child.size();
            let pos = off + done as u64;
            if child_start + child_len <= pos {
                child_start += child_len;
                continue;
            }

            let child_off = pos - child_start;
            let want = core::cmp::min((n - done) as u64, child_len - child_off) as usize;
            let got = child.read_at(&mut buf[done..done + want], child_off)?;
            // 子区域必须读满其范围内的请求
            if got != want {
                return Err(Error::new(ErrorKind::Corrupted, "region array child returned a short read"));
            }

            done += got;
            child_start += child_len;
        }

        Ok(done)
    }

    pub fn write_at(&self, buf: &[u8], off: u64) -> Result<usize> {
        let n = bounds(self.size(), off, buf.len())?;
        let mut done = 0usize;
        let mut child_start = 0u64;

        for child in self.children.iter() {
            if done == n {
                break;
            }
            let child_len = child.size();
            let pos = off + done as u64;
            if child_start + child_len <= pos {
                child_start += child_len;
                continue;
            }

            let child_off = pos - child_start;
            let want = core::cmp::min((n - done) as u64, child_len - child_off) as usize;
            let wrote = child.write_at(&buf[done..done + want], child_off)?;
            if wrote != want {
                return Err(Error::new(ErrorKind::Corrupted, "region array child returned a short write"));
            }
            done += wrote;
            child_start += child_len;
        }

        Ok(done)
    }
}
