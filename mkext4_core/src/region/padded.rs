//! 零填充区域

use super::{bounds, Region, Shared};
use crate::error::Result;

/// 把内部区域扩展到 `size` 字节
///
/// 超出内部区域的读取得到零，写入被静默吸收。
#[derive(Clone)]
pub struct PaddedRegion {
    inner: Shared,
    size: u64,
}

impl PaddedRegion {
    pub fn new(inner: Region, size: u64) -> Self {
        Self {
            inner: inner.into(),
            size,
        }
    }

    pub fn inner(&self) -> &Region {
        &self.inner
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn read_at(&self, buf: &mut [u8], off: u64) -> Result<usize> {
        let n = bounds(self.size, off, buf.len())?;
        let inner_size = self.inner.size();

        let mut filled = 0;
        if off < inner_size {
            let k = core::cmp::min(n as u64, inner_size - off) as usize;
            filled = self.inner.read_at(&mut buf[..k], off)?;
        }
        buf[filled..n].fill(0);

        Ok(n)
    }

    pub fn write_at(&self, buf: &[u8], off: u64) -> Result<usize> {
        let n = bounds(self.size, off, buf.len())?;
        let inner_size = self.inner.size();

        if off < inner_size {
            let k = core::cmp::min(n as u64, inner_size - off) as usize;
            self.inner.write_at(&buf[..k], off)?;
        }

        Ok(n)
    }
}
