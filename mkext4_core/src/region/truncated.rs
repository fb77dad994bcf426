//! 截断区域

use super::{bounds, Region, Shared};
use crate::error::Result;

/// 只暴露内部区域的前 `max` 字节
#[derive(Clone)]
pub struct TruncatedRegion {
    inner: Shared,
    max: u64,
}

impl TruncatedRegion {
    pub fn new(inner: Region, max: u64) -> Self {
        Self {
            inner: inner.into(),
            max,
        }
    }

    pub fn inner(&self) -> &Region {
        &self.inner
    }

    pub fn size(&self) -> u64 {
        self.max
    }

    pub fn read_at(&self, buf: &mut [u8], off: u64) -> Result<usize> {
        let n = bounds(self.max, off, buf.len())?;
        self.inner.read_at(&mut buf[..n], off)
    }

    pub fn write_at(&self, buf: &[u8], off: u64) -> Result<usize> {
        let n = bounds(self.max, off, buf.len())?;
        self.inner.write_at(&buf[..n], off)
    }
}
