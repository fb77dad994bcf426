//! 偏移区域

use super::{bounds, Region, Shared};
use crate::error::Result;

/// 基区域从 `delta` 开始的视图
///
/// 通过 [`Region::offset`] 构造时嵌套的偏移会被合并，这里不再检查。
#[derive(Clone)]
pub struct OffsetRegion {
    base: Shared,
    delta: u64,
}

impl OffsetRegion {
    pub(super) fn new(base: impl Into<Shared>, delta: u64) -> Self {
        Self {
            base: base.into(),
            delta,
        }
    }

    pub fn base(&self) -> &Region {
        &self.base
    }

    pub(super) fn shared_base(&self) -> Shared {
        self.base.clone()
    }

    pub fn delta(&self) -> u64 {
        self.delta
    }

    pub fn size(&self) -> u64 {
        self.base.size().saturating_sub(self.delta)
    }

    pub fn read_at(&self, buf: &mut [u8], off: u64) -> Result<usize> {
        let n = bounds(self.size(), off, buf.len())?;
        self.base.read_at(&mut buf[..n], off + self.delta)
    }

    pub fn write_at(&self, buf: &[u8], off: u64) -> Result<usize> {
        let n = bounds(self.size(), off, buf.len())?;
        self.base.write_at(&buf[..n], off + self.delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RawRegion;

    #[test]
    fn test_offset_write_reaches_base() {
        let raw = RawRegion::new(8);
        let view = Region::offset(Region::Raw(raw.clone()), 6);
        assert_eq!(view.size(), 2);
        assert_eq!(view.write_at(&[1, 2, 3], 0).unwrap(), 2);
        assert_eq!(raw.to_vec(), [0, 0, 0, 0, 0, 0, 1, 2]);
    }
}
