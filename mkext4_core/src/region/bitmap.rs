//! 位图区域
//!
//! 块位图和 inode 位图都是按位访问的缓冲区，位 `i` 存放在字节 `i / 8` 的第 `i % 8` 位。

use alloc::vec::Vec;

use super::RawRegion;
use crate::error::{Error, Result};

/// 位图
#[derive(Clone, Default)]
pub struct BitmapRegion {
    raw: RawRegion,
}

impl BitmapRegion {
    /// 创建能容纳 `bits` 位的位图（向上取整到字节）
    pub fn new(bits: u64) -> Self {
        Self {
            raw: RawRegion::new(bits.div_ceil(8) as usize),
        }
    }

    pub fn size(&self) -> u64 {
        self.raw.size()
    }

    /// 位数
    pub fn bits(&self) -> u64 {
        self.size() * 8
    }

    pub fn read_at(&self, buf: &mut [u8], off: u64) -> Result<usize> {
        self.raw.read_at(buf, off)
    }

    pub fn write_at(&self, buf: &[u8], off: u64) -> Result<usize> {
        self.raw.write_at(buf, off)
    }

    /// 读取位
    pub fn get(&self, i: u64) -> Result<bool> {
        if i >= self.bits() {
            return Err(Error::out_of_range());
        }
        let (index, pos) = ((i / 8) as usize, i % 8);
        Ok((self.raw.read_u8(index) >> pos) & 0x01 != 0)
    }

    /// 设置位
    pub fn set(&self, i: u64, value: bool) -> Result<()> {
        if i >= self.bits() {
            return Err(Error::out_of_range());
        }
        let (index, pos) = ((i / 8) as usize, i % 8);
        self.raw.with_mut(|data| {
            if value {
                data[index] |= 0x01 << pos;
            } else {
                data[index] &= !(0x01 << pos);
            }
        });
        Ok(())
    }

    /// 设置区间 `[start, end)` 内的所有位
    pub fn set_range(&self, start: u64, end: u64, value: bool) -> Result<()> {
        if end > self.bits() || start > end {
            return Err(Error::out_of_range());
        }
        for i in start..end {
            self.set(i, value)?;
        }
        Ok(())
    }

    /// 设置全部位
    pub fn set_all(&self, value: bool) {
        let fill = if value { 0xff } else { 0x00 };
        self.raw.with_mut(|data| data.fill(fill));
    }

    /// 统计被置位的位数
    pub fn count_ones(&self) -> u64 {
        self.raw
            .with(|data| data.iter().map(|b| b.count_ones() as u64).sum())
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.raw.to_vec()
    }
}
