//! 内存区域模块
//!
//! 内存区域是可按字节随机访问的对象，统一提供 `size` / `read_at` / `write_at`。
//! 偏移总是相对区域起点，且必须小于 `size()`。
//!
//! 区域之间可以组合：
//!
//! - [`RawRegion`]：一段内存缓冲区
//! - [`BitmapRegion`]：按位访问的缓冲区
//! - [`FileRegion`]：按需读取的只读数据源
//! - [`OffsetRegion`]：对基区域做偏移
//! - [`PaddedRegion`]：超出内部区域的部分读为零、写入被吸收
//! - [`TruncatedRegion`]：只暴露前若干字节
//! - [`RegionArray`]：多个区域紧密拼接
//! - [`FragmentedRegion`]：一页内由多个片段拼成
//!
//! 所有区域的克隆都很廉价（共享底层缓冲区），同一缓冲区可以被多个页面别名引用。

mod array;
mod bitmap;
mod file;
mod fragmented;
mod offset;
mod padded;
mod raw;
mod truncated;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

pub use array::RegionArray;
pub use bitmap::BitmapRegion;
pub use file::{FileRegion, ReadAt};
#[cfg(feature = "std")]
pub use file::HostFile;
pub use fragmented::{Fragment, FragmentedRegion};
pub use offset::OffsetRegion;
pub use padded::PaddedRegion;
pub use raw::RawRegion;
pub use truncated::TruncatedRegion;

use crate::error::{Error, Result};

/// 内存区域
#[derive(Clone)]
pub enum Region {
    Raw(RawRegion),
    Bitmap(BitmapRegion),
    File(FileRegion),
    Offset(OffsetRegion),
    Padded(PaddedRegion),
    Truncated(TruncatedRegion),
    Array(RegionArray),
    Fragmented(FragmentedRegion),
}

impl Region {
    /// 区域大小（字节）
    pub fn size(&self) -> u64 {
        match self {
            Region::Raw(r) => r.size(),
            Region::Bitmap(r) => r.size(),
            Region::File(r) => r.size(),
            Region::Offset(r) => r.size(),
            Region::Padded(r) => r.size(),
            Region::Truncated(r) => r.size(),
            Region::Array(r) => r.size(),
            Region::Fragmented(r) => r.size(),
        }
    }

    /// 从 `off` 开始读取
    ///
    /// # 返回
    ///
    /// 实际读取的字节数，等于 `min(buf.len(), size() - off)`
    pub fn read_at(&self, buf: &mut [u8], off: u64) -> Result<usize> {
        match self {
            Region::Raw(r) => r.read_at(buf, off),
            Region::Bitmap(r) => r.read_at(buf, off),
            Region::File(r) => r.read_at(buf, off),
            Region::Offset(r) => r.read_at(buf, off),
            Region::Padded(r) => r.read_at(buf, off),
            Region::Truncated(r) => r.read_at(buf, off),
            Region::Array(r) => r.read_at(buf, off),
            Region::Fragmented(r) => r.read_at(buf, off),
        }
    }

    /// 从 `off` 开始写入
    ///
    /// # 返回
    ///
    /// 被区域接收的字节数，等于 `min(buf.len(), size() - off)`
    pub fn write_at(&self, buf: &[u8], off: u64) -> Result<usize> {
        match self {
            Region::Raw(r) => r.write_at(buf, off),
            Region::Bitmap(r) => r.write_at(buf, off),
            Region::File(r) => r.write_at(buf, off),
            Region::Offset(r) => r.write_at(buf, off),
            Region::Padded(r) => r.write_at(buf, off),
            Region::Truncated(r) => r.write_at(buf, off),
            Region::Array(r) => r.write_at(buf, off),
            Region::Fragmented(r) => r.write_at(buf, off),
        }
    }

    /// 读出整个区域
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = alloc::vec![0u8; self.size() as usize];
        if !buf.is_empty() {
            self.read_at(&mut buf, 0)?;
        }
        Ok(buf)
    }

    /// 以 `delta` 为新起点的视图
    ///
    /// 偏移为 0 时返回原区域；嵌套的偏移视图在构造时合并。
    pub fn offset(base: Region, delta: u64) -> Region {
        if delta == 0 {
            return base;
        }
        match base {
            Region::Offset(inner) => Region::Offset(OffsetRegion::new(
                inner.shared_base(),
                inner.delta() + delta,
            )),
            other => Region::Offset(OffsetRegion::new(other, delta)),
        }
    }

    /// 零填充到 `size` 字节的视图
    pub fn padded(inner: Region, size: u64) -> Region {
        Region::Padded(PaddedRegion::new(inner, size))
    }

    /// 最多暴露 `max` 字节的视图
    ///
    /// 区域本身不超过 `max` 时直接返回原区域。
    pub fn truncated(inner: Region, max: u64) -> Region {
        if inner.size() <= max {
            return inner;
        }
        Region::Truncated(TruncatedRegion::new(inner, max))
    }

    /// 紧密拼接
    pub fn array(children: Vec<Region>) -> Region {
        Region::Array(RegionArray::new(children))
    }

    /// 由字节复制出的原始区域
    pub fn from_bytes(bytes: &[u8]) -> Region {
        Region::Raw(RawRegion::from_vec(bytes.to_vec()))
    }
}

impl From<RawRegion> for Region {
    fn from(r: RawRegion) -> Self {
        Region::Raw(r)
    }
}

impl From<BitmapRegion> for Region {
    fn from(r: BitmapRegion) -> Self {
        Region::Bitmap(r)
    }
}

impl From<FileRegion> for Region {
    fn from(r: FileRegion) -> Self {
        Region::File(r)
    }
}

impl From<Vec<u8>> for Region {
    fn from(v: Vec<u8>) -> Self {
        Region::Raw(RawRegion::from_vec(v))
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Raw(r) => write!(f, "raw<{}>", r.size()),
            Region::Bitmap(r) => write!(f, "bitmap<{}>", r.size()),
            Region::File(r) => write!(f, "file<{}>", r.size()),
            Region::Offset(r) => write!(f, "{:?} offset={:016X}", r.base(), r.delta()),
            Region::Padded(r) => write!(f, "{:?} padded={:016X}", r.inner(), r.size()),
            Region::Truncated(r) => write!(f, "{:?} truncated={:016X}", r.inner(), r.size()),
            Region::Array(r) => write!(f, "array[{}]<{}>", r.len(), r.size()),
            Region::Fragmented(r) => write!(f, "fragmented[{}]", r.fragments().len()),
        }
    }
}

/// 检查偏移并计算本次可访问的长度
#[inline]
pub(crate) fn bounds(size: u64, off: u64, len: usize) -> Result<usize> {
    if off >= size {
        return Err(Error::out_of_range());
    }
    Ok(core::cmp::min(len as u64, size - off) as usize)
}

/// 共享的子区域句柄
pub(crate) type Shared = Rc<Region>;
