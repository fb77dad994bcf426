//! 原始缓冲区区域

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use byteorder::{ByteOrder, LittleEndian};
use core::cell::RefCell;

use super::bounds;
use crate::error::Result;

/// 一段共享的内存缓冲区
///
/// 克隆后与原对象共享同一缓冲区，磁盘结构（superblock、inode 等）
/// 通过它在映射之后继续被原地修改。
#[derive(Clone, Default)]
pub struct RawRegion {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl RawRegion {
    /// 分配 `size` 字节的零缓冲区
    pub fn new(size: usize) -> Self {
        Self::from_vec(vec![0u8; size])
    }

    pub fn from_vec(v: Vec<u8>) -> Self {
        Self {
            buf: Rc::new(RefCell::new(v)),
        }
    }

    pub fn size(&self) -> u64 {
        self.buf.borrow().len() as u64
    }

    pub fn read_at(&self, buf: &mut [u8], off: u64) -> Result<usize> {
        let data = self.buf.borrow();
        let n = bounds(data.len() as u64, off, buf.len())?;
        let off = off as usize;
        buf[..n].copy_from_slice(&data[off..off + n]);
        Ok(n)
    }

    pub fn write_at(&self, buf: &[u8], off: u64) -> Result<usize> {
        let mut data = self.buf.borrow_mut();
        let n = bounds(data.len() as u64, off, buf.len())?;
        let off = off as usize;
        data[off..off + n].copy_from_slice(&buf[..n]);
        Ok(n)
    }

    /// 以只读切片访问内容
    pub fn with<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.buf.borrow())
    }

    /// 以可变切片访问内容
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.buf.borrow_mut())
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.borrow().clone()
    }

    /// 两个句柄是否指向同一缓冲区
    pub fn ptr_eq(&self, other: &RawRegion) -> bool {
        Rc::ptr_eq(&self.buf, &other.buf)
    }

    // 以下访问器用于固定布局的磁盘结构，字段偏移由调用者保证在界内

    pub fn read_u8(&self, off: usize) -> u8 {
        self.buf.borrow()[off]
    }

    pub fn write_u8(&self, off: usize, v: u8) {
        self.buf.borrow_mut()[off] = v;
    }

    pub fn read_u16(&self, off: usize) -> u16 {
        LittleEndian::read_u16(&self.buf.borrow()[off..off + 2])
    }

    pub fn write_u16(&self, off: usize, v: u16) {
        LittleEndian::write_u16(&mut self.buf.borrow_mut()[off..off + 2], v);
    }

    pub fn read_u32(&self, off: usize) -> u32 {
        LittleEndian::read_u32(&self.buf.borrow()[off..off + 4])
    }

    pub fn write_u32(&self, off: usize, v: u32) {
        LittleEndian::write_u32(&mut self.buf.borrow_mut()[off..off + 4], v);
    }

    pub fn read_bytes(&self, off: usize, out: &mut [u8]) {
        out.copy_from_slice(&self.buf.borrow()[off..off + out.len()]);
    }

    pub fn write_bytes(&self, off: usize, bytes: &[u8]) {
        self.buf.borrow_mut()[off..off + bytes.len()].copy_from_slice(bytes);
    }
}
