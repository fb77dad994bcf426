//! 按需读取的只读区域
//!
//! 主机文件通过 [`FileRegion`] 映射进镜像时不会被整体读入内存，
//! 只有在镜像被顺序读出时才读取对应的字节。

use alloc::rc::Rc;
use alloc::vec::Vec;

use super::bounds;
use crate::error::{Error, ErrorKind, Result};

/// 可按偏移读取的数据源
pub trait ReadAt {
    /// 从 `offset` 开始读取，返回读取的字节数；到达末尾时返回 0
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize>;
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        if offset >= self.len() as u64 {
            return Ok(0);
        }
        let src = &self[offset as usize..];
        let n = core::cmp::min(src.len(), buf.len());
        buf[..n].copy_from_slice(&src[..n]);
        Ok(n)
    }
}

#[cfg(feature = "std")]
impl ReadAt for std::fs::File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        #[cfg(unix)]
        let r = std::os::unix::fs::FileExt::read_at(self, buf, offset);
        #[cfg(windows)]
        let r = std::os::windows::fs::FileExt::seek_read(self, buf, offset);
        #[cfg(not(any(unix, windows)))]
        let r: std::io::Result<usize> = {
            let _ = (buf, offset);
            Err(std::io::ErrorKind::Unsupported.into())
        };

        r.map_err(|e| {
            log::warn!("read_at({offset}) on host file failed: {e}");
            Error::new(ErrorKind::Io, "failed to read from host file")
        })
    }
}

/// 按路径引用的主机文件
///
/// 不持有文件描述符，每次读取时重新打开。
#[cfg(feature = "std")]
pub struct HostFile {
    path: std::path::PathBuf,
}

#[cfg(feature = "std")]
impl HostFile {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(feature = "std")]
impl ReadAt for HostFile {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let file = std::fs::File::open(&self.path).map_err(|e| {
            log::warn!("failed to open {}: {e}", self.path.display());
            Error::new(ErrorKind::Io, "failed to open host file")
        })?;
        ReadAt::read_at(&file, buf, offset)
    }
}

/// 只读的数据源区域
#[derive(Clone)]
pub struct FileRegion {
    source: Rc<dyn ReadAt>,
    size: u64,
}

impl FileRegion {
    /// 以给定大小包装数据源
    ///
    /// 数据源比 `size` 短时，缺失部分读为零。
    pub fn new(source: impl ReadAt + 'static, size: u64) -> Self {
        Self {
            source: Rc::new(source),
            size,
        }
    }

    /// 按路径包装主机文件，大小取自文件元数据
    #[cfg(feature = "std")]
    pub fn from_path(path: impl Into<std::path::PathBuf>) -> Result<Self> {
        let source = HostFile::new(path);
        let size = std::fs::metadata(&source.path)
            .map_err(|_| Error::new(ErrorKind::Io, "failed to stat host file"))?
            .len();
        Ok(Self::new(source, size))
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn read_at(&self, buf: &mut [u8], off: u64) -> Result<usize> {
        let n = bounds(self.size, off, buf.len())?;
        let mut done = 0;
        while done < n {
            let got = self.source.read_at(&mut buf[done..n], off + done as u64)?;
            if got == 0 {
                break;
            }
            done += got;
        }
        buf[done..n].fill(0);
        Ok(n)
    }

    pub fn write_at(&self, buf: &[u8], off: u64) -> Result<usize> {
        bounds(self.size, off, buf.len())?;
        Err(Error::new(ErrorKind::ReadOnly, "region is read only"))
    }
}
