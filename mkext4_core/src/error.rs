//! 错误处理模块

use core::fmt;

use crate::consts::*;

/// 错误类别
///
/// 调用者可以根据类别决定后续行为（例如 `NotFound` 时自动创建父目录）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 底层数据源读取失败
    Io,
    /// 访问偏移超出区域大小
    OutOfRange,
    /// 文件系统已满、碎片过多或 inode 耗尽
    NoSpace,
    /// 路径不存在
    NotFound,
    /// 参数无效（节点类型错误、名称过长等）
    InvalidInput,
    /// 目录项已存在
    AlreadyExists,
    /// 内部一致性被破坏（空指针块号、区域越界读等）
    Corrupted,
    /// 未实现的磁盘格式
    Unsupported,
    /// 只读区域
    ReadOnly,
}

impl ErrorKind {
    /// 对应的 errno
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::Io => EIO,
            ErrorKind::OutOfRange => ERANGE,
            ErrorKind::NoSpace => ENOSPC,
            ErrorKind::NotFound => ENOENT,
            ErrorKind::InvalidInput => EINVAL,
            ErrorKind::AlreadyExists => EEXIST,
            ErrorKind::Corrupted => EUCLEAN,
            ErrorKind::Unsupported => ENOTSUP,
            ErrorKind::ReadOnly => EROFS,
        }
    }
}

/// mkext4 错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
}

impl Error {
    pub fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    /// 兼容 C 的错误码
    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    pub(crate) fn out_of_range() -> Self {
        Self::new(ErrorKind::OutOfRange, "offset out of range")
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (errno {}): {}", self.kind, self.code(), self.message)
    }
}

impl core::error::Error for Error {}

/// mkext4 Result 类型
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(Error::new(ErrorKind::NoSpace, "full").code(), ENOSPC);
        assert_eq!(Error::new(ErrorKind::NotFound, "missing").code(), ENOENT);
        assert_eq!(Error::out_of_range().kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn test_error_display() {
        let err = Error::new(ErrorKind::InvalidInput, "bad name");
        let text = err.to_string();
        assert!(text.contains("InvalidInput"));
        assert!(text.contains("bad name"));
    }
}
