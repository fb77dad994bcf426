//! 路径处理
//!
//! 所有路径在查找前按词法规则规范化为以 `/` 开头的绝对路径，
//! 不访问文件系统，也不解析符号链接。

use alloc::string::String;
use alloc::vec::Vec;

/// 规范化路径
///
/// 合并重复的 `/`，去掉 `.` 和末尾的 `/`，按词法处理 `..`
/// （根目录的 `..` 仍是根目录）。相对路径视为相对于根目录。
pub fn clean(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }

    let mut out = String::with_capacity(path.len() + 1);
    for part in &parts {
        out.push('/');
        out.push_str(part);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// 拆分规范化路径为（父目录，最后一个分量）
///
/// 根目录没有最后一个分量，返回 `None`。
pub(crate) fn split(path: &str) -> Option<(&str, &str)> {
    if path == "/" {
        return None;
    }
    let idx = path.rfind('/')?;
    let parent = if idx == 0 { "/" } else { &path[..idx] };
    Some((parent, &path[idx + 1..]))
}
