//! 最小的 tar 读取器
//!
//! 支持 ustar 头、GNU 长名称（`L`/`K`）和 pax 扩展头（`x`）中的
//! `path`/`linkpath`/`uid`/`gid`/`mtime`，以及 gzip 压缩的归档。
//! 只产出普通文件、硬链接、符号链接和目录，其他类型跳过。

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;

const BLOCK: usize = 512;

/// 支持的条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    HardLink,
    Symlink,
    Directory,
}

/// 归档中的一个条目
#[derive(Debug, Clone)]
pub struct TarEntry {
    /// 相对归档根目录的路径，不含开头的 `./` 和结尾的 `/`
    pub path: String,
    pub kind: EntryKind,
    /// 符号链接或硬链接的目标
    pub link_target: String,
    pub data: Vec<u8>,
    pub mode: u16,
    pub uid: u32,
    pub gid: u32,
    pub mtime: u32,
}

/// 读取归档文件，按扩展名或 gzip 魔数决定是否解压
pub fn read_archive(path: &Path) -> Result<Vec<TarEntry>> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    let name = path.to_string_lossy();
    let gzipped = name.ends_with(".gz") || name.ends_with(".tgz") || raw.starts_with(&[0x1f, 0x8b]);
    let entries = if gzipped {
        read_tar_gz(&raw)
    } else {
        parse_tar(&raw)
    };
    entries.with_context(|| format!("failed to parse archive {}", path.display()))
}

/// 解压并解析 `.tar.gz`
pub fn read_tar_gz(gz_data: &[u8]) -> Result<Vec<TarEntry>> {
    let mut tar_data = Vec::new();
    GzDecoder::new(gz_data)
        .read_to_end(&mut tar_data)
        .context("failed to decompress gzip data")?;
    parse_tar(&tar_data)
}

/// 下一个条目的覆盖字段（来自 GNU 长名称或 pax 头）
#[derive(Default)]
struct Overrides {
    path: Option<String>,
    link_target: Option<String>,
    uid: Option<u32>,
    gid: Option<u32>,
    mtime: Option<u32>,
}

/// 解析未压缩的 tar 归档
pub fn parse_tar(data: &[u8]) -> Result<Vec<TarEntry>> {
    let mut entries = Vec::new();
    let mut next = Overrides::default();
    let mut pos = 0;

    while pos + BLOCK <= data.len() {
        let header = &data[pos..pos + BLOCK];
        // 两个全零块标志归档结束，单个也视为结束
        if header.iter().all(|&b| b == 0) {
            break;
        }
        verify_checksum(header).with_context(|| format!("bad tar header at offset {pos}"))?;

        let size = parse_numeric(&header[124..136])? as usize;
        let body_start = pos + BLOCK;
        let body_end = body_start
            .checked_add(size)
            .filter(|&end| end <= data.len())
            .with_context(|| format!("truncated tar entry at offset {pos}"))?;
        let body = &data[body_start..body_end];
        pos = body_start + size.div_ceil(BLOCK) * BLOCK;

        let typeflag = header[156];
        let kind = match typeflag {
            b'L' => {
                next.path = Some(c_string(body));
                continue;
            }
            b'K' => {
                next.link_target = Some(c_string(body));
                continue;
            }
            b'x' => {
                parse_pax(body, &mut next)?;
                continue;
            }
            b'g' => continue,
            b'0' | b'7' | 0 => EntryKind::File,
            b'1' => EntryKind::HardLink,
            b'2' => EntryKind::Symlink,
            b'5' => EntryKind::Directory,
            other => {
                log::warn!(
                    "skipping unsupported tar entry type {:?} for {}",
                    other as char,
                    header_path(header)
                );
                next = Overrides::default();
                continue;
            }
        };

        let overrides = std::mem::take(&mut next);
        let path = overrides.path.unwrap_or_else(|| header_path(header));
        let path = path.trim_start_matches("./").trim_end_matches('/').to_string();

        entries.push(TarEntry {
            path,
            kind,
            link_target: overrides
                .link_target
                .unwrap_or_else(|| c_string(&header[157..257])),
            data: if kind == EntryKind::File {
                body.to_vec()
            } else {
                Vec::new()
            },
            mode: (parse_numeric(&header[100..108])? & 0o7777) as u16,
            uid: overrides.uid.unwrap_or(parse_numeric(&header[108..116])? as u32),
            gid: overrides.gid.unwrap_or(parse_numeric(&header[116..124])? as u32),
            mtime: overrides.mtime.unwrap_or(parse_numeric(&header[136..148])? as u32),
        });
    }

    Ok(entries)
}

/// ustar 的 name + prefix
fn header_path(header: &[u8]) -> String {
    let name = c_string(&header[0..100]);
    let prefix = if &header[257..262] == b"ustar" {
        c_string(&header[345..500])
    } else {
        String::new()
    };
    if prefix.is_empty() {
        name
    } else {
        format!("{prefix}/{name}")
    }
}

fn c_string(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// 解析数值字段：八进制文本，或最高位置 1 的 base-256 编码
fn parse_numeric(field: &[u8]) -> Result<u64> {
    if field.first().is_some_and(|&b| b & 0x80 != 0) {
        let mut value = (field[0] & 0x7f) as u64;
        for &b in &field[1..] {
            value = value
                .checked_mul(256)
                .and_then(|v| v.checked_add(b as u64))
                .context("base-256 tar field overflows")?;
        }
        return Ok(value);
    }

    let text: String = field
        .iter()
        .skip_while(|&&b| b == b' ')
        .take_while(|&&b| b != 0 && b != b' ')
        .map(|&b| b as char)
        .collect();
    if text.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(&text, 8).with_context(|| format!("bad octal tar field {text:?}"))
}

fn verify_checksum(header: &[u8]) -> Result<()> {
    let expected = parse_numeric(&header[148..156])?;
    let actual: u64 = header
        .iter()
        .enumerate()
        .map(|(i, &b)| if (148..156).contains(&i) { b' ' as u64 } else { b as u64 })
        .sum();
    if actual != expected {
        bail!("checksum mismatch: header says {expected}, computed {actual}");
    }
    Ok(())
}

/// 解析 pax 记录 `"<len> <key>=<value>\n"`
fn parse_pax(body: &[u8], next: &mut Overrides) -> Result<()> {
    let mut rest = body;
    while !rest.is_empty() {
        let space = rest
            .iter()
            .position(|&b| b == b' ')
            .context("pax record without length")?;
        let len: usize = std::str::from_utf8(&rest[..space])
            .ok()
            .and_then(|s| s.parse().ok())
            .context("bad pax record length")?;
        if len <= space + 1 || len > rest.len() {
            bail!("pax record length {len} out of range");
        }

        let record = &rest[space + 1..len];
        let record = record.strip_suffix(b"\n").unwrap_or(record);
        if let Some(eq) = record.iter().position(|&b| b == b'=') {
            let key = &record[..eq];
            let value = String::from_utf8_lossy(&record[eq + 1..]).into_owned();
            match key {
                b"path" => next.path = Some(value),
                b"linkpath" => next.link_target = Some(value),
                b"uid" => next.uid = value.parse().ok(),
                b"gid" => next.gid = value.parse().ok(),
                // 小数部分舍去
                b"mtime" => next.mtime = value.split('.').next().and_then(|s| s.parse().ok()),
                _ => {}
            }
        }
        rest = &rest[len..];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 构造一个 ustar 头，校验和已填好
    fn header(name: &str, typeflag: u8, size: usize, link: &str) -> [u8; BLOCK] {
        let mut h = [0u8; BLOCK];
        h[..name.len()].copy_from_slice(name.as_bytes());
        h[100..107].copy_from_slice(b"0000644");
        h[108..115].copy_from_slice(b"0001750");
        h[116..123].copy_from_slice(b"0000144");
        h[124..135].copy_from_slice(format!("{size:011o}").as_bytes());
        h[136..147].copy_from_slice(b"14524066000");
        h[156] = typeflag;
        h[157..157 + link.len()].copy_from_slice(link.as_bytes());
        h[257..263].copy_from_slice(b"ustar\0");
        h[263..265].copy_from_slice(b"00");

        h[148..156].fill(b' ');
        let sum: u32 = h.iter().map(|&b| b as u32).sum();
        h[148..155].copy_from_slice(format!("{sum:06o}\0").as_bytes());
        h
    }

    /// 追加一个条目（头 + 按块补齐的数据）
    fn push(out: &mut Vec<u8>, name: &str, typeflag: u8, body: &[u8], link: &str) {
        out.extend_from_slice(&header(name, typeflag, body.len(), link));
        out.extend_from_slice(body);
        out.resize(out.len().div_ceil(BLOCK) * BLOCK, 0);
    }

    fn finish(out: &mut Vec<u8>) {
        out.extend_from_slice(&[0u8; 2 * BLOCK]);
    }

    #[test]
    fn test_parse_basic_entries() {
        let mut tar = Vec::new();
        push(&mut tar, "./etc/", b'5', b"", "");
        push(&mut tar, "./etc/hostname", b'0', b"box\n", "");
        push(&mut tar, "./etc/alias", b'1', b"", "etc/hostname");
        push(&mut tar, "./bin", b'2', b"", "usr/bin");
        push(&mut tar, "./dev/null", b'3', b"", "");
        finish(&mut tar);

        let entries = parse_tar(&tar).unwrap();
        let summary: Vec<_> = entries.iter().map(|e| (e.path.as_str(), e.kind)).collect();
        assert_eq!(
            summary,
            [
                ("etc", EntryKind::Directory),
                ("etc/hostname", EntryKind::File),
                ("etc/alias", EntryKind::HardLink),
                ("bin", EntryKind::Symlink),
            ]
        );

        let file = &entries[1];
        assert_eq!(file.data, b"box\n");
        assert_eq!((file.mode, file.uid, file.gid), (0o644, 1000, 100));
        assert_eq!(file.mtime, 0o14524066000);
        assert_eq!(entries[2].link_target, "etc/hostname");
        assert_eq!(entries[3].link_target, "usr/bin");
    }

    #[test]
    fn test_gnu_long_name_and_pax() {
        let long = format!("deep/{}", "x".repeat(150));
        let mut tar = Vec::new();
        push(&mut tar, "././@LongLink", b'L', format!("{long}\0").as_bytes(), "");
        push(&mut tar, "short", b'0', b"data", "");

        let record = |kv: &str| {
            let body_len = kv.len() + 2;
            let mut len = body_len + body_len.to_string().len();
            if len.to_string().len() != body_len.to_string().len() {
                len += 1;
            }
            format!("{len} {kv}\n")
        };
        let pax = format!("{}{}", record("linkpath=/a/very/long/target"), record("uid=200000"));
        push(&mut tar, "PaxHeaders/link", b'x', pax.as_bytes(), "");
        push(&mut tar, "link", b'2', b"", "short-target");
        finish(&mut tar);

        let entries = parse_tar(&tar).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, long);
        assert_eq!(entries[0].data, b"data");
        assert_eq!(entries[1].path, "link");
        assert_eq!(entries[1].link_target, "/a/very/long/target");
        assert_eq!(entries[1].uid, 200_000);
        assert_eq!(entries[1].gid, 100);
    }

    #[test]
    fn test_rejects_corrupt_header() {
        let mut tar = Vec::new();
        push(&mut tar, "file", b'0', b"abc", "");
        tar[0] = b'g';
        assert!(parse_tar(&tar).is_err());

        let mut tar = Vec::new();
        push(&mut tar, "file", b'0', b"abc", "");
        tar.truncate(BLOCK + 1);
        assert!(parse_tar(&tar).is_err());
    }

    #[test]
    fn test_numeric_fields() {
        assert_eq!(parse_numeric(b"0000644\0").unwrap(), 0o644);
        assert_eq!(parse_numeric(b"   755 \0").unwrap(), 0o755);
        assert_eq!(parse_numeric(&[0; 8]).unwrap(), 0);
        assert_eq!(parse_numeric(&[0x80, 0, 0, 0, 0, 0, 0x01, 0x00]).unwrap(), 256);
        assert!(parse_numeric(b"0009\0").is_err());
    }

    #[test]
    fn test_gzip_archive() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut tar = Vec::new();
        push(&mut tar, "hello", b'0', b"hi", "");
        finish(&mut tar);

        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&tar).unwrap();
        let entries = read_tar_gz(&enc.finish().unwrap()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data, b"hi");
    }
}
