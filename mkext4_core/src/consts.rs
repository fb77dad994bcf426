//! ext4 常量定义

/// Superblock 位置（从文件系统开始的字节偏移）
pub const EXT4_SUPERBLOCK_OFFSET: u64 = 1024;

/// Superblock 大小
pub const EXT4_SUPERBLOCK_SIZE: usize = 1024;

/// ext4 魔数
pub const EXT4_SUPERBLOCK_MAGIC: u16 = 0xEF53;

/// 块大小（固定 4096）
pub const EXT4_BLOCK_SIZE: u64 = 4096;

/// log2(块大小) - 10
pub const EXT4_LOG_BLOCK_SIZE: u32 = 2;

/// Inode 大小
pub const EXT4_INODE_SIZE: u16 = 256;

/// 64 位块组描述符大小
pub const EXT4_GROUP_DESC_SIZE_64: u16 = 64;

/// 默认每组块数
pub const EXT4_DEFAULT_BLOCKS_PER_GROUP: u32 = 32768;

/// 默认每组 inode 数
pub const EXT4_DEFAULT_INODES_PER_GROUP: u32 = 8192;

/// 默认保留块数
pub const EXT4_DEFAULT_RESERVED_BLOCKS: u64 = 3276;

/// 第一个非保留 inode
pub const EXT4_FIRST_INO: u32 = 11;

/// 根目录 inode
pub const EXT4_ROOT_INO: u32 = 2;

/// lost+found inode
pub const EXT4_LOST_FOUND_INO: u32 = 11;

/// inode 中 i_block 区域的偏移和大小（15 * 4 = 60 字节）
pub const EXT4_INODE_BLOCK_OFFSET: usize = 40;
pub const EXT4_INODE_BLOCK_SIZE: usize = 60;

/// 内联符号链接的最大长度（必须小于 i_block 大小）
pub const EXT4_FAST_SYMLINK_MAX: usize = EXT4_INODE_BLOCK_SIZE - 1;

/// Extent 树魔数
pub const EXT4_EXTENT_MAGIC: u16 = 0xF30A;

/// Extent 头、叶子、索引的大小均为 12 字节
pub const EXT4_EXTENT_ENTRY_SIZE: usize = 12;

/// 内联 extent 树最多容纳的 extent 数
pub const EXT4_INLINE_EXTENTS_MAX: usize = 4;

/// 单个初始化 extent 的最大长度
pub const EXT4_EXTENT_MAX_LEN: u64 = 32768;

/// 目录项名称最大长度
pub const EXT4_NAME_MAX: usize = 255;

/// 目录项头部大小（inode + rec_len + name_len + file_type）
pub const EXT4_DIR_ENTRY_HEADER_SIZE: usize = 8;

/// 块组标志：inode 表已清零
pub const EXT4_BG_INODE_ZEROED: u16 = 0x0004;

/// 文件系统状态：干净卸载
pub const EXT4_SUPER_STATE_VALID: u16 = 0x0001;

/// 出错时的行为：只读重新挂载
pub const EXT4_ERRORS_RO: u16 = 2;

/// 目录项类型常量
pub const EXT4_DE_UNKNOWN: u8 = 0;
pub const EXT4_DE_REG_FILE: u8 = 1;
pub const EXT4_DE_DIR: u8 = 2;
pub const EXT4_DE_CHRDEV: u8 = 3;
pub const EXT4_DE_BLKDEV: u8 = 4;
pub const EXT4_DE_FIFO: u8 = 5;
pub const EXT4_DE_SOCK: u8 = 6;
pub const EXT4_DE_SYMLINK: u8 = 7;

/// 错误码（兼容 C errno）
pub const EOK: i32 = 0;
pub const ENOENT: i32 = 2;
pub const EIO: i32 = 5;
pub const EEXIST: i32 = 17;
pub const EINVAL: i32 = 22;
pub const ENOSPC: i32 = 28;
pub const EROFS: i32 = 30;
pub const ERANGE: i32 = 34;
pub const ENOTSUP: i32 = 95;
pub const EUCLEAN: i32 = 117;

/// Inode 模式位
pub const EXT4_INODE_MODE_FIFO: u16 = 0x1000;
pub const EXT4_INODE_MODE_CHARDEV: u16 = 0x2000;
pub const EXT4_INODE_MODE_DIRECTORY: u16 = 0x4000;
pub const EXT4_INODE_MODE_BLOCKDEV: u16 = 0x6000;
pub const EXT4_INODE_MODE_FILE: u16 = 0x8000;
pub const EXT4_INODE_MODE_SOFTLINK: u16 = 0xA000;
pub const EXT4_INODE_MODE_SOCKET: u16 = 0xC000;
pub const EXT4_INODE_MODE_TYPE_MASK: u16 = 0xF000;

/// 权限位（rwx + setuid/setgid/sticky）
pub const EXT4_INODE_MODE_PERM_MASK: u16 = 0o7777;

/// 新分配 inode 的默认权限
pub const EXT4_DEFAULT_MODE: u16 = 0o755;
