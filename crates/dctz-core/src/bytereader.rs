//! 字节流读取器.
//!
//! 按小端字节序从容器缓冲区中顺序读取定长字段和数据段, 是头部解析与流切分的基础设施.
//! 所有读取都做边界检查, 越界返回 [`DctzError::ContainerTruncated`].

use byteorder::{ByteOrder, LittleEndian};

use crate::{DctzError, DctzResult};

/// 字节流读取器
///
/// # 示例
/// ```
/// use dctz_core::bytereader::ByteReader;
///
/// let data = [0x10, 0x00, 0x00, 0x00, 0xAA, 0xBB];
/// let mut br = ByteReader::new(&data);
/// assert_eq!(br.read_u32().unwrap(), 16);
/// assert_eq!(br.read_bytes(2).unwrap(), &[0xAA, 0xBB]);
/// assert!(br.is_eof());
/// ```
pub struct ByteReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前字节索引
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// 创建新的字节流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 获取已读取的字节数
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 获取剩余可读字节数
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// 是否已到达末尾
    pub fn is_eof(&self) -> bool {
        self.remaining() == 0
    }

    /// 读取 n 个字节 (零拷贝, 返回源数据切片)
    pub fn read_bytes(&mut self, n: usize) -> DctzResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(DctzError::ContainerTruncated(format!(
                "偏移 {} 处需要 {} 字节, 仅剩 {} 字节",
                self.pos,
                n,
                self.remaining(),
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// 跳过 n 个字节 (结构体对齐填充等)
    pub fn skip(&mut self, n: usize) -> DctzResult<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// 读取小端 u32
    pub fn read_u32(&mut self) -> DctzResult<u32> {
        self.read_bytes(4).map(LittleEndian::read_u32)
    }

    /// 读取小端 f32
    pub fn read_f32(&mut self) -> DctzResult<f32> {
        self.read_bytes(4).map(LittleEndian::read_f32)
    }

    /// 读取小端 f64
    pub fn read_f64(&mut self) -> DctzResult<f64> {
        self.read_bytes(8).map(LittleEndian::read_f64)
    }

    /// 获取剩余未读数据
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }
}
