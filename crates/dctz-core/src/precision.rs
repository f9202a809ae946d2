//! DC / AC 精确值的存储精度.
//!
//! 编码器在构建时选择完整精度 (f64) 或截断精度 (f32) 存储 DC 与 AC 精确值,
//! 解码器必须使用相同的选择. 容器本身不记录该选择.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::{DctzError, DctzResult};

/// 精确值存储精度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    /// 64 位浮点, 每值 8 字节
    #[default]
    Full,
    /// 32 位浮点, 每值 4 字节, 解码时提升为 f64
    Truncated,
}

impl Precision {
    /// 每个值占用的字节数
    pub const fn bytes_per_value(&self) -> usize {
        match self {
            Self::Full => 8,
            Self::Truncated => 4,
        }
    }

    /// `count` 个值占用的字节数, 溢出时返回 `None`
    pub fn stream_size(&self, count: usize) -> Option<usize> {
        count.checked_mul(self.bytes_per_value())
    }

    /// 将小端字节流解码为 f64 值, 追加到 `dst`
    ///
    /// `src` 长度必须是元素宽度的整数倍.
    pub fn decode_into(&self, src: &[u8], dst: &mut Vec<f64>) -> DctzResult<()> {
        let width = self.bytes_per_value();
        if src.len() % width != 0 {
            return Err(DctzError::MalformedContainer(format!(
                "数据大小 {} 不是元素宽度 {} 的整数倍",
                src.len(),
                width,
            )));
        }
        dst.try_reserve_exact(src.len() / width).map_err(|e| {
            DctzError::AllocationFailure(format!("精确值缓冲区: {}", e))
        })?;
        match self {
            Self::Full => dst.extend(src.chunks_exact(8).map(LittleEndian::read_f64)),
            Self::Truncated => dst.extend(
                src.chunks_exact(4)
                    .map(|c| f64::from(LittleEndian::read_f32(c))),
            ),
        }
        Ok(())
    }

    /// 将 f64 值按本精度编码为小端字节流 (供编码端使用)
    pub fn encode_into(&self, src: &[f64], dst: &mut Vec<u8>) {
        dst.reserve(src.len() * self.bytes_per_value());
        for &v in src {
            match self {
                Self::Full => dst.extend_from_slice(&v.to_le_bytes()),
                Self::Truncated => dst.extend_from_slice(&(v as f32).to_le_bytes()),
            }
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Full => "full(f64)",
            Self::Truncated => "truncated(f32)",
        };
        write!(f, "{name}")
    }
}
