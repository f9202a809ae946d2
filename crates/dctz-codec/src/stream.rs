//! 熵编码流适配.
//!
//! 分箱索引流与 DC 流以 zlib 格式压缩存储. 解压结果必须恰好等于预期大小,
//! 不足或多于预期都视为码流损坏, 不做部分恢复.

use std::io::{Read, Write};

use dctz_core::{DctzError, DctzResult, Precision};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use log::trace;

/// zlib 的最大压缩比, 压缩数据每字节最多解压出这么多字节
pub const MAX_INFLATE_RATIO: usize = 1032;

/// 将 zlib 流解压为恰好 `expected_size` 字节
///
/// 输出缓冲区随实际解压出的数据增长, 声明的大小本身不会触发大块分配.
pub fn inflate(compressed: &[u8], expected_size: usize, what: &str) -> DctzResult<Vec<u8>> {
    let limit = expected_size.saturating_add(1);
    let initial = expected_size.min(compressed.len().saturating_mul(4));
    let mut out: Vec<u8> = Vec::new();
    out.try_reserve_exact(initial).map_err(|e| {
        DctzError::AllocationFailure(format!("{}: 无法分配 {} 字节 ({})", what, initial, e))
    })?;

    // 多读 1 字节, 用于发现超出预期的数据
    ZlibDecoder::new(compressed)
        .take(limit as u64)
        .read_to_end(&mut out)
        .map_err(|e| {
            DctzError::StreamCorrupt(format!(
                "{} 解压失败 (预期 {} 字节): {}",
                what, expected_size, e
            ))
        })?;

    if out.len() != expected_size {
        return Err(DctzError::StreamCorrupt(format!(
            "{} 解压大小与预期的 {} 字节不符 ({})",
            what,
            expected_size,
            if out.len() > expected_size { "数据多于预期" } else { "数据不足" },
        )));
    }

    trace!(
        "{} 解压完成: {} -> {} 字节",
        what,
        compressed.len(),
        expected_size
    );
    Ok(out)
}

/// 解压并按精度解码为 f64 值
pub fn inflate_values(
    compressed: &[u8],
    count: usize,
    precision: Precision,
    what: &str,
) -> DctzResult<Vec<f64>> {
    let size = precision
        .stream_size(count)
        .ok_or_else(|| DctzError::MalformedContainer(format!("{} 大小溢出", what)))?;
    let raw = inflate(compressed, size, what)?;
    decode_values(&raw, precision)
}

/// 将未压缩的字节流按精度解码为 f64 值
pub fn decode_values(raw: &[u8], precision: Precision) -> DctzResult<Vec<f64>> {
    let mut values = Vec::new();
    precision.decode_into(raw, &mut values)?;
    Ok(values)
}

/// zlib 压缩 (供编码端使用)
pub fn deflate(raw: &[u8], level: u32) -> DctzResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder
        .write_all(raw)
        .map_err(|e| DctzError::StreamCorrupt(format!("zlib 压缩失败: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| DctzError::StreamCorrupt(format!("zlib 压缩失败: {}", e)))
}
