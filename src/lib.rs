//! # DCTZ
//!
//! 基于分块 DCT 的误差有界浮点数组有损压缩, 本 crate 提供解码端.
//!
//! 编码器将数组划分为固定大小的块做 DCT, AC 系数量化到由误差界推导的分箱表,
//! 无法在误差界内表示的系数以精确值另存. 解码器解析容器, 还原每个块的频域向量,
//! 逆变换并反缩放, 得到每个元素误差不超过误差界的重建数组.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use dctz::codec::{CoefficientMode, DecoderConfig};
//!
//! let container = std::fs::read("data/sample.dctz").unwrap();
//! let config = DecoderConfig::default().with_mode(CoefficientMode::Direct);
//! let samples = dctz::decode(&container, &config).unwrap();
//! println!("解码得到 {} 个元素", samples.len());
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `dctz-core` | 错误类型、字节读取、数值精度 |
//! | `dctz-codec` | 容器解析、熵解码、分箱表、块重建、逆变换 |

/// 核心类型与工具
pub use dctz_core as core;

/// 解码管线
pub use dctz_codec as codec;

pub mod logging;

use dctz_codec::{DctzDecoder, DecoderConfig};
use dctz_core::DctzResult;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 按给定配置解码一个完整容器
///
/// 配置 (系数模式、数值精度、块大小) 必须与编码时一致, 容器本身不记录这些信息.
pub fn decode(input: &[u8], config: &DecoderConfig) -> DctzResult<Vec<f64>> {
    DctzDecoder::new(*config)?.decode(input)
}
