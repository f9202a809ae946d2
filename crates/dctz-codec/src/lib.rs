//! # dctz-codec
//!
//! DCTZ 误差有界有损压缩的解码管线.
//!
//! 编码端把浮点数组按块做 DCT, AC 系数量化到由误差界决定的分箱表, 分箱表无法在误差界内表示的
//! 系数以精确值存储. 本 crate 从紧凑容器中还原原始数组:
//!
//! - [`header`]: 容器头部解析与数据段切分
//! - [`stream`]: zlib 熵编码流解压
//! - [`bins`]: 误差有界分箱表生成 (编解码两端共享)
//! - [`reconstruct`]: 直接模式 / 量化表模式的块重建
//! - [`idct`]: 逆 DCT
//! - [`rescale`]: 幅值反缩放
//!
//! ## 使用示例
//!
//! ```rust
//! use dctz_codec::{CoefficientMode, DctzDecoder, DecoderConfig};
//!
//! let config = DecoderConfig::default().with_mode(CoefficientMode::Direct);
//! let decoder = DctzDecoder::new(config).unwrap();
//!
//! // 短于头部的输入会被拒绝
//! assert!(decoder.decode(&[0u8; 8]).is_err());
//! ```

pub mod bins;
pub mod config;
pub mod decoder;
pub mod header;
pub mod idct;
pub mod reconstruct;
pub mod rescale;
pub mod stream;

// 重导出常用类型
pub use bins::{BinTable, ESCAPE};
pub use config::{CoefficientMode, DecoderConfig};
pub use decoder::DctzDecoder;
pub use header::{ContainerHeader, HEADER_SIZE};
pub use idct::{DctIdct, InverseTransform};
pub use reconstruct::{BlockLayout, ReconstructionStats};
