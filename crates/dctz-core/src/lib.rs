//! # dctz-core
//!
//! DCTZ 解码器核心库, 提供错误类型、字节流读取和精确值精度定义.
//!
//! 本 crate 为解码管线提供底层基础设施, 不依赖任何编解码逻辑.

pub mod bytereader;
pub mod error;
pub mod precision;

// 重导出常用类型
pub use bytereader::ByteReader;
pub use error::{DctzError, DctzResult, try_alloc};
pub use precision::Precision;
