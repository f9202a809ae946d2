//! 解码配置.
//!
//! 编码器在构建时固定的选择 (系数重建模式、精确值精度、块大小、分箱数) 在这里作为
//! 运行时配置值传入, 同一个解码器可以服务不同变体的容器.

use std::fmt;

use dctz_core::{DctzError, DctzResult, Precision};

/// 默认变换块大小 (每块 1 个 DC + 63 个 AC 系数)
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// 默认分箱数
pub const DEFAULT_NUM_BINS: usize = 255;

/// 分箱表最多可容纳的条目数 (索引 255 保留为转义标记)
pub const MAX_NUM_BINS: usize = 255;

/// AC 系数重建模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoefficientMode {
    /// 直接模式: 分箱索引命中取分箱中心, 转义取精确值
    #[default]
    Direct,
    /// 量化表模式: 一级转义后读取二级索引, 命中时乘以对应频率的量化因子
    QuantizerTable,
}

impl fmt::Display for CoefficientMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Direct => "direct",
            Self::QuantizerTable => "qtable",
        };
        write!(f, "{name}")
    }
}

/// 解码配置
///
/// 必须与生成容器的编码器一致, 解码器无法从容器中检测不匹配.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// 系数重建模式
    pub mode: CoefficientMode,
    /// DC 与 AC 精确值的存储精度
    pub precision: Precision,
    /// 变换块大小 (BLK_SZ)
    pub block_size: usize,
    /// 分箱表条目数 (NBINS)
    pub n_bins: usize,
    /// 是否使用 rayon 并行处理块
    pub parallel: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            mode: CoefficientMode::Direct,
            precision: Precision::Full,
            block_size: DEFAULT_BLOCK_SIZE,
            n_bins: DEFAULT_NUM_BINS,
            parallel: true,
        }
    }
}

impl DecoderConfig {
    /// 设置系数重建模式
    pub fn with_mode(mut self, mode: CoefficientMode) -> Self {
        self.mode = mode;
        self
    }

    /// 设置精确值精度
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// 设置块大小
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// 设置是否并行
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// 检查配置合法性
    pub fn validate(&self) -> DctzResult<()> {
        if self.block_size < 2 {
            return Err(DctzError::InvalidArgument(format!(
                "块大小 {} 过小, 至少需要 1 个 DC 和 1 个 AC 系数",
                self.block_size,
            )));
        }
        if self.n_bins == 0 || self.n_bins > MAX_NUM_BINS {
            return Err(DctzError::InvalidArgument(format!(
                "分箱数 {} 超出范围 [1, {}]",
                self.n_bins, MAX_NUM_BINS,
            )));
        }
        Ok(())
    }

    /// 量化表占用的字节数 (BLK_SZ - 1 个 f64), 直接模式为 0
    pub fn qtable_size(&self) -> usize {
        match self.mode {
            CoefficientMode::Direct => 0,
            CoefficientMode::QuantizerTable => (self.block_size - 1) * 8,
        }
    }
}
