//! 误差有界分箱表.
//!
//! 编码器与解码器各自从同一个误差界独立计算分箱表, 两端必须逐条一致,
//! 因此生成函数只依赖 `error_bound` 与 `n_bins`, 不依赖任何输入数据.
//!
//! 布局: 宽度为 `2 * error_bound` 的等宽分箱, 以索引 `n_bins / 2` 的零箱为中心对称排列.
//! 第 i 个分箱覆盖半开区间 `[center - eb, center + eb)`, 区间内任意值以中心重建时误差不超过 eb.
//! 索引 255 为转义标记, 永远不会出现在表中.

use dctz_core::{DctzError, DctzResult};

use crate::config::MAX_NUM_BINS;

/// 转义标记: 该系数不在分箱表内
pub const ESCAPE: u8 = 255;

/// 分箱宽度相对误差界的倍数
const BIN_WIDTH_FACTOR: f64 = 2.0;

/// 分箱表最外侧的边界是否仍为有限值
pub fn bin_table_fits(error_bound: f64, n_bins: usize) -> bool {
    (BIN_WIDTH_FACTOR * error_bound * (n_bins / 2 + 1) as f64).is_finite()
}

/// 分箱表
#[derive(Debug, Clone, PartialEq)]
pub struct BinTable {
    /// 各分箱的上边界 (不含)
    boundaries: Vec<f64>,
    /// 各分箱的重建中心
    centers: Vec<f64>,
    /// 生成时使用的误差界
    error_bound: f64,
}

impl BinTable {
    /// 从误差界生成分箱表
    pub fn generate(error_bound: f64, n_bins: usize) -> DctzResult<Self> {
        if !error_bound.is_finite() || error_bound <= 0.0 {
            return Err(DctzError::InvalidArgument(format!(
                "误差界 {} 必须为正有限值",
                error_bound,
            )));
        }
        if n_bins == 0 || n_bins > MAX_NUM_BINS {
            return Err(DctzError::InvalidArgument(format!(
                "分箱数 {} 超出范围 [1, {}]",
                n_bins, MAX_NUM_BINS,
            )));
        }

        if !bin_table_fits(error_bound, n_bins) {
            return Err(DctzError::InvalidArgument(format!(
                "误差界 {:e} 过大, {} 个分箱超出浮点范围",
                error_bound, n_bins,
            )));
        }

        let width = BIN_WIDTH_FACTOR * error_bound;
        let zero_bin = (n_bins / 2) as f64;
        let centers: Vec<f64> = (0..n_bins)
            .map(|i| (i as f64 - zero_bin) * width)
            .collect();
        let boundaries = centers.iter().map(|&c| c + error_bound).collect();

        Ok(Self {
            boundaries,
            centers,
            error_bound,
        })
    }

    /// 分箱数
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    /// 是否为空表 (生成函数不会产生空表)
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// 生成时使用的误差界
    pub fn error_bound(&self) -> f64 {
        self.error_bound
    }

    /// 各分箱上边界
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// 各分箱中心
    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    /// 取分箱中心, 索引越界 (包括转义标记) 返回 `None`
    #[inline]
    pub fn center(&self, index: u8) -> Option<f64> {
        self.centers.get(index as usize).copied()
    }

    /// 查找值所在的分箱 (编码端查找)
    ///
    /// 值超出表覆盖范围, 或以中心重建误差超过误差界时返回 `None`, 编码端应转义.
    pub fn locate(&self, value: f64) -> Option<u8> {
        if !value.is_finite() {
            return None;
        }
        let width = BIN_WIDTH_FACTOR * self.error_bound;
        let k = (value / width).round() + (self.len() / 2) as f64;
        if k < 0.0 || k >= self.len() as f64 {
            return None;
        }
        let index = k as usize;
        if (value - self.centers[index]).abs() <= self.error_bound {
            Some(index as u8)
        } else {
            None
        }
    }
}
