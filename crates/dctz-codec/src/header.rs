//! 容器头部与数据段切分.
//!
//! 头部为固定 48 字节的小端记录, 按 C 结构体自然对齐布局:
//!
//! | 偏移 | 类型 | 字段 |
//! |------|------|------|
//! | 0  | u32 | 元素总数 N |
//! | 8  | f64 | 误差界 |
//! | 16 | u32 | AC 精确值总数 |
//! | 24 | f64 | 缩放因子 SF |
//! | 32 | u32 | 分箱索引流压缩大小 |
//! | 36 | u32 | DC 流压缩大小 |
//! | 40 | u32 | AC 精确值流大小 |
//! | 44 | u32 | 分箱索引总数 K (仅量化表模式) |
//!
//! 偏移 4 与 20 为对齐填充.

use dctz_core::{ByteReader, DctzError, DctzResult};
use log::{debug, warn};

use crate::bins::bin_table_fits;
use crate::config::{CoefficientMode, DecoderConfig, MAX_NUM_BINS};
use crate::stream::MAX_INFLATE_RATIO;

/// 头部固定大小 (字节)
pub const HEADER_SIZE: usize = 48;

/// 容器头部
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerHeader {
    /// 元素总数 N
    pub num_elements: u32,
    /// 误差界 (缩放前)
    pub error_bound: f64,
    /// AC 精确值总数
    pub tot_ac_exact_count: u32,
    /// 十进制缩放因子 SF
    pub scaling_factor: f64,
    /// 分箱索引流压缩大小 (字节)
    pub bindex_sz_compressed: u32,
    /// DC 流压缩大小 (字节)
    pub dc_sz_compressed: u32,
    /// AC 精确值流大小 (字节, 未压缩存储)
    pub ac_exact_sz_compressed: u32,
    /// 分箱索引总数 K (一级 + 二级), 直接模式下为 0
    pub bindex_count: u32,
}

impl ContainerHeader {
    /// 从缓冲区开头解析头部
    ///
    /// 返回头部与第一个数据段的偏移. 仅检查缓冲区长度, 字段一致性由 [`validate`](Self::validate)
    /// 与后续阶段检查.
    pub fn parse(buffer: &[u8]) -> DctzResult<(Self, usize)> {
        if buffer.len() < HEADER_SIZE {
            return Err(DctzError::MalformedContainer(format!(
                "缓冲区 {} 字节, 短于头部大小 {}",
                buffer.len(),
                HEADER_SIZE,
            )));
        }

        let mut br = ByteReader::new(&buffer[..HEADER_SIZE]);
        let num_elements = br.read_u32()?;
        br.skip(4)?;
        let error_bound = br.read_f64()?;
        let tot_ac_exact_count = br.read_u32()?;
        br.skip(4)?;
        let scaling_factor = br.read_f64()?;
        let bindex_sz_compressed = br.read_u32()?;
        let dc_sz_compressed = br.read_u32()?;
        let ac_exact_sz_compressed = br.read_u32()?;
        let bindex_count = br.read_u32()?;

        let header = Self {
            num_elements,
            error_bound,
            tot_ac_exact_count,
            scaling_factor,
            bindex_sz_compressed,
            dc_sz_compressed,
            ac_exact_sz_compressed,
            bindex_count,
        };
        debug!(
            "容器头部: N={}, 误差界={:e}, AC 精确值={}, SF={}, 分箱索引={}B, DC={}B, AC 精确值={}B, K={}",
            header.num_elements,
            header.error_bound,
            header.tot_ac_exact_count,
            header.scaling_factor,
            header.bindex_sz_compressed,
            header.dc_sz_compressed,
            header.ac_exact_sz_compressed,
            header.bindex_count,
        );
        Ok((header, HEADER_SIZE))
    }

    /// 检查头部字段自身的一致性
    pub fn validate(&self, mode: CoefficientMode) -> DctzResult<()> {
        if self.num_elements == 0 {
            return Err(DctzError::MalformedContainer("元素总数不能为 0".into()));
        }
        if !self.error_bound.is_finite() || self.error_bound <= 0.0 {
            return Err(DctzError::MalformedContainer(format!(
                "误差界 {} 必须为正有限值",
                self.error_bound,
            )));
        }
        if !self.scaling_factor.is_finite() {
            return Err(DctzError::MalformedContainer(format!(
                "缩放因子 {} 不是有限值",
                self.scaling_factor,
            )));
        }
        if !bin_table_fits(self.error_bound, MAX_NUM_BINS) {
            return Err(DctzError::MalformedContainer(format!(
                "误差界 {:e} 过大, 分箱表超出浮点范围",
                self.error_bound,
            )));
        }
        if mode == CoefficientMode::QuantizerTable && self.bindex_count < self.num_elements {
            return Err(DctzError::MalformedContainer(format!(
                "分箱索引总数 K={} 小于元素总数 N={}",
                self.bindex_count, self.num_elements,
            )));
        }
        let bindex_len = self.bindex_len(mode);
        if bindex_len > max_inflated_size(self.bindex_sz_compressed) {
            return Err(DctzError::MalformedContainer(format!(
                "分箱索引流 {} 字节无法解压出 {} 项",
                self.bindex_sz_compressed, bindex_len,
            )));
        }
        Ok(())
    }

    /// 块数 ceil(N / block_size)
    pub fn num_blocks(&self, block_size: usize) -> usize {
        (self.num_elements as usize).div_ceil(block_size)
    }

    /// 解压后的分箱索引流长度 (直接模式 N, 量化表模式 K)
    pub fn bindex_len(&self, mode: CoefficientMode) -> usize {
        match mode {
            CoefficientMode::Direct => self.num_elements as usize,
            CoefficientMode::QuantizerTable => self.bindex_count as usize,
        }
    }

    /// 按相同布局序列化头部 (供编码端使用)
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.reserve(HEADER_SIZE);
        out.extend_from_slice(&self.num_elements.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&self.error_bound.to_le_bytes());
        out.extend_from_slice(&self.tot_ac_exact_count.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&self.scaling_factor.to_le_bytes());
        out.extend_from_slice(&self.bindex_sz_compressed.to_le_bytes());
        out.extend_from_slice(&self.dc_sz_compressed.to_le_bytes());
        out.extend_from_slice(&self.ac_exact_sz_compressed.to_le_bytes());
        out.extend_from_slice(&self.bindex_count.to_le_bytes());
    }
}

/// 头部之后的各数据段 (均为输入缓冲区的切片)
#[derive(Debug, Clone, Copy)]
pub struct ContainerSegments<'a> {
    /// 压缩的分箱索引流
    pub bindex: &'a [u8],
    /// 压缩的 DC 流
    pub dc: &'a [u8],
    /// 未压缩的 AC 精确值流
    pub ac_exact: &'a [u8],
    /// 量化表 (仅量化表模式)
    pub qtable: Option<&'a [u8]>,
}

impl<'a> ContainerSegments<'a> {
    /// 按头部声明的大小切分数据段
    ///
    /// 数据段超出缓冲区返回 [`DctzError::ContainerTruncated`];
    /// AC 精确值流大小与声明个数不符返回 [`DctzError::MalformedContainer`].
    pub fn split(
        header: &ContainerHeader,
        payload: &'a [u8],
        config: &DecoderConfig,
    ) -> DctzResult<Self> {
        let expected_ac = config
            .precision
            .stream_size(header.tot_ac_exact_count as usize)
            .ok_or_else(|| DctzError::MalformedContainer("AC 精确值流大小溢出".into()))?;
        if expected_ac != header.ac_exact_sz_compressed as usize {
            return Err(DctzError::MalformedContainer(format!(
                "AC 精确值流 {} 字节, 但 {} 个 {} 值需要 {} 字节",
                header.ac_exact_sz_compressed,
                header.tot_ac_exact_count,
                config.precision,
                expected_ac,
            )));
        }

        let dc_len = config
            .precision
            .stream_size(header.num_blocks(config.block_size))
            .ok_or_else(|| DctzError::MalformedContainer("DC 流大小溢出".into()))?;
        if dc_len > max_inflated_size(header.dc_sz_compressed) {
            return Err(DctzError::MalformedContainer(format!(
                "DC 流 {} 字节无法解压出 {} 字节",
                header.dc_sz_compressed, dc_len,
            )));
        }

        let mut br = ByteReader::new(payload);
        let bindex = read_segment(&mut br, header.bindex_sz_compressed as usize, "分箱索引流")?;
        let dc = read_segment(&mut br, header.dc_sz_compressed as usize, "DC 流")?;
        let ac_exact = read_segment(&mut br, expected_ac, "AC 精确值流")?;
        let qtable = match config.mode {
            CoefficientMode::Direct => None,
            CoefficientMode::QuantizerTable => {
                Some(read_segment(&mut br, config.qtable_size(), "量化表")?)
            }
        };

        if !br.is_eof() {
            warn!("容器末尾有 {} 字节未使用的数据", br.remaining());
        }

        Ok(Self {
            bindex,
            dc,
            ac_exact,
            qtable,
        })
    }
}

/// 压缩大小为 `compressed` 的 zlib 流最多能解压出的字节数
fn max_inflated_size(compressed: u32) -> usize {
    (compressed as usize).saturating_mul(MAX_INFLATE_RATIO)
}

fn read_segment<'a>(br: &mut ByteReader<'a>, len: usize, what: &str) -> DctzResult<&'a [u8]> {
    br.read_bytes(len).map_err(|_| {
        DctzError::ContainerTruncated(format!(
            "{} 声明 {} 字节, 缓冲区仅剩 {} 字节",
            what,
            len,
            br.remaining(),
        ))
    })
}
