//! 块重建引擎.
//!
//! 对每个块, 由 DC 数组、分箱索引流、AC 精确值流以及 (量化表模式下的) 量化表组装频域向量,
//! 再调用逆变换写入输出数组对应的块切片.
//!
//! AC 精确值游标与二级索引游标在所有块之间按槽位顺序全局推进. 为了允许块乱序 (并行) 处理,
//! 先做一次顺序预扫描, 计算每个块起始时两个游标的位置, 同时完成流计数校验.

use dctz_core::{DctzError, DctzResult, try_alloc};
use log::trace;
use rayon::prelude::*;

use crate::bins::{BinTable, ESCAPE};
use crate::config::CoefficientMode;
use crate::idct::InverseTransform;

/// 块布局: N 个元素按块大小切分, 最后一块可能较短
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    num_elements: usize,
    block_size: usize,
    num_blocks: usize,
}

impl BlockLayout {
    /// 创建块布局
    pub fn new(num_elements: usize, block_size: usize) -> Self {
        Self {
            num_elements,
            block_size,
            num_blocks: num_elements.div_ceil(block_size),
        }
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// 第 `index` 块在输出数组中的起始位置
    pub fn block_start(&self, index: usize) -> usize {
        index * self.block_size
    }

    /// 第 `index` 块的长度
    pub fn block_len(&self, index: usize) -> usize {
        let start = self.block_start(index);
        self.block_size.min(self.num_elements.saturating_sub(start))
    }

    /// 尾块长度 (仅当最后一块短于块大小时)
    pub fn tail_len(&self) -> Option<usize> {
        let rem = self.num_elements % self.block_size;
        (rem != 0).then_some(rem)
    }

    /// AC 系数槽位总数 (N - 块数)
    pub fn num_ac_slots(&self) -> usize {
        self.num_elements - self.num_blocks
    }
}

/// 解压后的系数流
#[derive(Debug, Clone, Copy)]
pub struct CoefficientStreams<'a> {
    /// 分箱索引流: 前 N 字节为按位置排列的一级索引, 其后为二级索引
    pub bindex: &'a [u8],
    /// 每块一个 DC 值
    pub dc: &'a [f64],
    /// AC 精确值
    pub ac_exact: &'a [f64],
    /// 每个 AC 频率一个量化因子 (仅量化表模式)
    pub qtable: Option<&'a [f64]>,
}

/// 某个块开始时各个流游标的位置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOffsets {
    /// AC 精确值流位置
    pub exact: usize,
    /// 二级索引位置 (相对二级索引段起点)
    pub secondary: usize,
}

/// 重建统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructionStats {
    /// 一级索引直接命中分箱的 AC 系数数
    pub primary_hits: usize,
    /// 一级转义后由二级索引命中的 AC 系数数
    pub secondary_hits: usize,
    /// 取自 AC 精确值流的系数数
    pub exact_escapes: usize,
}

/// 预扫描结果
#[derive(Debug, Clone)]
pub struct ReconstructionPlan {
    offsets: Vec<StreamOffsets>,
    stats: ReconstructionStats,
}

impl ReconstructionPlan {
    /// 每个块的起始游标位置
    pub fn offsets(&self) -> &[StreamOffsets] {
        &self.offsets
    }

    pub fn stats(&self) -> ReconstructionStats {
        self.stats
    }
}

/// 带边界检查的流游标
struct StreamCursor<'a, T> {
    data: &'a [T],
    pos: usize,
    what: &'static str,
}

impl<'a, T: Copy> StreamCursor<'a, T> {
    fn new(data: &'a [T], pos: usize, what: &'static str) -> Self {
        Self { data, pos, what }
    }

    fn next(&mut self) -> DctzResult<T> {
        let value = self.data.get(self.pos).copied().ok_or_else(|| {
            DctzError::ContainerTruncated(format!(
                "{} 读取第 {} 项, 仅声明 {} 项",
                self.what,
                self.pos + 1,
                self.data.len(),
            ))
        })?;
        self.pos += 1;
        Ok(value)
    }
}

/// 块重建引擎
pub struct BlockEngine<'a> {
    layout: BlockLayout,
    streams: CoefficientStreams<'a>,
    bins: &'a BinTable,
    mode: CoefficientMode,
}

impl<'a> BlockEngine<'a> {
    /// 创建引擎并检查各个流的长度与布局一致
    pub fn new(
        layout: BlockLayout,
        streams: CoefficientStreams<'a>,
        bins: &'a BinTable,
        mode: CoefficientMode,
    ) -> DctzResult<Self> {
        if streams.dc.len() != layout.num_blocks() {
            return Err(DctzError::MalformedContainer(format!(
                "DC 流 {} 项, 块数为 {}",
                streams.dc.len(),
                layout.num_blocks(),
            )));
        }
        if streams.bindex.len() < layout.num_elements() {
            return Err(DctzError::ContainerTruncated(format!(
                "分箱索引流 {} 项, 少于元素总数 {}",
                streams.bindex.len(),
                layout.num_elements(),
            )));
        }
        if mode == CoefficientMode::Direct && streams.bindex.len() != layout.num_elements() {
            return Err(DctzError::MalformedContainer(format!(
                "直接模式分箱索引流应为 {} 项, 实际 {} 项",
                layout.num_elements(),
                streams.bindex.len(),
            )));
        }
        if mode == CoefficientMode::QuantizerTable {
            let expected = layout.block_size() - 1;
            match streams.qtable {
                Some(q) if q.len() == expected => {}
                Some(q) => {
                    return Err(DctzError::MalformedContainer(format!(
                        "量化表 {} 项, 应为 {} 项",
                        q.len(),
                        expected,
                    )));
                }
                None => {
                    return Err(DctzError::ContainerTruncated("量化表模式缺少量化表".into()));
                }
            }
        }
        Ok(Self {
            layout,
            streams,
            bins,
            mode,
        })
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// 二级索引段 (直接模式下为空)
    fn secondary_indices(&self) -> &'a [u8] {
        let bindex: &'a [u8] = self.streams.bindex;
        match self.mode {
            CoefficientMode::Direct => &[],
            CoefficientMode::QuantizerTable => &bindex[self.layout.num_elements()..],
        }
    }

    #[inline]
    fn center(&self, index: u8, slot: usize) -> DctzResult<f64> {
        self.bins.center(index).ok_or_else(|| {
            DctzError::MalformedContainer(format!(
                "槽位 {} 的分箱索引 {} 超出分箱表 ({} 项)",
                slot,
                index,
                self.bins.len(),
            ))
        })
    }

    /// 顺序预扫描: 计算每块的游标起点并校验流计数
    ///
    /// 需要的 AC 精确值或二级索引多于声明数量时返回 [`DctzError::ContainerTruncated`];
    /// 声明的值未被全部消耗时返回 [`DctzError::MalformedContainer`].
    pub fn plan(&self) -> DctzResult<ReconstructionPlan> {
        let secondary = self.secondary_indices();
        let mut offsets: Vec<StreamOffsets> = Vec::new();
        offsets
            .try_reserve_exact(self.layout.num_blocks())
            .map_err(|e| DctzError::AllocationFailure(format!("块游标表: {}", e)))?;

        let mut cur = StreamOffsets::default();
        let mut stats = ReconstructionStats::default();

        for block in 0..self.layout.num_blocks() {
            offsets.push(cur);
            let start = self.layout.block_start(block);
            let end = start + self.layout.block_len(block);
            for slot in start + 1..end {
                let b = self.streams.bindex[slot];
                if b != ESCAPE {
                    self.center(b, slot)?;
                    stats.primary_hits += 1;
                    continue;
                }
                match self.mode {
                    CoefficientMode::Direct => {
                        cur.exact += 1;
                        stats.exact_escapes += 1;
                    }
                    CoefficientMode::QuantizerTable => {
                        let s = *secondary.get(cur.secondary).ok_or_else(|| {
                            DctzError::ContainerTruncated(format!(
                                "槽位 {} 需要第 {} 个二级索引, 仅声明 {} 个",
                                slot,
                                cur.secondary + 1,
                                secondary.len(),
                            ))
                        })?;
                        cur.secondary += 1;
                        if s == ESCAPE {
                            cur.exact += 1;
                            stats.exact_escapes += 1;
                        } else {
                            self.center(s, slot)?;
                            stats.secondary_hits += 1;
                        }
                    }
                }
            }
        }

        let declared = self.streams.ac_exact.len();
        if cur.exact > declared {
            return Err(DctzError::ContainerTruncated(format!(
                "需要 {} 个 AC 精确值, 仅声明 {} 个",
                cur.exact, declared,
            )));
        }
        if cur.exact < declared {
            return Err(DctzError::MalformedContainer(format!(
                "声明 {} 个 AC 精确值, 仅消耗 {} 个",
                declared, cur.exact,
            )));
        }
        if cur.secondary != secondary.len() {
            return Err(DctzError::MalformedContainer(format!(
                "声明 {} 个二级索引, 一级转义仅 {} 个",
                secondary.len(),
                cur.secondary,
            )));
        }

        Ok(ReconstructionPlan { offsets, stats })
    }

    /// 组装第 `index` 块的频域向量
    ///
    /// `coeffs` 长度必须等于该块长度.
    pub fn reconstruct_block(
        &self,
        index: usize,
        offsets: StreamOffsets,
        coeffs: &mut [f64],
    ) -> DctzResult<()> {
        let start = self.layout.block_start(index);
        let mut exact = StreamCursor::new(self.streams.ac_exact, offsets.exact, "AC 精确值流");
        let mut secondary =
            StreamCursor::new(self.secondary_indices(), offsets.secondary, "二级索引");
        let qtable = self.streams.qtable.unwrap_or(&[]);

        coeffs[0] = self.streams.dc[index];
        for (j, value) in coeffs.iter_mut().enumerate().skip(1) {
            let slot = start + j;
            let b = self.streams.bindex[slot];
            *value = if b != ESCAPE {
                self.center(b, slot)?
            } else {
                match self.mode {
                    CoefficientMode::Direct => exact.next()?,
                    CoefficientMode::QuantizerTable => {
                        let s = secondary.next()?;
                        if s == ESCAPE {
                            exact.next()?
                        } else {
                            let q = qtable.get(j - 1).copied().ok_or_else(|| {
                                DctzError::MalformedContainer(format!("量化表缺少频率 {}", j))
                            })?;
                            self.center(s, slot)? * q
                        }
                    }
                }
            };
        }

        trace!(
            "块 {}: DC={:e}, AC 精确值 {}..{}",
            index, coeffs[0], offsets.exact, exact.pos
        );
        Ok(())
    }

    /// 重建并逆变换单个块
    fn process_block<T: InverseTransform + ?Sized>(
        &self,
        plan: &ReconstructionPlan,
        transform: &T,
        scratch: &mut [f64],
        index: usize,
        output: &mut [f64],
    ) -> DctzResult<()> {
        let coeffs = &mut scratch[..output.len()];
        self.reconstruct_block(index, plan.offsets[index], coeffs)?;
        transform.inverse(coeffs, output)
    }

    /// 处理所有块, 结果写入 `output` (长度必须为 N)
    ///
    /// `parallel` 为真时使用 rayon 按块并行, 结果与顺序执行完全一致.
    pub fn run<T: InverseTransform + ?Sized>(
        &self,
        plan: &ReconstructionPlan,
        transform: &T,
        output: &mut [f64],
        parallel: bool,
    ) -> DctzResult<()> {
        if output.len() != self.layout.num_elements() {
            return Err(DctzError::InvalidArgument(format!(
                "输出缓冲区 {} 项, 应为 {} 项",
                output.len(),
                self.layout.num_elements(),
            )));
        }
        if plan.offsets.len() != self.layout.num_blocks() {
            return Err(DctzError::InvalidArgument(format!(
                "预扫描结果 {} 块, 应为 {} 块",
                plan.offsets.len(),
                self.layout.num_blocks(),
            )));
        }

        let block_size = self.layout.block_size();
        if parallel {
            output
                .par_chunks_mut(block_size)
                .enumerate()
                .try_for_each_init(
                    || scratch_buffer(block_size),
                    |scratch, (index, out)| match scratch {
                        Ok(scratch) => self.process_block(plan, transform, scratch, index, out),
                        Err(e) => Err(e.clone()),
                    },
                )
        } else {
            let mut scratch = scratch_buffer(block_size)?;
            output
                .chunks_mut(block_size)
                .enumerate()
                .try_for_each(|(index, out)| {
                    self.process_block(plan, transform, &mut scratch, index, out)
                })
        }
    }
}

/// 单个工作线程的块系数缓冲区
fn scratch_buffer(block_size: usize) -> DctzResult<Vec<f64>> {
    try_alloc(block_size, "块系数缓冲区")
}
