//! DCTZ 解码器.
//!
//! 解码流程:
//! 1. 解析并校验容器头部, 按声明大小切分数据段
//! 2. 解压分箱索引流与 DC 流, 读取 AC 精确值与量化表
//! 3. 分配输出数组, 从误差界生成分箱表
//! 4. 预扫描分箱索引流, 校验流计数并计算每块游标起点
//! 5. 逐块重建频域向量并逆变换
//! 6. 对整个输出数组做幅值反缩放
//!
//! 任一步骤失败都会中止解码, 不返回部分结果.

use std::time::Instant;

use dctz_core::{DctzError, DctzResult, Precision, try_alloc};
use log::debug;

use crate::bins::BinTable;
use crate::config::DecoderConfig;
use crate::header::{ContainerHeader, ContainerSegments};
use crate::idct::{DctIdct, InverseTransform};
use crate::reconstruct::{BlockEngine, BlockLayout, CoefficientStreams};
use crate::rescale::rescale;
use crate::stream::{decode_values, inflate, inflate_values};

/// DCTZ 解码器
///
/// 只持有配置, 不持有跨调用状态, 可以在多个线程中同时使用.
#[derive(Debug, Clone)]
pub struct DctzDecoder {
    config: DecoderConfig,
}

impl DctzDecoder {
    /// 使用指定配置创建解码器
    pub fn new(config: DecoderConfig) -> DctzResult<Self> {
        config.validate()?;
        debug!(
            "创建 DCTZ 解码器: 模式={}, 精度={}, 块大小={}, 分箱数={}, 并行={}",
            config.mode, config.precision, config.block_size, config.n_bins, config.parallel,
        );
        Ok(Self { config })
    }

    /// 获取解码配置
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// 只解析容器头部, 不解码
    pub fn peek_header(input: &[u8]) -> DctzResult<ContainerHeader> {
        ContainerHeader::parse(input).map(|(header, _)| header)
    }

    /// 解码容器, 返回 N 个样本
    pub fn decode(&self, input: &[u8]) -> DctzResult<Vec<f64>> {
        let (header, offset) = self.read_header(input)?;
        let idct = self.plan_idct(&header);
        let streams = self.inflate_streams(&header, &input[offset..])?;
        // 各个流已通过校验后才分配输出
        let mut output: Vec<f64> = try_alloc(header.num_elements as usize, "输出数组")?;
        self.reconstruct(&header, &streams, &idct, &mut output)?;
        Ok(output)
    }

    /// 解码到调用方提供的缓冲区
    ///
    /// `output` 长度必须恰好为 N. 返回错误时缓冲区内容无意义.
    pub fn decode_into(&self, input: &[u8], output: &mut [f64]) -> DctzResult<()> {
        let (header, offset) = self.read_header(input)?;
        let expected = header.num_elements as usize;
        if output.len() != expected {
            return Err(DctzError::InvalidArgument(format!(
                "输出缓冲区 {} 项, 容器声明 {} 个元素",
                output.len(),
                expected,
            )));
        }
        let idct = self.plan_idct(&header);
        let streams = self.inflate_streams(&header, &input[offset..])?;
        self.reconstruct(&header, &streams, &idct, output)
    }

    /// 使用调用方提供的逆变换解码
    pub fn decode_with_transform<T: InverseTransform + ?Sized>(
        &self,
        input: &[u8],
        transform: &T,
    ) -> DctzResult<Vec<f64>> {
        let (header, offset) = self.read_header(input)?;
        let streams = self.inflate_streams(&header, &input[offset..])?;
        let mut output: Vec<f64> = try_alloc(header.num_elements as usize, "输出数组")?;
        self.reconstruct(&header, &streams, transform, &mut output)?;
        Ok(output)
    }

    fn read_header(&self, input: &[u8]) -> DctzResult<(ContainerHeader, usize)> {
        let (header, offset) = ContainerHeader::parse(input)?;
        header.validate(self.config.mode)?;
        Ok((header, offset))
    }

    /// 为完整块与尾块创建变换计划
    fn plan_idct(&self, header: &ContainerHeader) -> DctIdct {
        let layout = BlockLayout::new(header.num_elements as usize, self.config.block_size);
        match layout.tail_len() {
            Some(tail) => DctIdct::new(&[self.config.block_size, tail]),
            None => DctIdct::new(&[self.config.block_size]),
        }
    }

    /// 切分数据段并解压各个流
    fn inflate_streams(
        &self,
        header: &ContainerHeader,
        payload: &[u8],
    ) -> DctzResult<DecodedStreams> {
        let cfg = &self.config;
        let t = Instant::now();

        let segments = ContainerSegments::split(header, payload, cfg)?;
        let num_blocks = header.num_blocks(cfg.block_size);
        let bindex = inflate(segments.bindex, header.bindex_len(cfg.mode), "分箱索引流")?;
        let dc = inflate_values(segments.dc, num_blocks, cfg.precision, "DC 流")?;
        let ac_exact = decode_values(segments.ac_exact, cfg.precision)?;
        let qtable = segments
            .qtable
            .map(|raw| decode_values(raw, Precision::Full))
            .transpose()?;

        debug!("解压完成: {:?}", t.elapsed());
        Ok(DecodedStreams {
            bindex,
            dc,
            ac_exact,
            qtable,
        })
    }

    fn reconstruct<T: InverseTransform + ?Sized>(
        &self,
        header: &ContainerHeader,
        decoded: &DecodedStreams,
        transform: &T,
        output: &mut [f64],
    ) -> DctzResult<()> {
        let cfg = &self.config;
        let start = Instant::now();
        let layout = BlockLayout::new(header.num_elements as usize, cfg.block_size);

        let t = Instant::now();
        let bins = BinTable::generate(header.error_bound, cfg.n_bins)?;
        let genbin_t = t.elapsed();

        let streams = CoefficientStreams {
            bindex: &decoded.bindex,
            dc: &decoded.dc,
            ac_exact: &decoded.ac_exact,
            qtable: decoded.qtable.as_deref(),
        };
        let engine = BlockEngine::new(layout, streams, &bins, cfg.mode)?;

        let t = Instant::now();
        let plan = engine.plan()?;
        let stats = plan.stats();
        debug!(
            "流统计: 一级命中={}, 二级命中={}, 精确值={}, 块数={}",
            stats.primary_hits,
            stats.secondary_hits,
            stats.exact_escapes,
            layout.num_blocks(),
        );
        engine.run(&plan, transform, output, cfg.parallel)?;
        let idct_t = t.elapsed();

        let t = Instant::now();
        rescale(output, header.scaling_factor, cfg.parallel);
        let sf_t = t.elapsed();

        let total = start.elapsed();
        let secs = total.as_secs_f64();
        let rate = if secs > 0.0 {
            (output.len() * std::mem::size_of::<f64>()) as f64 / (1024.0 * 1024.0) / secs
        } else {
            0.0
        };
        debug!(
            "重建完成: 分箱表={:?}, 块重建+逆变换={:?}, 反缩放={:?}, 总计={:?} ({:.1} MB/s)",
            genbin_t, idct_t, sf_t, total, rate,
        );
        Ok(())
    }
}

/// 解压后的各个流
struct DecodedStreams {
    bindex: Vec<u8>,
    dc: Vec<f64>,
    ac_exact: Vec<f64>,
    qtable: Option<Vec<f64>>,
}
