//! 集成测试公共工具: 最小化的 DCTZ 编码器与测试信号.
//!
//! 编码器按解码器的容器布局产出数据, 只用于验证解码端, 不追求压缩率.

#![allow(dead_code)]

use dctz::codec::stream::deflate;
use dctz::codec::{BinTable, CoefficientMode, ContainerHeader, DecoderConfig, ESCAPE};
use dctz::core::Precision;

/// 初始化测试日志 (重复调用无副作用)
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 编码参数
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub mode: CoefficientMode,
    pub precision: Precision,
    pub block_size: usize,
    /// 样本域的绝对误差界
    pub error_bound: f64,
    pub scaling_factor: f64,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            mode: CoefficientMode::Direct,
            precision: Precision::Full,
            block_size: 64,
            error_bound: 1e-3,
            scaling_factor: 1.0,
        }
    }
}

impl EncodeOptions {
    /// 与编码参数匹配的解码配置
    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig::default()
            .with_mode(self.mode)
            .with_precision(self.precision)
            .with_block_size(self.block_size)
    }
}

/// 编码结果与统计
#[derive(Debug, Clone)]
pub struct Encoded {
    pub container: Vec<u8>,
    pub primary_escapes: usize,
    pub secondary_hits: usize,
    pub exact_values: usize,
}

/// 正交归一化 DCT-II
pub fn forward_dct(block: &[f64]) -> Vec<f64> {
    let n = block.len() as f64;
    (0..block.len())
        .map(|j| {
            let w = if j == 0 {
                (1.0 / n).sqrt()
            } else {
                (2.0 / n).sqrt()
            };
            let sum: f64 = block
                .iter()
                .enumerate()
                .map(|(k, &x)| {
                    x * (std::f64::consts::PI * j as f64 * (2 * k + 1) as f64 / (2.0 * n)).cos()
                })
                .sum();
            w * sum
        })
        .collect()
}

/// 频率 j (1..block_size) 的量化表项
fn qtable_value(j: usize, block_size: usize) -> f64 {
    1.0 + 7.0 * j as f64 / block_size as f64
}

/// 把存储精度的舍入提前施加到值上
fn round_to(precision: Precision, value: f64) -> f64 {
    match precision {
        Precision::Full => value,
        Precision::Truncated => value as f32 as f64,
    }
}

/// 编码浮点数组
///
/// 系数误差界取 `eb / (10^(SF-1) * sqrt(block_size))`, 保证逆变换后每个样本误差不超过 `eb`.
pub fn encode(data: &[f64], opts: &EncodeOptions) -> Encoded {
    let bs = opts.block_size;
    let xscale = 10f64.powf(opts.scaling_factor - 1.0);
    let coef_eb = opts.error_bound / xscale / (bs as f64).sqrt();
    let bins = BinTable::generate(coef_eb, 255).unwrap();
    let zero_bin = (bins.len() / 2) as u8;
    let qtable: Vec<f64> = (1..bs).map(|j| qtable_value(j, bs)).collect();

    let mut bindex = Vec::with_capacity(data.len());
    let mut secondary = Vec::new();
    let mut dc = Vec::new();
    let mut ac_exact = Vec::new();
    let mut primary_escapes = 0;
    let mut secondary_hits = 0;

    for block in data.chunks(bs) {
        let scaled: Vec<f64> = block.iter().map(|&x| x / xscale).collect();
        let coeffs = forward_dct(&scaled);
        dc.push(coeffs[0]);
        bindex.push(zero_bin);
        for (j, &c) in coeffs.iter().enumerate().skip(1) {
            if let Some(b) = bins.locate(c) {
                bindex.push(b);
                continue;
            }
            bindex.push(ESCAPE);
            primary_escapes += 1;
            if opts.mode == CoefficientMode::QuantizerTable {
                let q = qtable[j - 1];
                let hit = bins
                    .locate(c / q)
                    .filter(|&s| (c - bins.centers()[s as usize] * q).abs() <= coef_eb);
                if let Some(s) = hit {
                    secondary.push(s);
                    secondary_hits += 1;
                    continue;
                }
                secondary.push(ESCAPE);
            }
            ac_exact.push(round_to(opts.precision, c));
        }
    }

    let mut header = ContainerHeader {
        num_elements: data.len() as u32,
        error_bound: coef_eb,
        tot_ac_exact_count: ac_exact.len() as u32,
        scaling_factor: opts.scaling_factor,
        bindex_sz_compressed: 0,
        dc_sz_compressed: 0,
        ac_exact_sz_compressed: 0,
        bindex_count: 0,
    };
    if opts.mode == CoefficientMode::QuantizerTable {
        bindex.extend_from_slice(&secondary);
        header.bindex_count = bindex.len() as u32;
    }

    let bindex_z = deflate(&bindex, 6).unwrap();
    let mut dc_raw = Vec::new();
    opts.precision.encode_into(&dc, &mut dc_raw);
    let dc_z = deflate(&dc_raw, 6).unwrap();
    let mut ac_raw = Vec::new();
    opts.precision.encode_into(&ac_exact, &mut ac_raw);

    header.bindex_sz_compressed = bindex_z.len() as u32;
    header.dc_sz_compressed = dc_z.len() as u32;
    header.ac_exact_sz_compressed = ac_raw.len() as u32;

    let mut container = Vec::new();
    header.write_to(&mut container);
    container.extend_from_slice(&bindex_z);
    container.extend_from_slice(&dc_z);
    container.extend_from_slice(&ac_raw);
    if opts.mode == CoefficientMode::QuantizerTable {
        Precision::Full.encode_into(&qtable, &mut container);
    }

    Encoded {
        container,
        primary_escapes,
        secondary_hits,
        exact_values: ac_exact.len(),
    }
}

/// 确定性测试信号: 平滑分量 + 伪随机噪声 + 稀疏尖峰
pub fn test_signal(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..n)
        .map(|i| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let noise = ((state >> 11) as f64 / (1u64 << 53) as f64) - 0.5;
            let t = i as f64;
            let spike = if i % 97 == 13 { 12.0 } else { 0.0 };
            3.0 * (t * 0.013).sin() + 1.5 * (t * 0.11).cos() + 0.2 * noise + spike
        })
        .collect()
}

/// 幅值很小的平滑信号, 所有 AC 系数都落在分箱表内
pub fn smooth_signal(n: usize, amplitude: f64) -> Vec<f64> {
    (0..n)
        .map(|i| 4.0 + amplitude * (i as f64 * 0.02).sin())
        .collect()
}

/// 最大绝对误差
pub fn max_abs_error(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
