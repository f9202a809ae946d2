//! 逆 DCT.
//!
//! 每个块的频域向量 (下标 0 为 DC, 其余为 AC) 经正交归一化 DCT-III 变换回样本域.
//! 变换计划在块循环之前为块长度 (及尾块长度) 一次性创建, 块循环结束后随上下文释放.

use std::sync::Arc;

use dctz_core::{DctzError, DctzResult};
use rustdct::{Dct3, DctPlanner, TransformType2And3};

/// 逆变换原语
///
/// 实现必须可以在多个线程上并发调用 (块循环可能并行执行).
pub trait InverseTransform: Sync {
    /// 将 `coeffs` 变换到样本域并写入 `output`, 两者长度必须相同
    fn inverse(&self, coeffs: &[f64], output: &mut [f64]) -> DctzResult<()>;
}

/// 基于 rustdct 的正交归一化逆 DCT
pub struct DctIdct {
    /// 已创建的变换计划, 按长度区分
    plans: Vec<(usize, Arc<dyn TransformType2And3<f64>>)>,
}

impl DctIdct {
    /// 为给定的若干块长度创建变换计划
    pub fn new(lengths: &[usize]) -> Self {
        let mut planner = DctPlanner::new();
        let mut plans: Vec<(usize, Arc<dyn TransformType2And3<f64>>)> = Vec::new();
        for &len in lengths {
            if len > 1 && !plans.iter().any(|(l, _)| *l == len) {
                plans.push((len, planner.plan_dct3(len)));
            }
        }
        Self { plans }
    }

    fn plan(&self, len: usize) -> Option<&Arc<dyn TransformType2And3<f64>>> {
        self.plans.iter().find(|(l, _)| *l == len).map(|(_, p)| p)
    }
}

impl InverseTransform for DctIdct {
    fn inverse(&self, coeffs: &[f64], output: &mut [f64]) -> DctzResult<()> {
        let n = coeffs.len();
        if n != output.len() {
            return Err(DctzError::TransformFailure(format!(
                "系数长度 {} 与输出长度 {} 不一致",
                n,
                output.len(),
            )));
        }
        if n == 1 {
            output[0] = coeffs[0];
            return Ok(());
        }
        let plan = self.plan(n).ok_or_else(|| {
            DctzError::TransformFailure(format!("未创建长度 {} 的变换计划", n))
        })?;

        // rustdct 的 DCT-III 为 x0/2 + sum(xk * cos(...)), 这里换算为正交归一化形式
        let dc_scale = 2.0 / (n as f64).sqrt();
        let ac_scale = (2.0 / n as f64).sqrt();
        output[0] = coeffs[0] * dc_scale;
        for (o, &c) in output[1..].iter_mut().zip(&coeffs[1..]) {
            *o = c * ac_scale;
        }
        plan.process_dct3(output);
        Ok(())
    }
}
