//! 幅值反缩放.
//!
//! 编码器在量化前将数据除以 `10^(SF - 1)` 做十进制归一化. 解码的最后一步对整个输出数组
//! 统一乘回该因子, 仅执行一次. SF 等于 1 时不做任何乘法, 输出与逆变换结果比特一致.

use rayon::prelude::*;

/// 缩放因子 SF 对应的乘数 `10^(SF - 1)`
pub fn scale_multiplier(scaling_factor: f64) -> f64 {
    10f64.powf(scaling_factor - 1.0)
}

/// 对输出数组反缩放
pub fn rescale(output: &mut [f64], scaling_factor: f64, parallel: bool) {
    if scaling_factor == 1.0 {
        return;
    }
    let xscale = scale_multiplier(scaling_factor);
    if parallel {
        output.par_iter_mut().for_each(|v| *v *= xscale);
    } else {
        output.iter_mut().for_each(|v| *v *= xscale);
    }
}
