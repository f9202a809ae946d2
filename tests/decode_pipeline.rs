//! 解码管线集成测试.
//!
//! 用 tests/common 中的最小编码器生成容器, 验证解码结果满足误差界以及各类损坏输入的处理.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::{EncodeOptions, encode, init_logger, max_abs_error, smooth_signal, test_signal};
use dctz::codec::{CoefficientMode, DctIdct, DctzDecoder, InverseTransform};
use dctz::core::{DctzError, DctzResult, Precision};

#[test]
fn test_往返误差界_直接模式() {
    init_logger();
    for &eb in &[1e-2, 1e-4, 1e-6] {
        for &n in &[1usize, 7, 64, 1000, 4109] {
            let data = test_signal(n, n as u64);
            let opts = EncodeOptions {
                error_bound: eb,
                ..Default::default()
            };
            let encoded = encode(&data, &opts);
            let out = dctz::decode(&encoded.container, &opts.decoder_config()).unwrap();
            assert_eq!(out.len(), n);
            let err = max_abs_error(&out, &data);
            assert!(err <= eb, "eb={eb:e}, n={n}: 最大误差 {err:e}");
        }
    }
}

#[test]
fn test_往返误差界_截断精度() {
    init_logger();
    let eb = 1e-2;
    let data = test_signal(1000, 7);
    let opts = EncodeOptions {
        precision: Precision::Truncated,
        error_bound: eb,
        ..Default::default()
    };
    let encoded = encode(&data, &opts);
    assert!(encoded.exact_values > 0);
    let out = dctz::decode(&encoded.container, &opts.decoder_config()).unwrap();
    let err = max_abs_error(&out, &data);
    assert!(err <= eb, "最大误差 {err:e}");

    // 截断精度容器用全精度配置解码: 流大小与精度不符
    let wrong = opts.decoder_config().with_precision(Precision::Full);
    assert!(dctz::decode(&encoded.container, &wrong).is_err());
}

#[test]
fn test_往返误差界_量化表模式() {
    init_logger();
    for &eb in &[1e-2, 1e-3, 1e-5] {
        let data = test_signal(4109, 42);
        let opts = EncodeOptions {
            mode: CoefficientMode::QuantizerTable,
            error_bound: eb,
            ..Default::default()
        };
        let encoded = encode(&data, &opts);
        if eb == 1e-3 {
            assert!(encoded.secondary_hits > 0);
        }
        assert!(encoded.primary_escapes > 0);

        let out = dctz::decode(&encoded.container, &opts.decoder_config()).unwrap();
        let err = max_abs_error(&out, &data);
        assert!(err <= eb, "eb={eb:e}: 最大误差 {err:e}");
    }
}

#[test]
fn test_无转义时两种模式结果一致() {
    init_logger();
    let data = smooth_signal(1000, 0.02);
    let direct = EncodeOptions {
        error_bound: 1e-2,
        ..Default::default()
    };
    let qtable = EncodeOptions {
        mode: CoefficientMode::QuantizerTable,
        ..direct.clone()
    };

    let a = encode(&data, &direct);
    let b = encode(&data, &qtable);
    assert_eq!(a.primary_escapes, 0);
    assert_eq!(b.primary_escapes, 0);

    let out_a = dctz::decode(&a.container, &direct.decoder_config()).unwrap();
    let out_b = dctz::decode(&b.container, &qtable.decoder_config()).unwrap();
    for (x, y) in out_a.iter().zip(&out_b) {
        assert_eq!(x.to_bits(), y.to_bits());
    }
}

#[test]
fn test_缩放因子() {
    init_logger();
    let eb = 0.5;
    let data: Vec<f64> = test_signal(2000, 3).iter().map(|v| v * 100.0).collect();
    let opts = EncodeOptions {
        error_bound: eb,
        scaling_factor: 3.0,
        ..Default::default()
    };
    let encoded = encode(&data, &opts);
    let out = dctz::decode(&encoded.container, &opts.decoder_config()).unwrap();
    let err = max_abs_error(&out, &data);
    assert!(err <= eb, "最大误差 {err:e}");
}

#[test]
fn test_小块大小() {
    init_logger();
    let data = test_signal(333, 9);
    let opts = EncodeOptions {
        block_size: 8,
        error_bound: 1e-4,
        ..Default::default()
    };
    let encoded = encode(&data, &opts);
    let out = dctz::decode(&encoded.container, &opts.decoder_config()).unwrap();
    assert!(max_abs_error(&out, &data) <= 1e-4);

    // 块大小不一致: DC 个数对不上
    let wrong = opts.decoder_config().with_block_size(16);
    assert!(dctz::decode(&encoded.container, &wrong).is_err());
}

#[test]
fn test_任意截断都返回错误() {
    init_logger();
    let data = test_signal(300, 11);
    for mode in [CoefficientMode::Direct, CoefficientMode::QuantizerTable] {
        let opts = EncodeOptions {
            mode,
            error_bound: 1e-3,
            ..Default::default()
        };
        let encoded = encode(&data, &opts);
        let config = opts.decoder_config();
        for len in 0..encoded.container.len() {
            let result = dctz::decode(&encoded.container[..len], &config);
            assert!(
                matches!(
                    result,
                    Err(DctzError::MalformedContainer(_)) | Err(DctzError::ContainerTruncated(_))
                ),
                "mode={mode}, len={len}: {result:?}"
            );
        }
    }
}

#[test]
fn test_负载损坏不会崩溃() {
    init_logger();
    let data = test_signal(500, 5);
    let opts = EncodeOptions {
        mode: CoefficientMode::QuantizerTable,
        error_bound: 1e-3,
        ..Default::default()
    };
    let encoded = encode(&data, &opts);
    let config = opts.decoder_config();

    // 头部字段单独测试, 这里只破坏数据段
    for pos in (dctz::codec::HEADER_SIZE..encoded.container.len()).step_by(3) {
        let mut corrupted = encoded.container.clone();
        corrupted[pos] ^= 0x5a;
        if let Ok(out) = dctz::decode(&corrupted, &config) {
            assert_eq!(out.len(), data.len());
        }
    }
}

#[test]
fn test_末尾多余数据被容忍() {
    init_logger();
    let data = test_signal(200, 1);
    let opts = EncodeOptions::default();
    let encoded = encode(&data, &opts);
    let expected = dctz::decode(&encoded.container, &opts.decoder_config()).unwrap();

    let mut padded = encoded.container.clone();
    padded.extend_from_slice(&[0xAB; 16]);
    let out = dctz::decode(&padded, &opts.decoder_config()).unwrap();
    assert_eq!(out, expected);
}

#[test]
fn test_并行与顺序结果一致() {
    init_logger();
    let data = test_signal(64 * 200 + 17, 21);
    for mode in [CoefficientMode::Direct, CoefficientMode::QuantizerTable] {
        let opts = EncodeOptions {
            mode,
            error_bound: 1e-4,
            ..Default::default()
        };
        let encoded = encode(&data, &opts);
        let parallel = dctz::decode(&encoded.container, &opts.decoder_config()).unwrap();
        let sequential = dctz::decode(
            &encoded.container,
            &opts.decoder_config().with_parallel(false),
        )
        .unwrap();
        for (a, b) in parallel.iter().zip(&sequential) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}

#[test]
fn test_decode_into_复用缓冲区() {
    init_logger();
    let data = test_signal(777, 2);
    let opts = EncodeOptions::default();
    let encoded = encode(&data, &opts);
    let decoder = DctzDecoder::new(opts.decoder_config()).unwrap();

    let mut buffer = vec![f64::NAN; 777];
    decoder.decode_into(&encoded.container, &mut buffer).unwrap();
    assert!(max_abs_error(&buffer, &data) <= opts.error_bound);

    let header = DctzDecoder::peek_header(&encoded.container).unwrap();
    assert_eq!(header.num_elements, 777);
    assert_eq!(header.tot_ac_exact_count as usize, encoded.exact_values);
}

/// 委托给 DctIdct 并统计调用次数
struct CountingTransform {
    inner: DctIdct,
    calls: AtomicUsize,
}

impl InverseTransform for CountingTransform {
    fn inverse(&self, coeffs: &[f64], output: &mut [f64]) -> DctzResult<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.inverse(coeffs, output)
    }
}

/// 第 `fail_at` 次调用起返回错误
struct FailingTransform {
    inner: DctIdct,
    calls: AtomicUsize,
    fail_at: usize,
}

impl InverseTransform for FailingTransform {
    fn inverse(&self, coeffs: &[f64], output: &mut [f64]) -> DctzResult<()> {
        if self.calls.fetch_add(1, Ordering::Relaxed) >= self.fail_at {
            return Err(DctzError::TransformFailure("模拟变换失败".into()));
        }
        self.inner.inverse(coeffs, output)
    }
}

#[test]
fn test_自定义逆变换() {
    init_logger();
    let n = 64 * 10 + 5;
    let data = test_signal(n, 8);
    let opts = EncodeOptions::default();
    let encoded = encode(&data, &opts);
    let decoder = DctzDecoder::new(opts.decoder_config()).unwrap();

    let transform = CountingTransform {
        inner: DctIdct::new(&[64, 5]),
        calls: AtomicUsize::new(0),
    };
    let out = decoder
        .decode_with_transform(&encoded.container, &transform)
        .unwrap();
    assert_eq!(transform.calls.load(Ordering::Relaxed), 11);
    assert_eq!(out, decoder.decode(&encoded.container).unwrap());
}

#[test]
fn test_逆变换失败中止解码() {
    init_logger();
    let data = test_signal(64 * 50, 4);
    let opts = EncodeOptions::default();
    let encoded = encode(&data, &opts);

    for parallel in [false, true] {
        let decoder = DctzDecoder::new(opts.decoder_config().with_parallel(parallel)).unwrap();
        let transform = FailingTransform {
            inner: DctIdct::new(&[64]),
            calls: AtomicUsize::new(0),
            fail_at: 7,
        };
        let result = decoder.decode_with_transform(&encoded.container, &transform);
        assert!(matches!(result, Err(DctzError::TransformFailure(_))));
    }
}
