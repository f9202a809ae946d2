//! 统一错误类型定义.
//!
//! 所有 DCTZ crate 共用的错误类型. 解码过程中的任何错误都是致命的:
//! 调用直接返回错误, 不会交出部分填充的输出数组.

use thiserror::Error;

/// DCTZ 解码统一错误类型
#[derive(Debug, Clone, Error)]
pub enum DctzError {
    /// 容器格式错误: 缓冲区短于头部, 或头部字段与缓冲区/流内容不一致
    #[error("容器格式错误: {0}")]
    MalformedContainer(String),

    /// 熵编码流损坏: 解压失败或解压后大小不符
    #[error("码流损坏: {0}")]
    StreamCorrupt(String),

    /// 容器截断: 读取越过了声明的流边界
    #[error("容器截断: {0}")]
    ContainerTruncated(String),

    /// 内存分配失败
    #[error("内存分配失败: {0}")]
    AllocationFailure(String),

    /// 逆变换失败
    #[error("逆变换失败: {0}")]
    TransformFailure(String),

    /// 无效参数 (解码配置或调用方缓冲区)
    #[error("无效参数: {0}")]
    InvalidArgument(String),
}

/// DCTZ 统一 Result 类型
pub type DctzResult<T> = Result<T, DctzError>;

/// 按元素个数分配零初始化的缓冲区
///
/// 使用 `try_reserve_exact`, 分配失败时返回 [`DctzError::AllocationFailure`] 而不是终止进程.
pub fn try_alloc<T: Clone + Default>(len: usize, what: &str) -> DctzResult<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|e| {
        DctzError::AllocationFailure(format!("{}: 无法分配 {} 个元素 ({})", what, len, e))
    })?;
    buf.resize(len, T::default());
    Ok(buf)
}
