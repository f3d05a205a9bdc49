use ash::vk;

/// GFX 边界上所有可能出现的错误
#[derive(Debug, thiserror::Error)]
pub enum GfxError {
    /// 资源分配失败（显存不足、超出后端限制等）
    #[error("failed to allocate `{name}`: {reason}")]
    AllocationFailed { name: String, reason: String },

    #[error("device `{0}` does not support hardware ray tracing")]
    RayTracingUnsupported(String),

    /// handle 已经被销毁或者不属于当前 device
    #[error("invalid {kind} handle")]
    InvalidHandle { kind: &'static str },

    #[error("unsupported image format: {0:?}")]
    UnsupportedFormat(vk::Format),

    #[error("image extent mismatch: expected {expected:?}, got {actual:?}")]
    ExtentMismatch { expected: vk::Extent2D, actual: vk::Extent2D },

    /// 同一张 image 在一个命令中同时作为输入和输出
    #[error("image `{0}` is bound as both input and output")]
    ResourceAliasing(&'static str),
}

impl GfxError {
    #[inline]
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, GfxError::AllocationFailed { .. })
    }
}
