use ravel_gfx::error::GfxError;
use ravel_render_graph::render_graph::RgError;

/// 渲染核心对外暴露的错误
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// 设备不支持硬件光线查询，只会在 initialize 时出现一次
    #[error("device `{device}` does not support hardware ray tracing")]
    UnsupportedHardware { device: String },

    /// 暂时性的状态，`render_frame` 会吞掉这个错误并跳过当前帧
    #[error("renderer is not ready: {0}")]
    NotReady(&'static str),

    /// 资源分配失败，对当前分辨率是致命的
    #[error("failed to create `{name}`")]
    ResourceCreationFailure {
        name: String,
        #[source]
        source: GfxError,
    },

    #[error(transparent)]
    Gfx(GfxError),

    #[error("render graph cycle: {0:?}")]
    GraphCycle(Vec<String>),
}

impl From<GfxError> for RenderError {
    fn from(error: GfxError) -> Self {
        match error {
            GfxError::AllocationFailed { name, reason } => RenderError::ResourceCreationFailure {
                name: name.clone(),
                source: GfxError::AllocationFailed { name, reason },
            },
            GfxError::RayTracingUnsupported(device) => RenderError::UnsupportedHardware { device },
            other => RenderError::Gfx(other),
        }
    }
}

impl From<RgError> for RenderError {
    fn from(error: RgError) -> Self {
        match error {
            RgError::Cycle(passes) => RenderError::GraphCycle(passes),
            RgError::Pass { name, source } => {
                log::error!("pass `{}` failed: {}", name, source);
                source.into()
            }
        }
    }
}
