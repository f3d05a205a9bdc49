use crate::render_graph::RgImageState;

/// 导出资源信息
///
/// 描述资源在渲染图执行完成后的最终状态。被导出的资源视为 graph 的输出，
/// 写入它的 Pass 不会被剔除。
#[derive(Clone, Copy, Debug)]
pub struct RgExportInfo {
    /// 资源的最终状态（layout, access, stage）
    pub final_state: RgImageState,
}

impl RgExportInfo {
    #[inline]
    pub fn new(final_state: RgImageState) -> Self {
        Self { final_state }
    }
}
