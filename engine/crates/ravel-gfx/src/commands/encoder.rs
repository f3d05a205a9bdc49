use crate::{
    commands::barrier::GfxImageBarrier,
    error::GfxError,
    raytracing::bindings::{AccumBindings, AccumPushConstants, RtBindings, RtPushConstants},
};

/// 命令录制接口
///
/// 对应一个 command buffer。核心只会录制下面这几类命令，
/// 具体的 pipeline、descriptor set 都由后端自己管理。
pub trait GfxCommandEncoder {
    /// 开始一个 debug label 区间，必须与 [`Self::end_label`] 成对出现
    fn begin_label(&mut self, label_name: &str, label_color: glam::Vec4);

    fn end_label(&mut self);

    fn image_barrier(&mut self, barriers: &[GfxImageBarrier]);

    /// 发射光线生成 kernel
    ///
    /// `extent` 为 `[width, height, depth]`，每个 work item 对应一个输出像素
    fn trace_rays(
        &mut self,
        bindings: &RtBindings,
        push_constants: &RtPushConstants,
        extent: [u32; 3],
    ) -> Result<(), GfxError>;

    /// 累积：`output = mix(accumulation, current_frame, 1 / (accum_frames + 1))`
    fn blit_accumulate(
        &mut self,
        bindings: &AccumBindings,
        push_constants: &AccumPushConstants,
    ) -> Result<(), GfxError>;
}
