use ravel_gfx::{commands::barrier::GfxImageBarrier, foundation::device::GfxDevice, resources::handles::GfxImageHandle};
use ravel_render_graph::render_graph::{RgImageBarrierDesc, RgImageHandle, RgImageState};
use ravel_scene::{camera::Camera, ray_traceable::SceneEnumerator};

use crate::{
    accumulation::AccumulatedResult,
    error::RenderError,
    renderer::{FrameOutput, ProgressiveRenderer},
};

/// 单相机的直接录制入口
///
/// 不经过 render graph，光追与累积之间的同步由这里手动插入
pub struct CameraRenderPath;

impl CameraRenderPath {
    pub fn render(
        renderer: &mut ProgressiveRenderer,
        device: &mut dyn GfxDevice,
        scene: &dyn SceneEnumerator,
        camera: &Camera,
        width: u32,
        height: u32,
    ) -> Result<FrameOutput, RenderError> {
        if let Some(output) = renderer.frame_gate() {
            return Ok(output);
        }

        let result = Self::record(renderer, device, scene, camera.world_transform(), width, height);
        renderer.absorb_not_ready(result)
    }

    fn record(
        renderer: &mut ProgressiveRenderer,
        device: &mut dyn GfxDevice,
        scene: &dyn SceneEnumerator,
        camera_transform: glam::Mat4,
        width: u32,
        height: u32,
    ) -> Result<AccumulatedResult, RenderError> {
        let environment = renderer.settings().environment;
        let prepared = renderer.prepare_frame(device, scene, camera_transform, width, height)?;

        // raw trace 每帧整张覆盖，旧内容直接丢弃
        let raw = renderer.dispatcher.ensure_target(device, prepared.extent)?;
        Self::record_barriers(
            device,
            &[(raw.image, RgImageState::UNDEFINED, RgImageState::STORAGE_WRITE_RAY_TRACING)],
        );

        let raw = renderer.dispatcher.dispatch(
            device,
            &renderer.accel_manager,
            &prepared.basis,
            &environment,
            renderer.frame_state.sample_index,
            prepared.extent.width,
            prepared.extent.height,
        )?;

        renderer.accumulation.validate(raw.extent)?;
        let roles = renderer.accumulation.next_roles().ok_or(RenderError::NotReady("accumulation buffers"))?;

        // 等待光追写入 raw trace；两张累积缓冲从各自上一次的使用状态转换过来
        Self::record_barriers(
            device,
            &[
                (raw.image, RgImageState::STORAGE_WRITE_RAY_TRACING, RgImageState::STORAGE_READ_COMPUTE),
                (roles.previous, roles.previous_state, RgImageState::STORAGE_READ_COMPUTE),
                (roles.current, roles.current_state, RgImageState::STORAGE_WRITE_COMPUTE),
            ],
        );

        renderer.accumulation.accumulate(device.encoder(), &raw, &mut renderer.frame_state)
    }

    /// 按 render graph 的规则生成 barrier，只读到只读且 layout 不变的转换会被跳过
    fn record_barriers(device: &mut dyn GfxDevice, transitions: &[(GfxImageHandle, RgImageState, RgImageState)]) {
        // 直接录制时没有 graph 的虚拟句柄，handle 只是占位
        let barriers = transitions
            .iter()
            .filter_map(|&(image, pre_usage, crt_usage)| {
                let desc = RgImageBarrierDesc::new(RgImageHandle::default(), pre_usage, crt_usage);
                desc.needs_barrier().then(|| desc.to_gfx_barrier(image))
            })
            .collect::<Vec<GfxImageBarrier>>();
        if !barriers.is_empty() {
            device.encoder().image_barrier(&barriers);
        }
    }
}
