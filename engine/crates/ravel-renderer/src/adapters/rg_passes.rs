use ash::vk;
use itertools::Itertools;
use ravel_gfx::{
    error::GfxError,
    foundation::device::GfxDevice,
    raytracing::bindings::{RtBindings, RtPushConstants},
    resources::handles::GfxAccelHandle,
};
use ravel_render_graph::render_graph::{
    RenderGraphBuilder, RgImageHandle, RgImageState, RgPass, RgPassBuilder, RgPassContext,
};
use ravel_scene::{camera::Camera, ray_traceable::SceneEnumerator};

use crate::{
    accumulation::{AccumulatedResult, AccumulationEngine},
    error::RenderError,
    frame_state::FrameState,
    ray_dispatch::RayDispatchOrchestrator,
    renderer::{FrameOutput, ProgressiveRenderer},
};

/// raw trace 与累积缓冲使用的格式
const HDR_FORMAT: vk::Format = vk::Format::R32G32B32A32_SFLOAT;

/// 光追 Pass 的 RenderGraph 封装
pub struct RtTraceRgPass {
    pub accel: GfxAccelHandle,
    pub push_constants: RtPushConstants,
    pub extent: vk::Extent2D,

    /// 单帧 RT 输出（只写）
    pub raw_image: RgImageHandle,
}

impl RgPass for RtTraceRgPass {
    fn setup(&mut self, builder: &mut RgPassBuilder) {
        builder.write_image(self.raw_image, RgImageState::STORAGE_WRITE_RAY_TRACING);
    }

    fn execute(&mut self, ctx: &mut RgPassContext<'_>) -> Result<(), GfxError> {
        let output = ctx.get_image_handle(self.raw_image).ok_or(GfxError::InvalidHandle { kind: "image" })?;
        let bindings = RtBindings {
            accel: self.accel,
            output,
        };
        RayDispatchOrchestrator::record(ctx.cmd, &bindings, &self.push_constants, self.extent)
    }

    fn has_side_effects(&self) -> bool {
        true
    }
}

/// 累积 Pass 的 RenderGraph 封装
///
/// 直接可变借用累积引擎和帧状态，执行时交换缓冲角色并递增样本数
pub struct AccumRgPass<'a> {
    pub engine: &'a mut AccumulationEngine,
    pub frame_state: &'a mut FrameState,

    /// 单帧 RT 输出（只读）
    pub raw_image: RgImageHandle,
    /// 上一帧的累积结果（只读）
    pub previous_image: RgImageHandle,
    /// 本帧的累积结果（只写）
    pub current_image: RgImageHandle,
}

impl RgPass for AccumRgPass<'_> {
    fn setup(&mut self, builder: &mut RgPassBuilder) {
        builder.read_image(self.raw_image, RgImageState::STORAGE_READ_COMPUTE);
        builder.read_image(self.previous_image, RgImageState::STORAGE_READ_COMPUTE);
        builder.write_image(self.current_image, RgImageState::STORAGE_WRITE_COMPUTE);
    }

    fn execute(&mut self, ctx: &mut RgPassContext<'_>) -> Result<(), GfxError> {
        let raw = ctx.get_image_handle(self.raw_image).ok_or(GfxError::InvalidHandle { kind: "image" })?;
        debug_assert_eq!(
            ctx.get_image_handle(self.current_image),
            self.engine.next_roles().map(|roles| roles.current)
        );

        self.engine.record_blend(ctx.cmd, raw, self.frame_state).map(|_| ())
    }

    fn has_side_effects(&self) -> bool {
        true
    }
}

/// 通过 render graph 录制一帧的入口
///
/// 最新的累积结果会被导出为相机的颜色输出
pub struct RgRenderPath;

impl RgRenderPath {
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

        let accel = renderer.accel_manager.ready_handle().ok_or(RenderError::NotReady("accel is not ready"))?;
        let raw = renderer.dispatcher.ensure_target(device, prepared.extent)?;
        renderer.accumulation.validate(raw.extent)?;
        let roles = renderer.accumulation.next_roles().ok_or(RenderError::NotReady("accumulation buffers"))?;

        let frame_name = renderer.frame_state.frame_name();
        let push_constants =
            RayDispatchOrchestrator::push_constants(&prepared.basis, &environment, renderer.frame_state.sample_index);

        {
            let mut builder = RenderGraphBuilder::new();
            let raw_image = builder.import_image("raw-trace", raw.image, HDR_FORMAT, RgImageState::UNDEFINED);
            // 两个入口可能交替录制，缓冲的初始状态以累积引擎记录的为准
            let previous_image =
                builder.import_image("accum-previous", roles.previous, HDR_FORMAT, roles.previous_state);
            let current_image = builder.import_image("accum-current", roles.current, HDR_FORMAT, roles.current_state);

            builder
                .add_pass(
                    "ray-trace",
                    RtTraceRgPass {
                        accel,
                        push_constants,
                        extent: raw.extent,
                        raw_image,
                    },
                )
                .add_pass(
                    "accumulate",
                    AccumRgPass {
                        engine: &mut renderer.accumulation,
                        frame_state: &mut renderer.frame_state,
                        raw_image,
                        previous_image,
                        current_image,
                    },
                );
            builder.export_image(current_image, RgImageState::TRANSFER_SRC);

            let mut graph = builder.compile()?;
            log::debug!(
                "{}: {} (culled {})",
                frame_name,
                graph.execution_order().iter().map(|&index| graph.pass_name(index)).join(" -> "),
                graph.culled_passes().len()
            );
            graph.execute(device.encoder())?;
        }
        renderer.accumulation.set_slot_state(roles.current_slot, RgImageState::TRANSFER_SRC);

        renderer.accumulation.latest().ok_or(RenderError::NotReady("accumulation produced no result"))
    }
}
