use ash::vk;
use bytemuck::Zeroable;
use ravel_gfx::{
    basic::color::LabelColor,
    commands::encoder::GfxCommandEncoder,
    error::GfxError,
    foundation::device::GfxDevice,
    raytracing::bindings::{RtBindings, RtPushConstants},
    resources::{handles::GfxImageHandle, image::GfxImageDesc},
};

use crate::{
    accel_manager::AccelerationStructureManager, camera_basis::CameraBasis, error::RenderError,
    settings::EnvironmentSettings,
};

/// 光追 kernel 的输出，每个像素一个 HDR 样本
///
/// 每帧由 dispatch 写入一次，再由累积阶段读取一次
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTraceTarget {
    pub image: GfxImageHandle,
    pub extent: vk::Extent2D,
}

/// 负责发射光线生成 kernel，一个 work item 对应一个输出像素
#[derive(Default)]
pub struct RayDispatchOrchestrator {
    raw_target: Option<RawTraceTarget>,
}
// new & init
impl RayDispatchOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 分辨率变化时重新创建 raw trace target
    pub fn ensure_target(
        &mut self,
        device: &mut dyn GfxDevice,
        extent: vk::Extent2D,
    ) -> Result<RawTraceTarget, RenderError> {
        if extent.width == 0 || extent.height == 0 {
            return Err(RenderError::NotReady("output extent is zero"));
        }
        if let Some(target) = self.raw_target {
            if target.extent == extent {
                return Ok(target);
            }
        }

        if let Some(old) = self.raw_target.take() {
            device.destroy_image(old.image);
        }
        let image = device.create_image(&GfxImageDesc::new_hdr_storage_2d(extent), "raw-trace")?;
        log::info!("raw trace target created: {}x{}", extent.width, extent.height);

        let target = RawTraceTarget { image, extent };
        self.raw_target = Some(target);
        Ok(target)
    }
}
// record
impl RayDispatchOrchestrator {
    /// `frame_index` 作为 kernel 的随机数种子
    pub fn push_constants(basis: &CameraBasis, environment: &EnvironmentSettings, frame_index: u32) -> RtPushConstants {
        RtPushConstants {
            bottom_left: basis.bottom_left.extend(0.0),
            top_left: basis.top_left.extend(0.0),
            bottom_right: basis.bottom_right.extend(0.0),
            top_right: basis.top_right.extend(0.0),
            camera_pos: basis.position.extend(1.0),
            sky_color: environment.sky_color.extend(1.0),
            ground_color: environment.ground_color.extend(1.0),
            frame_index,
            ..RtPushConstants::zeroed()
        }
    }

    /// 录制一次 `extent.width x extent.height x 1` 的 trace
    pub fn record(
        encoder: &mut dyn GfxCommandEncoder,
        bindings: &RtBindings,
        push_constants: &RtPushConstants,
        extent: vk::Extent2D,
    ) -> Result<(), GfxError> {
        encoder.begin_label("ray-trace", LabelColor::COLOR_CMD);
        let result = encoder.trace_rays(bindings, push_constants, [extent.width, extent.height, 1]);
        encoder.end_label();
        result
    }

    /// 加速结构必须处于 Ready，否则返回 `NotReady`
    ///
    /// 只会写入 raw trace target
    #[allow(clippy::too_many_arguments)]
    pub fn dispatch(
        &mut self,
        device: &mut dyn GfxDevice,
        accel: &AccelerationStructureManager,
        basis: &CameraBasis,
        environment: &EnvironmentSettings,
        frame_index: u32,
        output_width: u32,
        output_height: u32,
    ) -> Result<RawTraceTarget, RenderError> {
        let accel = accel.ready_handle().ok_or(RenderError::NotReady("accel is not ready"))?;
        let target = self.ensure_target(
            device,
            vk::Extent2D {
                width: output_width,
                height: output_height,
            },
        )?;

        let push_constants = Self::push_constants(basis, environment, frame_index);
        let bindings = RtBindings {
            accel,
            output: target.image,
        };
        Self::record(device.encoder(), &bindings, &push_constants, target.extent)?;
        Ok(target)
    }
}
// getters
impl RayDispatchOrchestrator {
    #[inline]
    pub fn raw_target(&self) -> Option<RawTraceTarget> {
        self.raw_target
    }
}
// destroy
impl RayDispatchOrchestrator {
    pub fn destroy(&mut self, device: &mut dyn GfxDevice) {
        if let Some(target) = self.raw_target.take() {
            device.destroy_image(target.image);
        }
    }
}
impl Drop for RayDispatchOrchestrator {
    fn drop(&mut self) {
        if self.raw_target.is_some() {
            log::warn!("RayDispatchOrchestrator dropped without destroy");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{camera_basis::CameraSampleBasis, settings::{CameraConfig, InstancePolicy}};
    use ravel_scene::scene_manager::SceneManager;
    use ravel_soft_gfx::soft_gfx::SoftGfx;

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    #[test]
    fn test_ensure_target_reuses_same_extent() {
        let mut gfx = SoftGfx::new("soft");
        let mut dispatcher = RayDispatchOrchestrator::new();

        let first = dispatcher.ensure_target(&mut gfx, extent(8, 4)).unwrap();
        let again = dispatcher.ensure_target(&mut gfx, extent(8, 4)).unwrap();
        assert_eq!(first, again);
        assert_eq!(gfx.stats().image_allocations, 1);

        let resized = dispatcher.ensure_target(&mut gfx, extent(4, 4)).unwrap();
        assert_ne!(resized.image, first.image);
        assert_eq!(gfx.live_image_count(), 1);

        assert!(matches!(dispatcher.ensure_target(&mut gfx, extent(0, 4)), Err(RenderError::NotReady(_))));
        dispatcher.destroy(&mut gfx);
        assert_eq!(gfx.live_image_count(), 0);
    }

    #[test]
    fn test_push_constants_layout_from_basis() {
        let basis = CameraSampleBasis::compute(&CameraConfig::default(), 1.0, glam::Mat4::IDENTITY);
        let env = EnvironmentSettings::default();
        let push = RayDispatchOrchestrator::push_constants(&basis, &env, 42);

        assert_eq!(push.top_left.w, 0.0);
        assert_eq!(push.camera_pos, glam::Vec4::W);
        assert_eq!(push.sky_color.truncate(), env.sky_color);
        assert_eq!(push.frame_index, 42);
        assert_eq!(push._padding_0, [0; 3]);
    }

    #[test]
    fn test_dispatch_requires_ready_accel() {
        let mut gfx = SoftGfx::new("soft");
        let mut accel = AccelerationStructureManager::new(InstancePolicy::Opaque, 1);
        let mut dispatcher = RayDispatchOrchestrator::new();
        let basis = CameraSampleBasis::compute(&CameraConfig::default(), 1.0, glam::Mat4::IDENTITY);
        let env = EnvironmentSettings::default();

        let result = dispatcher.dispatch(&mut gfx, &accel, &basis, &env, 0, 4, 4);
        assert!(matches!(result, Err(RenderError::NotReady(_))));
        assert_eq!(gfx.stats().trace_dispatches, 0);

        accel.initialize(&mut gfx).unwrap();
        accel.rescan_scene(&mut gfx, &SceneManager::new()).unwrap();
        let target = dispatcher.dispatch(&mut gfx, &accel, &basis, &env, 0, 4, 3).unwrap();

        assert_eq!(target.extent, extent(4, 3));
        assert_eq!(gfx.stats().trace_dispatches, 1);
        assert_eq!(gfx.stats().traced_work_items, 12);
        assert_eq!(gfx.stats().labels, vec!["ray-trace".to_string()]);

        // 空场景：上半部分看到天空
        let pixels = gfx.image_pixels(target.image).unwrap();
        assert_eq!(pixels[0].truncate(), env.sky_color);
        assert_eq!(pixels[11].truncate(), env.ground_color);

        dispatcher.destroy(&mut gfx);
        accel.destroy(&mut gfx);
    }
}
