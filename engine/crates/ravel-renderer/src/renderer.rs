use ash::vk;
use ravel_gfx::foundation::device::GfxDevice;
use ravel_scene::{camera::Camera, ray_traceable::SceneEnumerator};

use crate::{
    accel_manager::AccelerationStructureManager,
    accumulation::{AccumulatedResult, AccumulationEngine},
    adapters::{camera_path::CameraRenderPath, rg_passes::RgRenderPath},
    camera_basis::{CameraBasis, CameraSampleBasis},
    error::RenderError,
    frame_state::FrameState,
    ray_dispatch::RayDispatchOrchestrator,
    settings::{CameraConfig, RendererSettings},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererStatus {
    Uninitialized,
    /// 设备不支持光追，之后的每一帧都是空操作
    Disabled,
    Active,
}

/// 一帧的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutput {
    Disabled,
    /// 还在初始化过程中，这一帧没有产生图像
    NotReady,
    Presented(AccumulatedResult),
}

impl FrameOutput {
    #[inline]
    pub fn presented(&self) -> Option<&AccumulatedResult> {
        match self {
            FrameOutput::Presented(result) => Some(result),
            _ => None,
        }
    }
}

/// 两个入口共享的每帧准备结果
pub(crate) struct PreparedFrame {
    pub basis: CameraBasis,
    pub extent: vk::Extent2D,
}

/// 渐进式光追渲染器
///
/// 每帧顺序执行：相机采样基 -> 加速结构 rebuild -> 光线派发 -> 累积
pub struct ProgressiveRenderer {
    settings: RendererSettings,
    camera_config: CameraConfig,
    status: RendererStatus,
    /// initialize 失败时记录的设备名
    unsupported_device: Option<String>,
    scene_dirty: bool,

    pub(crate) accel_manager: AccelerationStructureManager,
    pub(crate) dispatcher: RayDispatchOrchestrator,
    pub(crate) accumulation: AccumulationEngine,
    pub(crate) frame_state: FrameState,
}
// new & init
impl ProgressiveRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self {
            settings,
            camera_config: CameraConfig::default(),
            status: RendererStatus::Uninitialized,
            unsupported_device: None,
            scene_dirty: false,

            accel_manager: AccelerationStructureManager::new(settings.instance_policy, settings.layer_mask),
            dispatcher: RayDispatchOrchestrator::new(),
            accumulation: AccumulationEngine::new(),
            frame_state: FrameState::new(),
        }
    }

    /// 检查硬件支持、创建加速结构并扫描一次场景
    ///
    /// 硬件不支持时返回 `UnsupportedHardware`，renderer 在整个生命周期内保持 `Disabled`
    pub fn initialize(
        &mut self,
        device: &mut dyn GfxDevice,
        scene: &dyn SceneEnumerator,
        camera_config: &CameraConfig,
    ) -> Result<(), RenderError> {
        match self.status {
            RendererStatus::Active => return Ok(()),
            RendererStatus::Disabled => {
                return Err(RenderError::UnsupportedHardware {
                    device: self.unsupported_device.clone().unwrap_or_default(),
                });
            }
            RendererStatus::Uninitialized => (),
        }

        self.camera_config = *camera_config;
        self.frame_state = FrameState::new();

        if let Err(e) = self.accel_manager.initialize(device) {
            if let RenderError::UnsupportedHardware { device: device_name } = &e {
                log::warn!("progressive renderer disabled: {} has no ray tracing support", device_name);
                self.status = RendererStatus::Disabled;
                self.unsupported_device = Some(device_name.clone());
            }
            return Err(e);
        }

        self.accel_manager.rescan_scene(device, scene)?;
        self.frame_state.accel_ready = self.accel_manager.is_ready();
        self.scene_dirty = false;
        self.status = RendererStatus::Active;

        log::info!("progressive renderer initialized on {}", device.device_name());
        Ok(())
    }
}
// render
impl ProgressiveRenderer {
    /// 通过直接录制的入口渲染一帧
    ///
    /// `NotReady` 会被吸收为 [`FrameOutput::NotReady`]，`Disabled` 时什么也不做
    pub fn render_frame(
        &mut self,
        device: &mut dyn GfxDevice,
        scene: &dyn SceneEnumerator,
        camera: &Camera,
        width: u32,
        height: u32,
    ) -> Result<FrameOutput, RenderError> {
        CameraRenderPath::render(self, device, scene, camera, width, height)
    }

    /// 通过 render graph 的入口渲染一帧，语义和 [`Self::render_frame`] 相同
    pub fn render_frame_with_graph(
        &mut self,
        device: &mut dyn GfxDevice,
        scene: &dyn SceneEnumerator,
        camera: &Camera,
        width: u32,
        height: u32,
    ) -> Result<FrameOutput, RenderError> {
        RgRenderPath::render(self, device, scene, camera, width, height)
    }

    /// 非 Active 时直接给出这一帧的结果
    pub(crate) fn frame_gate(&self) -> Option<FrameOutput> {
        match self.status {
            RendererStatus::Active => None,
            RendererStatus::Disabled => Some(FrameOutput::Disabled),
            RendererStatus::Uninitialized => Some(FrameOutput::NotReady),
        }
    }

    pub(crate) fn absorb_not_ready(
        &self,
        result: Result<AccumulatedResult, RenderError>,
    ) -> Result<FrameOutput, RenderError> {
        match result {
            Ok(accumulated) => {
                log::debug!(
                    "{} presented {:?}, {} samples",
                    self.frame_state.frame_name(),
                    accumulated.slot,
                    accumulated.sample_count
                );
                Ok(FrameOutput::Presented(accumulated))
            }
            Err(RenderError::NotReady(reason)) => {
                log::debug!("{} skipped: {}", self.frame_state.frame_name(), reason);
                Ok(FrameOutput::NotReady)
            }
            Err(e) => Err(e),
        }
    }

    /// 两个入口共享的准备阶段：相机采样基、运动检测、加速结构、累积缓冲尺寸
    pub(crate) fn prepare_frame(
        &mut self,
        device: &mut dyn GfxDevice,
        scene: &dyn SceneEnumerator,
        camera_transform: glam::Mat4,
        width: u32,
        height: u32,
    ) -> Result<PreparedFrame, RenderError> {
        self.frame_state.next_frame();
        if width == 0 || height == 0 {
            return Err(RenderError::NotReady("output extent is zero"));
        }
        let extent = vk::Extent2D { width, height };

        let basis = CameraSampleBasis::compute(&self.camera_config, width as f32 / height as f32, camera_transform);
        if let Some(previous) = self.frame_state.last_camera_transform {
            if CameraSampleBasis::has_moved(&camera_transform, &previous) {
                log::debug!("{} camera moved, accumulation reset", self.frame_state.frame_name());
                self.frame_state.reset_samples();
            }
        }
        self.frame_state.last_camera_transform = Some(camera_transform);

        let accel_result = if self.scene_dirty {
            self.accel_manager.clear_instances();
            let result = self.accel_manager.rescan_scene(device, scene);
            if result.is_ok() {
                self.scene_dirty = false;
                self.frame_state.reset_samples();
            }
            result
        } else {
            self.accel_manager.rebuild(device)
        };
        self.frame_state.accel_ready = accel_result.is_ok() && self.accel_manager.is_ready();
        accel_result?;

        self.accumulation.resize(device, extent, &mut self.frame_state)?;
        if !self.frame_state.resources_ready() {
            return Err(RenderError::NotReady("frame resources are not ready"));
        }

        Ok(PreparedFrame { basis, extent })
    }
}
// update
impl ProgressiveRenderer {
    /// 场景中的物体增加或者删除之后调用，下一帧会重新扫描场景并重新开始累积
    pub fn invalidate_scene(&mut self) {
        self.scene_dirty = true;
    }

    pub fn set_camera_config(&mut self, camera_config: CameraConfig) {
        if self.camera_config != camera_config {
            self.camera_config = camera_config;
            self.frame_state.reset_samples();
        }
    }
}
// getters
impl ProgressiveRenderer {
    #[inline]
    pub fn status(&self) -> RendererStatus {
        self.status
    }

    #[inline]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    #[inline]
    pub fn camera_config(&self) -> &CameraConfig {
        &self.camera_config
    }

    #[inline]
    pub fn frame_state(&self) -> &FrameState {
        &self.frame_state
    }

    #[inline]
    pub fn accel_manager(&self) -> &AccelerationStructureManager {
        &self.accel_manager
    }

    #[inline]
    pub fn dispatcher(&self) -> &RayDispatchOrchestrator {
        &self.dispatcher
    }

    #[inline]
    pub fn accumulation(&self) -> &AccumulationEngine {
        &self.accumulation
    }

    /// 最近一次呈现的图像
    #[inline]
    pub fn latest_result(&self) -> Option<AccumulatedResult> {
        self.accumulation.latest()
    }
}
// destroy
impl ProgressiveRenderer {
    pub fn destroy(&mut self, device: &mut dyn GfxDevice) {
        self.accumulation.destroy(device);
        self.dispatcher.destroy(device);
        self.accel_manager.destroy(device);
        self.frame_state = FrameState::new();
        if self.status == RendererStatus::Active {
            self.status = RendererStatus::Uninitialized;
        }
    }
}
impl Drop for ProgressiveRenderer {
    fn drop(&mut self) {
        log::info!("ProgressiveRenderer drop");
    }
}
