use std::rc::Rc;

use itertools::Itertools;
use ravel_gfx::{
    foundation::device::GfxDevice,
    raytracing::acceleration::{GfxAccelInstance, GfxAccelModeMask, GfxAccelSettings, GfxInstanceFlags},
    resources::handles::{GfxAccelHandle, GfxGeometryHandle},
};
use ravel_scene::ray_traceable::{RayTraceable, SceneEnumerator};

use crate::{error::RenderError, settings::InstancePolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelStatus {
    /// 还没有调用 initialize
    Uninitialized,
    /// 设备不支持光线查询，之后的所有操作都是空操作
    Unavailable,
    /// 已经创建，但是从未扫描过场景
    Empty,
    /// clear 之后，需要重新扫描
    NeedsRescan,
    /// 已扫描并至少构建过一次（instance 可能为 0 个）
    Ready,
}

/// 加速结构中的一个 instance
///
/// 不会被原地修改，只会被 clear 之后重新添加；transform 在每次 rebuild 时重新读取
pub struct SceneInstance {
    renderable: Rc<dyn RayTraceable>,
    flags: GfxInstanceFlags,
}

impl SceneInstance {
    #[inline]
    pub fn geometry(&self) -> GfxGeometryHandle {
        self.renderable.geometry_handle()
    }

    #[inline]
    pub fn flags(&self) -> GfxInstanceFlags {
        self.flags
    }

    #[inline]
    pub fn transform(&self) -> glam::Mat4 {
        self.renderable.world_transform()
    }

    fn to_gfx_instance(&self, custom_index: u32) -> GfxAccelInstance {
        GfxAccelInstance {
            geometry: self.geometry(),
            transform: self.transform(),
            flags: self.flags,
            mode: GfxAccelModeMask::DYNAMIC_TRANSFORM,
            custom_index,
        }
    }
}

/// 管理场景的光追加速结构
///
/// 场景被认为是动态的：每帧 dispatch 之前都会 rebuild 一次
pub struct AccelerationStructureManager {
    policy: InstancePolicy,
    layer_mask: u32,

    status: AccelStatus,
    accel: Option<GfxAccelHandle>,
    instances: Vec<SceneInstance>,
}
// new & init
impl AccelerationStructureManager {
    pub fn new(policy: InstancePolicy, layer_mask: u32) -> Self {
        log::info!("Creating AccelerationStructureManager");
        Self {
            policy,
            layer_mask,
            status: AccelStatus::Uninitialized,
            accel: None,
            instances: Vec::new(),
        }
    }

    /// 创建一个空的加速结构：自动管理 transform，接收所有类型的 renderable
    ///
    /// 设备不支持光线查询时返回 `UnsupportedHardware`，并且这个结果会被缓存
    pub fn initialize(&mut self, device: &mut dyn GfxDevice) -> Result<(), RenderError> {
        match self.status {
            AccelStatus::Uninitialized => (),
            AccelStatus::Unavailable => {
                return Err(RenderError::UnsupportedHardware {
                    device: device.device_name().to_string(),
                });
            }
            _ => return Ok(()),
        }

        if !device.supports_ray_tracing() {
            log::warn!("device {} does not support ray tracing, accel disabled", device.device_name());
            self.status = AccelStatus::Unavailable;
            return Err(RenderError::UnsupportedHardware {
                device: device.device_name().to_string(),
            });
        }

        let accel = device.create_accel(&GfxAccelSettings::default(), "scene-accel")?;
        self.accel = Some(accel);
        self.status = AccelStatus::Empty;
        Ok(())
    }
}
// update
impl AccelerationStructureManager {
    /// 重新遍历场景并填充加速结构
    ///
    /// 会先丢弃所有旧的 instance，因此调用多次和调用一次的结果相同
    pub fn rescan_scene(&mut self, device: &mut dyn GfxDevice, scene: &dyn SceneEnumerator) -> Result<(), RenderError> {
        let accel = match self.status {
            AccelStatus::Unavailable => return Ok(()),
            AccelStatus::Uninitialized => return Err(RenderError::NotReady("accel is not initialized")),
            _ => self.accel.ok_or(RenderError::NotReady("accel is not initialized"))?,
        };

        let policy = self.policy;
        let layer_mask = self.layer_mask;
        let renderables = scene.renderables();
        let total = renderables.len();

        self.instances = renderables
            .into_iter()
            .filter(|renderable| Self::layer_visible(layer_mask, renderable.layer()))
            .filter_map(|renderable| {
                let Some(flags) = policy.instance_flags(renderable.shading_flags()) else {
                    log::debug!("skip disabled renderable, geometry {:?}", renderable.geometry_handle());
                    return None;
                };
                log::debug!("add instance: geometry {:?}, flags {:?}", renderable.geometry_handle(), flags);
                Some(SceneInstance { renderable, flags })
            })
            .collect_vec();

        log::info!(
            "scene scanned: {} instances from {} renderables, policy {:?}, layer mask {:#b}",
            self.instances.len(),
            total,
            policy,
            layer_mask
        );

        self.build(device, accel)?;
        self.status = AccelStatus::Ready;
        Ok(())
    }

    /// 移除所有 instance，之后必须重新扫描场景才能继续使用
    pub fn clear_instances(&mut self) {
        match self.status {
            AccelStatus::Uninitialized | AccelStatus::Unavailable => (),
            _ => {
                self.instances.clear();
                self.status = AccelStatus::NeedsRescan;
            }
        }
    }

    /// 重新读取所有 instance 的 transform 并构建加速结构
    ///
    /// 每帧 dispatch 之前调用一次
    pub fn rebuild(&mut self, device: &mut dyn GfxDevice) -> Result<(), RenderError> {
        match self.status {
            AccelStatus::Unavailable => Ok(()),
            AccelStatus::Uninitialized => Err(RenderError::NotReady("accel is not initialized")),
            AccelStatus::Empty | AccelStatus::NeedsRescan => Err(RenderError::NotReady("scene has not been scanned")),
            AccelStatus::Ready => {
                let accel = self.accel.ok_or(RenderError::NotReady("accel is not initialized"))?;
                self.build(device, accel)
            }
        }
    }

    fn build(&self, device: &mut dyn GfxDevice, accel: GfxAccelHandle) -> Result<(), RenderError> {
        let instances = self
            .instances
            .iter()
            .enumerate()
            .map(|(idx, instance)| instance.to_gfx_instance(idx as u32))
            .collect_vec();
        device.build_accel(accel, &instances)?;
        Ok(())
    }

    #[inline]
    fn layer_visible(layer_mask: u32, layer: u32) -> bool {
        1u32.checked_shl(layer).is_some_and(|bit| layer_mask & bit != 0)
    }
}
// getters
impl AccelerationStructureManager {
    #[inline]
    pub fn status(&self) -> AccelStatus {
        self.status
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.status == AccelStatus::Ready
    }

    /// 只有在 Ready 时才能交给 dispatch 使用
    #[inline]
    pub fn ready_handle(&self) -> Option<GfxAccelHandle> {
        if self.is_ready() { self.accel } else { None }
    }

    #[inline]
    pub fn instances(&self) -> &[SceneInstance] {
        &self.instances
    }

    #[inline]
    pub fn policy(&self) -> InstancePolicy {
        self.policy
    }
}
// destroy
impl AccelerationStructureManager {
    pub fn destroy(&mut self, device: &mut dyn GfxDevice) {
        if let Some(accel) = self.accel.take() {
            device.destroy_accel(accel);
        }
        self.instances.clear();
        if self.status != AccelStatus::Unavailable {
            self.status = AccelStatus::Uninitialized;
        }
    }
}
impl Drop for AccelerationStructureManager {
    fn drop(&mut self) {
        if self.accel.is_some() {
            log::warn!("AccelerationStructureManager dropped without destroy");
        }
        log::info!("AccelerationStructureManager drop");
    }
}
