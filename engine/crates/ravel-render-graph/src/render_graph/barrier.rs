//! Barrier 自动计算
//!
//! 根据资源状态转换自动生成 image barrier。

use ash::vk;
use ravel_gfx::{commands::barrier::GfxImageBarrier, resources::handles::GfxImageHandle};

use crate::render_graph::{RgImageHandle, RgImageState};

/// 图像 Barrier 描述
#[derive(Clone, Debug)]
pub struct RgImageBarrierDesc {
    /// 资源句柄（RenderGraph 内部）
    pub handle: RgImageHandle,
    pub src_state: RgImageState,
    pub dst_state: RgImageState,
    /// 图像 aspect（COLOR / DEPTH / STENCIL）
    pub aspect: vk::ImageAspectFlags,
}

impl RgImageBarrierDesc {
    pub fn new(handle: RgImageHandle, src_state: RgImageState, dst_state: RgImageState) -> Self {
        Self {
            handle,
            src_state,
            dst_state,
            aspect: vk::ImageAspectFlags::COLOR,
        }
    }

    pub fn with_aspect(mut self, aspect: vk::ImageAspectFlags) -> Self {
        self.aspect = aspect;
        self
    }

    /// 检查是否需要 barrier
    pub fn needs_barrier(&self) -> bool {
        // Layout 不同一定需要 barrier
        if self.src_state.layout != self.dst_state.layout {
            return true;
        }

        // 有写操作需要 barrier（确保可见性）
        if self.src_state.is_write() || self.dst_state.is_write() {
            return true;
        }

        // 只读到只读可以跳过 barrier
        false
    }

    /// 转换为 GfxImageBarrier
    pub fn to_gfx_barrier(&self, image: GfxImageHandle) -> GfxImageBarrier {
        GfxImageBarrier::new()
            .image(image)
            .layout_transfer(self.src_state.layout, self.dst_state.layout)
            .src_mask(self.src_state.stage, self.src_state.src_access())
            .dst_mask(self.dst_state.stage, self.dst_state.access)
            .image_aspect_flag(self.aspect)
    }
}

/// Pass 执行前需要的 Barrier 集合
#[derive(Clone, Debug, Default)]
pub struct PassBarriers {
    pub image_barriers: Vec<RgImageBarrierDesc>,
}

impl PassBarriers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 不需要的 barrier 会被直接丢弃
    pub fn add_image_barrier(&mut self, barrier: RgImageBarrierDesc) {
        if barrier.needs_barrier() {
            self.image_barriers.push(barrier);
        }
    }

    pub fn has_barriers(&self) -> bool {
        !self.image_barriers.is_empty()
    }

    pub fn image_barrier_count(&self) -> usize {
        self.image_barriers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_to_read_no_barrier() {
        let barrier = RgImageBarrierDesc::new(
            RgImageHandle::default(),
            RgImageState::STORAGE_READ_COMPUTE,
            RgImageState::STORAGE_READ_COMPUTE,
        );
        assert!(!barrier.needs_barrier());
    }

    #[test]
    fn test_write_to_read_needs_barrier() {
        let barrier = RgImageBarrierDesc::new(
            RgImageHandle::default(),
            RgImageState::STORAGE_WRITE_RAY_TRACING,
            RgImageState::STORAGE_READ_COMPUTE,
        );
        assert!(barrier.needs_barrier());

        let gfx_barrier = barrier.to_gfx_barrier(GfxImageHandle::default());
        assert_eq!(gfx_barrier.src_stage, vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR);
        assert_eq!(gfx_barrier.src_access, vk::AccessFlags2::SHADER_STORAGE_WRITE);
        assert_eq!(gfx_barrier.dst_access, vk::AccessFlags2::SHADER_STORAGE_READ);
        assert!(gfx_barrier.has_src_write());
    }

    #[test]
    fn test_layout_change_needs_barrier() {
        let barrier =
            RgImageBarrierDesc::new(RgImageHandle::default(), RgImageState::UNDEFINED, RgImageState::STORAGE_READ_COMPUTE);
        assert!(barrier.needs_barrier());

        let mut barriers = PassBarriers::new();
        barriers.add_image_barrier(barrier);
        barriers.add_image_barrier(RgImageBarrierDesc::new(
            RgImageHandle::default(),
            RgImageState::SHADER_READ_FRAGMENT,
            RgImageState::SHADER_READ_FRAGMENT,
        ));
        assert_eq!(barriers.image_barrier_count(), 1);
    }
}
