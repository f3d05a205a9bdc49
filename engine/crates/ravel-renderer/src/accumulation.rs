//! 逐帧累积
//!
//! 两张固定的累积缓冲 A/B 轮流作为输入与输出：本帧把 raw trace 和「上一帧结果」混合，
//! 写入「当前结果」，然后交换两者的角色。
//!
//! 混合权重为 `1 / (n + 1)` 与 `n / (n + 1)`，n 为已经累积的样本数。
//! n 为 0 时输出就是新样本本身，所以缓冲重建或者相机移动之后都不需要清空缓冲。
//!
//! 两个录制入口会交替使用同一组缓冲，所以每个 slot 最后一次被使用时的状态记录在这里，
//! 作为下一帧 barrier 的起点。

use ash::vk;
use ravel_gfx::{
    basic::color::LabelColor,
    commands::encoder::GfxCommandEncoder,
    error::GfxError,
    foundation::device::GfxDevice,
    raytracing::bindings::{AccumBindings, AccumPushConstants},
    resources::{handles::GfxImageHandle, image::GfxImageDesc},
};
use ravel_render_graph::render_graph::RgImageState;

use crate::{error::RenderError, frame_state::FrameState, ray_dispatch::RawTraceTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumState {
    Uninitialized,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumSlot {
    A,
    B,
}

impl AccumSlot {
    #[inline]
    pub fn other(self) -> Self {
        match self {
            AccumSlot::A => AccumSlot::B,
            AccumSlot::B => AccumSlot::A,
        }
    }

    #[inline]
    fn index(self) -> usize {
        match self {
            AccumSlot::A => 0,
            AccumSlot::B => 1,
        }
    }
}

/// 一次累积的结果，也就是需要被呈现的图像
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulatedResult {
    pub image: GfxImageHandle,
    pub slot: AccumSlot,
    pub extent: vk::Extent2D,
    /// 结果中包含的样本数
    pub sample_count: u32,
}

/// 下一次累积时两张缓冲的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumRoles {
    /// 本次混合的输入
    pub previous: GfxImageHandle,
    /// 本次混合的输出
    pub current: GfxImageHandle,
    pub current_slot: AccumSlot,

    /// 两张缓冲最后一次被使用时的状态
    pub previous_state: RgImageState,
    pub current_state: RgImageState,
}

pub struct AccumulationEngine {
    state: AccumState,
    /// 按 [A, B] 排列
    slots: Option<[GfxImageHandle; 2]>,
    /// 按 [A, B] 排列，新建的缓冲为 UNDEFINED
    slot_states: [RgImageState; 2],
    extent: vk::Extent2D,

    /// 下一次累积写入 A
    current_is_a: bool,
    latest: Option<AccumulatedResult>,
}

impl Default for AccumulationEngine {
    fn default() -> Self {
        Self::new()
    }
}
// new & init
impl AccumulationEngine {
    pub fn new() -> Self {
        Self {
            state: AccumState::Uninitialized,
            slots: None,
            slot_states: [RgImageState::UNDEFINED; 2],
            extent: vk::Extent2D::default(),
            current_is_a: true,
            latest: None,
        }
    }

    /// 尺寸变化时重建两张缓冲，并将样本数清零；尺寸相同时什么也不做
    ///
    /// 返回是否发生了重建。分配失败时会释放已经分配的缓冲，回到 `Uninitialized`
    pub fn resize(
        &mut self,
        device: &mut dyn GfxDevice,
        extent: vk::Extent2D,
        frame_state: &mut FrameState,
    ) -> Result<bool, RenderError> {
        if self.state == AccumState::Ready && self.extent == extent {
            return Ok(false);
        }
        if extent.width == 0 || extent.height == 0 {
            return Err(RenderError::NotReady("output extent is zero"));
        }

        self.release(device);
        frame_state.buffers_ready = false;

        let desc = GfxImageDesc::new_hdr_storage_2d(extent);
        let slot_a = device.create_image(&desc, "accum-a")?;
        let slot_b = match device.create_image(&desc, "accum-b") {
            Ok(handle) => handle,
            Err(e) => {
                device.destroy_image(slot_a);
                log::error!("failed to create accumulation buffers {}x{}: {}", extent.width, extent.height, e);
                return Err(e.into());
            }
        };

        self.slots = Some([slot_a, slot_b]);
        self.slot_states = [RgImageState::UNDEFINED; 2];
        self.extent = extent;
        self.state = AccumState::Ready;
        self.current_is_a = true;

        frame_state.reset_samples();
        frame_state.buffers_ready = true;
        log::info!("accumulation buffers created: {}x{}", extent.width, extent.height);
        Ok(true)
    }

    fn release(&mut self, device: &mut dyn GfxDevice) {
        if let Some(slots) = self.slots.take() {
            for handle in slots {
                device.destroy_image(handle);
            }
        }
        self.slot_states = [RgImageState::UNDEFINED; 2];
        self.state = AccumState::Uninitialized;
        self.latest = None;
    }
}
// accumulate
impl AccumulationEngine {
    /// 检查 raw trace 是否可以被累积
    pub fn validate(&self, raw_extent: vk::Extent2D) -> Result<(), RenderError> {
        if self.state != AccumState::Ready {
            return Err(RenderError::NotReady("accumulation buffers are not created"));
        }
        if raw_extent != self.extent {
            return Err(RenderError::NotReady("raw trace extent differs from accumulation buffers"));
        }
        Ok(())
    }

    /// 将 raw trace 混合进当前结果，交换角色，返回刚写入的缓冲
    ///
    /// `frame_state.sample_index` 从 n 变为 n + 1
    pub fn accumulate(
        &mut self,
        encoder: &mut dyn GfxCommandEncoder,
        raw: &RawTraceTarget,
        frame_state: &mut FrameState,
    ) -> Result<AccumulatedResult, RenderError> {
        self.validate(raw.extent)?;
        Ok(self.record_blend(encoder, raw.image, frame_state)?)
    }

    /// 只录制混合命令，调用前需要先通过 [`Self::validate`]
    pub(crate) fn record_blend(
        &mut self,
        encoder: &mut dyn GfxCommandEncoder,
        raw_image: GfxImageHandle,
        frame_state: &mut FrameState,
    ) -> Result<AccumulatedResult, GfxError> {
        let roles = self.next_roles().ok_or(GfxError::InvalidHandle { kind: "accumulation" })?;
        let accum_frames = frame_state.sample_index;

        let bindings = AccumBindings {
            current_frame: raw_image,
            accumulation: roles.previous,
            output: roles.current,
        };
        let push_constants = AccumPushConstants {
            image_size: [self.extent.width, self.extent.height],
            accum_frames,
            _padding_0: 0,
        };

        encoder.begin_label("accumulate", LabelColor::COLOR_CMD);
        let result = encoder.blit_accumulate(&bindings, &push_constants);
        encoder.end_label();
        result?;

        self.slot_states[roles.current_slot.index()] = RgImageState::STORAGE_WRITE_COMPUTE;
        self.slot_states[roles.current_slot.other().index()] = RgImageState::STORAGE_READ_COMPUTE;
        self.current_is_a = !self.current_is_a;
        frame_state.sample_index = accum_frames.saturating_add(1);

        let accumulated = AccumulatedResult {
            image: roles.current,
            slot: roles.current_slot,
            extent: self.extent,
            sample_count: frame_state.sample_index,
        };
        self.latest = Some(accumulated);
        Ok(accumulated)
    }

    /// 混合之外的使用（例如 render graph 导出）之后，记录 slot 的最终状态
    pub(crate) fn set_slot_state(&mut self, slot: AccumSlot, state: RgImageState) {
        self.slot_states[slot.index()] = state;
    }
}
// getters
impl AccumulationEngine {
    #[inline]
    pub fn state(&self) -> AccumState {
        self.state
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// 下一次累积要写入的缓冲
    #[inline]
    pub fn current_slot(&self) -> AccumSlot {
        if self.current_is_a { AccumSlot::A } else { AccumSlot::B }
    }

    pub fn slot_image(&self, slot: AccumSlot) -> Option<GfxImageHandle> {
        let [a, b] = self.slots?;
        Some(match slot {
            AccumSlot::A => a,
            AccumSlot::B => b,
        })
    }

    #[inline]
    pub fn slot_state(&self, slot: AccumSlot) -> RgImageState {
        self.slot_states[slot.index()]
    }

    pub fn next_roles(&self) -> Option<AccumRoles> {
        let current_slot = self.current_slot();
        Some(AccumRoles {
            previous: self.slot_image(current_slot.other())?,
            current: self.slot_image(current_slot)?,
            current_slot,
            previous_state: self.slot_state(current_slot.other()),
            current_state: self.slot_state(current_slot),
        })
    }

    /// 最近一次写入的结果，resize 之后在下一次累积前为 None
    #[inline]
    pub fn latest(&self) -> Option<AccumulatedResult> {
        self.latest
    }
}
// destroy
impl AccumulationEngine {
    pub fn destroy(&mut self, device: &mut dyn GfxDevice) {
        self.release(device);
    }
}
impl Drop for AccumulationEngine {
    fn drop(&mut self) {
        if self.slots.is_some() {
            log::warn!("AccumulationEngine dropped without destroy");
        }
    }
}
