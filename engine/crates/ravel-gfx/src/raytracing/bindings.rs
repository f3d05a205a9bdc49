//! 光追与累积两个 kernel 的绑定布局
//!
//! push constant 结构体需要和 shader 端保持一致，全部按 16 字节对齐，不允许隐式 padding。

use crate::resources::handles::{GfxAccelHandle, GfxImageHandle};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RtPushConstants {
    /// 远平面四个角点的世界空间方向（单位向量，w 为 0）
    pub bottom_left: glam::Vec4,
    pub top_left: glam::Vec4,
    pub bottom_right: glam::Vec4,
    pub top_right: glam::Vec4,
    /// xyz 为相机位置，w 为 1
    pub camera_pos: glam::Vec4,
    /// 线性空间颜色
    pub sky_color: glam::Vec4,
    pub ground_color: glam::Vec4,
    /// 作为随机数种子
    pub frame_index: u32,
    pub _padding_0: [u32; 3],
}

/// 光追 kernel 的 descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtBindings {
    pub accel: GfxAccelHandle,
    pub output: GfxImageHandle,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct AccumPushConstants {
    pub image_size: [u32; 2],
    /// 已经累积的帧数，即新样本之前的样本数
    pub accum_frames: u32,
    pub _padding_0: u32,
}

/// 累积 kernel 的 descriptor
///
/// 三张 image 必须互不相同
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumBindings {
    /// 本帧的光追结果
    pub current_frame: GfxImageHandle,
    /// 上一帧的累积结果
    pub accumulation: GfxImageHandle,
    pub output: GfxImageHandle,
}
