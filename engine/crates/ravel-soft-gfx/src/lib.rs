//! 软件光追后端
//!
//! 用 CPU 实现 [`ravel_gfx`] 中定义的 device 与 command encoder：
//! - image 以 `Vec<Vec4>` 的形式存放在 slotmap 中
//! - 加速结构为 instance 级别的 AABB 暴力遍历
//! - 光追与累积 kernel 通过 rayon 按行并行
//!
//! 命令在录制时立即执行，因此不需要 submit。

pub mod soft_accel;
pub mod soft_geometry;
pub mod soft_gfx;
pub mod soft_image;
pub mod soft_kernel;
