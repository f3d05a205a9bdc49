//! GPU 边界抽象层
//!
//! 渲染核心只通过这里的 trait 和描述结构与 GPU 打交道：
//! 资源的创建与销毁由 [`foundation::device::GfxDevice`] 负责，
//! 命令的录制由 [`commands::encoder::GfxCommandEncoder`] 负责。
//! 具体的后端（软件光追、Vulkan 等）实现这些 trait。

pub mod basic;
pub mod commands;
pub mod error;
pub mod foundation;
pub mod raytracing;
pub mod resources;
