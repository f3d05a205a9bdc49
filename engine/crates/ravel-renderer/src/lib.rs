//! 渐进式光追渲染核心
//!
//! 每帧对每个像素投射一条带抖动的主光线，再把结果与之前的帧做滑动平均；
//! 相机静止时图像逐渐收敛，相机移动时重新开始累积。
//!
//! 四个组件按依赖顺序：
//! - [`accel_manager::AccelerationStructureManager`]：场景加速结构的生命周期
//! - [`camera_basis::CameraSampleBasis`]：远平面四角方向与相机移动检测
//! - [`ray_dispatch::RayDispatchOrchestrator`]：每像素一个 work item 的光线派发
//! - [`accumulation::AccumulationEngine`]：双缓冲累积
//!
//! [`renderer::ProgressiveRenderer`] 把它们串起来，[`adapters`] 提供直接录制与 render graph 两个入口。

pub mod accel_manager;
pub mod accumulation;
pub mod adapters;
pub mod camera_basis;
pub mod config;
pub mod error;
pub mod frame_state;
pub mod ray_dispatch;
pub mod renderer;
pub mod settings;
