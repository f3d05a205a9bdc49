//! 同一个渲染核心的两个入口
//!
//! - [`camera_path`]：单相机直接录制，手动插入 barrier
//! - [`rg_passes`]：把光追和累积声明为 render graph 中的两个 pass，由 graph 推导顺序和 barrier

pub mod camera_path;
pub mod rg_passes;
