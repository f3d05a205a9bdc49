//! RenderGraph 资源句柄定义
//!
//! 这些句柄是 graph 内部的虚拟引用，与 device 的物理句柄分离。

use slotmap::new_key_type;

new_key_type! {
    /// Graph 内部的 Image 句柄
    pub struct RgImageHandle;
}
