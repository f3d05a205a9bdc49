use std::rc::Rc;

use ravel_gfx::{raytracing::acceleration::GfxInstanceFlags, resources::handles::GfxGeometryHandle};

/// 可以被放入加速结构的物体
///
/// 每次 rebuild 都会重新读取 transform，因此实现者可以在帧与帧之间自由修改
pub trait RayTraceable {
    fn geometry_handle(&self) -> GfxGeometryHandle;

    /// object -> world
    fn world_transform(&self) -> glam::Mat4;

    /// 物体自身希望使用的光线查询方式
    fn shading_flags(&self) -> GfxInstanceFlags;

    /// 所在的 layer，取值 [0, 32)
    fn layer(&self) -> u32 {
        0
    }
}

/// 场景遍历接口，由宿主提供
pub trait SceneEnumerator {
    /// 当前场景中所有的 renderable，顺序需要稳定
    fn renderables(&self) -> Vec<Rc<dyn RayTraceable>>;
}
