use std::cell::Cell;

use ravel_gfx::{raytracing::acceleration::GfxInstanceFlags, resources::handles::GfxGeometryHandle};

use crate::ray_traceable::RayTraceable;

/// 场景中的一个物体
///
/// 会被 renderer 通过 `Rc` 共享持有，所以可变状态放在 `Cell` 里
pub struct SceneObject {
    name: String,
    geometry: GfxGeometryHandle,
    transform: Cell<glam::Mat4>,
    flags: Cell<GfxInstanceFlags>,
    layer: u32,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, geometry: GfxGeometryHandle, transform: glam::Mat4) -> Self {
        Self {
            name: name.into(),
            geometry,
            transform: Cell::new(transform),
            flags: Cell::new(GfxInstanceFlags::ENABLED | GfxInstanceFlags::CLOSEST_HIT_ONLY),
            layer: 0,
        }
    }

    /// builder
    #[inline]
    pub fn with_flags(self, flags: GfxInstanceFlags) -> Self {
        self.flags.set(flags);
        self
    }

    /// builder
    #[inline]
    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn set_transform(&self, transform: glam::Mat4) {
        self.transform.set(transform);
    }

    pub fn set_enabled(&self, enabled: bool) {
        let mut flags = self.flags.get();
        flags.set(GfxInstanceFlags::ENABLED, enabled);
        self.flags.set(flags);
    }
}

impl RayTraceable for SceneObject {
    fn geometry_handle(&self) -> GfxGeometryHandle {
        self.geometry
    }

    fn world_transform(&self) -> glam::Mat4 {
        self.transform.get()
    }

    fn shading_flags(&self) -> GfxInstanceFlags {
        self.flags.get()
    }

    fn layer(&self) -> u32 {
        self.layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_toggle_keeps_other_flags() {
        let object = SceneObject::new("obj", GfxGeometryHandle::default(), glam::Mat4::IDENTITY)
            .with_flags(GfxInstanceFlags::all());
        object.set_enabled(false);
        assert_eq!(object.shading_flags(), GfxInstanceFlags::CLOSEST_HIT_ONLY | GfxInstanceFlags::UNIQUE_ANY_HIT);
        object.set_enabled(true);
        assert_eq!(object.shading_flags(), GfxInstanceFlags::all());
    }

    #[test]
    fn test_transform_is_read_back() {
        let object = SceneObject::new("obj", GfxGeometryHandle::default(), glam::Mat4::IDENTITY).with_layer(3);
        let moved = glam::Mat4::from_translation(glam::vec3(1.0, 2.0, 3.0));
        object.set_transform(moved);
        assert_eq!(object.world_transform(), moved);
        assert_eq!(object.layer(), 3);
    }
}
