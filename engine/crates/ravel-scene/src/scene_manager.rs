use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

use crate::{
    ray_traceable::{RayTraceable, SceneEnumerator},
    scene_object::SceneObject,
};

new_key_type! {
    pub struct SceneObjectHandle;
}

/// 在 CPU 侧管理场景数据
#[derive(Default)]
pub struct SceneManager {
    all_objects: SlotMap<SceneObjectHandle, Rc<SceneObject>>,
}
// new & init
impl SceneManager {
    pub fn new() -> Self {
        Self::default()
    }
}
// getter
impl SceneManager {
    #[inline]
    pub fn object_map(&self) -> &SlotMap<SceneObjectHandle, Rc<SceneObject>> {
        &self.all_objects
    }

    #[inline]
    pub fn get(&self, handle: SceneObjectHandle) -> Option<&Rc<SceneObject>> {
        self.all_objects.get(handle)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.all_objects.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.all_objects.len()
    }
}
// 增删
impl SceneManager {
    pub fn register_object(&mut self, object: SceneObject) -> SceneObjectHandle {
        log::debug!("register scene object: {}", object.name());
        self.all_objects.insert(Rc::new(object))
    }

    pub fn remove_object(&mut self, handle: SceneObjectHandle) -> Option<Rc<SceneObject>> {
        let removed = self.all_objects.remove(handle);
        if let Some(object) = &removed {
            log::debug!("remove scene object: {}", object.name());
        }
        removed
    }
}
impl SceneEnumerator for SceneManager {
    fn renderables(&self) -> Vec<Rc<dyn RayTraceable>> {
        self.all_objects.values().map(|object| object.clone() as Rc<dyn RayTraceable>).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ravel_gfx::resources::handles::GfxGeometryHandle;

    #[test]
    fn test_register_and_enumerate() {
        let mut scene = SceneManager::new();
        assert!(scene.is_empty());

        let a = scene.register_object(SceneObject::new("a", GfxGeometryHandle::default(), glam::Mat4::IDENTITY));
        let _b = scene.register_object(SceneObject::new("b", GfxGeometryHandle::default(), glam::Mat4::IDENTITY));
        assert_eq!(scene.renderables().len(), 2);

        let removed = scene.remove_object(a).unwrap();
        assert_eq!(removed.name(), "a");
        assert_eq!(scene.len(), 1);
        assert!(scene.get(a).is_none());
    }

    #[test]
    fn test_enumerated_objects_share_state() {
        let mut scene = SceneManager::new();
        let handle = scene.register_object(SceneObject::new("a", GfxGeometryHandle::default(), glam::Mat4::IDENTITY));
        let renderables = scene.renderables();

        let moved = glam::Mat4::from_translation(glam::Vec3::X);
        scene.get(handle).unwrap().set_transform(moved);
        assert_eq!(renderables[0].world_transform(), moved);
    }
}
