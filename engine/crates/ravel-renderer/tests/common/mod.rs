#![allow(dead_code)]

use std::rc::Rc;

use ravel_renderer::{
    renderer::ProgressiveRenderer,
    settings::{CameraConfig, RendererSettings},
};
use ravel_scene::{camera::Camera, scene_manager::SceneManager, scene_object::SceneObject};
use ravel_soft_gfx::{soft_geometry::SoftGeometry, soft_gfx::SoftGfx};

pub struct TestWorld {
    pub gfx: SoftGfx,
    pub scene: SceneManager,
    pub sphere: Rc<SceneObject>,
    pub camera: Camera,
}

/// 地面 + 一个球，相机略微俯视
pub fn build_world(gfx: SoftGfx) -> TestWorld {
    let mut gfx = gfx;
    let floor = gfx.register_geometry(SoftGeometry::quad_xz(5.0, glam::vec3(0.8, 0.8, 0.8)));
    let ball = gfx.register_geometry(SoftGeometry::sphere(glam::Vec3::ZERO, 1.0, glam::vec3(0.9, 0.2, 0.2)));

    let mut scene = SceneManager::new();
    scene.register_object(SceneObject::new("floor", floor, glam::Mat4::IDENTITY));
    let sphere_handle = scene.register_object(SceneObject::new(
        "sphere",
        ball,
        glam::Mat4::from_translation(glam::vec3(0.0, 1.0, -3.0)),
    ));
    let sphere = scene.get(sphere_handle).cloned().unwrap();

    TestWorld {
        gfx,
        scene,
        sphere,
        camera: Camera::new(glam::vec3(0.0, 1.5, 4.0), 0.0, -10.0),
    }
}

pub fn initialized_renderer(world: &mut TestWorld) -> ProgressiveRenderer {
    let mut renderer = ProgressiveRenderer::new(RendererSettings::default());
    renderer
        .initialize(&mut world.gfx, &world.scene, &CameraConfig::default())
        .unwrap();
    renderer
}

pub fn raw_pixels(world: &TestWorld, renderer: &ProgressiveRenderer) -> Vec<glam::Vec4> {
    let raw = renderer.dispatcher().raw_target().unwrap();
    world.gfx.image_pixels(raw.image).unwrap().to_vec()
}

pub fn image_pixels(world: &TestWorld, image: ravel_gfx::resources::handles::GfxImageHandle) -> Vec<glam::Vec4> {
    world.gfx.image_pixels(image).unwrap().to_vec()
}
